use crate::error::AppError;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Token lifetime in hours.
const TOKEN_TTL_HOURS: i64 = 24;

/// Represents the claims encoded within a JWT (JSON Web Token).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject of the token: the user's id.
    pub sub: i32,
    /// Normalized username at issue time.
    pub username: String,
    /// Expiration timestamp (seconds since epoch) for the token.
    pub exp: usize,
}

fn jwt_secret() -> Result<String, AppError> {
    std::env::var("JWT_SECRET").map_err(|_| {
        log::error!("JWT_SECRET is not set");
        AppError::InternalServerError("JWT_SECRET not set".into())
    })
}

/// Generates a JWT identifying `user_id` / `username`.
///
/// The token is set to expire in 24 hours and is signed with `JWT_SECRET`.
///
/// # Returns
/// `AppError::InternalServerError` if `JWT_SECRET` is not set or if token encoding fails.
pub fn generate_token(user_id: i32, username: &str) -> Result<String, AppError> {
    let expiration =
        (chrono::Utc::now() + chrono::Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize;

    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: expiration,
    };

    let secret = jwt_secret()?;

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
}

/// Verifies a JWT string and decodes its claims.
///
/// Default validation applies: HS256 signature and expiration.
///
/// # Returns
/// `AppError::InternalServerError` if `JWT_SECRET` is not set.
/// `AppError::Unauthorized` if the token is malformed, its signature is invalid, or it has expired.
pub fn verify_token(token: &str) -> Result<Claims, AppError> {
    let secret = jwt_secret()?;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lazy_static::lazy_static;

    lazy_static! {
        pub(crate) static ref JWT_ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    }

    // Helper to run test logic with a temporarily set JWT_SECRET
    pub(crate) fn run_with_temp_jwt_secret<F>(secret_value: &str, test_logic: F)
    where
        F: FnOnce(),
    {
        // A panicking test poisons the lock; the guard is still usable.
        let _guard = JWT_ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        let original_secret_val = std::env::var("JWT_SECRET").ok();
        std::env::set_var("JWT_SECRET", secret_value);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(test_logic));

        if let Some(original) = original_secret_val {
            std::env::set_var("JWT_SECRET", original);
        } else {
            std::env::remove_var("JWT_SECRET");
        }

        if let Err(panic_payload) = result {
            std::panic::resume_unwind(panic_payload);
        }
    }

    #[test]
    fn test_token_generation_and_verification() {
        run_with_temp_jwt_secret("test_secret_for_gen_verify", || {
            let token = generate_token(1, "alice").unwrap();
            let claims = verify_token(&token).unwrap();
            assert_eq!(claims.sub, 1);
            assert_eq!(claims.username, "alice");
        });
    }

    #[test]
    fn test_token_expiration() {
        run_with_temp_jwt_secret("test_secret_for_expiration", || {
            let expiration = (chrono::Utc::now() - chrono::Duration::hours(2)).timestamp() as usize;

            let claims_expired = Claims {
                sub: 2,
                username: "bob".to_string(),
                exp: expiration,
            };
            let expired_token = encode(
                &Header::default(),
                &claims_expired,
                &EncodingKey::from_secret("test_secret_for_expiration".as_bytes()),
            )
            .unwrap();

            match verify_token(&expired_token) {
                Err(AppError::Unauthorized(msg)) => {
                    assert!(msg.contains("ExpiredSignature"), "{}", msg);
                }
                Ok(_) => panic!("Token should have been invalid due to expiration"),
                Err(e) => panic!("Unexpected error type for expired token: {:?}", e),
            }
        });
    }

    #[test]
    fn test_forged_token_rejected() {
        // Claims signed with a different secret must not verify.
        let forged = encode(
            &Header::default(),
            &Claims {
                sub: 1,
                username: "admin".to_string(),
                exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
            },
            &EncodingKey::from_secret(b"attacker-secret"),
        )
        .unwrap();

        run_with_temp_jwt_secret("a_completely_different_secret", || {
            assert!(matches!(
                verify_token(&forged),
                Err(AppError::Unauthorized(_))
            ));
            assert!(matches!(
                verify_token("not-a-jwt"),
                Err(AppError::Unauthorized(_))
            ));
        });
    }
}
