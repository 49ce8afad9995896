use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::auth::token::Claims;
use crate::error::AppError;

/// The caller identity decoded by `AuthMiddleware`.
///
/// Only meaningful on routes behind the middleware. Anywhere else the claims
/// are absent and extraction fails with `401 Unauthorized`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: i32,
    pub username: String,
}

impl AuthenticatedUser {
    /// Fails with `403 Forbidden` unless the caller is `username`.
    pub fn ensure_is(&self, username: &str) -> Result<(), AppError> {
        if self.username == username {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "You can only modify your own profile".into(),
            ))
        }
    }

    /// Fails with `403 Forbidden` unless the caller's id is `owner_id`.
    pub fn ensure_owns(&self, owner_id: i32) -> Result<(), AppError> {
        if self.id == owner_id {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "You can only modify your own recipes".into(),
            ))
        }
    }
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username,
        }
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<Claims>().cloned() {
            Some(claims) => ready(Ok(claims.into())),
            None => {
                let err = AppError::Unauthorized(
                    "User identity not found in request. Ensure AuthMiddleware is active."
                        .to_string(),
                );
                ready(Err(err.into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::dev::Payload;
    use actix_web::http::StatusCode;
    use actix_web::test;

    #[actix_rt::test]
    async fn test_authenticated_user_extractor_success() {
        let req = test::TestRequest::default().to_http_request();
        req.extensions_mut().insert(Claims {
            sub: 123,
            username: "alice".to_string(),
            exp: 0,
        });

        let mut payload = Payload::None;
        let user = AuthenticatedUser::from_request(&req, &mut payload)
            .await
            .unwrap();
        assert_eq!(user.id, 123);
        assert_eq!(user.username, "alice");
    }

    #[actix_rt::test]
    async fn test_authenticated_user_extractor_failure() {
        let req = test::TestRequest::default().to_http_request();

        let mut payload = Payload::None;
        let err = AuthenticatedUser::from_request(&req, &mut payload)
            .await
            .unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[::core::prelude::v1::test]
    fn test_ownership_checks() {
        let user = AuthenticatedUser {
            id: 1,
            username: "alice".to_string(),
        };
        assert!(user.ensure_is("alice").is_ok());
        assert!(matches!(user.ensure_is("bob"), Err(AppError::Forbidden(_))));
        assert!(user.ensure_owns(1).is_ok());
        assert!(matches!(user.ensure_owns(2), Err(AppError::Forbidden(_))));
    }
}
