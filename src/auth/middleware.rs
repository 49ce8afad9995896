use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::token::verify_token;
use crate::error::AppError;

/// Routes under `/api` reachable without a bearer token.
const PUBLIC_PATHS: [&str; 3] = [
    "/api/auth/login",
    "/api/auth/register",
    "/api/auth/check-username/",
];

pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.iter().any(|public| path.starts_with(public))
}

/// Gates every request on a valid `Authorization: Bearer <token>` header.
///
/// On success the decoded `Claims` are stored in the request extensions for
/// [`AuthenticatedUser`](crate::auth::AuthenticatedUser) to pick up. On failure the
/// request is answered here with the `AppError` response; the inner service never runs.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if is_public_path(req.path()) {
            let fut = self.service.call(req);
            return Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) });
        }

        let token = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty());

        let claims = match token {
            Some(token) => verify_token(token),
            None => Err(AppError::Unauthorized("Missing token".into())),
        };

        match claims {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
            Err(app_err) => {
                log::debug!("Rejected request to {}: {}", req.path(), app_err);
                let res = req.error_response(app_err).map_into_right_body();
                Box::pin(async move { Ok(res) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::{generate_token, tests::run_with_temp_jwt_secret};
    use crate::auth::AuthenticatedUser;
    use actix_web::{http::StatusCode, test, web, App, HttpResponse};

    async fn whoami(user: AuthenticatedUser) -> HttpResponse {
        HttpResponse::Ok().body(user.username)
    }

    #[::core::prelude::v1::test]
    fn test_public_paths() {
        assert!(is_public_path("/api/auth/login"));
        assert!(is_public_path("/api/auth/register"));
        assert!(is_public_path("/api/auth/check-username/alice"));
        assert!(!is_public_path("/api/auth/me"));
        assert!(!is_public_path("/api/recipes"));
    }

    #[actix_rt::test]
    async fn test_missing_and_malformed_headers_are_rejected() {
        let app = test::init_service(
            App::new().service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .route("/whoami", web::get().to(whoami)),
            ),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/whoami").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        for value in ["Basic abc", "Bearer ", "Bearer"] {
            let req = test::TestRequest::get()
                .uri("/api/whoami")
                .insert_header((header::AUTHORIZATION, value))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{:?}", value);
        }
    }

    #[::core::prelude::v1::test]
    fn test_valid_token_passes_claims_through() {
        run_with_temp_jwt_secret("middleware-secret", || {
            let token = generate_token(5, "carol").unwrap();
            actix_rt::System::new().block_on(async move {
                let app = test::init_service(
                    App::new().service(
                        web::scope("/api")
                            .wrap(AuthMiddleware)
                            .route("/whoami", web::get().to(whoami)),
                    ),
                )
                .await;

                let req = test::TestRequest::get()
                    .uri("/api/whoami")
                    .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
                    .to_request();
                let body = test::call_and_read_body(&app, req).await;
                assert_eq!(body, "carol");
            });
        });
    }
}
