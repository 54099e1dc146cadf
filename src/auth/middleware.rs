use std::rc::Rc;

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use sqlx::PgPool;

use crate::auth::extractors::AuthenticatedUser;
use crate::auth::token::TokenSettings;
use crate::error::AppError;
use crate::models::User;

/// Message for every authentication failure, so callers cannot tell the causes apart.
pub const AUTH_FAILED: &str = "Please authenticate.";

/// Resolves `Authorization: Bearer <token>` to a user holding that token.
///
/// On success an [`AuthenticatedUser`] is inserted into the request extensions;
/// on failure the request is answered with the error response (401 for any
/// credential problem) and the inner service never runs.
/// Requires `web::Data<TokenSettings>` and `web::Data<PgPool>` in app data.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            match authenticate(&req).await {
                Ok(authenticated) => {
                    req.extensions_mut().insert(authenticated);
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(err) => Ok(req.error_response(err).map_into_right_body()),
            }
        })
    }
}

/// Pulls the token out of an `Authorization: Bearer ...` header value.
pub fn bearer_token(value: &str) -> Option<&str> {
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn authenticate(req: &ServiceRequest) -> Result<AuthenticatedUser, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_owned)
        .ok_or_else(|| AppError::Unauthorized(AUTH_FAILED.into()))?;

    let settings = req
        .app_data::<web::Data<TokenSettings>>()
        .cloned()
        .ok_or_else(|| AppError::InternalServerError("TokenSettings missing from app data".into()))?;

    let claims = settings.verify_token(&token).map_err(|err| {
        log::debug!("rejected bearer token: {}", err);
        AppError::Unauthorized(AUTH_FAILED.into())
    })?;

    let pool = req
        .app_data::<web::Data<PgPool>>()
        .cloned()
        .ok_or_else(|| AppError::InternalServerError("PgPool missing from app data".into()))?;

    match User::find_by_token(&pool, claims.sub, &token).await? {
        Some(user) => Ok(AuthenticatedUser { user, token }),
        None => Err(AppError::Unauthorized(AUTH_FAILED.into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(bearer_token("abc.def.ghi"), None);
    }
}
