use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::auth::middleware::AUTH_FAILED;
use crate::error::AppError;
use crate::models::User;

/// The caller resolved by `AuthMiddleware`: the user and the token it presented.
///
/// Use it as a handler argument on routes wrapped by `AuthMiddleware`. On a route
/// without the middleware the extraction fails with 401.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub token: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUser>().cloned() {
            Some(authenticated) => ready(Ok(authenticated)),
            None => {
                let err = AppError::Unauthorized(AUTH_FAILED.to_string());
                ready(Err(err.into()))
            }
        }
    }
}
