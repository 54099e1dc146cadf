use actix_multipart::Multipart;
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use futures::StreamExt;
use serde_json::{Map, Value};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{
        password::{hash_password_blocking, verify_password_blocking},
        AuthMiddleware, AuthResponse, AuthenticatedUser, LoginRequest, TokenSettings,
    },
    avatar,
    error::AppError,
    models::{parse_update, NewUser, User, UserUpdate, USER_UPDATE_FIELDS},
};

/// Multipart field that carries the avatar file.
const AVATAR_FIELD: &str = "avatar";

fn unable_to_login() -> AppError {
    AppError::BadRequest("Unable to login".into())
}

/// Sign up
///
/// Creates an account and returns it together with its first token.
///
/// ## Responses:
/// - `201 Created`: `{"user": User, "token": "..."}`.
/// - `400 Bad Request`: invalid fields or an email that is already registered.
#[post("")]
pub async fn signup(
    pool: web::Data<PgPool>,
    settings: web::Data<TokenSettings>,
    body: web::Json<NewUser>,
) -> Result<impl Responder, AppError> {
    let new_user = body.into_inner().normalized();
    new_user.validate()?;

    if User::email_taken(&pool, &new_user.email).await? {
        return Err(AppError::BadRequest("Email is already registered".into()));
    }

    let password_hash = hash_password_blocking(new_user.password.clone()).await?;
    let (user, token) =
        User::create(&pool, &new_user, &password_hash, |id| settings.generate_token(id)).await?;

    log::info!("user {} signed up", user.id);
    Ok(HttpResponse::Created().json(AuthResponse { user, token }))
}

/// Log in
///
/// An unknown email and a wrong password produce the same `400 Unable to login`.
#[post("/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    settings: web::Data<TokenSettings>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate().map_err(|_| unable_to_login())?;
    let login_data = login_data.into_inner();

    let user = User::find_by_email(&pool, &login_data.normalized_email())
        .await?
        .ok_or_else(unable_to_login)?;

    if !verify_password_blocking(login_data.password, user.password_hash.clone()).await? {
        log::warn!("failed login for user {}", user.id);
        return Err(unable_to_login());
    }

    let token = settings.generate_token(user.id)?;
    User::add_token(&pool, user.id, &token).await?;

    Ok(HttpResponse::Ok().json(AuthResponse { user, token }))
}

/// Revokes the token used for this request.
#[post("/logout", wrap = "AuthMiddleware")]
pub async fn logout(
    pool: web::Data<PgPool>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    User::remove_token(&pool, auth.user.id, &auth.token).await?;
    Ok(HttpResponse::Ok().finish())
}

/// Revokes every token of the caller.
#[post("/logoutAll", wrap = "AuthMiddleware")]
pub async fn logout_all(
    pool: web::Data<PgPool>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    User::clear_tokens(&pool, auth.user.id).await?;
    Ok(HttpResponse::Ok().finish())
}

#[get("/me", wrap = "AuthMiddleware")]
pub async fn get_profile(auth: AuthenticatedUser) -> impl Responder {
    HttpResponse::Ok().json(auth.user)
}

/// Update profile
///
/// Only `name`, `email`, `password` and `age` may be sent; any other key is
/// rejected with `400 Invalid updates!`. A new password is hashed before it is saved.
#[patch("/me", wrap = "AuthMiddleware")]
pub async fn update_profile(
    pool: web::Data<PgPool>,
    auth: AuthenticatedUser,
    body: web::Json<Map<String, Value>>,
) -> Result<impl Responder, AppError> {
    let update: UserUpdate = parse_update(body.into_inner(), USER_UPDATE_FIELDS)?;
    let user = User::apply_update(&pool, auth.user.id, update).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// Deletes the caller's account along with every task it owns.
#[delete("/me", wrap = "AuthMiddleware")]
pub async fn delete_account(
    pool: web::Data<PgPool>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let user = User::delete_with_tasks(&pool, auth.user.id).await?;
    log::info!("user {} deleted their account", user.id);
    Ok(HttpResponse::Ok().json(user))
}

/// Reads the `avatar` field of a multipart body, enforcing the name and size rules.
async fn read_avatar_upload(mut payload: Multipart) -> Result<Vec<u8>, AppError> {
    while let Some(field) = payload.next().await {
        let mut field = field?;

        let disposition = field.content_disposition();
        if disposition.get_name() != Some(AVATAR_FIELD) {
            continue;
        }
        let file_name = disposition.get_filename().unwrap_or_default().to_owned();
        avatar::check_file_name(&file_name)?;

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            avatar::check_size(data.len() + chunk.len())?;
            data.extend_from_slice(&chunk);
        }
        return Ok(data);
    }

    Err(AppError::BadRequest("Please upload an image".into()))
}

/// Upload avatar
///
/// Expects a multipart body with an `avatar` file (`.jpg`, `.jpeg` or `.png`,
/// at most 1 MB). The image is stored as a 250x250 PNG.
#[post("/me/avatar", wrap = "AuthMiddleware")]
pub async fn upload_avatar(
    pool: web::Data<PgPool>,
    auth: AuthenticatedUser,
    payload: Multipart,
) -> Result<impl Responder, AppError> {
    let upload = read_avatar_upload(payload).await?;
    let png = avatar::normalize_blocking(upload).await?;
    User::set_avatar(&pool, auth.user.id, Some(png)).await?;
    Ok(HttpResponse::Ok().finish())
}

#[delete("/me/avatar", wrap = "AuthMiddleware")]
pub async fn delete_avatar(
    pool: web::Data<PgPool>,
    auth: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    User::set_avatar(&pool, auth.user.id, None).await?;
    Ok(HttpResponse::Ok().finish())
}

/// Serves a user's avatar. Public; 404 when the user or the avatar is missing.
#[get("/{id}/avatar")]
pub async fn get_avatar(
    pool: web::Data<PgPool>,
    user_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let avatar = User::find_avatar(&pool, user_id.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Avatar not found".into()))?;

    Ok(HttpResponse::Ok()
        .content_type(avatar::AVATAR_CONTENT_TYPE)
        .body(avatar))
}
