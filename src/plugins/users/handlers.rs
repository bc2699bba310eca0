use axum::{Json, extract::Path};
use axum::http::StatusCode;
use sqlx::PgPool;
use crate::plugins::users::models::{UserDto, CreateUser};
use crate::plugins::users::repo;
use crate::http_error::AppError;

pub async fn create_user(pool: PgPool, payload: CreateUser) -> Result<Json<UserDto>, AppError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::new(StatusCode::BAD_REQUEST, "name is required").with_code("invalid_input"));
    }
    let user = repo::insert_user(&pool, name, payload.avatar_ref.as_deref()).await?;
    tracing::info!("created user {}", user.id);
    Ok(Json(user))
}

pub async fn get_user(pool: PgPool, Path(id): Path<i64>) -> Result<Json<UserDto>, AppError> {
    Ok(Json(repo::get_user(&pool, id).await?))
}
