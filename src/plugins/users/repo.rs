use sqlx::PgPool;
use crate::http_error::AppError;
use crate::plugins::users::models::UserDto;

pub async fn insert_user(pool: &PgPool, name: &str, avatar_ref: Option<&str>) -> Result<UserDto, AppError> {
    let user = sqlx::query_as::<_, UserDto>("INSERT INTO users (name, avatar_ref) VALUES ($1, $2) RETURNING id, name, avatar_ref")
        .bind(name)
        .bind(avatar_ref)
        .fetch_one(pool)
        .await
        .map_err(AppError::from)?;
    Ok(user)
}

pub async fn get_user(pool: &PgPool, id: i64) -> Result<UserDto, AppError> {
    let user = sqlx::query_as::<_, UserDto>("SELECT id, name, avatar_ref FROM users WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(AppError::from)?;
    Ok(user)
}
