use axum::{Router, routing::{post, get}, Json, extract::Path};
use sqlx::PgPool;
use crate::kernel::Plugin;
use crate::plugins::users::models::CreateUser;
use crate::plugins::users::handlers::{create_user, get_user};

pub struct UsersPlugin {
    pub pool: PgPool,
}

impl UsersPlugin {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Plugin for UsersPlugin {
    async fn router(&self) -> Router {
        let p_create = self.pool.clone();
        let p_get = self.pool.clone();

        Router::new()
            .route("/", post(move |Json(payload): Json<CreateUser>| {
                let pool = p_create.clone();
                async move { create_user(pool, payload).await }
            }))
            .route("/:id", get(move |Path(id): Path<i64>| {
                let pool = p_get.clone();
                async move { get_user(pool, Path(id)).await }
            }))
    }

    fn name(&self) -> &'static str {
        "users"
    }
}
