use axum::{routing::get, routing::post, Extension, Router};
use std::sync::Arc;

use crate::db::DbPool;
use crate::kernel::Plugin;
use crate::plugins::auth::JwtSecret;
use crate::plugins::communication::follows::handlers::{following, toggle_follow};
use crate::plugins::communication::follows::repo::PgFollowStore;
use crate::plugins::communication::follows::service::FollowService;

pub struct FollowsPlugin {
    service: Arc<FollowService>,
    jwt_secret: JwtSecret,
}

impl FollowsPlugin {
    pub fn new(service: Arc<FollowService>, jwt_secret: impl Into<String>) -> Self {
        Self { service, jwt_secret: JwtSecret(jwt_secret.into()) }
    }

    pub fn from_pool(pool: DbPool, jwt_secret: impl Into<String>) -> Self {
        Self::new(FollowService::new(PgFollowStore::new(pool).into_arc()).into_arc(), jwt_secret)
    }
}

#[async_trait::async_trait]
impl Plugin for FollowsPlugin {
    async fn router(&self) -> Router {
        Router::new()
            .route("/", post(toggle_follow))
            .route("/following", get(following))
            .layer(Extension(self.service.clone()))
            .layer(Extension(self.jwt_secret.clone()))
    }

    fn name(&self) -> &'static str { "communication/follows" }
}
