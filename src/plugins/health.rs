use crate::db::{self, DbPool};
use crate::kernel::Plugin;
use axum::{Extension, Json, Router, routing::get};
use serde::Serialize;

#[derive(Serialize)]
struct Health {
    status: &'static str,
    database: &'static str,
}

/// `GET /health`; pings the database when a pool is attached.
#[derive(Default)]
pub struct HealthPlugin {
    pool: Option<DbPool>,
}

impl HealthPlugin {
    pub fn new() -> Self {
        Self { pool: None }
    }

    pub fn with_pool(pool: DbPool) -> Self {
        Self { pool: Some(pool) }
    }
}

async fn health_handler(Extension(pool): Extension<Option<DbPool>>) -> Json<Health> {
    let database = match pool {
        Some(pool) if db::ping(&pool).await => "up",
        Some(_) => "down",
        None => "detached",
    };
    let status = if database == "down" { "degraded" } else { "ok" };
    Json(Health { status, database })
}

#[async_trait::async_trait]
impl Plugin for HealthPlugin {
    async fn router(&self) -> Router {
        Router::new()
            .route("/", get(health_handler))
            .layer(Extension(self.pool.clone()))
    }

    fn name(&self) -> &'static str {
        "health"
    }

    async fn on_start(&self) {
        tracing::info!("health plugin started");
    }
}
