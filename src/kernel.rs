use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::Router;
use async_trait::async_trait;
use std::time::Instant;
use tracing::info;

use crate::plugins::metrics::MetricsPlugin;

#[async_trait]
pub trait Plugin: Send + Sync {

    async fn router(&self) -> Router;

    fn name(&self) -> &'static str;
    /// Optional lifecycle hook called when the kernel starts.
    async fn on_start(&self) {}
    /// Optional lifecycle hook called on shutdown.
    async fn on_shutdown(&self) {}
}

/// Builds the application router by mounting each plugin under `/{plugin.name()}`.
/// With metrics attached, every plugin router counts and times its requests.
pub async fn build_app(plugins: &[Box<dyn Plugin>], metrics: Option<MetricsPlugin>) -> Router {
    let mut app = Router::new();

    for plugin in plugins.iter() {
        info!("starting plugin {}", plugin.name());
        plugin.on_start().await;
        let mut router = plugin.router().await;
        if let Some(m) = metrics.clone() {
            let label = plugin.name();
            router = router.layer(middleware::from_fn(move |req: Request, next: Next| {
                let m = m.clone();
                async move {
                    let method = req.method().to_string();
                    let started = Instant::now();
                    let resp = next.run(req).await;
                    m.observe(&method, label, resp.status().as_u16(), started.elapsed().as_secs_f64());
                    resp
                }
            }));
        }
        // mount plugin under its name to namespace routes
        app = app.nest(&format!("/{}", plugin.name()), router);
    }

    app
}
