use axum::Router;
use dotenvy::dotenv;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use storyline_api_kernel::config::AppConfig;
use storyline_api_kernel::db;
use storyline_api_kernel::kernel::{build_app, Plugin};
use storyline_api_kernel::plugins::communication::follows::FollowsPlugin;
use storyline_api_kernel::plugins::communication::stories::StoriesPlugin;
use storyline_api_kernel::plugins::health::HealthPlugin;
use storyline_api_kernel::plugins::metrics::MetricsPlugin;
use storyline_api_kernel::plugins::users::UsersPlugin;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // load environment before reading config
    dotenv().ok();
    let cfg = AppConfig::from_env()?;
    init_tracing(cfg.log_json);

    let pool = db::init_db(&cfg.database_url).await?;
    let metrics_plugin = MetricsPlugin::new();

    let plugins_vec: Vec<Box<dyn Plugin>> = vec![
        Box::new(HealthPlugin::with_pool(pool.clone())),
        Box::new(UsersPlugin::new(pool.clone())),
        Box::new(FollowsPlugin::from_pool(pool.clone(), cfg.jwt_secret.clone())),
        Box::new(StoriesPlugin::from_config(pool.clone(), &cfg, Some(metrics_plugin.stories.clone()))),
    ];

    let plugin_names: Vec<&'static str> = plugins_vec.iter().map(|p| p.name()).collect();
    tracing::info!("mounting plugins: {:?}", plugin_names);

    let mut app: Router = build_app(&plugins_vec, Some(metrics_plugin.clone())).await;

    // not instrumented, scrapes would count themselves
    app = app.nest("/metrics", metrics_plugin.router());

    let addr: SocketAddr = format!("0.0.0.0:{}", cfg.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            for p in plugins_vec.iter() {
                p.on_shutdown().await;
            }
        })
        .await?;

    Ok(())
}
