use axum::{routing::get, Router};
use axum::http::StatusCode;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Counters for the story lifecycle.
#[derive(Clone)]
pub struct StoryMetrics {
    pub uploaded: IntCounter,
    pub upload_failures: IntCounterVec,
    pub views_recorded: IntCounter,
    pub swept_stories: IntCounter,
    pub swept_files: IntCounter,
}

impl StoryMetrics {
    fn register(registry: &Registry) -> prometheus::Result<Self> {
        let uploaded = IntCounter::new("stories_uploaded_total", "Stories created from uploads")?;
        let upload_failures = IntCounterVec::new(
            Opts::new("story_upload_failures_total", "Rejected or failed story uploads"),
            &["code"],
        )?;
        let views_recorded = IntCounter::new("story_views_recorded_total", "Story views written")?;
        let swept_stories = IntCounter::new("stories_swept_total", "Expired story rows deleted")?;
        let swept_files = IntCounter::new("story_files_swept_total", "Expired story media files deleted")?;

        registry.register(Box::new(uploaded.clone()))?;
        registry.register(Box::new(upload_failures.clone()))?;
        registry.register(Box::new(views_recorded.clone()))?;
        registry.register(Box::new(swept_stories.clone()))?;
        registry.register(Box::new(swept_files.clone()))?;

        Ok(Self { uploaded, upload_failures, views_recorded, swept_stories, swept_files })
    }

    /// Unregistered counters, for wiring that does not expose `/metrics`.
    pub fn detached() -> Self {
        Self::register(&Registry::new()).expect("fresh registry accepts story metrics")
    }
}

#[derive(Clone)]
pub struct MetricsPlugin {
    registry: Arc<Registry>,
    pub request_counter: Arc<IntCounterVec>,
    pub request_duration: Arc<HistogramVec>,
    pub stories: StoryMetrics,
}

impl MetricsPlugin {
    pub fn new() -> Self {
        let registry = Registry::new();
        let ctr_opts = Opts::new("requests_total", "Total HTTP requests");
        let counter = IntCounterVec::new(ctr_opts, &["method", "plugin", "status"]).expect("counter");
        registry.register(Box::new(counter.clone())).ok();

        let hist_opts = HistogramOpts::new("request_duration_seconds", "HTTP request latencies in seconds");
        let histogram = HistogramVec::new(hist_opts, &["method", "plugin"]).expect("histogram");
        registry.register(Box::new(histogram.clone())).ok();

        let stories = StoryMetrics::register(&registry).expect("story metrics");

        // process collector is only available on Linux
        #[cfg(target_os = "linux")]
        {
            let collector = prometheus::process_collector::ProcessCollector::for_self();
            registry.register(Box::new(collector)).ok();
        }

        MetricsPlugin {
            registry: Arc::new(registry),
            request_counter: Arc::new(counter),
            request_duration: Arc::new(histogram),
            stories,
        }
    }

    pub fn observe(&self, method: &str, plugin: &str, status: u16, seconds: f64) {
        self.request_counter
            .with_label_values(&[method, plugin, &status.to_string()])
            .inc();
        self.request_duration.with_label_values(&[method, plugin]).observe(seconds);
    }

    pub fn render(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer).map_err(|e| e.to_string())?;
        String::from_utf8(buffer).map_err(|e| e.to_string())
    }

    pub fn router(&self) -> Router {
        let metrics = self.clone();
        Router::new().route("/", get(move || {
            let rendered = metrics.render();
            async move {
                match rendered {
                    Ok(body) => (StatusCode::OK, body),
                    Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e),
                }
            }
        }))
    }
}

impl Default for MetricsPlugin {
    fn default() -> Self {
        Self::new()
    }
}
