use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

// Global Prometheus registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

fn service_and_env() -> (String, String) {
    let service = std::env::var("APP_SERVICE").ok().unwrap_or_else(|| env!("APP_SERVICE_DEFAULT").to_string());
    let env_name = std::env::var("APP_ENV").ok().unwrap_or_else(|| env!("APP_ENV_DEFAULT").to_string());
    (service, env_name)
}

fn labelled(name: &str, help: &str) -> Opts {
    let (service, env_name) = service_and_env();
    Opts::new(name, help)
        .const_label("service", service)
        .const_label("env", env_name)
}

// Metric construction only fails on invalid names, which are constants here.
fn counter(name: &str, help: &str) -> IntCounter {
    let c = IntCounter::with_opts(labelled(name, help))
        .unwrap_or_else(|e| panic!("invalid metric {}: {}", name, e));
    REGISTRY.register(Box::new(c.clone())).ok();
    c
}

// App info gauge (const)
pub static APP_INFO: Lazy<IntGauge> = Lazy::new(|| {
    let (service, env_name) = service_and_env();
    let g = IntGauge::with_opts(
        Opts::new("app_info", "Application info gauge")
            .const_label("service", &service)
            .const_label("env", &env_name)
            .const_label("version", env!("CARGO_PKG_VERSION"))
            .const_label("git_sha", env!("GIT_SHA"))
            .const_label("build_time", env!("BUILD_TIME")),
    )
    .unwrap_or_else(|e| panic!("invalid metric app_info: {}", e));
    REGISTRY.register(Box::new(g.clone())).ok();
    g.set(1);
    g
});

// Search cache
pub static SEARCH_CACHE_HITS_TOTAL: Lazy<IntCounter> =
    Lazy::new(|| counter("search_cache_hits_total", "Searches served from the result cache"));

pub static SEARCH_CACHE_MISSES_TOTAL: Lazy<IntCounter> =
    Lazy::new(|| counter("search_cache_misses_total", "Searches that went to the document store"));

pub static SEARCH_CACHE_INVALIDATIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    counter(
        "search_cache_invalidations_total",
        "Per-user search cache invalidations triggered by writes",
    )
});

pub static SEARCH_LATENCY_MS: Lazy<Histogram> = Lazy::new(|| {
    let (service, env_name) = service_and_env();
    let mut opts = HistogramOpts::new("search_latency_ms", "Uncached search latency in milliseconds")
        .buckets(vec![1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 250.0, 500.0, 1000.0]);
    opts.common_opts = opts.common_opts.const_label("service", service).const_label("env", env_name);
    let h = Histogram::with_opts(opts).unwrap_or_else(|e| panic!("invalid metric search_latency_ms: {}", e));
    REGISTRY.register(Box::new(h.clone())).ok();
    h
});

// Uploads
pub static UPLOADS_TOTAL: Lazy<IntCounter> =
    Lazy::new(|| counter("uploads_total", "Audio entries created"));

pub static UPLOAD_FAILURES_TOTAL: Lazy<IntCounter> =
    Lazy::new(|| counter("upload_failures_total", "Uploads that failed after authentication"));

// AI calls, by kind (transcription, therapist, chat)
pub static AI_REQUEST_DURATION_MS: Lazy<HistogramVec> = Lazy::new(|| {
    let (service, env_name) = service_and_env();
    let mut opts = HistogramOpts::new("ai_request_duration_ms", "Generative AI request duration in milliseconds")
        .buckets(vec![100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0, 60000.0]);
    opts.common_opts = opts.common_opts.const_label("service", service).const_label("env", env_name);
    let hv = HistogramVec::new(opts, &["kind"])
        .unwrap_or_else(|e| panic!("invalid metric ai_request_duration_ms: {}", e));
    REGISTRY.register(Box::new(hv.clone())).ok();
    hv
});

// HTTP
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let cv = IntCounterVec::new(labelled("http_requests_total", "HTTP requests by method and status"), &["method", "status"])
        .unwrap_or_else(|e| panic!("invalid metric http_requests_total: {}", e));
    REGISTRY.register(Box::new(cv.clone())).ok();
    cv
});

/// Touch every static so `/metrics` lists them before first use.
pub fn init() {
    Lazy::force(&APP_INFO);
    Lazy::force(&SEARCH_CACHE_HITS_TOTAL);
    Lazy::force(&SEARCH_CACHE_MISSES_TOTAL);
    Lazy::force(&SEARCH_CACHE_INVALIDATIONS_TOTAL);
    Lazy::force(&SEARCH_LATENCY_MS);
    Lazy::force(&UPLOADS_TOTAL);
    Lazy::force(&UPLOAD_FAILURES_TOTAL);
    Lazy::force(&AI_REQUEST_DURATION_MS);
    Lazy::force(&HTTP_REQUESTS_TOTAL);
}

pub fn observe_search_latency_ms(duration_ms: f64) {
    SEARCH_LATENCY_MS.observe(duration_ms);
}

pub fn observe_ai_duration_ms(kind: &str, duration_ms: f64) {
    AI_REQUEST_DURATION_MS.with_label_values(&[kind]).observe(duration_ms);
}

pub fn record_http_request(method: &str, status: u16) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, &status.to_string()])
        .inc();
}

// Exporter for Prometheus text format
pub fn export_prometheus() -> String {
    let metric_families = REGISTRY.gather();
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_ok() {
        String::from_utf8(buffer).unwrap_or_default()
    } else {
        "".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_lists_registered_metrics() {
        init();
        SEARCH_CACHE_HITS_TOTAL.inc();
        record_http_request("GET", 200);
        observe_ai_duration_ms("transcription", 12.0);
        let text = export_prometheus();
        assert!(text.contains("search_cache_hits_total"));
        assert!(text.contains("http_requests_total"));
        assert!(text.contains("ai_request_duration_ms"));
        assert!(text.contains("app_info"));
    }
}
