//! Prometheus metrics for the assistant.
//!
//! Recording helpers are no-ops until [`init_metrics`] has run, so library
//! code and tests can call them freely.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::{Mutex, OnceLock};

// Global registry
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub static CHAT_RESPONSES_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static LLM_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static LLM_REQUEST_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
pub static LLM_RETRIES_TOTAL: OnceLock<IntCounter> = OnceLock::new();

static INIT_LOCK: Mutex<()> = Mutex::new(());

/// How a chat request was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Answered,
    OffTopic,
    Fallback,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Answered => "answered",
            Outcome::OffTopic => "off_topic",
            Outcome::Fallback => "fallback",
        }
    }
}

/// Initialize all metrics. Safe to call more than once; only the first call registers.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let _guard = INIT_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    if REGISTRY.get().is_some() {
        return Ok(());
    }

    let registry = Registry::new();

    let chat_responses = IntCounterVec::new(
        Opts::new("chat_responses_total", "Chat responses by outcome"),
        &["outcome"],
    )?;

    let llm_requests = IntCounterVec::new(
        Opts::new("llm_requests_total", "Calls to the LLM provider by final status"),
        &["provider", "status"],
    )?;

    let llm_duration = HistogramVec::new(
        HistogramOpts::new(
            "llm_request_duration_seconds",
            "LLM call duration in seconds, including retries",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["provider"],
    )?;

    let llm_retries = IntCounter::new("llm_retries_total", "LLM call attempts beyond the first")?;

    registry.register(Box::new(chat_responses.clone()))?;
    registry.register(Box::new(llm_requests.clone()))?;
    registry.register(Box::new(llm_duration.clone()))?;
    registry.register(Box::new(llm_retries.clone()))?;

    // Initialize globals
    let _ = REGISTRY.set(registry);
    let _ = CHAT_RESPONSES_TOTAL.set(chat_responses);
    let _ = LLM_REQUESTS_TOTAL.set(llm_requests);
    let _ = LLM_REQUEST_DURATION_SECONDS.set(llm_duration);
    let _ = LLM_RETRIES_TOTAL.set(llm_retries);

    tracing::info!("Prometheus metrics initialized");
    Ok(())
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    let registry = match REGISTRY.get() {
        Some(r) => r,
        None => {
            tracing::error!("Metrics registry not initialized");
            return "# Metrics registry not initialized\n".to_string();
        }
    };

    let metric_families = registry.gather();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return format!("# Failed to encode metrics: {}\n", e);
    }

    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to convert metrics to UTF-8");
            format!("# Failed to convert metrics to UTF-8: {}\n", e)
        }
    }
}

/// Record how a chat request was answered.
pub fn record_chat_outcome(outcome: Outcome) {
    if let Some(counter) = CHAT_RESPONSES_TOTAL.get() {
        counter.with_label_values(&[outcome.as_str()]).inc();
    }
}

/// Record a finished LLM call (after all retries).
pub fn record_llm_request(provider: &str, status: &str, duration_secs: f64) {
    if let Some(counter) = LLM_REQUESTS_TOTAL.get() {
        counter.with_label_values(&[provider, status]).inc();
    }
    if let Some(histogram) = LLM_REQUEST_DURATION_SECONDS.get() {
        histogram
            .with_label_values(&[provider])
            .observe(duration_secs);
    }
}

/// Record extra attempts made for one call.
pub fn record_llm_retries(retries: u64) {
    if retries == 0 {
        return;
    }
    if let Some(counter) = LLM_RETRIES_TOTAL.get() {
        counter.inc_by(retries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_exposed_after_init() {
        init_metrics().unwrap();
        init_metrics().unwrap();

        record_chat_outcome(Outcome::Answered);
        record_llm_request("mock", "success", 0.2);

        let text = get_metrics();
        assert!(text.contains("chat_responses_total"));
        assert!(text.contains("llm_request_duration_seconds"));
    }
}
