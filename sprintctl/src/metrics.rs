//! Prometheus metrics for assistant traffic.
//!
//! Follows the GenAI semantic-convention naming for the duration and token
//! instruments so dashboards built against standard exporters keep working.

use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry};

use crate::ai::{Provider, TokenUsage};

/// Metric instruments for assistant requests
#[derive(Clone)]
pub struct AiMetrics {
    /// Total request duration, provider call included
    request_duration: HistogramVec,
    /// Token usage split by direction (input/output)
    token_usage: HistogramVec,
    /// Requests by outcome (success, error, cache_hit, rate_limited)
    requests_total: CounterVec,
    /// Reference to the Prometheus registry
    registry: Registry,
}

impl AiMetrics {
    /// Create the instruments and register them with `registry`.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let duration_buckets = vec![0.01, 0.02, 0.04, 0.08, 0.16, 0.32, 0.64, 1.28, 2.56, 5.12, 10.24, 20.48, 40.96, 81.92];
        let request_duration = HistogramVec::new(
            HistogramOpts::new("gen_ai_server_request_duration_seconds", "Assistant request duration").buckets(duration_buckets),
            &["gen_ai_provider_name", "gen_ai_request_model"],
        )?;
        registry.register(Box::new(request_duration.clone()))?;

        let token_buckets = vec![1.0, 4.0, 16.0, 64.0, 256.0, 1024.0, 4096.0, 16384.0, 65536.0];
        let token_usage = HistogramVec::new(
            HistogramOpts::new("gen_ai_client_token_usage", "Number of tokens used in prompt and completion").buckets(token_buckets),
            &["gen_ai_provider_name", "gen_ai_request_model", "gen_ai_token_type"],
        )?;
        registry.register(Box::new(token_usage.clone()))?;

        let requests_total = CounterVec::new(
            Opts::new("assistant_requests_total", "Assistant requests by outcome"),
            &["gen_ai_provider_name", "gen_ai_request_model", "outcome"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        Ok(Self {
            request_duration,
            token_usage,
            requests_total,
            registry: registry.clone(),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a completed provider call.
    pub fn record_call(&self, provider: Provider, model: &str, duration_secs: f64, usage: &TokenUsage) {
        let provider = provider.to_string();
        self.request_duration.with_label_values(&[&provider, model]).observe(duration_secs);
        self.token_usage
            .with_label_values(&[&provider, model, "input"])
            .observe(usage.prompt_tokens as f64);
        self.token_usage
            .with_label_values(&[&provider, model, "output"])
            .observe(usage.completion_tokens as f64);
    }

    /// Count one request with its outcome label.
    pub fn record_outcome(&self, provider: Provider, model: &str, outcome: &str) {
        self.requests_total
            .with_label_values(&[&provider.to_string(), model, outcome])
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruments_register_and_record() {
        let registry = Registry::new();
        let metrics = AiMetrics::new(&registry).unwrap();

        metrics.record_call(Provider::Openai, "gpt-4o", 0.5, &TokenUsage::new(100, 20));
        metrics.record_outcome(Provider::Openai, "gpt-4o", "success");
        metrics.record_outcome(Provider::Openai, "gpt-4o", "cache_hit");

        let families = registry.gather();
        let names: Vec<&str> = families.iter().map(|f| f.name()).collect();
        assert!(names.contains(&"gen_ai_server_request_duration_seconds"));
        assert!(names.contains(&"gen_ai_client_token_usage"));
        assert!(names.contains(&"assistant_requests_total"));
    }

    #[test]
    fn test_double_registration_fails() {
        let registry = Registry::new();
        let _metrics = AiMetrics::new(&registry).unwrap();
        assert!(AiMetrics::new(&registry).is_err());
    }
}
