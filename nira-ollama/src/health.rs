//! Liveness probing of the Ollama HTTP endpoint.

use std::time::Duration;

/// Timeout for a single readiness probe.
pub(crate) const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Probes whether the Ollama server is accepting requests.
///
/// All failures (connect error, timeout, non-2xx) collapse to `false`;
/// the probe never surfaces an error to its caller.
#[derive(Clone)]
pub struct HealthProbe {
    client: reqwest::Client,
}

impl HealthProbe {
    #[must_use]
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }

    /// GET `/api/version`; `true` only on a 2xx response.
    pub async fn check(&self, base_url: &str) -> bool {
        let url = format!("{}/api/version", base_url.trim_end_matches('/'));
        matches!(self.client.get(url).send().await, Ok(r) if r.status().is_success())
    }
}

impl Default for HealthProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn check_healthy_server_returns_true() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/api/version"))
            .respond_with(wiremock::ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let probe = HealthProbe::new();
        assert!(probe.check(&server.uri()).await);
    }

    #[tokio::test]
    async fn check_non_2xx_returns_false() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/api/version"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let probe = HealthProbe::new();
        assert!(!probe.check(&server.uri()).await);
    }

    #[tokio::test]
    async fn check_unreachable_address_returns_false_within_timeout() {
        let probe = HealthProbe::new();
        let start = std::time::Instant::now();
        // Port 1 is virtually never listening; connection is refused fast.
        assert!(!probe.check("http://127.0.0.1:1").await);
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn check_handles_trailing_slash() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/api/version"))
            .respond_with(wiremock::ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let probe = HealthProbe::new();
        assert!(probe.check(&format!("{}/", server.uri())).await);
    }
}
