use std::time::{Duration, Instant};

use super::{Recommendation, RecommendError, RecommendationClient, RecommendationRequest};
use crate::detect::Detection;

/// Endpoint and credential for the recommendation service.
#[derive(Clone)]
pub struct RecommendationSettings {
    pub endpoint: String,
    pub api_key: String,
    pub timeout: Duration,
}

// Keeps the credential out of logs.
impl std::fmt::Debug for RecommendationSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecommendationSettings")
            .field("endpoint", &self.endpoint)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Blocking HTTP client. One POST per `analyze` call, no retries.
pub struct HttpRecommendationClient {
    agent: ureq::Agent,
    endpoint: String,
    authorization: String,
}

impl HttpRecommendationClient {
    pub fn new(settings: &RecommendationSettings) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(settings.timeout).build();
        Self {
            agent,
            endpoint: settings.endpoint.clone(),
            authorization: format!("Bearer {}", settings.api_key),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl RecommendationClient for HttpRecommendationClient {
    fn analyze(&mut self, detections: &[Detection]) -> Result<Recommendation, RecommendError> {
        let started = Instant::now();
        let result = self
            .agent
            .post(&self.endpoint)
            .set("Authorization", &self.authorization)
            .send_json(RecommendationRequest::new(detections));

        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                log::debug!("recommendation service returned {}", status);
                return Err(RecommendError::Remote { status, body });
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(RecommendError::Transport(transport.to_string()));
            }
        };

        let status = response.status();
        let body = response
            .into_string()
            .map_err(|e| RecommendError::Transport(format!("read response body: {}", e)))?;
        log::debug!(
            "recommendation service answered {} in {:?}",
            status,
            started.elapsed()
        );
        if status != 200 {
            return Err(RecommendError::Remote { status, body });
        }
        match serde_json::from_str(&body) {
            Ok(value) => Ok(Recommendation::new(value)),
            Err(_) => Err(RecommendError::Remote { status, body }),
        }
    }
}
