//! Client for the Mixture-of-Agents service.
//!
//! `GET /models` lists identifiers; `POST /moa` runs one prompt through the
//! selected models and an aggregator.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ureq::Agent;

use crate::catalog::ModelId;
use crate::error::{CatalogFetchError, RequestError};

/// `{provider, model}` pair as sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    /// Provider token.
    pub provider: String,
    /// Model name.
    pub model: String,
}

impl From<&ModelId> for ModelRef {
    fn from(id: &ModelId) -> Self {
        Self {
            provider: id.provider.clone(),
            model: id.model.clone(),
        }
    }
}

/// Body of `POST /moa`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoaRequest {
    /// User prompt.
    pub prompt: String,
    /// Proposer models.
    pub selected_models: Vec<ModelRef>,
    /// Model that synthesizes the proposals.
    pub aggregator_config: ModelRef,
    /// Extra aggregator instructions.
    pub custom_prompt: String,
    /// Proposal rounds.
    pub rounds: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Token budget per call.
    pub max_tokens: u32,
}

/// Body of a successful `POST /moa` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoaResponse {
    /// Raw answer per model identifier.
    pub proposals: BTreeMap<String, String>,
    /// Raw synthesized answer.
    pub aggregated_response: String,
}

/// The service collaborator. Calls block; the controller runs them as tasks.
pub trait MoaBackend: Send + Sync {
    /// Fetch the flat list of model identifiers.
    fn fetch_catalog(&self) -> Result<Vec<String>, CatalogFetchError>;

    /// Issue one generate request.
    fn generate(&self, request: &MoaRequest) -> Result<MoaResponse, RequestError>;
}

/// [`MoaBackend`] over HTTP.
#[derive(Debug)]
pub struct HttpBackend {
    base_url: String,
    catalog_agent: Agent,
    generate_agent: Agent,
}

impl HttpBackend {
    /// Client for the service at `base_url` (no trailing path).
    #[must_use]
    pub fn new(base_url: &str, catalog_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            catalog_agent: agent(catalog_timeout),
            generate_agent: agent(request_timeout),
        }
    }

    /// Service base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn agent(timeout: Duration) -> Agent {
    let config = ureq::config::Config::builder()
        .timeout_global(Some(timeout))
        .build();
    config.new_agent()
}

impl MoaBackend for HttpBackend {
    fn fetch_catalog(&self) -> Result<Vec<String>, CatalogFetchError> {
        let url = format!("{}/models", self.base_url);
        debug!(%url, "Fetching model catalog");

        let response = match self.catalog_agent.get(url.as_str()).call() {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(status)) => {
                return Err(CatalogFetchError::Status(status));
            }
            Err(err) => return Err(CatalogFetchError::Transport(err)),
        };

        response
            .into_body()
            .read_json::<Vec<String>>()
            .map_err(|err| match err {
                ureq::Error::Json(err) => CatalogFetchError::Malformed(err),
                other => CatalogFetchError::Transport(other),
            })
    }

    fn generate(&self, request: &MoaRequest) -> Result<MoaResponse, RequestError> {
        let url = format!("{}/moa", self.base_url);
        debug!(%url, models = request.selected_models.len(), "Sending generate request");

        let response = match self.generate_agent.post(url.as_str()).send_json(request) {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(status)) => {
                warn!(status, "Generate request rejected");
                return Err(RequestError::Status(status));
            }
            Err(err) => return Err(RequestError::Transport(err)),
        };

        response
            .into_body()
            .read_json::<MoaResponse>()
            .map_err(|err| match err {
                ureq::Error::Json(err) => RequestError::Malformed(err),
                other => RequestError::Transport(other),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() -> Result<(), Box<dyn std::error::Error>> {
        let request = MoaRequest {
            prompt: "2+2".to_string(),
            selected_models: vec![ModelRef::from(&ModelId::new("OpenAI", "gpt-4"))],
            aggregator_config: ModelRef {
                provider: "OpenAI".to_string(),
                model: "gpt-3.5-turbo".to_string(),
            },
            custom_prompt: String::new(),
            rounds: 1,
            temperature: 0.7,
            max_tokens: 2048,
        };

        assert_eq!(
            serde_json::to_value(&request)?,
            json!({
                "prompt": "2+2",
                "selectedModels": [{"provider": "OpenAI", "model": "gpt-4"}],
                "aggregatorConfig": {"provider": "OpenAI", "model": "gpt-3.5-turbo"},
                "customPrompt": "",
                "rounds": 1,
                "temperature": 0.7,
                "maxTokens": 2048
            })
        );
        Ok(())
    }

    #[test]
    fn test_response_parses() -> Result<(), Box<dyn std::error::Error>> {
        let response: MoaResponse = serde_json::from_str(
            r#"{"proposals":{"OpenAI gpt-4":"4"},"aggregatedResponse":"The answer is 4"}"#,
        )?;
        assert_eq!(response.proposals.get("OpenAI gpt-4").map(String::as_str), Some("4"));
        assert_eq!(response.aggregated_response, "The answer is 4");
        Ok(())
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let backend = HttpBackend::new(
            "http://localhost:5000/",
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        assert_eq!(backend.base_url(), "http://localhost:5000");
    }
}
