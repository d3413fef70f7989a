use super::{ModelCheck, ModelVerdict};
use crate::error::ModelCheckError;
use crate::settings::ModelSettings;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::debug;

const VERDICT_INSTRUCTIONS: &str = "Respond ONLY with JSON of the form \
{\"activated\": true|false, \"confidence\": <number between 0 and 1>}, where \
\"activated\" is true when the check applies to the message.";

/// Model-check capability backed by an Ollama `/api/generate` endpoint.
pub struct OllamaModelCheck {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaModelCheck {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    pub fn from_settings(settings: &ModelSettings) -> Self {
        Self::new(&settings.base_url, &settings.model)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    format: &'a str,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f64,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl ModelCheck for OllamaModelCheck {
    fn evaluate<'a>(
        &'a self,
        prompt: &'a str,
        temperature: f64,
    ) -> BoxFuture<'a, Result<ModelVerdict, ModelCheckError>> {
        Box::pin(async move {
            let url = format!("{}/api/generate", self.base_url);
            let request = GenerateRequest {
                model: &self.model,
                prompt: format!("{}\n\n{}", prompt, VERDICT_INSTRUCTIONS),
                stream: false,
                format: "json",
                options: GenerateOptions { temperature },
            };

            let response = self
                .client
                .post(&url)
                .json(&request)
                .send()
                .await
                .map_err(|e| ModelCheckError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ModelCheckError::Transport(format!(
                    "{} returned {}: {}",
                    url, status, body
                )));
            }

            let body: GenerateResponse = response
                .json()
                .await
                .map_err(|e| ModelCheckError::Format(e.to_string()))?;
            debug!(model = %self.model, response = %body.response, "Model-check response");

            parse_verdict(&body.response)
        })
    }
}

fn parse_verdict(text: &str) -> Result<ModelVerdict, ModelCheckError> {
    let verdict: ModelVerdict = serde_json::from_str(text.trim())
        .map_err(|e| ModelCheckError::Format(format!("{}: {}", e, text)))?;
    if !(0.0..=1.0).contains(&verdict.confidence) {
        return Err(ModelCheckError::Format(format!(
            "confidence {} is outside 0..=1",
            verdict.confidence
        )));
    }
    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use super::parse_verdict;

    #[test]
    fn parses_verdict_with_confidence() {
        let verdict = parse_verdict(r#" {"activated": true, "confidence": 0.82} "#).unwrap();
        assert!(verdict.activated);
        assert_eq!(verdict.confidence, 0.82);
    }

    #[test]
    fn missing_confidence_defaults_to_full() {
        let verdict = parse_verdict(r#"{"activated": false}"#).unwrap();
        assert!(!verdict.activated);
        assert_eq!(verdict.confidence, 1.0);
    }

    #[test]
    fn rejects_non_json_and_out_of_range() {
        assert!(parse_verdict("yes, it violates the policy").is_err());
        assert!(parse_verdict(r#"{"activated": true, "confidence": 7}"#).is_err());
    }
}
