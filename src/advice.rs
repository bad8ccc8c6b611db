use crate::config::Config;
use crate::models::DailyRecord;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

pub const MISSING_KEY_MESSAGE: &str =
    "Configure an API key to receive guidance. Meanwhile, sit quietly with today's reflection.";
pub const NO_GUIDANCE_MESSAGE: &str =
    "No guidance is available right now. Rest in stillness for a few breaths.";
pub const CONNECTION_MESSAGE: &str =
    "The connection is unsteady. Return your attention to the present breath.";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Produces guidance text for a reflection. Never fails; problems surface as
/// one of the fixed fallback sentences.
pub trait AdviceGenerator: Send + Sync {
    fn generate(&self, reflection: &str, summary: &str) -> impl Future<Output = String> + Send;
}

/// One-line verdict overview, e.g. `Wife: peaceful, Son: agitated, Parents: peaceful`.
pub fn emotion_summary(record: &DailyRecord) -> String {
    record
        .targets
        .iter()
        .map(|(target, log)| {
            let state = if log.has_negative_emotion { "agitated" } else { "peaceful" };
            format!("{}: {state}", target.label())
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn build_prompt(reflection: &str, summary: &str) -> String {
    format!(
        "You are a compassionate and wise contemplative teacher. The user is doing their \
         daily self-reflection and confession.\n\n\
         Overall emotional state today: {summary}\n\
         The user's reflection: \"{reflection}\"\n\n\
         Drawing on ideas such as impermanence, emptiness of the aggregates, cause and effect, \
         and loving-kindness, offer a short (under 150 words), warm and encouraging piece of \
         guidance. Do not criticise; help the user let go of attachment and return to inner calm."
    )
}

#[derive(Debug, Clone)]
pub struct GeminiAdvisor {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
}

impl GeminiAdvisor {
    pub fn new(api_key: Option<String>, model: impl Into<String>, endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|err| {
                warn!("failed to build advice client, using defaults: {err}");
                reqwest::Client::new()
            });
        Self {
            client,
            api_key,
            model: model.into(),
            endpoint: endpoint.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.advice_api_key.clone(),
            config.advice_model.clone(),
            config.advice_endpoint.clone(),
        )
    }

    async fn request(&self, api_key: &str, prompt: &str) -> Result<Option<String>, reqwest::Error> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        );
        let body: serde_json::Value = self
            .client
            .post(url)
            .query(&[("key", api_key)])
            .json(&serde_json::json!({
                "contents": [{ "parts": [{ "text": prompt }] }]
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let text = body["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string);
        Ok(text)
    }
}

impl AdviceGenerator for GeminiAdvisor {
    async fn generate(&self, reflection: &str, summary: &str) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            return MISSING_KEY_MESSAGE.to_string();
        };

        let prompt = build_prompt(reflection, summary);
        match self.request(api_key, &prompt).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                warn!("advice response carried no text");
                NO_GUIDANCE_MESSAGE.to_string()
            }
            Err(err) => {
                warn!("advice request failed: {err}");
                CONNECTION_MESSAGE.to_string()
            }
        }
    }
}
