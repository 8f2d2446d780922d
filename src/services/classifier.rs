//! Image classification through an OpenAI-compatible chat completions API.
//!
//! The service is asked for a strict JSON object (name, species, category,
//! description). Anything that does not parse into one of the fixed
//! categories is rejected.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::config::ClassifierSettings;
use crate::error::{AppError, AppResult};
use crate::models::{Category, Classification};

/// HTTP connect timeout for classifier calls.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const SYSTEM_PROMPT: &str = "You are an AI that provides fun animal details based on images. \
Categorize the animal into one of these categories: Arthropods, Mollusks, Worms, Cnidarians, \
Echinoderms, Sponges, Fish, Birds, Reptiles, Amphibians, Mammals. Try to generate interesting \
and fun facts. Keep your language exciting and upbeat.";

/// Derives category, species and description for one image.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        image_url: &str,
        animal_name: &str,
        species_hint: &str,
    ) -> AppResult<Classification>;
}

/// Chat completions client.
#[derive(Clone)]
pub struct OpenAiClassifier {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<SecretString>,
}

impl OpenAiClassifier {
    pub fn new(settings: &ClassifierSettings) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| AppError::Enrichment(format!("Failed to build HTTP client: {}", e)))?;

        if settings.api_key.is_none() {
            warn!("OPENAI_API_KEY is not set; classification requests will be rejected upstream");
        }

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
        })
    }

    /// Build the chat completions request body.
    pub fn request_body(
        model: &str,
        image_url: &str,
        animal_name: &str,
        species_hint: &str,
    ) -> Value {
        let user_prompt = format!(
            "Provide detailed information about this {}. Scientific Name: {}. \
             Include its scientific species name and which category it belongs to from the list provided.",
            animal_name, species_hint
        );
        let categories: Vec<&str> = Category::ALL.iter().map(Category::as_str).collect();

        json!({
            "model": model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": user_prompt },
                        { "type": "image_url", "image_url": { "url": image_url } }
                    ]
                }
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "animal",
                    "strict": true,
                    "schema": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "species": { "type": "string" },
                            "category": { "type": "string", "enum": categories },
                            "description": { "type": "string" }
                        },
                        "required": ["name", "species", "category", "description"],
                        "additionalProperties": false
                    }
                }
            }
        })
    }

    /// Extract and validate the classification from a completion response.
    pub fn parse_response(body: &str) -> AppResult<Classification> {
        let completion: ChatCompletion = serde_json::from_str(body).map_err(|e| {
            AppError::Enrichment(format!("Unexpected classifier response: {}", e))
        })?;

        let message = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| AppError::Enrichment("Classifier returned no result".to_string()))?;

        if let Some(refusal) = message.refusal.filter(|r| !r.trim().is_empty()) {
            return Err(AppError::Enrichment(format!(
                "Classifier refused the request: {}",
                refusal
            )));
        }

        let content = message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AppError::Enrichment("Classifier returned no content".to_string()))?;

        let details: AnimalDetails = serde_json::from_str(&content).map_err(|e| {
            AppError::Enrichment(format!("Classifier content is not valid animal JSON: {}", e))
        })?;

        let raw_category = details
            .category
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                AppError::Enrichment("Failed to get animal category from classifier".to_string())
            })?;

        let category = Category::parse(&raw_category).ok_or_else(|| {
            AppError::Enrichment(format!("Classifier returned unknown category '{}'", raw_category))
        })?;

        Ok(Classification {
            species: details.species.unwrap_or_default().trim().to_string(),
            category,
            description: details.description.unwrap_or_default().trim().to_string(),
        })
    }
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    async fn classify(
        &self,
        image_url: &str,
        animal_name: &str,
        species_hint: &str,
    ) -> AppResult<Classification> {
        let body = Self::request_body(&self.model, image_url, animal_name, species_hint);

        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Enrichment(format!("Classifier request failed: {}", e)))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            AppError::Enrichment(format!("Failed to read classifier response: {}", e))
        })?;

        if !status.is_success() {
            return Err(AppError::Enrichment(format!(
                "Classifier returned HTTP {}",
                status.as_u16()
            )));
        }

        let classification = Self::parse_response(&text)?;
        info!(
            "Classified {} as {} ({})",
            image_url, classification.category, classification.species
        );

        Ok(classification)
    }
}

#[derive(Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    refusal: Option<String>,
}

/// Shape requested through the JSON schema. Fields are optional here so a
/// missing category is reported as such rather than as a parse error.
#[derive(Deserialize)]
struct AnimalDetails {
    species: Option<String>,
    category: Option<String>,
    description: Option<String>,
}
