use crate::config::Settings;
use crate::errors::{Error, Result};
use crate::summary::ScanSummary;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

/// Instructions sent ahead of every request.
pub const SYSTEM_PROMPT: &str = "You are a meticulous UI refactor assistant for Next.js + Tailwind + shadcn/ui. \
You ONLY output valid JSON (no markdown). \
Return a JSON array of edits: [{ \"path\": \"path/from/repo\", \"newContent\": \"FULL FILE CONTENT\" }]. \
Do not include files you did not change. \
Keep changes focused: spacing scale consistency, typography, color tokens, layout structure, accessible components. \
Do not introduce new dependencies. Do not rename files. Preserve functionality.";

/// At most this many candidate files are sent per request.
pub const MAX_CANDIDATES: usize = 30;

/// A file offered to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateFile {
    pub rel: String,
    pub text: String,
}

/// Everything the provider gets to see.
#[derive(Debug, Clone, Serialize)]
pub struct ProposalContext {
    pub scan: ScanSummary,
    pub files: Vec<CandidateFile>,
    pub instructions: Option<String>,
}

/// A whole-file rewrite suggested by the provider. Not yet validated.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Proposal {
    #[serde(alias = "rel")]
    pub path: String,
    #[serde(rename = "newContent", alias = "after")]
    pub new_content: String,
}

/// Source of externally proposed edits.
///
/// Implementations may fail however they like; the improve pipeline treats
/// any error as "no proposals".
#[async_trait]
pub trait EditProvider: Send + Sync {
    /// Short label used in notes and logs.
    fn describe(&self) -> String;

    async fn propose_edits(&self, context: &ProposalContext) -> Result<Vec<Proposal>>;
}

/// Calls an OpenAI-style Responses endpoint.
pub struct OpenAiProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    /// Builds a provider from settings, or `None` when no API key is configured.
    pub fn from_settings(settings: &Settings) -> Result<Option<Self>> {
        let Some(api_key) = settings.api_key.clone() else {
            return Ok(None);
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Some(Self {
            client,
            endpoint: format!("{}/v1/responses", settings.api_base.trim_end_matches('/')),
            api_key,
            model: settings.model.clone(),
        }))
    }
}

#[async_trait]
impl EditProvider for OpenAiProvider {
    fn describe(&self) -> String {
        format!("OpenAI (model: {})", self.model)
    }

    async fn propose_edits(&self, context: &ProposalContext) -> Result<Vec<Proposal>> {
        if context.files.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "model": self.model,
            "input": build_input(context)?,
            "temperature": 0.2,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Provider(format!("provider responded with {status}")));
        }

        let payload: Value = response.json().await?;
        let text = extract_output_text(&payload)
            .ok_or_else(|| Error::Provider("no output_text block in response".into()))?;
        parse_proposals(&text)
    }
}

/// The two-message conversation: fixed system prompt, then the JSON payload.
fn build_input(context: &ProposalContext) -> Result<Value> {
    Ok(json!([
        { "role": "system", "content": SYSTEM_PROMPT },
        { "role": "user", "content": serde_json::to_string_pretty(context)? },
    ]))
}

/// First `output_text` block in a Responses API payload.
pub fn extract_output_text(payload: &Value) -> Option<String> {
    payload
        .get("output")?
        .as_array()?
        .iter()
        .filter_map(|item| item.get("content")?.as_array())
        .flatten()
        .find(|block| block.get("type").and_then(Value::as_str) == Some("output_text"))
        .and_then(|block| block.get("text")?.as_str())
        .map(|text| text.trim().to_string())
}

/// Parses the model's answer. The answer must be a JSON array; entries that
/// lack a string path or content are skipped.
pub fn parse_proposals(text: &str) -> Result<Vec<Proposal>> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Array(entries) = value else {
        return Err(Error::Provider("expected a JSON array of edits".into()));
    };
    Ok(entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<Proposal>(entry).ok())
        .collect())
}
