//! Structured analysis of support chat logs.

use std::collections::HashSet;
use std::sync::LazyLock;

use schemars::generate::SchemaSettings;
use schemars::transform::RecursiveTransform;
use schemars::{JsonSchema, Schema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use techflow_model::{
    ModelFinishReason, ModelProvider, ModelRequest, ResponseFormat,
};

use crate::error::Error;
use crate::model_client::ModelClient;

const PROMPT_TEMPLATE: &str = include_str!("./prompts/analysis.md");
const LOGS_PLACEHOLDER: &str = "{{LOGS}}";

/// Target length of [`AnalysisResult::summary`], in words.
pub const SUMMARY_WORD_LIMIT: usize = 30;

/// One support chat message to analyze.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogRecord {
    /// Identifier, unique within a batch.
    pub id: String,
    /// Display name of the customer.
    pub customer: String,
    /// What the customer wrote.
    pub message: String,
    /// When the message was sent, as displayed (e.g. `10:05`).
    pub timestamp: String,
}

impl LogRecord {
    /// Creates a log record.
    pub fn new(
        id: impl Into<String>,
        customer: impl Into<String>,
        timestamp: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            customer: customer.into(),
            message: message.into(),
            timestamp: timestamp.into(),
        }
    }
}

/// A topic mentioned in the logs.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
#[schemars(description = "A topic raised in the support chats.")]
pub struct Topic {
    /// Short name of the topic.
    #[schemars(description = "Short name of the topic.")]
    pub name: String,
    /// How many log messages mention it.
    #[schemars(description = "Number of chat messages that mention it.")]
    pub count: u32,
}

/// The analysis returned by the provider.
///
/// This type is the single definition of the structured-output contract:
/// the schema sent to the provider is derived from it, and the reply is
/// validated by deserializing into it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[schemars(description = "Analysis of a batch of customer support chats.")]
pub struct AnalysisResult {
    /// Overall customer sentiment from 0 (very negative) to 100 (very
    /// positive).
    #[schemars(
        range(min = 0, max = 100),
        description = "Overall customer sentiment, from 0 (very negative) \
                       to 100 (very positive)."
    )]
    pub sentiment_score: f64,
    /// The most mentioned topics, most frequent first.
    #[schemars(
        description = "The top 3 topics by number of mentions, most \
                       frequent first."
    )]
    pub topics: Vec<Topic>,
    /// A short summary of the logs, at most 30 words.
    #[schemars(description = "Summary of the chats in at most 30 words.")]
    pub summary: String,
    /// Issues that need immediate attention.
    #[schemars(
        description = "Problems that need immediate attention from the \
                       support team."
    )]
    pub urgent_issues: Vec<String>,
}

impl AnalysisResult {
    /// Returns the number of words in the summary.
    #[inline]
    pub fn summary_word_count(&self) -> usize {
        self.summary.split_whitespace().count()
    }

    fn validate(&self) -> Result<(), String> {
        if !self.sentiment_score.is_finite()
            || !(0.0..=100.0).contains(&self.sentiment_score)
        {
            return Err(format!(
                "sentimentScore {} is outside [0, 100]",
                self.sentiment_score
            ));
        }
        Ok(())
    }
}

static ANALYSIS_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    SchemaSettings::draft2020_12()
        .with(|s| {
            s.meta_schema = None;
            s.inline_subschemas = true;
        })
        // Structured output accepts only a subset of the `format` values.
        .with_transform(RecursiveTransform(|schema: &mut Schema| {
            schema.remove("format");
        }))
        .into_generator()
        .into_root_schema_for::<AnalysisResult>()
        .to_value()
});

/// Returns the JSON schema of [`AnalysisResult`], self-contained.
#[inline]
pub fn analysis_schema() -> &'static Value {
    &ANALYSIS_SCHEMA
}

/// Renders the logs as one `[timestamp] customer: message` line per record,
/// in input order.
pub fn serialize_logs(logs: &[LogRecord]) -> String {
    logs.iter()
        .map(|l| format!("[{}] {}: {}", l.timestamp, l.customer, l.message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses the provider reply into an [`AnalysisResult`].
///
/// # Errors
///
/// - `EmptyResponse` if `text` is blank.
/// - `MalformedResponse` if `text` is not valid JSON, does not match the
///   schema, or carries an out-of-range score.
pub fn parse_analysis(text: &str) -> Result<AnalysisResult, Error> {
    let text = text.trim();
    if text.is_empty() {
        return Err(
            Error::empty_response().with_reason("provider returned no text")
        );
    }
    let result: AnalysisResult = serde_json::from_str(text).map_err(|err| {
        Error::malformed_response()
            .with_reason(format!("invalid analysis JSON: {err}"))
    })?;
    result
        .validate()
        .map_err(|reason| Error::malformed_response().with_reason(reason))?;
    Ok(result)
}

fn validate_logs(logs: &[LogRecord]) -> Result<(), Error> {
    if logs.is_empty() {
        return Err(
            Error::invalid_input().with_reason("no log records to analyze")
        );
    }
    let mut ids = HashSet::new();
    for log in logs {
        let fields = [
            ("id", &log.id),
            ("customer", &log.customer),
            ("message", &log.message),
            ("timestamp", &log.timestamp),
        ];
        if let Some((name, _)) =
            fields.iter().find(|(_, v)| v.trim().is_empty())
        {
            return Err(Error::invalid_input().with_reason(format!(
                "log record {:?} has an empty {name}",
                log.id
            )));
        }
        if !ids.insert(log.id.as_str()) {
            return Err(Error::invalid_input()
                .with_reason(format!("duplicate log record id {:?}", log.id)));
        }
    }
    Ok(())
}

/// Turns a batch of support logs into one structured-output provider call.
#[derive(Clone)]
pub struct AnalysisClient {
    model_client: ModelClient,
}

impl AnalysisClient {
    /// Creates a client backed by `provider`.
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        Self {
            model_client: ModelClient::new(provider),
        }
    }

    /// Analyzes `logs` and returns the typed result.
    ///
    /// An empty batch is rejected with `InvalidInput` before any provider
    /// call, as are records with a blank field or a repeated id.
    pub async fn analyze(
        &self,
        logs: &[LogRecord],
    ) -> Result<AnalysisResult, Error> {
        validate_logs(logs)?;

        let request = build_request(logs);
        debug!("analyzing {} log records", logs.len());

        let resp = self
            .model_client
            .send_request(request, |_| {})
            .await
            .map_err(|err| {
                Error::transport_failure(err.kind())
                    .with_reason(err.to_string())
            })?;

        if resp.text.trim().is_empty()
            && resp.finish_reason == Some(ModelFinishReason::Blocked)
        {
            warn!("analysis blocked by the provider");
            return Err(Error::empty_response()
                .with_reason("reply blocked by the provider"));
        }

        let result = parse_analysis(&resp.text).inspect_err(|err| {
            error!("failed to parse analysis: {err}");
        })?;
        if result.summary_word_count() > SUMMARY_WORD_LIMIT {
            warn!(
                "summary has {} words, over the {} word target",
                result.summary_word_count(),
                SUMMARY_WORD_LIMIT
            );
        }
        Ok(result)
    }
}

fn build_request(logs: &[LogRecord]) -> ModelRequest {
    ModelRequest {
        system_instruction: None,
        history: vec![],
        prompt: PROMPT_TEMPLATE
            .replace(LOGS_PLACEHOLDER, &serialize_logs(logs)),
        response_format: ResponseFormat::Json {
            schema: analysis_schema().clone(),
        },
    }
}
