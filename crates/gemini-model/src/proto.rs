use serde::{Deserialize, Serialize};
use serde_json::Value;
use techflow_model::{
    ModelFinishReason, ModelMessage, ModelRequest, ResponseFormat, Role,
};

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
    pub response_id: Option<String>,
    pub error: Option<ApiError>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

/// The error object the service returns, either as an HTTP error body
/// (wrapped in [`ErrorBody`]) or inside a stream chunk.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    pub code: Option<u16>,
    pub message: Option<String>,
    pub status: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    pub error: ApiError,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate in this chunk.
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let texts: Vec<&str> = parts
            .iter()
            // Thought summaries are not part of the reply.
            .filter(|p| !p.thought.unwrap_or(false))
            .filter_map(|p| p.text.as_deref())
            .filter(|t| !t.is_empty())
            .collect();
        if texts.is_empty() {
            return None;
        }
        Some(texts.concat())
    }

    /// The finish reason reported in this chunk, if any.
    pub fn finish_reason(&self) -> Option<ModelFinishReason> {
        if let Some(feedback) = &self.prompt_feedback {
            if feedback.block_reason.is_some() {
                return Some(ModelFinishReason::Blocked);
            }
        }
        let reason = self.candidates.first()?.finish_reason.as_deref()?;
        Some(match reason {
            "STOP" => ModelFinishReason::Stop,
            "MAX_TOKENS" => ModelFinishReason::MaxTokens,
            "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT"
            | "SPII" | "IMAGE_SAFETY" => ModelFinishReason::Blocked,
            _ => ModelFinishReason::Other,
        })
    }
}

// ------------------------
// Types shared by both ends
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
}

impl Part {
    #[inline]
    fn from_text(text: &str) -> Self {
        Self {
            text: Some(text.to_owned()),
            thought: None,
        }
    }
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_json_schema: Value,
}

// -----------
// Conversions
// -----------

pub fn create_request(req: &ModelRequest) -> GenerateContentRequest {
    let system_instruction =
        req.system_instruction.as_deref().map(|text| Content {
            role: None,
            parts: vec![Part::from_text(text)],
        });

    let mut contents: Vec<_> = req.history.iter().map(create_content).collect();
    contents.push(create_content(&ModelMessage::user(req.prompt.as_str())));

    let generation_config = match &req.response_format {
        ResponseFormat::Text => None,
        ResponseFormat::Json { schema } => Some(GenerationConfig {
            response_mime_type: "application/json",
            response_json_schema: schema.clone(),
        }),
    };

    GenerateContentRequest {
        system_instruction,
        contents,
        generation_config,
    }
}

#[inline]
fn create_content(msg: &ModelMessage) -> Content {
    Content {
        role: Some(
            match msg.role {
                Role::User => "user",
                Role::Assistant => "model",
            }
            .to_owned(),
        ),
        parts: vec![Part::from_text(&msg.text)],
    }
}
