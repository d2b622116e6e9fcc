//! Gemini `generateContent` wire types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `:generateContent` / `:streamGenerateContent` request body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// Conversation
    #[serde(default)]
    pub contents: Vec<Content>,
    /// System instruction
    #[serde(default)]
    pub system_instruction: Option<Content>,
    /// Tool definitions
    #[serde(default)]
    pub tools: Vec<Tool>,
    /// Generation settings
    #[serde(default)]
    pub generation_config: Option<GenerationConfig>,
}

/// A turn of the conversation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    /// `user` or `model`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role: String,
    /// Content parts
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Content part; exactly one payload field is set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    /// Text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Marks the text as a thought
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
    /// Opaque thought signature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought_signature: Option<String>,
    /// Inline file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
    /// Remote file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_data: Option<FileData>,
    /// Function call made by the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    /// Function result sent by the client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
}

/// Inline file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    /// Content type
    pub mime_type: String,
    /// Base64 content
    pub data: String,
}

/// Remote file reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    /// File URI
    pub file_uri: String,
    /// Content type
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Function call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Call id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Function name
    pub name: String,
    /// Arguments object
    #[serde(default)]
    pub args: Value,
}

/// Function result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    /// Id of the call answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Function name
    pub name: String,
    /// Result object
    #[serde(default)]
    pub response: Value,
}

/// Tool definitions
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    /// Function declarations
    #[serde(default)]
    pub function_declarations: Vec<FunctionDeclaration>,
}

/// Function declaration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDeclaration {
    /// Function name
    pub name: String,
    /// Function description
    #[serde(default)]
    pub description: Option<String>,
    /// Parameter schema
    #[serde(default)]
    pub parameters: Option<Value>,
    /// Parameter schema, JSON Schema dialect
    #[serde(default)]
    pub parameters_json_schema: Option<Value>,
}

/// Generation settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Stop sequences
    #[serde(default)]
    pub stop_sequences: Vec<String>,
    /// Sampling temperature
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Output token limit
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
    /// `application/json` for JSON output
    #[serde(default)]
    pub response_mime_type: Option<String>,
    /// Output schema
    #[serde(default)]
    pub response_schema: Option<Value>,
    /// Output schema, JSON Schema dialect
    #[serde(default)]
    pub response_json_schema: Option<Value>,
    /// Thinking settings
    #[serde(default)]
    pub thinking_config: Option<ThinkingConfig>,
}

/// Thinking settings
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    /// Token budget for thoughts
    #[serde(default)]
    pub thinking_budget: Option<i64>,
}

/// Response, or one streamed chunk of it
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Response id
    pub response_id: String,
    /// Model name
    pub model_version: String,
    /// Candidates
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<Candidate>,
    /// Token usage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<UsageMetadata>,
}

/// Response candidate
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Generated content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    /// Why generation stopped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<&'static str>,
    /// Candidate index
    pub index: u32,
}

/// Token usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Prompt tokens
    pub prompt_token_count: u32,
    /// Generated tokens
    pub candidates_token_count: u32,
    /// Sum of both
    pub total_token_count: u32,
}

/// Error details
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    /// HTTP status code
    pub code: u16,
    /// Error message
    pub message: String,
    /// Canonical status name
    pub status: &'static str,
}

/// Error body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    /// Error details
    pub error: ApiError,
}

/// Streaming event
#[derive(Debug, Clone, PartialEq)]
pub enum GeminiEvent {
    /// A response chunk
    Chunk(GenerateContentResponse),
    /// Mid-stream error
    Error(ErrorResponse),
}
