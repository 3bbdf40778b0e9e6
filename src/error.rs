#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("inference error: {0}")]
    Inference(#[from] InferenceError),
    #[error("model requested unknown tool `{name}` (available: {})", known.join(", "))]
    UnknownTool { name: String, known: Vec<String> },
    #[error("model still requested tools after {rounds} tool round(s)")]
    ToolRoundsExhausted { rounds: usize },
    #[error("conversation error: {0}")]
    Conversation(String),
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("API returned {status}: {body}")]
    ApiError { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    Parse(String),
}

/// Failure to obtain a credential from a secret store. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("missing secret `{key}`: {hint}")]
    Missing { key: String, hint: String },
    #[error("could not read secret `{key}`: {message}")]
    Retrieval { key: String, message: String },
}
