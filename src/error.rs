use rustyline::error::ReadlineError;

/// Failure reaching the upstream generative-language service.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("request to upstream failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("upstream returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("upstream returned no text: {reason}")]
    EmptyResponse { reason: String },
    #[error("API key contains characters not allowed in an HTTP header")]
    InvalidApiKey,
}

/// A chat request the endpoint refuses to forward.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("malformed request body: {0}")]
    Body(String),
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("temperature must be between {min} and {max}, got {value}")]
    Temperature { value: f32, min: f32, max: f32 },
    #[error("max_tokens must be between {min} and {max}, got {value}")]
    MaxTokens { value: u32, min: u32, max: u32 },
    #[error("unsupported model '{0}'")]
    UnsupportedModel(String),
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set in environment variables or .env file")]
    Missing(&'static str),
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Failure reaching the chat endpoint from the frontend.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("{0}")]
    Network(#[from] reqwest::Error),
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SessionError {
    #[error("a reply is still pending for this model")]
    Busy,
    #[error("message is empty")]
    EmptyMessage,
    #[error("unknown model '{0}'")]
    UnknownModel(String),
    #[error("model '{0}' is disabled")]
    ModelDisabled(String),
    #[error("no reply is pending")]
    NotAwaiting,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Backend error: {0}")]
    Relay(#[from] RelayError),
    #[error("{0}")]
    Session(#[from] SessionError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Terminal error: {0}")]
    Terminal(#[from] clearscreen::Error),
    #[error("Readline error: {0}")]
    Readline(String),
}

impl From<ReadlineError> for Error {
    fn from(err: ReadlineError) -> Self {
        Error::Readline(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
