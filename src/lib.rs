pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod relay;
pub mod renderer;
pub mod server;
pub mod session;
pub mod ui;

pub use client::{CompletionBackend, CompletionRequest, GeminiClient};
pub use error::{ConfigError, Error, RelayError, Result, SessionError, UpstreamError, ValidationError};
pub use models::{ChatRequest, ChatResponse, ErrorBody, Message, Role};
pub use relay::{ChatBackend, RelayClient};
pub use session::{ChatSession, ModelConfig, Transcript};
