//! Frontend chat state: one transcript and one config per model, plus the
//! `Idle`/`Awaiting` bookkeeping that keeps a model to a single request in
//! flight.
//!
//! The session never talks to the network itself. [`ChatSession::submit`] and
//! [`ChatSession::regenerate`] hand back the [`ChatRequest`] to send, and
//! [`ChatSession::complete`] records the outcome. [`ChatSession::dispatch`]
//! wires both halves to a [`ChatBackend`]; [`ChatSession::send`] and
//! [`ChatSession::regenerate_with`] are built on it.

mod model;
mod transcript;

pub use model::{ModelConfig, ModelProfile, CATALOG, MAX_TOKENS_RANGE, TEMPERATURE_RANGE};
pub use transcript::Transcript;

use tracing::{debug, warn};

use crate::error::SessionError;
use crate::models::{ChatRequest, Message, Role};
use crate::relay::ChatBackend;

pub const ERROR_PREFIX: &str = "🚨 API Error: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Awaiting,
}

#[derive(Debug, Clone)]
pub struct ModelSession {
    pub profile: ModelProfile,
    pub config: ModelConfig,
    transcript: Transcript,
    state: SessionState,
}

impl ModelSession {
    fn new(profile: &ModelProfile) -> Self {
        Self {
            profile: *profile,
            config: ModelConfig::from(profile),
            transcript: Transcript::new(),
            state: SessionState::Idle,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn ensure_idle(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Idle => Ok(()),
            SessionState::Awaiting => Err(SessionError::Busy),
        }
    }

    /// Request for the trailing user message, with everything before it as history.
    fn pending_request(&self, message: &str) -> ChatRequest {
        let system_prompt = self.config.system_prompt.trim();
        ChatRequest {
            message: message.to_string(),
            history: self.transcript.history(),
            system_prompt: (!system_prompt.is_empty()).then(|| system_prompt.to_string()),
            temperature: Some(self.config.temperature()),
            max_tokens: Some(self.config.max_tokens()),
            model: Some(self.profile.id.to_string()),
        }
    }
}

/// All per-model chat state for one user of the frontend.
#[derive(Debug, Clone)]
pub struct ChatSession {
    models: Vec<ModelSession>,
    active: usize,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(CATALOG)
    }
}

impl ChatSession {
    /// Starts on the first enabled profile.
    pub fn new(catalog: &[ModelProfile]) -> Self {
        let models: Vec<ModelSession> = catalog.iter().map(ModelSession::new).collect();
        let active = models.iter().position(|m| m.profile.enabled).unwrap_or(0);
        Self { models, active }
    }

    pub fn models(&self) -> &[ModelSession] {
        &self.models
    }

    pub fn active(&self) -> &ModelSession {
        &self.models[self.active]
    }

    pub fn active_mut(&mut self) -> &mut ModelSession {
        &mut self.models[self.active]
    }

    pub fn transcript(&self) -> &Transcript {
        &self.active().transcript
    }

    pub fn config_mut(&mut self) -> &mut ModelConfig {
        &mut self.active_mut().config
    }

    /// Switching away from a model with a request in flight is refused, so
    /// its reply always lands on the model that asked for it.
    pub fn select_model(&mut self, id: &str) -> Result<&ModelSession, SessionError> {
        self.active().ensure_idle()?;
        let index = self
            .models
            .iter()
            .position(|m| m.profile.id.eq_ignore_ascii_case(id.trim()))
            .ok_or_else(|| SessionError::UnknownModel(id.trim().to_string()))?;
        if !self.models[index].config.enabled {
            return Err(SessionError::ModelDisabled(self.models[index].profile.id.to_string()));
        }
        self.active = index;
        debug!(model = self.models[index].profile.id, "model selected");
        Ok(&self.models[index])
    }

    /// Appends the user message and moves the active model to `Awaiting`.
    pub fn submit(&mut self, text: &str) -> Result<ChatRequest, SessionError> {
        let model = self.active_mut();
        model.ensure_idle()?;
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        model.transcript.push(Message::user(text));
        model.state = SessionState::Awaiting;
        Ok(model.pending_request(text))
    }

    /// Records the reply (or an inline error in its place) and returns to `Idle`.
    pub fn complete(&mut self, outcome: Result<String, String>) -> Result<&Message, SessionError> {
        let model = self.active_mut();
        if model.state != SessionState::Awaiting {
            return Err(SessionError::NotAwaiting);
        }

        let content = match outcome {
            Ok(reply) => reply,
            Err(error) => format!("{ERROR_PREFIX}{error}"),
        };
        model.state = SessionState::Idle;
        Ok(model.transcript.push(Message::assistant(content)))
    }

    pub fn clear(&mut self) -> Result<(), SessionError> {
        let model = self.active_mut();
        model.ensure_idle()?;
        model.transcript.clear();
        Ok(())
    }

    /// Drops the last exchange; returns how many messages were removed.
    pub fn undo(&mut self) -> Result<usize, SessionError> {
        let model = self.active_mut();
        model.ensure_idle()?;
        Ok(model.transcript.undo())
    }

    /// Drops the last reply and asks again for the user message before it.
    /// Returns `None` when there is no user message to answer.
    pub fn regenerate(&mut self) -> Result<Option<ChatRequest>, SessionError> {
        let model = self.active_mut();
        model.ensure_idle()?;

        let has_prompt = match model.transcript.messages() {
            [.., last] if last.role == Role::User => true,
            [.., prompt, last] => last.role == Role::Assistant && prompt.role == Role::User,
            _ => false,
        };
        if !has_prompt {
            return Ok(None);
        }

        model.transcript.pop_reply();
        let prompt = match model.transcript.last() {
            Some(message) => message.content.clone(),
            None => return Ok(None),
        };
        model.state = SessionState::Awaiting;
        Ok(Some(model.pending_request(&prompt)))
    }

    /// Sends a request produced by [`submit`](Self::submit) or
    /// [`regenerate`](Self::regenerate) and records the outcome. `waiting`
    /// runs once the request is on its way.
    pub async fn dispatch<B, F>(
        &mut self,
        backend: &B,
        request: ChatRequest,
        waiting: F,
    ) -> Result<&Message, SessionError>
    where
        B: ChatBackend + ?Sized,
        F: FnOnce(),
    {
        if self.active().state != SessionState::Awaiting {
            return Err(SessionError::NotAwaiting);
        }

        let call = backend.chat(&request);
        waiting();
        let outcome = call
            .await
            .map(|response| response.response)
            .map_err(|err| err.to_string());
        if let Err(err) = &outcome {
            warn!(error = %err, model = self.active().profile.id, "chat request failed");
        }
        self.complete(outcome)
    }

    pub async fn send<B>(&mut self, backend: &B, text: &str) -> Result<&Message, SessionError>
    where
        B: ChatBackend + ?Sized,
    {
        let request = self.submit(text)?;
        self.dispatch(backend, request, || {}).await
    }

    pub async fn regenerate_with<B>(&mut self, backend: &B) -> Result<Option<&Message>, SessionError>
    where
        B: ChatBackend + ?Sized,
    {
        let Some(request) = self.regenerate()? else {
            return Ok(None);
        };
        self.dispatch(backend, request, || {}).await.map(Some)
    }
}
