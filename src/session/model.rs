use std::ops::RangeInclusive;

use crate::models::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};

pub const TEMPERATURE_RANGE: RangeInclusive<f32> = 0.0..=2.0;
pub const MAX_TOKENS_RANGE: RangeInclusive<u32> = 100..=4000;
const TEMPERATURE_STEPS_PER_UNIT: f32 = 10.0;
const MAX_TOKENS_STEP: u32 = 100;

/// A selectable entry in the model picker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelProfile {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub system_prompt: &'static str,
    pub enabled: bool,
}

pub const CATALOG: &[ModelProfile] = &[
    ModelProfile {
        id: "gemini",
        name: "Gemini",
        icon: "🌟",
        system_prompt: "You are Gemini, Google's AI model.",
        enabled: true,
    },
    ModelProfile {
        id: "deepseek",
        name: "DeepSeek R1",
        icon: "🤖",
        system_prompt: "You are DeepSeek R1, a helpful AI assistant.",
        enabled: false,
    },
    ModelProfile {
        id: "claude",
        name: "Claude",
        icon: "👤",
        system_prompt: "You are Claude, Anthropic's AI assistant.",
        enabled: false,
    },
    ModelProfile {
        id: "gpt4",
        name: "GPT-4",
        icon: "🧠",
        system_prompt: "You are GPT-4, OpenAI's advanced AI model.",
        enabled: false,
    },
];

/// Per-model settings edited from the UI. Numeric settings stay inside their
/// ranges no matter what the setters are given.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub name: String,
    pub system_prompt: String,
    temperature: f32,
    max_tokens: u32,
    pub enabled: bool,
}

impl ModelConfig {
    pub fn new(name: impl Into<String>, system_prompt: impl Into<String>, enabled: bool) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            enabled,
        }
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// Clamps to [0, 2] and snaps to the 0.1 slider step. NaN is ignored.
    pub fn set_temperature(&mut self, value: f32) -> f32 {
        if !value.is_nan() {
            let snapped = (value * TEMPERATURE_STEPS_PER_UNIT).round() / TEMPERATURE_STEPS_PER_UNIT;
            self.temperature = snapped.clamp(*TEMPERATURE_RANGE.start(), *TEMPERATURE_RANGE.end());
        }
        self.temperature
    }

    /// Clamps to [100, 4000] and snaps to the nearest 100.
    pub fn set_max_tokens(&mut self, value: u32) -> u32 {
        let snapped = value.saturating_add(MAX_TOKENS_STEP / 2) / MAX_TOKENS_STEP * MAX_TOKENS_STEP;
        self.max_tokens = snapped.clamp(*MAX_TOKENS_RANGE.start(), *MAX_TOKENS_RANGE.end());
        self.max_tokens
    }
}

impl From<&ModelProfile> for ModelConfig {
    fn from(profile: &ModelProfile) -> Self {
        Self::new(profile.name, profile.system_prompt, profile.enabled)
    }
}
