//! External AI service boundary.
//!
//! The engine only knows these traits; the browser glue (or the optional
//! `gateway` HTTP client) supplies implementations. Transport details are
//! out of scope here — what matters is the request/response shapes and how
//! failures are classified for the user.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::project::model::{AspectRatio, GroupingStrategy, Resolution};

#[cfg(feature = "gateway")]
pub mod gateway;

// =============================================================================
// ERRORS
// =============================================================================

/// Errors surfaced by a service implementation.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The call itself failed (network, HTTP status, provider error).
    #[error("service call failed: {0}")]
    Call(String),

    /// The call succeeded but the response was unusable.
    #[error("malformed service response: {0}")]
    BadResponse(String),
}

impl ServiceError {
    /// Creates a Call error.
    pub fn call(msg: impl Into<String>) -> Self {
        Self::Call(msg.into())
    }

    /// Creates a BadResponse error.
    pub fn bad_response(msg: impl Into<String>) -> Self {
        Self::BadResponse(msg.into())
    }
}

/// User-facing classification of a failed generation step.
///
/// Providers signal rate limiting and safety blocks only through message
/// text, so classification is substring sniffing over the error display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RateLimited,
    SafetyBlocked,
    ConnectionInterrupted,
}

impl FailureKind {
    /// Classifies a service error by its message text.
    pub fn classify(err: &ServiceError) -> Self {
        let msg = err.to_string();
        if msg.contains("429") {
            Self::RateLimited
        } else if msg.to_ascii_lowercase().contains("safety") {
            Self::SafetyBlocked
        } else {
            Self::ConnectionInterrupted
        }
    }

    /// The message shown on the failed scene card.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::RateLimited => "Rate limit reached. Please wait a moment and try again.",
            Self::SafetyBlocked => {
                "The prompt was blocked by the safety filter. Try rewording it."
            }
            Self::ConnectionInterrupted => "Connection interrupted. Please try again.",
        }
    }
}

// =============================================================================
// SCRIPT ANALYSIS
// =============================================================================

/// One scene as proposed by the analysis service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyzedScene {
    pub scene_number: i32,
    pub description: String,
    pub visual_prompt: String,
}

impl AnalyzedScene {
    pub fn new(scene_number: i32) -> Self {
        Self {
            scene_number,
            ..Default::default()
        }
    }

    /// Builder: Set description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: Set visual prompt.
    pub fn with_visual_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.visual_prompt = prompt.into();
        self
    }
}

/// One named group of scenes, returned by the `smart` strategy.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyzedGroup {
    pub name: String,
    pub scenes: Vec<AnalyzedScene>,
}

/// Analysis output. The variant must match the requested strategy: `smart`
/// returns `Grouped`, everything else returns `Flat`. The caller validates
/// this instead of trusting the response shape.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisResponse {
    Flat(Vec<AnalyzedScene>),
    Grouped(Vec<AnalyzedGroup>),
}

// =============================================================================
// IMAGE GENERATION
// =============================================================================

/// Render request sent to the image service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
}

// =============================================================================
// SERVICE TRAITS
// =============================================================================

/// Decomposes raw script text into scenes (optionally grouped), and rewrites
/// a single scene's visual prompt from its description.
#[async_trait]
pub trait ScriptAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        script: &str,
        strategy: GroupingStrategy,
    ) -> Result<AnalysisResponse, ServiceError>;

    /// Produces a fresh visual prompt for one scene from its description.
    async fn rewrite_prompt(&self, description: &str) -> Result<String, ServiceError>;
}

/// Improves an image prompt. May return the input unchanged.
#[async_trait]
pub trait PromptEnhancer: Send + Sync {
    async fn enhance(&self, prompt: &str) -> Result<String, ServiceError>;
}

/// Renders one image and returns a reference to it (URL or data URL).
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn render(&self, request: &RenderRequest) -> Result<String, ServiceError>;
}

/// Stateful conversational assistant session.
#[async_trait]
pub trait ChatSession: Send {
    async fn send(&mut self, message: &str) -> Result<String, ServiceError>;
}

// =============================================================================
// TESTS
// =============================================================================
