//! Failure taxonomy shared by the host, the model manager, and the session

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    #[error("No 3D rendering context available: {0}")]
    CapabilityUnavailable(String),
    #[error("Scene host has been torn down")]
    TornDown,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssetLoadError {
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("Failed to parse model: {0}")]
    Parse(String),
    #[error("Model contains no scene nodes")]
    EmptyScene,
    #[error("Load was cancelled")]
    Cancelled,
}

/// What the viewport should show instead of (or on top of) the scene
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum DisplayState {
    Loading,
    Ready,
    Error(String),
    Unsupported,
}

impl DisplayState {
    pub fn is_ready(&self) -> bool {
        matches!(self, DisplayState::Ready)
    }

    /// Text for the status overlay, `None` once the model is showing
    pub fn message(&self) -> Option<String> {
        match self {
            DisplayState::Loading => Some("Loading 3D model...".to_string()),
            DisplayState::Ready => None,
            DisplayState::Error(msg) => Some(format!("Error loading model: {msg}")),
            DisplayState::Unsupported => {
                Some("3D rendering is not supported in this browser.".to_string())
            }
        }
    }
}
