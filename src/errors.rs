/*!
 * Error types for the capflow application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

// Allow dead code - error types are for library consumers
#![allow(dead_code)]

use thiserror::Error;

/// Errors that can occur when driving the external transcoding engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Error when the engine process could not be started
    #[error("Failed to start transcoder process: {0}")]
    Spawn(String),

    /// Error when the engine process exited with a failure status
    #[error("Transcoder failed: {0}")]
    Failed(String),

    /// Error when the engine process exceeded its time bound
    #[error("Transcoder timed out after {0} seconds")]
    Timeout(u64),

    /// Error when engine output could not be interpreted
    #[error("Failed to parse transcoder output: {0}")]
    ParseError(String),
}

/// Errors that can occur while running the caption pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Error for invalid caller-supplied input (bad duration, empty script where required)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error when a required input file is missing before muxing
    #[error("Missing input file: {0}")]
    MissingInput(String),

    /// Error when a pipeline stage failed and the failure was recorded
    #[error("Stage '{stage}' failed: {message}")]
    StageFailed {
        /// Name of the failing stage
        stage: String,
        /// Human-readable failure description
        message: String,
    },

    /// Error from the transcoding engine after all fallbacks were exhausted
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

impl PipelineError {
    /// The stage name associated with this error, for status-record updates
    pub fn stage_name(&self) -> &str {
        match self {
            Self::InvalidInput(_) => "validation",
            Self::MissingInput(_) => "validation",
            Self::StageFailed { stage, .. } => stage,
            Self::Engine(_) => "muxing",
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the transcoding engine
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Error from the caption pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
