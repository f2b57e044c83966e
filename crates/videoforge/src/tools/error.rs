//! Errors from external tool calls.
//!
//! Variants carry a short description only. Response bodies are logged
//! (truncated) at debug level and never copied into the error.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("{tool} request failed: {message}")]
    Request { tool: &'static str, message: String },

    #[error("{tool} returned HTTP {status}")]
    Status { tool: &'static str, status: u16 },

    #[error("{tool} response could not be decoded: {message}")]
    Decode { tool: &'static str, message: String },

    #[error("{tool} process failed: {message}")]
    Process { tool: &'static str, message: String },

    #[error("I/O error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    pub fn request(tool: &'static str, err: impl std::fmt::Display) -> Self {
        ToolError::Request {
            tool,
            message: err.to_string(),
        }
    }

    pub fn decode(tool: &'static str, err: impl std::fmt::Display) -> Self {
        ToolError::Decode {
            tool,
            message: err.to_string(),
        }
    }

    pub fn process(tool: &'static str, message: impl Into<String>) -> Self {
        ToolError::Process {
            tool,
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ToolError::Io {
            path: path.into(),
            source,
        }
    }
}
