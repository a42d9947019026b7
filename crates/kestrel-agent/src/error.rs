//! Error types for kestrel-agent

use thiserror::Error;

/// Result type alias using kestrel-agent Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that end the session. Recoverable tool failures never surface here;
/// they travel back to the model as error tool results.
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the model provider layer
    #[error(transparent)]
    Ai(#[from] kestrel_ai::Error),

    /// The model asked for a tool nobody registered
    #[error("no executor registered for tool `{0}`")]
    UnknownTool(String),

    /// The model sent arguments that do not match the tool's schema
    #[error("invalid input for tool `{tool}`: {message}")]
    InvalidToolInput { tool: String, message: String },

    /// A tool declared a parameter schema that does not compile
    #[error("invalid parameter schema for tool `{tool}`: {message}")]
    InvalidToolSchema { tool: String, message: String },

    /// Reading operator input failed
    #[error("input error: {0}")]
    Input(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_tool_message() {
        let e = Error::UnknownTool("teleport".into());
        assert_eq!(e.to_string(), "no executor registered for tool `teleport`");
    }

    #[test]
    fn test_ai_error_is_transparent() {
        let e: Error = kestrel_ai::Error::api("overloaded_error", "Overloaded").into();
        assert_eq!(e.to_string(), "API error: Overloaded (type: overloaded_error)");
    }
}
