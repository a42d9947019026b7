//! Operator input seam

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Result of asking the operator for one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A line of input, without its line terminator
    Line(String),
    /// The read was interrupted through its cancellation token
    Cancelled,
    /// Input is closed
    Eof,
}

/// A cancellable prompt-and-read-a-line source
#[async_trait]
pub trait LineReader: Send {
    /// Show `prompt` and wait for a line. Must return
    /// [`ReadOutcome::Cancelled`] promptly once `cancel` fires.
    async fn read_line(&mut self, prompt: &str, cancel: CancellationToken) -> Result<ReadOutcome>;
}

/// Whether an answer to a yes/no question means yes
pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_affirmative() {
        for yes in ["y", "Y", "yes", "YES", "  Yes \n", "yEs"] {
            assert!(is_affirmative(yes), "{:?}", yes);
        }
        for no in ["", "n", "no", "yes please", "ye", "yy", "sure"] {
            assert!(!is_affirmative(no), "{:?}", no);
        }
    }
}
