//! Named failure postures for external-facing operations.
//!
//! Every operation that touches the store, the gateway or a signature states
//! which posture it runs under instead of deciding ad hoc in the handler.

use std::fmt;

/// What an operation does when a dependency fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePosture {
    /// The error propagates and nothing is mutated.
    FailClosed,
    /// The error is logged and replaced by a safe default.
    FailOpen,
    /// The error is logged and swallowed; the primary effect stands.
    BestEffort,
}

impl FailurePosture {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePosture::FailClosed => "fail_closed",
            FailurePosture::FailOpen => "fail_open",
            FailurePosture::BestEffort => "best_effort",
        }
    }

    /// Applies this posture to an operation's result.
    ///
    /// `FailClosed` returns the error unchanged. The other two log it under
    /// `operation` and substitute `fallback()`.
    pub fn resolve<T, E: fmt::Display>(
        self,
        operation: &'static str,
        result: Result<T, E>,
        fallback: impl FnOnce() -> T,
    ) -> Result<T, E> {
        match (self, result) {
            (_, Ok(value)) => Ok(value),
            (FailurePosture::FailClosed, Err(err)) => Err(err),
            (FailurePosture::FailOpen, Err(err)) => {
                tracing::warn!(operation, posture = self.as_str(), error = %err, "Falling back to safe default");
                Ok(fallback())
            }
            (FailurePosture::BestEffort, Err(err)) => {
                tracing::error!(operation, posture = self.as_str(), error = %err, "Secondary write failed");
                Ok(fallback())
            }
        }
    }
}

impl fmt::Display for FailurePosture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
