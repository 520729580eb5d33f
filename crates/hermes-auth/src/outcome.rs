//! Three-way record of an authentication extraction.

/// What happened when a stage tried to derive a piece of auth state.
///
/// Extraction stages never fail a request. Instead they record one of these
/// so later stages and handlers can tell "no credentials" apart from
/// "credentials that could not be used".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome<T> {
    /// The stage did not run, or its input was absent.
    NotAttempted,
    /// Extraction succeeded.
    Present(T),
    /// Extraction ran and failed for the given reason.
    Failed(String),
}

impl<T> Default for AuthOutcome<T> {
    fn default() -> Self {
        Self::NotAttempted
    }
}

impl<T> AuthOutcome<T> {
    /// Records the result of an extraction.
    pub fn from_result<E: std::fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Present(value),
            Err(e) => Self::Failed(e.to_string()),
        }
    }

    /// Returns the extracted value, if any.
    pub fn present(&self) -> Option<&T> {
        match self {
            Self::Present(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the failure reason, if extraction failed.
    pub fn failure(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Returns true if a value is present.
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// Returns true if the stage never ran.
    pub fn is_not_attempted(&self) -> bool {
        matches!(self, Self::NotAttempted)
    }

    /// Returns a short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotAttempted => "not_attempted",
            Self::Present(_) => "present",
            Self::Failed(_) => "failed",
        }
    }
}
