use std::fmt;

/// Failures a pipeline stage can surface to its caller.
///
/// Empty results and undefined arithmetic are not represented here: they are
/// handled by filtering inside the stages and never raised.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The backing data source failed to respond or could not be read.
    SourceUnavailable(String),
    /// An uploaded or embedded region file could not be parsed.
    MalformedInput(String),
    /// A caller supplied inconsistent arguments (mismatched grids, bad scale).
    InvalidArgument(String),
}

impl PipelineError {
    /// Only source failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PipelineError::SourceUnavailable(_))
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::SourceUnavailable(msg) => write!(f, "Source unavailable: {}", msg),
            PipelineError::MalformedInput(msg) => write!(f, "Malformed input: {}", msg),
            PipelineError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {}
