//! Error types.
//!
//! The library reports failures through [`SegmentationError`], grouped into
//! configuration problems, data problems, and broken internal invariants.
//! The binary converts those into an [`AppError`] carrying a process exit code:
//!
//! - `2`: bad configuration or unreadable input
//! - `3`: the input is valid but nothing survives a stage
//! - `4`: internal invariant violation

use thiserror::Error;

/// Result alias for the segmentation core.
pub type Result<T> = std::result::Result<T, SegmentationError>;

/// Rejected user configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{axis} bins need at least 2 edges, got {count}")]
    TooFewEdges { axis: &'static str, count: usize },

    #[error("{axis} bins must be strictly increasing (edge {index}: {prev} >= {next})")]
    NonIncreasingEdges {
        axis: &'static str,
        index: usize,
        prev: f64,
        next: f64,
    },

    #[error("{axis} bins: invalid edge '{value}' at position {index}")]
    InvalidEdge {
        axis: &'static str,
        index: usize,
        value: String,
    },

    #[error("at least one sample group is required")]
    NoGroups,

    #[error("sample group '{name}' must have a positive target size")]
    NonPositiveTarget { name: String },

    #[error("sample group '{name}' is configured more than once")]
    DuplicateGroup { name: String },

    #[error("sample group name '{name}' cannot be used in a file name")]
    InvalidGroupName { name: String },

    #[error("invalid group spec '{0}' (expected NAME=SIZE)")]
    InvalidGroupSpec(String),
}

/// The data cannot produce the requested output.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("missing required column: `{0}`")]
    MissingColumn(String),

    #[error("no order rows remain after cleaning")]
    NoOrderRows,

    #[error("no customers have a recency at or below {threshold} months")]
    EmptyAfterFilter { threshold: i64 },

    #[error("no customers fall inside both the recency and frequency bins")]
    NoSegmentedCustomers,

    #[error("sampling produced no assignments for any group")]
    EmptySample,
}

/// Errors raised by the aggregation/segmentation/sampling core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SegmentationError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("data error: {0}")]
    Data(#[from] DataError),

    /// A derived count broke an allocation guarantee. This is a defect, not an
    /// input problem, and aborts the whole run.
    #[error("invariant violation in segment {segment}: {detail}")]
    Invariant { segment: String, detail: String },
}

impl SegmentationError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration(_) => 2,
            Self::Data(DataError::MissingColumn(_)) => 2,
            Self::Data(_) => 3,
            Self::Invariant { .. } => 4,
        }
    }
}

/// Process-level error: a message plus the exit code `main` should use.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<SegmentationError> for AppError {
    fn from(err: SegmentationError) -> Self {
        Self::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
