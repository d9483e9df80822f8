use std::backtrace::Backtrace;
use thiserror::Error;

/// [`ReportErrorVariant`] is an enumeration of all the specific error variants
/// that can occur while turning a replay file into an analysis report. These
/// include errors related to header and network parsing, actor bookkeeping in
/// the boxcars adapter, identity resolution, and final schema validation.
#[derive(Error, Debug, Clone)]
pub enum ReportErrorVariant {
    #[error("Replay header could not be parsed: {message}")]
    HeaderParse { message: String },

    #[error("Replay network data could not be parsed: {message}")]
    NetworkParse { message: String },

    #[error("Replay has no network frames")]
    NoNetworkFrames,

    #[error("Frame index {index} out of bounds (len {len})")]
    FrameIndexOutOfBounds { index: usize, len: usize },

    #[error("Player id {player_id:?} does not resolve to a known identity")]
    UnknownPlayerId { player_id: String },

    #[error("Report failed schema validation: {message}")]
    SchemaValidation { message: String },

    #[error("I/O error reading replay: {message}")]
    Io { message: String },
}

/// [`ReportError`] pairs a [`ReportErrorVariant`] with the backtrace captured
/// at the point the error was constructed.
#[derive(Debug)]
pub struct ReportError {
    pub backtrace: Backtrace,
    pub variant: ReportErrorVariant,
}

impl ReportError {
    pub fn new(variant: ReportErrorVariant) -> Self {
        Self {
            backtrace: Backtrace::capture(),
            variant,
        }
    }

    pub fn new_result<T>(variant: ReportErrorVariant) -> Result<T, Self> {
        Err(Self::new(variant))
    }

    pub fn header_parse(message: impl Into<String>) -> Self {
        Self::new(ReportErrorVariant::HeaderParse {
            message: message.into(),
        })
    }

    pub fn network_parse(message: impl Into<String>) -> Self {
        Self::new(ReportErrorVariant::NetworkParse {
            message: message.into(),
        })
    }

    pub fn schema_validation(message: impl Into<String>) -> Self {
        Self::new(ReportErrorVariant::SchemaValidation {
            message: message.into(),
        })
    }
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.variant.fmt(f)
    }
}

impl std::error::Error for ReportError {}

impl From<std::io::Error> for ReportError {
    fn from(error: std::io::Error) -> Self {
        Self::new(ReportErrorVariant::Io {
            message: error.to_string(),
        })
    }
}

pub type ReportResult<T> = Result<T, ReportError>;
