use thiserror::Error;

/// Reasons an additive pack is refused at registry construction.
#[derive(Debug, Error)]
pub enum PackError {
    #[error("pack is not valid JSON for the additive schema: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("pack version is empty")]
    MissingVersion,

    #[error("additive at position {0} has an empty code")]
    EmptyCode(usize),

    #[error("additive code {0} appears more than once")]
    DuplicateCode(String),

    #[error("alias {alias:?} points at unknown additive code {code}")]
    UnknownAliasTarget { alias: String, code: String },

    #[error("pack checksum mismatch: declared {declared}, computed {computed}")]
    ChecksumMismatch { declared: String, computed: String },

    #[error("pack declares no checksum")]
    MissingChecksum,
}
