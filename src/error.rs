use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PanError>;

/// Everything that can go wrong while loading or querying a pangenome.
///
/// Load-time variants (`MissingColumn`, `DuplicateKey`, `MissingSequence`)
/// abort construction entirely; per-call variants leave the object as it was
/// before the call.
#[derive(Debug, Error)]
pub enum PanError {
    /// A required column is absent from an input table.
    #[error("required column '{0}' not found in input table")]
    MissingColumn(String),

    /// Two rows of the primary table map to the same composite gene id.
    #[error("duplicate gene id '{0}': organism and gene name must be unique together")]
    DuplicateKey(String),

    /// An organism or cluster name/id that was never registered.
    #[error("unknown {kind} '{name}'")]
    NotFound { kind: &'static str, name: String },

    /// A metadata join key is missing from the incoming table, or ambiguous.
    #[error("metadata join failed: {0}")]
    ShapeMismatch(String),

    /// Core level outside the valid range (0, 100].
    #[error("core level {0} is outside the valid range (0, 100]")]
    InvalidThreshold(f64),

    /// A subsetting selector named an unknown entity or an out-of-range position.
    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    /// A ledger gene has no matching entry in the sequence input.
    #[error("no sequence provided for gene '{0}'")]
    MissingSequence(String),
}

impl PanError {
    pub(crate) fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        PanError::NotFound {
            kind,
            name: name.into(),
        }
    }
}
