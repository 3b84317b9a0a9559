/// Bridge Error
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// A declared length is inconsistent with the array content
    #[error("invalid length: {0}")]
    InvalidLength(String),

    /// Feature widths disagree across the items of a batch
    #[error("shape mismatch: item {index} has feature width {actual}, expected {expected}")]
    ShapeMismatch {
        /// Index of the offending item
        index: usize,

        /// The width of the first item
        expected: usize,

        /// The width found on the offending item
        actual: usize,
    },

    /// No feature width can be derived from an empty gradient list
    #[error("cannot restore boundary markers for an empty batch")]
    EmptyBatch,
}
