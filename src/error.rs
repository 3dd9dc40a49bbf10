//! Error types for isochart.
//!
//! Every public operation returns [`Result`]. A failed call never hands back
//! partially filled buffers: the payload only exists on success.

use thiserror::Error;

/// Result type alias using [`AtlasError`].
pub type Result<T> = std::result::Result<T, AtlasError>;

/// Errors that can occur while building adjacency, validating, or generating an atlas.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AtlasError {
    /// Malformed input buffers (empty, wrong length, inconsistent counts).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A face references a vertex index outside the vertex buffer.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },

    /// The mesh has non-manifold topology the requested operation cannot accept.
    #[error("mesh has non-manifold topology: {details}")]
    NonManifoldMesh {
        /// Description of the non-manifold condition.
        details: String,
    },

    /// A chart could not be flattened into a valid disk within the retry budget.
    #[error("chart of {faces} faces could not be parameterized after {attempts} split rounds")]
    UnsolvableParameterization {
        /// Number of faces in the chart that failed.
        faces: usize,
        /// Number of split rounds attempted.
        attempts: usize,
    },

    /// Charts do not fit in the requested texture at a scale that leaves the
    /// largest chart at least one texel across.
    #[error("{charts} charts do not fit in {width}x{height} texels with a gutter of {gutter}")]
    PackingOverflow {
        /// Number of charts that had to be placed.
        charts: usize,
        /// Texture width in texels.
        width: u32,
        /// Texture height in texels.
        height: u32,
        /// Requested gutter in texels.
        gutter: f32,
    },

    /// The progress callback or cancel token requested an abort.
    #[error("atlas generation was cancelled")]
    Cancelled,

    /// Iterative solver failed to converge.
    #[error("solver failed to converge after {iterations} iterations")]
    ConvergenceFailed {
        /// Number of iterations attempted.
        iterations: usize,
    },
}

/// Coarse error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed counts, empty arrays, out-of-range parameters.
    InvalidInput,
    /// Topology defect detected by validation.
    NonManifoldMesh,
    /// A chart could not be reduced to a valid disk.
    UnsolvableParameterization,
    /// Charts exceed the texture domain.
    PackingOverflow,
    /// Caller-requested abort.
    Cancelled,
}

/// `E_INVALIDARG`
const E_INVALIDARG: i32 = 0x8007_0057_u32 as i32;
/// `E_ABORT`
const E_ABORT: i32 = 0x8000_4004_u32 as i32;
/// `E_FAIL`
const E_FAIL: i32 = 0x8000_4005_u32 as i32;
/// `HRESULT_FROM_WIN32(ERROR_INSUFFICIENT_BUFFER)`
const E_INSUFFICIENT_BUFFER: i32 = 0x8007_007A_u32 as i32;

impl AtlasError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        AtlasError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Create an invalid input error from anything printable.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        AtlasError::InvalidInput(message.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AtlasError::InvalidInput(_)
            | AtlasError::InvalidVertexIndex { .. }
            | AtlasError::InvalidParameter { .. } => ErrorKind::InvalidInput,
            AtlasError::NonManifoldMesh { .. } => ErrorKind::NonManifoldMesh,
            AtlasError::UnsolvableParameterization { .. } | AtlasError::ConvergenceFailed { .. } => {
                ErrorKind::UnsolvableParameterization
            }
            AtlasError::PackingOverflow { .. } => ErrorKind::PackingOverflow,
            AtlasError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// HRESULT-style code for callers that speak the native result convention.
    ///
    /// Always negative; success is `0` and is never represented by an error.
    pub fn result_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::InvalidInput => E_INVALIDARG,
            ErrorKind::NonManifoldMesh | ErrorKind::UnsolvableParameterization => E_FAIL,
            ErrorKind::PackingOverflow => E_INSUFFICIENT_BUFFER,
            ErrorKind::Cancelled => E_ABORT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            AtlasError::invalid_param("epsilon", -1.0, "must be non-negative").kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            AtlasError::ConvergenceFailed { iterations: 10 }.kind(),
            ErrorKind::UnsolvableParameterization
        );
        assert_eq!(AtlasError::Cancelled.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn test_result_codes_are_negative() {
        let errors = [
            AtlasError::invalid_input("empty"),
            AtlasError::NonManifoldMesh {
                details: "bowtie".into(),
            },
            AtlasError::PackingOverflow {
                charts: 3,
                width: 4,
                height: 4,
                gutter: 2.0,
            },
            AtlasError::Cancelled,
        ];
        for e in &errors {
            assert!(e.result_code() < 0, "{e} should map to a failure code");
        }
        assert_eq!(AtlasError::Cancelled.result_code(), 0x8000_4004_u32 as i32);
    }

    #[test]
    fn test_display() {
        let e = AtlasError::InvalidVertexIndex { face: 2, vertex: 9 };
        assert_eq!(e.to_string(), "face 2 references invalid vertex index 9");
    }
}
