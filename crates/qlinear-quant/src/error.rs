//! Quantization Error Types
//!
//! Error types for quantization parameter computation and array quantization.
//!
//! @version 0.1.0
//! @author Qlinear Development Team

use thiserror::Error;

/// Result type for quantization operations.
pub type QuantResult<T> = Result<T, QuantError>;

/// Errors that can occur during quantization.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuantError {
    /// A representable range violates `qmin <= 0 <= qmax`.
    #[error(
        "qmin and qmax must meet requirement: qmin <= 0 <= qmax \
         while qmin:{qmin}, qmax:{qmax}"
    )]
    InvalidRange {
        /// Lower bound of the representable range.
        qmin: i64,
        /// Upper bound of the representable range.
        qmax: i64,
    },

    /// The requested combination of storage type and options is not defined.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Zero point has a type that cannot be used for the requested quantization.
    #[error("Invalid zero point type: {0}")]
    ZeroPointType(String),

    /// Shape mismatch between data and declared shape.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Expected shape.
        expected: Vec<usize>,
        /// Actual shape.
        actual: Vec<usize>,
    },

    /// Axis outside `[-rank, rank)`.
    #[error("Invalid axis {axis} for tensor of rank {rank}")]
    InvalidAxis {
        /// Requested axis.
        axis: i64,
        /// Rank of the tensor.
        rank: usize,
    },

    /// A float8 quantized code decoded to NaN.
    #[error(
        "One of the quantized value is NaN data in [{rmin}, {rmax}], \
         quantized_data in [{qmin}, {qmax}]"
    )]
    NanQuantized {
        /// Minimum of the real input.
        rmin: f32,
        /// Maximum of the real input.
        rmax: f32,
        /// Minimum of the quantized output, decoded.
        qmin: f32,
        /// Maximum of the quantized output, decoded.
        qmax: f32,
    },

    /// Unknown quantization type name.
    #[error("Invalid quantization type: {0}")]
    InvalidQuantType(String),

    /// Calibration error.
    #[error("Calibration error: {0}")]
    CalibrationError(String),

    /// Invalid quantized data.
    #[error("Invalid quantized data: {0}")]
    InvalidData(String),
}
