//! Qlinear Quant - Linear Quantization Parameters
//!
//! Computes affine quantization parameters (scale and zero point) and
//! quantizes real-valued weight arrays. Supports these storage types:
//!
//! - **QInt8 / QUInt8**: 8-bit integers, optionally symmetric or reduced range
//! - **QInt16 / QUInt16**: 16-bit integers
//! - **QFLOAT8E4M3FN**: 8-bit float codes, scale derived from the data spread
//!
//! # Example
//! ```ignore
//! use qlinear_quant::{quantize_data, StorageType};
//!
//! let data = [-1.0f32, 0.0, 2.0];
//! let weight = quantize_data(&data, StorageType::QInt8, true, false, None, None, None)?;
//! assert_eq!(weight.quantized.codes(), vec![-64, 0, 127]);
//! ```
//!
//! @version 0.1.0
//! @author Qlinear Development Team

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod error;
pub mod float8;
pub mod types;
pub mod range;
pub mod params;
pub mod config;
pub mod quantize;
pub mod dequantize;
pub mod calibration;

pub use error::{QuantError, QuantResult};
pub use float8::Float8E4M3Fn;
pub use types::{
    Float8Variant, QuantFormat, QuantizationMode, QuantizedData, QuantizedValueType, RealValue,
    StorageType, ZeroPoint,
};
pub use range::{qrange_for_storage, resolve_range, RepresentableRange};
pub use params::{
    compute_scale_zero_point, compute_scale_zero_point_float8,
    compute_scale_zero_point_float8_with_cache, Float8DistributionCache, QuantizationParams,
};
pub use config::QuantConfig;
pub use quantize::{
    normalize_axis, quantize, quantize_data, quantize_data_per_axis,
    quantize_data_per_axis_with_cache, quantize_data_with_cache, quantize_data_with_config,
    QuantizedInitializer, QuantizedWeight,
};
pub use dequantize::{
    compute_quantization_stats, dequantize, quantization_error, QuantizationStats,
};
pub use calibration::{
    calibrate, calibrate_batch, smooth_distribution, CalibrationData, CalibrationMethod,
};

// =============================================================================
// Constants
// =============================================================================

/// Default smoothing epsilon for [`smooth_distribution`].
pub const DEFAULT_SMOOTHING_EPS: f32 = 0.0001;

// =============================================================================
// Tests
// =============================================================================
