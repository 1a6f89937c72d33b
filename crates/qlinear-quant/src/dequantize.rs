//! Dequantization Functions
//!
//! Functions for mapping quantized values back to real numbers and measuring
//! the error introduced by quantization.
//!
//! @version 0.1.0
//! @author Qlinear Development Team

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{QuantError, QuantResult};
use crate::types::{QuantizedData, RealValue, ZeroPoint};

// =============================================================================
// Public API
// =============================================================================

/// Dequantizes values with the affine map `scale * (q - zero_point)`.
///
/// Float8 codes are decoded and multiplied by `scale`; their zero point must
/// be zero.
///
/// # Example
/// ```ignore
/// use qlinear_quant::{dequantize, quantize_data, StorageType};
///
/// let data = [-1.0f32, 0.0, 2.0];
/// let weight = quantize_data(&data, StorageType::QInt8, true, false, None, None, None)?;
/// let restored = dequantize(&weight.quantized, weight.scale, weight.zero_point)?;
/// ```
pub fn dequantize<T: RealValue>(
    quantized: &QuantizedData,
    scale: T,
    zero_point: ZeroPoint,
) -> QuantResult<Vec<f32>> {
    let scale = scale.to_f32();
    match quantized {
        QuantizedData::I8(v) => {
            let zero_point = integer_zero_point(quantized, zero_point)?;
            Ok(dequantize_integers(v, zero_point, scale))
        }
        QuantizedData::U8(v) => {
            let zero_point = integer_zero_point(quantized, zero_point)?;
            Ok(dequantize_integers(v, zero_point, scale))
        }
        QuantizedData::I16(v) => {
            let zero_point = integer_zero_point(quantized, zero_point)?;
            Ok(dequantize_integers(v, zero_point, scale))
        }
        QuantizedData::U16(v) => {
            let zero_point = integer_zero_point(quantized, zero_point)?;
            Ok(dequantize_integers(v, zero_point, scale))
        }
        QuantizedData::F8E4M3Fn(codes) => {
            if !zero_point.is_zero() {
                return Err(QuantError::UnsupportedOperation(format!(
                    "float8 values cannot be dequantized with zero point {zero_point}"
                )));
            }
            Ok(codes.par_iter().map(|code| code.to_f32() * scale).collect())
        }
    }
}

fn integer_zero_point(quantized: &QuantizedData, zero_point: ZeroPoint) -> QuantResult<i32> {
    zero_point.as_i32().ok_or_else(|| {
        QuantError::ZeroPointType(format!(
            "{} values cannot be dequantized with a {} zero point",
            quantized.storage_type(),
            zero_point.storage_type()
        ))
    })
}

fn dequantize_integers<Q>(values: &[Q], zero_point: i32, scale: f32) -> Vec<f32>
where
    Q: Copy + Into<i32> + Sync,
{
    values
        .par_iter()
        .map(|&q| (q.into() - zero_point) as f32 * scale)
        .collect()
}

// =============================================================================
// Error Metrics
// =============================================================================

/// Root mean squared error between `original` and `restored`.
///
/// # Errors
/// `InvalidData` if the lengths differ.
pub fn quantization_error<T: RealValue>(original: &[T], restored: &[f32]) -> QuantResult<f32> {
    check_lengths(original.len(), restored.len())?;
    if original.is_empty() {
        return Ok(0.0);
    }

    let mse = original
        .iter()
        .zip(restored)
        .map(|(a, b)| (a.to_f32() - b).powi(2))
        .sum::<f32>()
        / original.len() as f32;

    Ok(mse.sqrt())
}

/// Statistics about quantization error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantizationStats {
    /// Root mean squared error.
    pub rmse: f32,
    /// Maximum absolute error.
    pub max_error: f32,
    /// Mean absolute error.
    pub mean_error: f32,
}

/// Computes error statistics between `original` and `restored`.
pub fn compute_quantization_stats<T: RealValue>(
    original: &[T],
    restored: &[f32],
) -> QuantResult<QuantizationStats> {
    let rmse = quantization_error(original, restored)?;

    let errors = original
        .iter()
        .zip(restored)
        .map(|(a, b)| (a.to_f32() - b).abs());
    let max_error = errors.clone().fold(0.0f32, f32::max);
    let mean_error = if original.is_empty() {
        0.0
    } else {
        errors.sum::<f32>() / original.len() as f32
    };

    Ok(QuantizationStats {
        rmse,
        max_error,
        mean_error,
    })
}

fn check_lengths(expected: usize, actual: usize) -> QuantResult<()> {
    if expected != actual {
        return Err(QuantError::InvalidData(format!(
            "length mismatch: {expected} original values, {actual} restored values"
        )));
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
