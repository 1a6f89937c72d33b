//! Quantization Functions
//!
//! Applies a scale and zero point to arrays of real values, and drives range
//! resolution, parameter computation and quantization for whole arrays or
//! per-axis slices.
//!
//! @version 0.1.0
//! @author Qlinear Development Team

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::QuantConfig;
use crate::error::{QuantError, QuantResult};
use crate::float8::Float8E4M3Fn;
use crate::params::{
    compute_scale_zero_point, compute_scale_zero_point_float8_with_cache, population_std_dev,
    Float8DistributionCache, QuantizationParams,
};
use crate::range::resolve_range;
use crate::types::{QuantizedData, RealValue, StorageType, ZeroPoint};

// =============================================================================
// Array Quantizer
// =============================================================================

/// Quantizes `data` with a known scale and zero point.
///
/// Integer storage computes `clip(round(x / scale) + zero_point, low, high)` in
/// f32 with half-to-even rounding. The clip bounds are the symmetric full
/// range of the type (int8 `[-127, 127]`, int16 `[-32767, 32767]`, unsigned
/// types their full range) narrowed by `low` and `high`.
///
/// Float8 storage encodes `x / scale` to the nearest E4M3FN code; `low` and
/// `high` do not apply and the zero point must be zero.
///
/// # Errors
/// - `ZeroPointType` if a float8 zero point is used for integer storage.
/// - `UnsupportedOperation` if a float8 zero point is not zero.
pub fn quantize<T: RealValue>(
    storage: StorageType,
    data: &[T],
    scale: T,
    zero_point: ZeroPoint,
    low: Option<i32>,
    high: Option<i32>,
) -> QuantResult<QuantizedData> {
    if storage.is_float8() {
        return quantize_float8(data, scale, zero_point);
    }

    let zero_point = zero_point.as_i32().ok_or_else(|| {
        QuantError::ZeroPointType(format!(
            "zero_point cannot be {} for integer quantization",
            zero_point.storage_type()
        ))
    })?;

    let range = resolve_range(storage, false, true)?;
    let clip_low = low.map_or(range.qmin(), |low| low.max(range.qmin())) as f32;
    let clip_high = high.map_or(range.qmax(), |high| high.min(range.qmax())) as f32;
    let scale = scale.to_f32();
    let zero_point = zero_point as f32;

    // `max` then `min` matches numpy.clip when the bounds cross.
    let affine = |x: T| -> f32 {
        ((x.to_f32() / scale).round_ties_even() + zero_point)
            .max(clip_low)
            .min(clip_high)
    };

    Ok(match storage {
        StorageType::QInt8 => {
            QuantizedData::I8(data.par_iter().map(|&x| affine(x) as i8).collect())
        }
        StorageType::QUInt8 => {
            QuantizedData::U8(data.par_iter().map(|&x| affine(x) as u8).collect())
        }
        StorageType::QInt16 => {
            QuantizedData::I16(data.par_iter().map(|&x| affine(x) as i16).collect())
        }
        StorageType::QUInt16 => {
            QuantizedData::U16(data.par_iter().map(|&x| affine(x) as u16).collect())
        }
        StorageType::QFloat8E4M3Fn => {
            return Err(QuantError::InvalidQuantType(format!("{storage} is not an integer type")))
        }
    })
}

/// Encodes `x / scale` for every value as E4M3FN.
fn quantize_float8<T: RealValue>(
    data: &[T],
    scale: T,
    zero_point: ZeroPoint,
) -> QuantResult<QuantizedData> {
    if !zero_point.is_zero() {
        return Err(QuantError::UnsupportedOperation(format!(
            "zero_point is expected to be null for float 8 not {zero_point}"
        )));
    }
    let scale = scale.to_f32();
    let codes = data
        .par_iter()
        .map(|&x| Float8E4M3Fn::from_f32(x.to_f32() / scale))
        .collect();
    Ok(QuantizedData::F8E4M3Fn(codes))
}

// =============================================================================
// Batch Driver
// =============================================================================

/// Result of quantizing one array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantizedWeight<T> {
    /// Real minimum used (before zero inclusion and symmetrization).
    pub rmin: T,
    /// Real maximum used (before zero inclusion and symmetrization).
    pub rmax: T,
    /// Zero point.
    pub zero_point: ZeroPoint,
    /// Scale.
    pub scale: T,
    /// Quantized values, same length as the input.
    pub quantized: QuantizedData,
}

impl<T: RealValue> QuantizedWeight<T> {
    /// Returns the scale and zero point.
    pub fn params(&self) -> QuantizationParams<T> {
        QuantizationParams::new(self.zero_point, self.scale)
    }
}

/// Quantizes one array of weights.
///
/// `rmin` and `rmax` default to the minimum and maximum of `data`. An empty
/// array returns `rmin = rmax = 0`, zero point 0, scale 1 and no values.
/// Integer codes never leave the resolved range, so reduced-range uint8 stays
/// within `[0, 127]`.
///
/// # Errors
/// - `UnsupportedOperation` for float8 with `reduce_range`.
/// - `NanQuantized` if any float8 code is NaN.
#[allow(clippy::too_many_arguments)]
pub fn quantize_data<T: RealValue>(
    data: &[T],
    storage: StorageType,
    symmetric: bool,
    reduce_range: bool,
    min_real_range: Option<T>,
    rmin_override: Option<T>,
    rmax_override: Option<T>,
) -> QuantResult<QuantizedWeight<T>> {
    let config = QuantConfig {
        storage_type: storage,
        symmetric,
        reduce_range,
        min_real_range: min_real_range.map(RealValue::to_f64),
        rmin_override: rmin_override.map(RealValue::to_f64),
        rmax_override: rmax_override.map(RealValue::to_f64),
    };
    quantize_data_with_config(data, &config)
}

/// Quantizes one array with settings from a [`QuantConfig`].
pub fn quantize_data_with_config<T: RealValue>(
    data: &[T],
    config: &QuantConfig,
) -> QuantResult<QuantizedWeight<T>> {
    quantize_data_with_cache(data, config, Float8DistributionCache::global())
}

/// Quantizes one array, reading float8 distributions from `cache`.
pub fn quantize_data_with_cache<T: RealValue>(
    data: &[T],
    config: &QuantConfig,
    cache: &Float8DistributionCache,
) -> QuantResult<QuantizedWeight<T>> {
    config.validate()?;
    let storage = config.storage_type;

    let (data_min, data_max) = min_max(data);
    let rmin = config.rmin_override.map_or(data_min, T::from_f64);
    let rmax = config.rmax_override.map_or(data_max, T::from_f64);

    if data.is_empty() {
        return Ok(QuantizedWeight {
            rmin,
            rmax,
            zero_point: ZeroPoint::zero(storage),
            scale: T::ONE,
            quantized: QuantizedData::empty(storage),
        });
    }

    if let Some(variant) = storage.float8_variant() {
        let std = T::from_f64(population_std_dev(data.iter().map(|x| x.to_f64())));
        let (zero_point, mut scale) =
            compute_scale_zero_point_float8_with_cache(cache, variant, std)?;
        if scale <= T::ZERO {
            // Constant data has no spread; keep values unscaled instead of dividing by zero.
            tracing::debug!(std = %std, "float8 scale collapsed, using scale 1");
            scale = T::ONE;
        }

        let quantized = quantize(storage, data, scale, zero_point, None, None)?;
        check_float8_codes(&quantized, data_min, data_max)?;

        return Ok(QuantizedWeight {
            rmin,
            rmax,
            zero_point,
            scale,
            quantized,
        });
    }

    let range = resolve_range(storage, config.reduce_range, config.symmetric)?;
    let (zero_point, scale) = compute_scale_zero_point(
        rmin,
        rmax,
        range.qmin(),
        range.qmax(),
        config.symmetric,
        config.min_real_range.map(T::from_f64),
    )?;
    let zero_point = ZeroPoint::from_i64(storage, i64::from(zero_point))?;
    let quantized = quantize(
        storage,
        data,
        scale,
        zero_point,
        Some(range.qmin()),
        Some(range.qmax()),
    )?;

    Ok(QuantizedWeight {
        rmin,
        rmax,
        zero_point,
        scale,
        quantized,
    })
}

/// Returns `(min, max)` of `data`, or `(0, 0)` when empty.
fn min_max<T: RealValue>(data: &[T]) -> (T, T) {
    let mut iter = data.iter().copied();
    let first = match iter.next() {
        Some(first) => first,
        None => return (T::ZERO, T::ZERO),
    };
    iter.fold((first, first), |(lo, hi), x| {
        (if x < lo { x } else { lo }, if x > hi { x } else { hi })
    })
}

/// Fails if any float8 code carries the NaN pattern.
fn check_float8_codes<T: RealValue>(
    quantized: &QuantizedData,
    rmin: T,
    rmax: T,
) -> QuantResult<()> {
    let QuantizedData::F8E4M3Fn(codes) = quantized else {
        return Ok(());
    };
    if !codes.par_iter().any(|code| code.is_nan()) {
        return Ok(());
    }

    let decoded = codes.iter().map(|code| code.to_f32());
    let qmin = decoded.clone().fold(f32::INFINITY, f32::min);
    let qmax = decoded.fold(f32::NEG_INFINITY, f32::max);
    tracing::error!(
        rmin = %rmin,
        rmax = %rmax,
        "float8 quantization produced NaN codes"
    );
    Err(QuantError::NanQuantized {
        rmin: rmin.to_f32(),
        rmax: rmax.to_f32(),
        qmin,
        qmax,
    })
}

// =============================================================================
// Per-Axis Driver
// =============================================================================

/// A weight quantized independently along one axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantizedInitializer<T> {
    /// Shape of the weight.
    pub shape: Vec<usize>,
    /// Normalized channel axis.
    pub axis: usize,
    /// Real minimum per channel.
    pub rmins: Vec<T>,
    /// Real maximum per channel.
    pub rmaxs: Vec<T>,
    /// Zero point per channel.
    pub zero_points: Vec<ZeroPoint>,
    /// Scale per channel.
    pub scales: Vec<T>,
    /// Quantized values in the original element order.
    pub quantized: QuantizedData,
}

impl<T> QuantizedInitializer<T> {
    /// Returns the number of channels.
    pub fn num_channels(&self) -> usize {
        self.scales.len()
    }
}

/// Maps `axis` into `[0, rank)`, counting negative axes from the end.
pub fn normalize_axis(axis: i64, rank: usize) -> Option<usize> {
    let rank = i64::try_from(rank).ok()?;
    let normalized = if axis < 0 { axis + rank } else { axis };
    if (0..rank).contains(&normalized) {
        usize::try_from(normalized).ok()
    } else {
        None
    }
}

/// Quantizes every slice of `data` along `axis` with its own parameters.
///
/// # Errors
/// - `ShapeMismatch` if `data.len()` differs from the product of `shape`.
/// - `InvalidAxis` if `axis` is outside `[-rank, rank)`.
/// - Any error of [`quantize_data_with_config`] for a channel.
pub fn quantize_data_per_axis<T: RealValue>(
    data: &[T],
    shape: &[usize],
    axis: i64,
    config: &QuantConfig,
) -> QuantResult<QuantizedInitializer<T>> {
    quantize_data_per_axis_with_cache(data, shape, axis, config, Float8DistributionCache::global())
}

/// Per-axis quantization reading float8 distributions from `cache`.
pub fn quantize_data_per_axis_with_cache<T: RealValue>(
    data: &[T],
    shape: &[usize],
    axis: i64,
    config: &QuantConfig,
    cache: &Float8DistributionCache,
) -> QuantResult<QuantizedInitializer<T>> {
    let numel: usize = shape.iter().product();
    if numel != data.len() {
        return Err(QuantError::ShapeMismatch {
            expected: shape.to_vec(),
            actual: vec![data.len()],
        });
    }
    let axis_index = normalize_axis(axis, shape.len()).ok_or(QuantError::InvalidAxis {
        axis,
        rank: shape.len(),
    })?;

    let outer: usize = shape[..axis_index].iter().product();
    let channels = shape[axis_index];
    let inner: usize = shape[axis_index + 1..].iter().product();

    let results = (0..channels)
        .into_par_iter()
        .map(|c| {
            let slice: Vec<T> = (0..outer)
                .flat_map(|o| {
                    let start = (o * channels + c) * inner;
                    data[start..start + inner].iter().copied()
                })
                .collect();
            quantize_data_with_cache(&slice, config, cache)
        })
        .collect::<QuantResult<Vec<_>>>()?;

    let mut rmins = Vec::with_capacity(channels);
    let mut rmaxs = Vec::with_capacity(channels);
    let mut zero_points = Vec::with_capacity(channels);
    let mut scales = Vec::with_capacity(channels);
    let mut parts = Vec::with_capacity(channels);
    for weight in results {
        rmins.push(weight.rmin);
        rmaxs.push(weight.rmax);
        zero_points.push(weight.zero_point);
        scales.push(weight.scale);
        parts.push(weight.quantized);
    }

    let quantized = QuantizedData::interleave(parts, config.storage_type, outer, inner)?;

    Ok(QuantizedInitializer {
        shape: shape.to_vec(),
        axis: axis_index,
        rmins,
        rmaxs,
        zero_points,
        scales,
        quantized,
    })
}

// =============================================================================
// Tests
// =============================================================================
