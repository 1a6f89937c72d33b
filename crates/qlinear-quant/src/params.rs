//! Quantization Parameters
//!
//! Computes the scale and zero point of the affine map `r = s * (q - z)`.
//! Integer targets derive both from a real interval `[rmin, rmax]`; float8
//! targets derive the scale from the standard deviation of the data and keep a
//! zero point of 0.
//!
//! @version 0.1.0
//! @author Qlinear Development Team

use std::sync::OnceLock;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{QuantError, QuantResult};
use crate::float8::Float8E4M3Fn;
use crate::range::RepresentableRange;
use crate::types::{Float8Variant, RealValue, ZeroPoint};

// =============================================================================
// Quantization Parameters
// =============================================================================

/// Scale and zero point of one quantized array or channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantizationParams<T> {
    /// Quantized code representing real zero.
    pub zero_point: ZeroPoint,
    /// Real step between adjacent codes.
    pub scale: T,
}

impl<T: RealValue> QuantizationParams<T> {
    /// Creates a parameter pair.
    pub fn new(zero_point: ZeroPoint, scale: T) -> Self {
        Self { zero_point, scale }
    }
}

// =============================================================================
// Integer Parameters
// =============================================================================

/// Computes `(zero_point, scale)` mapping `[rmin, rmax]` onto `[qmin, qmax]`.
///
/// The real interval is first widened to contain zero, then grown upward to at
/// least `min_real_range`, then symmetrized to `[-absmax, absmax]` when
/// `symmetric` is set. The scale is computed in f64 and narrowed to `T`.
///
/// A scale below the smallest normal `T` (a collapsed interval) yields
/// `(0, 1)`. In symmetric mode the zero point is the rounded midpoint of
/// `[qmin, qmax]`, independent of the scale, so int8, uint8, int16 and uint16
/// always get 0, 128, 0 and 32768. All rounding is half to even.
///
/// # Errors
/// `InvalidRange` unless `qmin <= 0 <= qmax`.
pub fn compute_scale_zero_point<T: RealValue>(
    rmin: T,
    rmax: T,
    qmin: i32,
    qmax: i32,
    symmetric: bool,
    min_real_range: Option<T>,
) -> QuantResult<(i32, T)> {
    let range = RepresentableRange::new(qmin, qmax)?;

    // Zero must be representable.
    let mut rmin = if rmin < T::ZERO { rmin } else { T::ZERO };
    let mut rmax = if rmax > T::ZERO { rmax } else { T::ZERO };

    if let Some(min_real_range) = min_real_range {
        let widened = T::from_f64(rmin.to_f64() + min_real_range.to_f64());
        if widened > rmax {
            rmax = widened;
        }
    }

    if symmetric {
        let absmax = rmin.to_f64().abs().max(rmax.to_f64().abs());
        rmin = T::from_f64(-absmax);
        rmax = T::from_f64(absmax);
    }

    let dr = T::from_f64(rmax.to_f64() - rmin.to_f64()).to_f64();
    let dq = f64::from(range.qmax()) - f64::from(range.qmin());
    let scale = dr / dq;

    if scale.is_nan() || scale < T::MIN_POSITIVE.to_f64() {
        tracing::debug!(
            rmin = %rmin,
            rmax = %rmax,
            "real range collapsed, using scale 1 and zero point 0"
        );
        return Ok((0, T::ONE));
    }

    let zero_point = if symmetric {
        ((f64::from(range.qmin()) + f64::from(range.qmax())) / 2.0).round_ties_even()
    } else {
        (f64::from(range.qmin()) - rmin.to_f64() / scale).round_ties_even()
    };
    let zero_point = zero_point.clamp(f64::from(range.qmin()), f64::from(range.qmax())) as i32;
    let scale = T::from_f64(scale);

    tracing::debug!(
        rmin = %rmin,
        rmax = %rmax,
        qmin = range.qmin(),
        qmax = range.qmax(),
        zero_point,
        scale = %scale,
        "computed quantization parameters"
    );

    Ok((zero_point, scale))
}

// =============================================================================
// Float8 Distribution Cache
// =============================================================================

/// Memoized standard deviation of every finite value of a float8 format.
///
/// Entries are computed on first use and never change, so concurrent callers
/// racing on a missing entry store the same value.
pub struct Float8DistributionCache {
    std_devs: RwLock<FxHashMap<Float8Variant, f64>>,
}

impl Float8DistributionCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            std_devs: RwLock::new(FxHashMap::default()),
        }
    }

    /// Returns the process-wide cache used by the convenience functions.
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<Float8DistributionCache> = OnceLock::new();
        GLOBAL.get_or_init(Float8DistributionCache::new)
    }

    /// Returns the standard deviation of the finite values of `variant`.
    ///
    /// # Errors
    /// `UnsupportedOperation` for any variant other than E4M3FN.
    pub fn std_dev(&self, variant: Float8Variant) -> QuantResult<f64> {
        if let Some(&std_dev) = self.std_devs.read().get(&variant) {
            return Ok(std_dev);
        }

        let std_dev = representable_std_dev(variant)?;
        tracing::debug!(%variant, std_dev, "cached float8 value distribution");
        self.std_devs.write().insert(variant, std_dev);
        Ok(std_dev)
    }

    /// Returns true if `variant` has already been computed.
    pub fn contains(&self, variant: Float8Variant) -> bool {
        self.std_devs.read().contains_key(&variant)
    }

    /// Returns the number of cached variants.
    pub fn len(&self) -> usize {
        self.std_devs.read().len()
    }

    /// Returns true if nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        self.std_devs.write().clear();
    }
}

impl Default for Float8DistributionCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Population standard deviation of all finite, non-NaN codes of a variant.
fn representable_std_dev(variant: Float8Variant) -> QuantResult<f64> {
    let values: Vec<f64> = match variant {
        Float8Variant::E4M3Fn => Float8E4M3Fn::finite_values().map(f64::from).collect(),
        other => {
            return Err(QuantError::UnsupportedOperation(format!(
                "quantization to {other} not implemented"
            )))
        }
    };
    Ok(population_std_dev(values.iter().copied()))
}

/// Population standard deviation (divides by `n`), 0 for an empty input.
pub(crate) fn population_std_dev(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let (count, sum) = values
        .clone()
        .fold((0usize, 0.0f64), |(n, s), v| (n + 1, s + v));
    if count == 0 {
        return 0.0;
    }
    let mean = sum / count as f64;
    let variance = values.map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;
    variance.sqrt()
}

// =============================================================================
// Float8 Parameters
// =============================================================================

/// Computes `(0, std / std(representable values))` using the given cache.
///
/// # Errors
/// `UnsupportedOperation` for any variant other than E4M3FN.
pub fn compute_scale_zero_point_float8_with_cache<T: RealValue>(
    cache: &Float8DistributionCache,
    variant: Float8Variant,
    std: T,
) -> QuantResult<(ZeroPoint, T)> {
    let std_f8 = cache.std_dev(variant)?;
    let zero_point = match variant {
        Float8Variant::E4M3Fn => ZeroPoint::F8E4M3Fn(Float8E4M3Fn::ZERO),
        other => {
            return Err(QuantError::UnsupportedOperation(format!(
                "unexpected element type {other}"
            )))
        }
    };
    let scale = T::from_f64(std.to_f64() / std_f8);
    Ok((zero_point, scale))
}

/// Computes float8 parameters with the process-wide cache.
pub fn compute_scale_zero_point_float8<T: RealValue>(
    variant: Float8Variant,
    std: T,
) -> QuantResult<(ZeroPoint, T)> {
    compute_scale_zero_point_float8_with_cache(Float8DistributionCache::global(), variant, std)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use half::f16;

    #[test]
    fn test_asymmetric_uint8() {
        let (zp, scale) = compute_scale_zero_point(-1.0f32, 3.0, 0, 255, false, None).unwrap();
        assert!((scale - 4.0 / 255.0).abs() < 1e-7);
        // round(0 - (-1) / (4/255)) = round(63.75)
        assert_eq!(zp, 64);
    }

    #[test]
    fn test_range_forced_to_contain_zero() {
        let (zp, scale) = compute_scale_zero_point(2.0f32, 4.0, 0, 255, false, None).unwrap();
        assert_eq!(zp, 0);
        assert!((scale - 4.0 / 255.0).abs() < 1e-7);

        let (zp, _) = compute_scale_zero_point(-4.0f32, -2.0, 0, 255, false, None).unwrap();
        assert_eq!(zp, 255);
    }

    #[test]
    fn test_symmetric_canonical_zero_points() {
        let cases = [(-127, 127, 0), (0, 255, 128), (-32767, 32767, 0), (0, 65535, 32768)];
        for (qmin, qmax, expected) in cases {
            let (zp, _) = compute_scale_zero_point(-0.3f32, 7.1, qmin, qmax, true, None).unwrap();
            assert_eq!(zp, expected, "range [{qmin}, {qmax}]");
        }
    }

    #[test]
    fn test_symmetric_scale() {
        let (zp, scale) = compute_scale_zero_point(-1.0f32, 2.0, -127, 127, true, None).unwrap();
        assert_eq!(zp, 0);
        assert!((scale - 4.0 / 254.0).abs() < 1e-7);
    }

    #[test]
    fn test_degenerate_range() {
        assert_eq!(
            compute_scale_zero_point(0.0f32, 0.0, -128, 127, false, None),
            Ok((0, 1.0))
        );
        assert_eq!(
            compute_scale_zero_point(0.0f32, 0.0, 0, 255, true, None),
            Ok((0, 1.0))
        );
    }

    #[test]
    fn test_min_real_range_grows_upward() {
        let (zp, scale) =
            compute_scale_zero_point(-0.001f32, 0.001, 0, 255, false, Some(1.0)).unwrap();
        // rmax becomes rmin + 1.0
        assert!((scale - 1.0 / 255.0).abs() < 1e-6);
        assert_eq!(zp, 0);

        // Never shrinks a wider interval.
        let (_, scale) = compute_scale_zero_point(-2.0f32, 2.0, 0, 255, false, Some(1.0)).unwrap();
        assert!((scale - 4.0 / 255.0).abs() < 1e-7);
    }

    #[test]
    fn test_invalid_range() {
        assert_eq!(
            compute_scale_zero_point(-1.0f32, 1.0, 1, 255, false, None),
            Err(QuantError::InvalidRange { qmin: 1, qmax: 255 })
        );
        assert!(compute_scale_zero_point(-1.0f32, 1.0, -10, -1, false, None).is_err());
    }

    #[test]
    fn test_f16_precision() {
        let (zp, scale) =
            compute_scale_zero_point(f16::from_f32(-1.0), f16::from_f32(3.0), 0, 255, false, None)
                .unwrap();
        assert_eq!(zp, 64);
        assert_eq!(scale, f16::from_f64(4.0 / 255.0));

        // 1e-6 * 2 / 255 is below the smallest normal f16.
        let (zp, scale) = compute_scale_zero_point(
            f16::from_f32(0.0),
            f16::from_f32(1e-6),
            0,
            255,
            false,
            None,
        )
        .unwrap();
        assert_eq!((zp, scale), (0, f16::ONE));
    }

    #[test]
    fn test_float8_cache() {
        let cache = Float8DistributionCache::new();
        assert!(cache.is_empty());

        let first = cache.std_dev(Float8Variant::E4M3Fn).unwrap();
        assert!(cache.contains(Float8Variant::E4M3Fn));
        let second = cache.std_dev(Float8Variant::E4M3Fn).unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);

        let values: Vec<f64> = Float8E4M3Fn::finite_values().map(f64::from).collect();
        let expected = population_std_dev(values.iter().copied());
        assert_eq!(first, expected);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_float8_unsupported_variant() {
        let cache = Float8DistributionCache::new();
        for variant in [
            Float8Variant::E4M3FnUz,
            Float8Variant::E5M2,
            Float8Variant::E5M2FnUz,
        ] {
            assert!(matches!(
                compute_scale_zero_point_float8_with_cache(&cache, variant, 1.0f32),
                Err(QuantError::UnsupportedOperation(_))
            ));
        }
        assert!(cache.is_empty());
    }

    #[test]
    fn test_float8_scale() {
        let cache = Float8DistributionCache::new();
        let std_f8 = cache.std_dev(Float8Variant::E4M3Fn).unwrap();
        let (zp, scale) =
            compute_scale_zero_point_float8_with_cache(&cache, Float8Variant::E4M3Fn, 2.5f32)
                .unwrap();
        assert!(zp.is_zero());
        assert!((f64::from(scale) - 2.5 / std_f8).abs() < 1e-6);
    }

    #[test]
    fn test_population_std_dev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(population_std_dev(values.iter().copied()), 2.0);
        assert_eq!(population_std_dev(std::iter::empty()), 0.0);
    }
}
