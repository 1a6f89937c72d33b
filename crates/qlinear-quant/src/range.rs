//! Representable Ranges
//!
//! Resolves the `[qmin, qmax]` interval a storage type may use, given the
//! reduced-range and symmetric modifiers.
//!
//! @version 0.1.0
//! @author Qlinear Development Team

use serde::{Deserialize, Serialize};

use crate::error::{QuantError, QuantResult};
use crate::types::StorageType;

// =============================================================================
// Representable Range
// =============================================================================

/// Bounds of quantized values, always satisfying `qmin <= 0 <= qmax`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct RepresentableRange {
    qmin: i32,
    qmax: i32,
}

/// Unchecked wire form, validated through [`RepresentableRange::new`].
#[derive(Deserialize)]
struct RawRange {
    qmin: i32,
    qmax: i32,
}

impl TryFrom<RawRange> for RepresentableRange {
    type Error = QuantError;

    fn try_from(raw: RawRange) -> QuantResult<Self> {
        Self::new(raw.qmin, raw.qmax)
    }
}

impl RepresentableRange {
    /// Creates a range, failing unless `qmin <= 0 <= qmax`.
    pub fn new(qmin: i32, qmax: i32) -> QuantResult<Self> {
        if qmin > 0 || qmax < 0 {
            return Err(QuantError::InvalidRange {
                qmin: i64::from(qmin),
                qmax: i64::from(qmax),
            });
        }
        Ok(Self { qmin, qmax })
    }

    /// Lower bound.
    pub fn qmin(&self) -> i32 {
        self.qmin
    }

    /// Upper bound.
    pub fn qmax(&self) -> i32 {
        self.qmax
    }

    /// Width of the range, `qmax - qmin`.
    pub fn width(&self) -> i64 {
        i64::from(self.qmax) - i64::from(self.qmin)
    }

    /// Returns true if `value` lies within the range.
    pub fn contains(&self, value: i64) -> bool {
        (i64::from(self.qmin)..=i64::from(self.qmax)).contains(&value)
    }
}

// =============================================================================
// Literal Tables
// =============================================================================

/// Full range of an integer storage type.
fn full_range(storage: StorageType) -> Option<(i32, i32)> {
    match storage {
        StorageType::QUInt8 => Some((0, 255)),
        StorageType::QInt8 => Some((-128, 127)),
        StorageType::QUInt16 => Some((0, 65535)),
        StorageType::QInt16 => Some((-32768, 32767)),
        StorageType::QFloat8E4M3Fn => None,
    }
}

/// Symmetric range; only signed integer types have one.
fn symmetric_range(storage: StorageType) -> Option<(i32, i32)> {
    match storage {
        StorageType::QInt8 => Some((-127, 127)),
        StorageType::QInt16 => Some((-32767, 32767)),
        _ => None,
    }
}

/// Reduced range, leaving headroom for fused accumulation.
fn reduced_range(storage: StorageType) -> Option<(i32, i32)> {
    match storage {
        StorageType::QUInt8 => Some((0, 127)),
        StorageType::QInt8 => Some((-64, 64)),
        StorageType::QUInt16 => Some((0, 32767)),
        StorageType::QInt16 => Some((-16384, 16384)),
        StorageType::QFloat8E4M3Fn => None,
    }
}

// =============================================================================
// Range Resolver
// =============================================================================

/// Returns `(qmin, qmax)` for an integer storage type.
///
/// `reduce_range` takes precedence over `symmetric`. Unsigned types have no
/// symmetric entry and fall back to their full range.
///
/// # Errors
/// `UnsupportedOperation` for float8 storage, which has no designer-chosen range.
pub fn resolve_range(
    storage: StorageType,
    reduce_range: bool,
    symmetric: bool,
) -> QuantResult<RepresentableRange> {
    if storage.is_float8() {
        return Err(QuantError::UnsupportedOperation(format!(
            "representable range is not defined for {storage}"
        )));
    }

    let bounds = if reduce_range {
        reduced_range(storage)
    } else if symmetric && symmetric_range(storage).is_some() {
        symmetric_range(storage)
    } else {
        full_range(storage)
    };

    let (qmin, qmax) = bounds.ok_or_else(|| {
        QuantError::InvalidQuantType(format!(
            "{storage}: only QInt8, QUInt8, QInt16 and QUInt16 have an integer range"
        ))
    })?;

    RepresentableRange::new(qmin, qmax)
}

/// Returns the width `qmax - qmin` of the resolved range.
pub fn qrange_for_storage(
    storage: StorageType,
    reduce_range: bool,
    symmetric: bool,
) -> QuantResult<i64> {
    resolve_range(storage, reduce_range, symmetric).map(|range| range.width())
}

// =============================================================================
// Tests
// =============================================================================
