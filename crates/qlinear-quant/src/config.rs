//! Quantization Configuration
//!
//! Serializable settings for one `quantize_data` call.
//!
//! @version 0.1.0
//! @author Qlinear Development Team

use serde::{Deserialize, Serialize};

use crate::error::{QuantError, QuantResult};
use crate::types::StorageType;

// =============================================================================
// Quantization Configuration
// =============================================================================

/// Settings for quantizing one array.
///
/// Real-valued options are stored as `f64` and narrowed to the source
/// precision when the array is quantized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantConfig {
    /// Target storage type.
    pub storage_type: StorageType,

    /// Symmetrize the real range and center the zero point.
    pub symmetric: bool,

    /// Use the reduced integer range.
    pub reduce_range: bool,

    /// Minimum width `rmax - rmin` of the real range.
    pub min_real_range: Option<f64>,

    /// Real minimum to use instead of `min(data)`.
    pub rmin_override: Option<f64>,

    /// Real maximum to use instead of `max(data)`.
    pub rmax_override: Option<f64>,
}

impl Default for QuantConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::QUInt8,
            symmetric: false,
            reduce_range: false,
            min_real_range: None,
            rmin_override: None,
            rmax_override: None,
        }
    }
}

impl QuantConfig {
    /// Creates an asymmetric, full-range configuration for `storage_type`.
    pub fn new(storage_type: StorageType) -> Self {
        Self {
            storage_type,
            ..Self::default()
        }
    }

    /// Sets symmetric quantization.
    pub fn with_symmetric(mut self, symmetric: bool) -> Self {
        self.symmetric = symmetric;
        self
    }

    /// Sets reduced-range quantization.
    pub fn with_reduce_range(mut self, reduce_range: bool) -> Self {
        self.reduce_range = reduce_range;
        self
    }

    /// Sets the minimum real range.
    pub fn with_min_real_range(mut self, min_real_range: f64) -> Self {
        self.min_real_range = Some(min_real_range);
        self
    }

    /// Overrides the real minimum.
    pub fn with_rmin(mut self, rmin: f64) -> Self {
        self.rmin_override = Some(rmin);
        self
    }

    /// Overrides the real maximum.
    pub fn with_rmax(mut self, rmax: f64) -> Self {
        self.rmax_override = Some(rmax);
        self
    }

    /// Checks option combinations that are never valid.
    pub fn validate(&self) -> QuantResult<()> {
        if self.storage_type.is_float8() && self.reduce_range {
            return Err(QuantError::UnsupportedOperation(format!(
                "reduce_range=true is not supported for {}",
                self.storage_type
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
