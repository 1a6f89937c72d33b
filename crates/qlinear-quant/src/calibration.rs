//! Calibration for Quantization
//!
//! Calibration methods for choosing the real range `[rmin, rmax]` handed to
//! the batch driver, and histogram smoothing for divergence-based
//! calibration.
//!
//! @version 0.1.0
//! @author Qlinear Development Team

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::QuantConfig;
use crate::error::{QuantError, QuantResult};
use crate::types::RealValue;

/// Number of histogram bins used by [`calibrate`].
pub const DEFAULT_NUM_BINS: usize = 2048;

// =============================================================================
// Calibration Data
// =============================================================================

/// Statistics collected from sample values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationData {
    /// Lower end of the calibrated range.
    pub min: f32,
    /// Upper end of the calibrated range.
    pub max: f32,
    /// Mean value.
    pub mean: f32,
    /// Population standard deviation.
    pub std_dev: f32,
    /// Number of samples.
    pub num_samples: usize,
    histogram: Vec<usize>,
    bin_edges: Vec<f32>,
}

impl CalibrationData {
    /// Collects statistics and a `num_bins` histogram from `data`.
    ///
    /// # Errors
    /// `CalibrationError` if `data` is empty or `num_bins` is 0.
    pub fn new<T: RealValue>(data: &[T], num_bins: usize) -> QuantResult<Self> {
        if data.is_empty() {
            return Err(QuantError::CalibrationError("no samples provided".to_string()));
        }
        if num_bins == 0 {
            return Err(QuantError::CalibrationError(
                "histogram needs at least one bin".to_string(),
            ));
        }

        let values: Vec<f32> = data.iter().map(|x| x.to_f32()).collect();
        let min = values.iter().fold(f32::INFINITY, |a, &b| a.min(b));
        let max = values.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));

        let n = values.len() as f64;
        let mean = values.iter().map(|&x| f64::from(x)).sum::<f64>() / n;
        let variance = values
            .iter()
            .map(|&x| (f64::from(x) - mean).powi(2))
            .sum::<f64>()
            / n;

        let bin_width = (max - min) / num_bins as f32;
        let bin_edges: Vec<f32> = (0..=num_bins)
            .map(|i| min + i as f32 * bin_width)
            .collect();
        let mut histogram = vec![0usize; num_bins];
        for &val in &values {
            let bin = if bin_width > 0.0 {
                ((val - min) / bin_width) as usize
            } else {
                0
            };
            histogram[bin.min(num_bins - 1)] += 1;
        }

        Ok(Self {
            min,
            max,
            mean: mean as f32,
            std_dev: variance.sqrt() as f32,
            num_samples: values.len(),
            histogram,
            bin_edges,
        })
    }

    /// Returns the dynamic range.
    pub fn dynamic_range(&self) -> f32 {
        self.max - self.min
    }

    /// Returns the calibrated `(rmin, rmax)` pair.
    pub fn range(&self) -> (f32, f32) {
        (self.min, self.max)
    }

    /// Returns the histogram counts.
    pub fn histogram(&self) -> &[usize] {
        &self.histogram
    }

    /// Returns the value at percentile `p` (0 to 100) from the histogram.
    pub fn percentile(&self, p: f32) -> f32 {
        if p <= 0.0 {
            return self.bin_edges[0];
        }
        if p >= 100.0 {
            return self.bin_edges[self.bin_edges.len() - 1];
        }

        let target = (p / 100.0 * self.num_samples as f32) as usize;
        let mut cumsum = 0usize;
        for (i, &count) in self.histogram.iter().enumerate() {
            cumsum += count;
            if cumsum >= target {
                return self.bin_edges[i];
            }
        }

        self.bin_edges[self.bin_edges.len() - 1]
    }

    /// Copies the calibrated range into the overrides of `config`.
    pub fn apply(&self, config: QuantConfig) -> QuantConfig {
        config
            .with_rmin(f64::from(self.min))
            .with_rmax(f64::from(self.max))
    }
}

// =============================================================================
// Calibration Methods
// =============================================================================

/// Calibration method enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationMethod {
    /// Use min/max values directly.
    MinMax,
    /// Use percentiles to reduce outlier impact.
    Percentile(u32), // percentile * 10 (e.g., 999 = 99.9%)
    /// Use mean +/- k * std_dev for the range.
    MeanStd(u32), // k * 10 (e.g., 30 = 3.0 sigma)
}

impl fmt::Display for CalibrationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationMethod::MinMax => f.write_str("minmax"),
            CalibrationMethod::Percentile(p) => write!(f, "percentile:{}", *p as f32 / 10.0),
            CalibrationMethod::MeanStd(k) => write!(f, "meanstd:{}", *k as f32 / 10.0),
        }
    }
}

impl FromStr for CalibrationMethod {
    type Err = QuantError;

    /// Parses `minmax`, `percentile:99.9` or `meanstd:3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || QuantError::CalibrationError(format!("unknown calibration method: {s}"));
        let lower = s.to_lowercase();
        let (name, arg) = match lower.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (lower.as_str(), None),
        };
        let tenths = |arg: Option<&str>| -> QuantResult<u32> {
            let value: f32 = arg.ok_or_else(invalid)?.trim().parse().map_err(|_| invalid())?;
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid());
            }
            Ok((value * 10.0).round() as u32)
        };

        match name {
            "minmax" if arg.is_none() => Ok(CalibrationMethod::MinMax),
            "percentile" => Ok(CalibrationMethod::Percentile(tenths(arg)?)),
            "meanstd" => Ok(CalibrationMethod::MeanStd(tenths(arg)?)),
            _ => Err(invalid()),
        }
    }
}

/// Calibrates `data` with the given method.
///
/// # Returns
/// Calibration data whose `min` and `max` hold the calibrated range.
pub fn calibrate<T: RealValue>(
    data: &[T],
    method: CalibrationMethod,
) -> QuantResult<CalibrationData> {
    let mut calib = CalibrationData::new(data, DEFAULT_NUM_BINS)?;
    apply_method(&mut calib, method)?;
    tracing::debug!(
        method = %method,
        rmin = calib.min,
        rmax = calib.max,
        "calibrated range"
    );
    Ok(calib)
}

/// Calibrates several sample batches as one population.
pub fn calibrate_batch<T: RealValue>(
    batches: &[&[T]],
    method: CalibrationMethod,
) -> QuantResult<CalibrationData> {
    if batches.is_empty() {
        return Err(QuantError::CalibrationError("No batches provided".to_string()));
    }
    let combined: Vec<T> = batches.iter().flat_map(|batch| batch.iter().copied()).collect();
    calibrate(&combined, method)
}

fn apply_method(calib: &mut CalibrationData, method: CalibrationMethod) -> QuantResult<()> {
    match method {
        CalibrationMethod::MinMax => {}
        CalibrationMethod::Percentile(p) => {
            let percentile = p as f32 / 10.0;
            if !(50.0..=100.0).contains(&percentile) {
                return Err(QuantError::CalibrationError(format!(
                    "percentile must lie in [50, 100], got {percentile}"
                )));
            }
            let lower = calib.percentile(100.0 - percentile);
            let upper = calib.percentile(percentile);
            calib.min = lower;
            calib.max = upper;
        }
        CalibrationMethod::MeanStd(k) => {
            let k_factor = k as f32 / 10.0;
            calib.min = calib.mean - k_factor * calib.std_dev;
            calib.max = calib.mean + k_factor * calib.std_dev;
        }
    }
    Ok(())
}

// =============================================================================
// Histogram Smoothing
// =============================================================================

/// Replaces empty bins of a discrete distribution by `eps` and takes the same
/// total mass off the non-empty bins.
///
/// The input need not be normalized. Returns `None` when every bin is zero.
///
/// # Errors
/// `CalibrationError` if the correction would make a bin non-positive.
pub fn smooth_distribution(p: &[f32], eps: f32) -> QuantResult<Option<Vec<f32>>> {
    let n_zeros = p.iter().filter(|&&v| v == 0.0).count();
    let n_nonzeros = p.len() - n_zeros;
    if n_nonzeros == 0 {
        return Ok(None);
    }

    let eps1 = eps * n_zeros as f32 / n_nonzeros as f32;
    if eps1 >= 1.0 {
        return Err(QuantError::CalibrationError(format!(
            "smoothing too strong: n_zeros={n_zeros}, n_nonzeros={n_nonzeros}, eps1={eps1}"
        )));
    }

    let hist: Vec<f32> = p
        .iter()
        .map(|&v| if v == 0.0 { eps } else { v - eps1 })
        .collect();
    if let Some(bad) = hist.iter().position(|&v| v <= 0.0) {
        return Err(QuantError::CalibrationError(format!(
            "bin {bad} is not positive after smoothing"
        )));
    }

    Ok(Some(hist))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StorageType;

    #[test]
    fn test_calibration_data() {
        let calib = CalibrationData::new(&[1.0f32, 2.0, 3.0, 4.0, 5.0], 10).unwrap();

        assert_eq!(calib.min, 1.0);
        assert_eq!(calib.max, 5.0);
        assert_eq!(calib.mean, 3.0);
        assert!((calib.std_dev - 2.0f32.sqrt()).abs() < 1e-6);
        assert_eq!(calib.num_samples, 5);
        assert_eq!(calib.histogram().iter().sum::<usize>(), 5);
    }

    #[test]
    fn test_calibration_data_errors() {
        assert!(CalibrationData::new::<f32>(&[], 10).is_err());
        assert!(CalibrationData::new(&[1.0f32], 0).is_err());
    }

    #[test]
    fn test_constant_data() {
        let calib = CalibrationData::new(&[2.0f32; 8], 4).unwrap();
        assert_eq!(calib.histogram()[0], 8);
        assert_eq!(calib.dynamic_range(), 0.0);
    }

    #[test]
    fn test_calibration_methods() {
        let data: Vec<f32> = (0..1000).map(|x| x as f32 / 100.0).collect();

        let minmax = calibrate(&data, CalibrationMethod::MinMax).unwrap();
        assert!((minmax.min - 0.0).abs() < 0.01);
        assert!((minmax.max - 9.99).abs() < 0.01);

        let percentile = calibrate(&data, CalibrationMethod::Percentile(999)).unwrap();
        assert!(percentile.min >= 0.0);
        assert!(percentile.max <= 9.99);
        assert!(percentile.max > 9.9);

        let meanstd = calibrate(&data, CalibrationMethod::MeanStd(10)).unwrap();
        assert!((meanstd.min - (4.995 - 2.8868)).abs() < 0.01);
        assert!((meanstd.max - (4.995 + 2.8868)).abs() < 0.01);
    }

    #[test]
    fn test_percentile_out_of_range() {
        assert!(matches!(
            calibrate(&[1.0f32, 2.0], CalibrationMethod::Percentile(300)),
            Err(QuantError::CalibrationError(_))
        ));
    }

    #[test]
    fn test_calibrate_batch() {
        let a = [0.0f32, 1.0];
        let b = [-4.0f32, 2.0];
        let calib = calibrate_batch(&[&a[..], &b[..]], CalibrationMethod::MinMax).unwrap();
        assert_eq!(calib.range(), (-4.0, 2.0));
        assert_eq!(calib.num_samples, 4);
        assert!(calibrate_batch::<f32>(&[], CalibrationMethod::MinMax).is_err());
    }

    #[test]
    fn test_apply_to_config() {
        let calib = calibrate(&[-1.0f32, 3.0], CalibrationMethod::MinMax).unwrap();
        let config = calib.apply(QuantConfig::new(StorageType::QUInt8));
        assert_eq!(config.rmin_override, Some(-1.0));
        assert_eq!(config.rmax_override, Some(3.0));
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("minmax".parse::<CalibrationMethod>().unwrap(), CalibrationMethod::MinMax);
        assert_eq!(
            "percentile:99.9".parse::<CalibrationMethod>().unwrap(),
            CalibrationMethod::Percentile(999)
        );
        assert_eq!(
            "MeanStd:3".parse::<CalibrationMethod>().unwrap(),
            CalibrationMethod::MeanStd(30)
        );
        assert!("percentile".parse::<CalibrationMethod>().is_err());
        assert!("entropy".parse::<CalibrationMethod>().is_err());
        assert_eq!(CalibrationMethod::Percentile(999).to_string(), "percentile:99.9");
    }

    #[test]
    fn test_smooth_distribution() {
        let hist = smooth_distribution(&[0.0, 2.0, 0.0, 4.0], 0.1).unwrap().unwrap();
        assert_eq!(hist[0], 0.1);
        assert_eq!(hist[2], 0.1);
        assert!((hist[1] - 1.9).abs() < 1e-6);
        assert!((hist[3] - 3.9).abs() < 1e-6);
        // Total mass is preserved.
        assert!((hist.iter().sum::<f32>() - 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_smooth_distribution_all_zero() {
        assert_eq!(smooth_distribution(&[0.0, 0.0], 0.0001).unwrap(), None);
    }

    #[test]
    fn test_smooth_distribution_non_positive_bin() {
        assert!(matches!(
            smooth_distribution(&[0.0, 0.0, 0.0, 0.05], 0.02),
            Err(QuantError::CalibrationError(_))
        ));
    }
}
