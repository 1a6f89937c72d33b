//! Params - Quantization Parameter Command
//!
//! Reads an array of values, computes its scale and zero point for the
//! requested storage type and prints the quantized values.
//!
//! @version 0.1.0
//! @author Qlinear Development Team

use half::f16;
use qlinear_quant::{
    calibrate, quantize_data_per_axis, quantize_data_with_config, QuantConfig, RealValue,
    StorageType, ZeroPoint,
};
use serde::Serialize;

use super::utils::{
    format_values, parse_values, print_header, print_kv, print_success, print_warning, read_input,
    write_json,
};
use crate::cli::{ParamsArgs, Precision};
use crate::config::FileConfig;
use crate::error::{CliError, CliResult};

/// Number of quantized values shown in the text report.
const DISPLAY_LIMIT: usize = 32;

// =============================================================================
// Report
// =============================================================================

/// Parameters of one quantized array or channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelReport {
    /// Real minimum used
    pub rmin: f64,
    /// Real maximum used
    pub rmax: f64,
    /// Zero point
    pub zero_point: i64,
    /// Scale
    pub scale: f64,
}

/// Result of the `params` command
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamsReport {
    /// Storage type
    pub storage_type: StorageType,
    /// Source precision
    pub precision: &'static str,
    /// Symmetric quantization
    pub symmetric: bool,
    /// Reduced range
    pub reduce_range: bool,
    /// Input shape, when given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<Vec<usize>>,
    /// Normalized channel axis for per-axis quantization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axis: Option<usize>,
    /// One entry per channel, or a single entry
    pub channels: Vec<ChannelReport>,
    /// Quantized values (raw bits for float8 codes)
    pub quantized: Vec<i64>,
}

fn channel<T: RealValue>(rmin: T, rmax: T, zero_point: ZeroPoint, scale: T) -> ChannelReport {
    ChannelReport {
        rmin: rmin.to_f64(),
        rmax: rmax.to_f64(),
        zero_point: i64::from(zero_point.as_i32().unwrap_or_default()),
        scale: scale.to_f64(),
    }
}

// =============================================================================
// Execute Command
// =============================================================================

/// Execute the `params` command
pub fn execute(args: ParamsArgs, quiet: bool) -> CliResult<()> {
    let (file_config, config_path) = FileConfig::resolve(args.config.as_deref())?;
    if let Some(path) = &config_path {
        tracing::info!(path = %path.display(), "loaded configuration");
    }

    let content = read_input(&args.input)?;
    let values = parse_values(&content)?;
    tracing::debug!(count = values.len(), "parsed input values");

    let report = match args.precision {
        Precision::F32 => build_report::<f32>(&values, &args, file_config.quantization, quiet)?,
        Precision::F16 => build_report::<f16>(&values, &args, file_config.quantization, quiet)?,
    };

    if let Some(path) = &args.output {
        write_json(&report, path)?;
        if !quiet && !args.json {
            print_success(&format!("Report written to {}", path.display()));
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !quiet {
        print_report(&report);
    }

    Ok(())
}

/// Applies command-line flags on top of the file configuration
fn apply_flags(mut config: QuantConfig, args: &ParamsArgs) -> QuantConfig {
    if let Some(storage_type) = args.storage_type {
        config.storage_type = storage_type;
    }
    if args.symmetric || args.no_symmetric {
        config.symmetric = args.symmetric;
    }
    if args.reduce_range || args.no_reduce_range {
        config.reduce_range = args.reduce_range;
    }
    if args.min_real_range.is_some() {
        config.min_real_range = args.min_real_range;
    }
    if args.rmin.is_some() {
        config.rmin_override = args.rmin;
    }
    if args.rmax.is_some() {
        config.rmax_override = args.rmax;
    }
    config
}

fn build_report<T: RealValue>(
    values: &[f64],
    args: &ParamsArgs,
    base: QuantConfig,
    quiet: bool,
) -> CliResult<ParamsReport> {
    let data: Vec<T> = values.iter().map(|&v| T::from_f64(v)).collect();

    let mut config = apply_flags(base, args);
    if let Some(method) = args.calibration {
        // Explicit --rmin/--rmax still win over the calibrated range.
        config = apply_flags(calibrate(&data, method)?.apply(config), args);
    }
    config.validate()?;

    if config.storage_type.is_float8()
        && (config.symmetric || config.min_real_range.is_some())
        && !quiet
    {
        print_warning(
            "float8 scale follows the data spread; symmetric and min-real-range are ignored",
        );
    }

    let mut report = ParamsReport {
        storage_type: config.storage_type,
        precision: T::NAME,
        symmetric: config.symmetric,
        reduce_range: config.reduce_range,
        shape: args.shape.clone(),
        axis: None,
        channels: Vec::new(),
        quantized: Vec::new(),
    };

    match (&args.shape, args.axis) {
        (Some(shape), Some(axis)) => {
            let initializer = quantize_data_per_axis(&data, shape, axis, &config)?;
            report.axis = Some(initializer.axis);
            report.channels = (0..initializer.num_channels())
                .map(|c| {
                    channel(
                        initializer.rmins[c],
                        initializer.rmaxs[c],
                        initializer.zero_points[c],
                        initializer.scales[c],
                    )
                })
                .collect();
            report.quantized = initializer.quantized.codes();
        }
        (shape, _) => {
            if let Some(shape) = shape {
                let numel: usize = shape.iter().product();
                if numel != data.len() {
                    return Err(CliError::InvalidArgument(format!(
                        "shape {shape:?} holds {numel} values but the input has {}",
                        data.len()
                    )));
                }
            }
            let weight = quantize_data_with_config(&data, &config)?;
            report.channels =
                vec![channel(weight.rmin, weight.rmax, weight.zero_point, weight.scale)];
            report.quantized = weight.quantized.codes();
        }
    }

    tracing::info!(
        storage_type = %report.storage_type,
        values = report.quantized.len(),
        channels = report.channels.len(),
        "quantized input"
    );

    Ok(report)
}

fn print_report(report: &ParamsReport) {
    print_header("Quantization Parameters");
    print_kv("Storage type", report.storage_type.name());
    print_kv("Precision", report.precision);
    print_kv("Symmetric", &report.symmetric.to_string());
    print_kv("Reduce range", &report.reduce_range.to_string());
    print_kv("Values", &report.quantized.len().to_string());

    match report.axis {
        Some(axis) => {
            print_kv("Axis", &axis.to_string());
            println!();
            println!(
                "  {:<8} {:>14} {:>14} {:>10} {:>14}",
                "Channel", "rmin", "rmax", "Zero pt", "Scale"
            );
            println!("  {}", "-".repeat(64));
            for (i, ch) in report.channels.iter().enumerate() {
                println!(
                    "  {:<8} {:>14.6} {:>14.6} {:>10} {:>14.8}",
                    i, ch.rmin, ch.rmax, ch.zero_point, ch.scale
                );
            }
            println!();
        }
        None => {
            if let Some(ch) = report.channels.first() {
                print_kv("rmin", &ch.rmin.to_string());
                print_kv("rmax", &ch.rmax.to_string());
                print_kv("Zero point", &ch.zero_point.to_string());
                print_kv("Scale", &ch.scale.to_string());
            }
        }
    }

    print_kv("Quantized", &format_values(&report.quantized, DISPLAY_LIMIT));
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn params_args(extra: &[&str]) -> ParamsArgs {
        let mut argv = vec!["qlinear", "params", "input.json"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Params(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_flags_override_file() {
        let base = QuantConfig::new(StorageType::QUInt16).with_rmin(-4.0);
        let config = apply_flags(base, &params_args(&["-t", "int8", "--rmax", "2"]));
        assert_eq!(config.storage_type, StorageType::QInt8);
        assert_eq!(config.rmin_override, Some(-4.0));
        assert_eq!(config.rmax_override, Some(2.0));
    }

    #[test]
    fn test_negated_flags_clear_file_settings() {
        let base = QuantConfig::new(StorageType::QUInt8)
            .with_symmetric(true)
            .with_reduce_range(true);
        let config = apply_flags(base, &params_args(&["--no-symmetric"]));
        assert!(!config.symmetric);
        assert!(config.reduce_range);

        let config = apply_flags(base, &params_args(&["--no-reduce-range"]));
        assert!(config.symmetric);
        assert!(!config.reduce_range);

        let config = apply_flags(base, &params_args(&[]));
        assert!(config.symmetric && config.reduce_range);
    }

    #[test]
    fn test_build_report_symmetric_int8() {
        let args = params_args(&["-t", "QInt8", "--symmetric"]);
        let report = build_report::<f32>(&[-1.0, 0.0, 2.0], &args, QuantConfig::default(), true)
            .unwrap();
        assert_eq!(report.channels.len(), 1);
        assert_eq!(report.channels[0].zero_point, 0);
        assert_eq!(report.quantized, vec![-64, 0, 127]);
        assert_eq!(report.precision, "f32");
    }

    #[test]
    fn test_build_report_per_axis() {
        let args = params_args(&["-t", "int8", "-s", "--shape", "2,2", "--axis", "1"]);
        let report =
            build_report::<f32>(&[1.0, 10.0, -1.0, -10.0], &args, QuantConfig::default(), true)
                .unwrap();
        assert_eq!(report.axis, Some(1));
        assert_eq!(report.channels.len(), 2);
        assert_eq!(report.quantized, vec![127, 127, -127, -127]);
    }

    #[test]
    fn test_build_report_shape_mismatch() {
        let args = params_args(&["--shape", "4"]);
        assert!(matches!(
            build_report::<f32>(&[1.0, 2.0], &args, QuantConfig::default(), true),
            Err(CliError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_build_report_f16() {
        let args = params_args(&["--precision", "f16"]);
        let report =
            build_report::<f16>(&[-1.0, 3.0], &args, QuantConfig::default(), true).unwrap();
        assert_eq!(report.precision, "f16");
        assert_eq!(report.channels[0].zero_point, 64);
    }
}
