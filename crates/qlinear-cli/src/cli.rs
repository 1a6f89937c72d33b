//! CLI - Command Line Interface Definitions
//!
//! Defines the CLI structure using clap derive macros.
//!
//! @version 0.1.0
//! @author Qlinear Development Team

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use qlinear_quant::{CalibrationMethod, StorageType};

// =============================================================================
// Main CLI Structure
// =============================================================================

/// Qlinear - linear quantization parameters for model weights
#[derive(Parser, Debug)]
#[command(
    name = "qlinear",
    author = "Qlinear Development Team",
    version,
    about = "Compute scales, zero points and quantized values for weight arrays",
    long_about = "Qlinear computes affine quantization parameters (r = scale * (q - zero_point))\n\
                  for 8-bit and 16-bit integer storage and float8 E4M3FN codes."
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Quantize an array of values and print its parameters
    Params(ParamsArgs),

    /// Show the representable range of a storage type
    Range(RangeArgs),

    /// List storage types and their ranges
    List,
}

// =============================================================================
// Params Command
// =============================================================================

/// Source precision of the input values
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    /// 32-bit floats
    #[default]
    F32,
    /// 16-bit floats
    F16,
}

/// Arguments for the `params` command
#[derive(Parser, Debug)]
pub struct ParamsArgs {
    /// Input file with a JSON array or whitespace-separated numbers ("-" for stdin)
    pub input: String,

    /// Storage type (QInt8, QUInt8, QInt16, QUInt16, QFLOAT8E4M3FN)
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub storage_type: Option<StorageType>,

    /// Symmetric quantization
    #[arg(short, long, overrides_with = "no_symmetric")]
    pub symmetric: bool,

    /// Asymmetric quantization, even if the config file says otherwise
    #[arg(long, overrides_with = "symmetric")]
    pub no_symmetric: bool,

    /// Use the reduced integer range
    #[arg(short, long, overrides_with = "no_reduce_range")]
    pub reduce_range: bool,

    /// Use the full integer range, even if the config file says otherwise
    #[arg(long, overrides_with = "reduce_range")]
    pub no_reduce_range: bool,

    /// Minimum width of the real range
    #[arg(long, value_name = "X")]
    pub min_real_range: Option<f64>,

    /// Real minimum to use instead of the data minimum
    #[arg(long, value_name = "X", allow_negative_numbers = true)]
    pub rmin: Option<f64>,

    /// Real maximum to use instead of the data maximum
    #[arg(long, value_name = "X", allow_negative_numbers = true)]
    pub rmax: Option<f64>,

    /// Calibrate the real range (minmax, percentile:99.9, meanstd:3)
    #[arg(long, value_name = "METHOD")]
    pub calibration: Option<CalibrationMethod>,

    /// Shape of the input, comma separated (required with --axis)
    #[arg(long, value_delimiter = ',', value_name = "DIMS")]
    pub shape: Option<Vec<usize>>,

    /// Quantize each slice along this axis independently
    #[arg(long, allow_negative_numbers = true, requires = "shape")]
    pub axis: Option<i64>,

    /// Precision of the input values
    #[arg(long, value_enum, default_value_t = Precision::F32)]
    pub precision: Precision,

    /// Configuration file (defaults to ./qlinear.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the JSON report to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

// =============================================================================
// Range Command
// =============================================================================

/// Arguments for the `range` command
#[derive(Parser, Debug)]
pub struct RangeArgs {
    /// Storage type
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub storage_type: StorageType,

    /// Use the reduced integer range
    #[arg(short, long)]
    pub reduce_range: bool,

    /// Use the symmetric range when the type has one
    #[arg(short, long)]
    pub symmetric: bool,

    /// Print the range as JSON
    #[arg(long)]
    pub json: bool,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_params() {
        let cli = Cli::parse_from([
            "qlinear", "params", "w.json", "-t", "int8", "--symmetric", "--rmin", "-2.5",
            "--shape", "2,3", "--axis", "-1", "--precision", "f16",
        ]);
        let Commands::Params(args) = cli.command else {
            panic!("expected params command");
        };
        assert_eq!(args.storage_type, Some(StorageType::QInt8));
        assert!(args.symmetric);
        assert_eq!(args.rmin, Some(-2.5));
        assert_eq!(args.shape, Some(vec![2, 3]));
        assert_eq!(args.axis, Some(-1));
        assert_eq!(args.precision, Precision::F16);
    }

    #[test]
    fn test_parse_range() {
        let cli = Cli::parse_from(["qlinear", "range", "--type", "QUInt16", "--reduce-range"]);
        let Commands::Range(args) = cli.command else {
            panic!("expected range command");
        };
        assert_eq!(args.storage_type, StorageType::QUInt16);
        assert!(args.reduce_range);
    }

    #[test]
    fn test_last_mode_flag_wins() {
        let cli = Cli::parse_from(["qlinear", "params", "w.json", "-s", "--no-symmetric"]);
        let Commands::Params(args) = cli.command else {
            panic!("expected params command");
        };
        assert!(!args.symmetric);
        assert!(args.no_symmetric);
    }

    #[test]
    fn test_axis_requires_shape() {
        assert!(Cli::try_parse_from(["qlinear", "params", "w.json", "--axis", "0"]).is_err());
    }
}
