//! List - Storage Type Listing
//!
//! Lists the supported storage types with their representable ranges.
//!
//! @version 0.1.0
//! @author Qlinear Development Team

use colored::Colorize;
use qlinear_quant::{resolve_range, StorageType};

use super::utils::print_header;
use crate::error::CliResult;

fn describe(storage: StorageType, reduce_range: bool, symmetric: bool) -> String {
    match resolve_range(storage, reduce_range, symmetric) {
        Ok(range) => format!("[{}, {}]", range.qmin(), range.qmax()),
        Err(_) => "-".to_string(),
    }
}

fn description(storage: StorageType) -> &'static str {
    match storage {
        StorageType::QInt8 => "8-bit signed integer",
        StorageType::QUInt8 => "8-bit unsigned integer",
        StorageType::QFloat8E4M3Fn => "8-bit float, scale from data spread",
        StorageType::QInt16 => "16-bit signed integer",
        StorageType::QUInt16 => "16-bit unsigned integer",
    }
}

/// Execute the `list` command
pub fn execute(quiet: bool) -> CliResult<()> {
    if quiet {
        return Ok(());
    }

    print_header("Storage Types");
    println!(
        "{:<15} {:>4}  {:<18} {:<18} {:<18} Description",
        "Type", "Bits", "Full", "Symmetric", "Reduced"
    );
    println!("{}", "-".repeat(110));

    for storage in StorageType::ALL {
        println!(
            "{:<15} {:>4}  {:<18} {:<18} {:<18} {}",
            storage.name().cyan(),
            storage.bits(),
            describe(storage, false, false),
            describe(storage, false, true),
            describe(storage, true, false),
            description(storage)
        );
    }

    print_header("Calibration Methods");
    println!("  - minmax            data minimum and maximum");
    println!("  - percentile:P      P-th and (100-P)-th percentiles");
    println!("  - meanstd:K         mean +/- K standard deviations");

    print_header("Example Usage");
    println!("  # Symmetric int8 parameters for a weight file");
    println!("  qlinear params weights.json -t QInt8 --symmetric");
    println!();
    println!("  # Per-channel parameters along the first axis");
    println!("  qlinear params weights.json -t QInt8 --shape 64,128 --axis 0 --json");

    Ok(())
}
