//! Range - Representable Range Command
//!
//! Prints the `[qmin, qmax]` interval of an integer storage type.
//!
//! @version 0.1.0
//! @author Qlinear Development Team

use qlinear_quant::resolve_range;
use serde_json::json;

use super::utils::{print_header, print_kv};
use crate::cli::RangeArgs;
use crate::error::CliResult;

/// Execute the `range` command
pub fn execute(args: RangeArgs, quiet: bool) -> CliResult<()> {
    let range = resolve_range(args.storage_type, args.reduce_range, args.symmetric)?;
    tracing::debug!(
        storage_type = %args.storage_type,
        qmin = range.qmin(),
        qmax = range.qmax(),
        "resolved range"
    );

    if args.json {
        let value = json!({
            "storage_type": args.storage_type,
            "reduce_range": args.reduce_range,
            "symmetric": args.symmetric,
            "qmin": range.qmin(),
            "qmax": range.qmax(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    if !quiet {
        print_header("Representable Range");
        print_kv("Type", args.storage_type.name());
        print_kv("qmin", &range.qmin().to_string());
        print_kv("qmax", &range.qmax().to_string());
        print_kv("Width", &range.width().to_string());
    }

    Ok(())
}
