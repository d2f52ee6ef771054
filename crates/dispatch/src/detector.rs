//! Missing-argument detector.
//!
//! Scans a whole batch of parsed calls for placeholder arguments (and
//! arity mismatches) and renders a clarification request instead of
//! executing. All-or-nothing: if anything in the batch is incomplete,
//! nothing runs, because later calls may depend on earlier results.

use crate::parser::{CALLBACK_FUNCTION, ParsedCall};
use marquee_core::function::FunctionRegistry;
use tracing::debug;

/// Scan all calls for missing information.
///
/// Returns `Some(clarification)` naming every incomplete call's missing
/// parameter(s) and the signature needing them, or `None` when the whole
/// batch is complete and execution may proceed.
pub fn detect_missing(calls: &[ParsedCall], registry: &FunctionRegistry) -> Option<String> {
    let mut clarification = String::new();

    for call in calls {
        if call.name == CALLBACK_FUNCTION {
            continue;
        }

        let spec = registry.spec(&call.name);

        for (index, arg) in call.args.iter().enumerate() {
            if !arg.is_placeholder() {
                continue;
            }

            debug!(function = %call.name, position = index, "Placeholder argument detected");

            let parameter = spec
                .and_then(|s| s.parameters.get(index))
                .map(|p| format!("`{p}`"))
                .unwrap_or_else(|| format!("argument {}", index + 1));

            let signature = spec
                .map(|s| s.signature())
                .unwrap_or_else(|| call.name.clone());

            clarification.push_str(&format!(
                "Ask the user for {parameter} before calling {signature}; provided so far: {}\n",
                call.display()
            ));
        }

        // A complete-looking call with the wrong argument count is
        // incomplete too, never executed.
        if let Some(spec) = spec {
            if call.is_complete() && call.args.len() != spec.arity() {
                debug!(
                    function = %call.name,
                    expected = spec.arity(),
                    got = call.args.len(),
                    "Arity mismatch"
                );
                clarification.push_str(&format!(
                    "{} takes {} argument(s) but {} were supplied; ask the user for the full details of {}\n",
                    call.name,
                    spec.arity(),
                    call.args.len(),
                    spec.signature()
                ));
            }
        }
    }

    if clarification.is_empty() {
        None
    } else {
        Some(clarification)
    }
}
