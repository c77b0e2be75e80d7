//! JSON output formatting

use serde::Serialize;
use wavetracker_core::store::TraceSummary;

#[derive(Serialize)]
struct TraceListing<'a> {
    num_traces: usize,
    unassigned: usize,
    traces: &'a [TraceSummary],
}

/// Print any serialisable value as pretty JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing result: {}", e),
    }
}

/// Print the trace listing together with the number of unassigned detections
pub fn print_trace_listing(traces: &[TraceSummary], unassigned: usize) {
    print_json(&TraceListing {
        num_traces: traces.len(),
        unassigned,
        traces,
    });
}
