//! Latency extraction from raw ping output.

use super::traits::{Latency, ProbeOutcome};

const EXACT_MARKER: &str = "time=";
const BOUND_MARKER: &str = "time<";
const UNIT: &str = "ms";

/// Classify raw probe output.
///
/// A failed probe never carries a latency, whatever its output says. A
/// successful probe without a recognizable marker is still a success, with
/// an unknown latency.
pub fn parse(raw_output: &str, succeeded: bool) -> ProbeOutcome {
    let latency = if succeeded {
        find_latency(raw_output)
    } else {
        None
    };

    ProbeOutcome {
        success: succeeded,
        latency,
        raw_output: raw_output.to_owned(),
    }
}

/// First line carrying a latency marker wins.
fn find_latency(output: &str) -> Option<Latency> {
    output.lines().find_map(|line| {
        if let Some(value) = marker_value(line, EXACT_MARKER) {
            Some(Latency::Exact(value))
        } else {
            marker_value(line, BOUND_MARKER).map(Latency::UpperBound)
        }
    })
}

/// Text between `marker` and the following `ms`, trimmed. Without a unit
/// the rest of the line is taken.
fn marker_value(line: &str, marker: &str) -> Option<String> {
    let (_, rest) = line.split_once(marker)?;
    let value = rest.split_once(UNIT).map_or(rest, |(value, _)| value).trim();
    (!value.is_empty()).then(|| value.to_owned())
}
