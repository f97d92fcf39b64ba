use std::path::PathBuf;

use rama::error::{ErrorContext as _, OpaqueError};
use serde::{Deserialize, Serialize};

/// Pacing of a fio workload.
///
/// fio stalls for `think_time` microseconds
/// after every `think_time_blocks` I/O blocks.
///
/// See <https://fio.readthedocs.io/en/latest/fio_doc.html#i-o-rate>.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DutyCycle {
    /// usecs to stall the job after `think_time_blocks` blocks
    pub think_time: u64,
    /// number of blocks to issue before waiting `think_time` usecs
    pub think_time_blocks: u32,
}

/// Guesstimates which bear no relation to real loads.
pub const DEFAULT_DUTY_CYCLES: &[DutyCycle] = &[
    DutyCycle::new_unchecked(500_000, 1000),
    DutyCycle::new_unchecked(750_000, 1000),
    DutyCycle::new_unchecked(1_000_000, 2000),
    DutyCycle::new_unchecked(1_250_000, 2000),
    DutyCycle::new_unchecked(1_500_000, 3000),
    DutyCycle::new_unchecked(1_750_000, 3000),
    DutyCycle::new_unchecked(2_000_000, 4000),
];

impl DutyCycle {
    pub fn new(think_time: u64, think_time_blocks: u32) -> Result<Self, OpaqueError> {
        if think_time_blocks == 0 {
            return Err(OpaqueError::from_display(
                "duty cycle: thinktime_blocks has to be a positive number",
            ));
        }
        Ok(Self::new_unchecked(think_time, think_time_blocks))
    }

    const fn new_unchecked(think_time: u64, think_time_blocks: u32) -> Self {
        Self {
            think_time,
            think_time_blocks,
        }
    }

    /// The extra fio arguments which encode this duty cycle.
    pub fn fio_args(&self) -> Vec<String> {
        vec![
            format!("--thinktime={}", self.think_time),
            format!("--thinktime_blocks={}", self.think_time_blocks),
        ]
    }
}

/// Parse a duty cycle from its `<thinktime>:<thinktime_blocks>` cli form,
/// e.g. `500000:1000`.
pub fn parse_duty_cycle(input: &str) -> Result<DutyCycle, String> {
    let Some((think_time, think_time_blocks)) = input.trim().split_once(':') else {
        return Err(format!(
            "invalid duty cycle '{input}': expected <thinktime>:<thinktime_blocks>"
        ));
    };
    let think_time = think_time
        .trim()
        .parse()
        .map_err(|err| format!("invalid thinktime '{think_time}': {err}"))?;
    let think_time_blocks = think_time_blocks
        .trim()
        .parse()
        .map_err(|err| format!("invalid thinktime_blocks '{think_time_blocks}': {err}"))?;
    DutyCycle::new(think_time, think_time_blocks).map_err(|err| err.to_string())
}

/// Load a duty cycle table from a JSON file containing a non-empty array of
/// `{"think_time": .., "think_time_blocks": ..}` objects.
pub async fn load_duty_cycles(path: PathBuf) -> Result<Vec<DutyCycle>, OpaqueError> {
    let raw = tokio::fs::read(&path)
        .await
        .context("read duty cycles file")
        .context_debug_field("path", path.clone())?;
    let cycles: Vec<DutyCycle> = serde_json::from_slice(&raw)
        .context("json decode duty cycles file")
        .context_debug_field("path", path)?;

    if cycles.is_empty() {
        return Err(OpaqueError::from_display(
            "empty duty cycles file (contains no entries)",
        ));
    }
    for cycle in &cycles {
        DutyCycle::new(cycle.think_time, cycle.think_time_blocks)?;
    }

    Ok(cycles)
}
