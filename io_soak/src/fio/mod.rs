//! Run fio against pods in bounded segments.
//!
//! See <https://fio.readthedocs.io/en/latest/fio_doc.html#i-o-rate>
//! for the meaning of the duty cycle (`thinktime`) parameters.

mod artifact;
mod duty_cycle;
mod runner;
mod segment;
mod workload;

pub use self::{
    artifact::ArtifactSink,
    duty_cycle::{DEFAULT_DUTY_CYCLES, DutyCycle, load_duty_cycles, parse_duty_cycle},
    runner::{
        DEFAULT_FIO_BLOCK_FILENAME, DEFAULT_FIO_FS_FILENAME, FioFiles, Outcome, RunRequest,
        SegmentedRunner, wait_outcome,
    },
    segment::{DEFAULT_SEGMENT_LENGTH, SegmentPlan},
    workload::{BoxWorkload, DynWorkload, FioJob, FioOutput, KubectlFio, Workload},
};
