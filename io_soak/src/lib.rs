//! Segmented fio soak driver.
//!
//! The [`fio::SegmentedRunner`] drives a single pod through a sequence of
//! bounded fio runs that together cover a requested duration, and signals
//! exactly one outcome per invocation. The [`cli`] module wires one runner per
//! pod into a soak test.

pub mod cli;
pub mod config;
pub mod fio;
pub mod utils;
