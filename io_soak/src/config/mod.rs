mod duration;
mod fio;

pub use self::{duration::parse_humantime_str, fio::FioConfig};
