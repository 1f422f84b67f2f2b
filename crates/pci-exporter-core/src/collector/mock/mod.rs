//! Mock filesystem for testing collectors without real sysfs.

mod filesystem;
mod scenarios;

pub use filesystem::MockFs;
