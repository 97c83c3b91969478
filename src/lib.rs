pub mod config;
pub mod error;
pub mod replayer;

pub mod mqtt;
pub mod source;

pub use config::Config;
pub use error::{Error, Result};
pub use replayer::{ReplaySummary, Replayer};
