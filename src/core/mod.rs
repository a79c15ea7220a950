pub mod config;
pub mod session;

pub use config::Configuration;
pub use session::{DecoderSession, NonIpv4Policy, RunSummary};
