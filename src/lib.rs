pub mod cli;
pub mod core;
pub mod error;
pub mod network;
pub mod setup_logger;
pub mod storage;

pub use crate::core::session::{DecoderSession, NonIpv4Policy, RunSummary};
pub use crate::error::{AppError, AppResult, DecodeError};
pub use crate::network::packet::{decode_frame, DecodedPacket, RawFrame, TransportHeader};
