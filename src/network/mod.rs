pub mod capture;
pub mod packet;

pub use capture::{FrameQueue, FrameSource, PcapFileSource};
