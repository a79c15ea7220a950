pub mod packet;

pub use packet::{InetAddr, StoredEthernet, StoredIPv4, StoredPacket};
