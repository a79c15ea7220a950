use crate::error::{DecodeError, Layer};
use crate::network::packet::field::be_u16;
use serde::Serialize;

pub const UDP_HEADER_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UDPHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub length: u16,
    pub checksum: u16,
}

impl UDPHeader {
    pub fn parse(data: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        if data.len() < UDP_HEADER_LEN {
            return Err(DecodeError::TruncatedFrame {
                layer: Layer::Udp,
                needed: UDP_HEADER_LEN,
                available: data.len(),
            });
        }

        let src_port = be_u16([data[0], data[1]]);
        let dst_port = be_u16([data[2], data[3]]);
        let length = be_u16([data[4], data[5]]);
        let checksum = be_u16([data[6], data[7]]);

        Ok((
            Self {
                src_port,
                dst_port,
                length,
                checksum,
            },
            &data[UDP_HEADER_LEN..],
        ))
    }
}
