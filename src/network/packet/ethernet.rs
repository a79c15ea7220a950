use crate::error::{DecodeError, Layer};
use crate::network::packet::field::be_u16;
use serde::{Serialize, Serializer};
use std::fmt;

pub const ETHERNET_HEADER_LEN: usize = 14;

/// MACアドレス。`AA:BB:CC:DD:EE:FF` 形式 (大文字) で表示する
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress(pub [u8; 6]);

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let octets: Vec<String> = self.0.iter().map(|b| format!("{:02X}", b)).collect();
        f.write_str(&octets.join(":"))
    }
}

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EthernetHeader {
    pub dst_mac: MacAddress,
    pub src_mac: MacAddress,
    pub ether_type: u16,
}

impl EthernetHeader {
    pub fn new(dst_mac: [u8; 6], src_mac: [u8; 6], ether_type: u16) -> Self {
        Self {
            dst_mac: MacAddress(dst_mac),
            src_mac: MacAddress(src_mac),
            ether_type,
        }
    }

    /// オフセット0からEthernetヘッダーを読み、残りのバイト列を返す
    pub fn parse(data: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        if data.len() < ETHERNET_HEADER_LEN {
            return Err(DecodeError::TruncatedFrame {
                layer: Layer::Ethernet,
                needed: ETHERNET_HEADER_LEN,
                available: data.len(),
            });
        }

        let mut destination = [0u8; 6];
        let mut source = [0u8; 6];

        destination.copy_from_slice(&data[0..6]);
        source.copy_from_slice(&data[6..12]);
        let ether_type = be_u16([data[12], data[13]]);

        Ok((
            Self::new(destination, source, ether_type),
            &data[ETHERNET_HEADER_LEN..],
        ))
    }
}
