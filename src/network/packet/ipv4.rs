use crate::error::{DecodeError, Layer};
use crate::network::packet::field::{
    assemble_be, be_u16, high_nibble, ipv4_flags, ipv4_fragment_offset, low_nibble, WideUint,
};
use pnet::packet::ip::IpNextHeaderProtocols;
use serde::Serialize;
use std::net::Ipv4Addr;

// 0                   1                   2                   3
// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |Version|  IHL  |Type of Service|          Total Length         |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |         Identification        |Flags|      Fragment Offset    |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |  Time to Live |    Protocol   |         Header Checksum       |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                       Source Address                          |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                    Destination Address                        |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                    Options                    |    Padding    |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+

pub const IPV4_MIN_HEADER_LEN: usize = 20;
pub const IPV4_MAX_HEADER_LEN: usize = 60;

/// トランスポート層のプロトコル番号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "u8")]
pub enum IpProtocol {
    Tcp,
    Udp,
    Icmp,
    Other(u8),
}

impl From<u8> for IpProtocol {
    fn from(number: u8) -> Self {
        if number == IpNextHeaderProtocols::Tcp.0 {
            IpProtocol::Tcp
        } else if number == IpNextHeaderProtocols::Udp.0 {
            IpProtocol::Udp
        } else if number == IpNextHeaderProtocols::Icmp.0 {
            IpProtocol::Icmp
        } else {
            IpProtocol::Other(number)
        }
    }
}

impl From<IpProtocol> for u8 {
    fn from(protocol: IpProtocol) -> Self {
        match protocol {
            IpProtocol::Tcp => IpNextHeaderProtocols::Tcp.0,
            IpProtocol::Udp => IpNextHeaderProtocols::Udp.0,
            IpProtocol::Icmp => IpNextHeaderProtocols::Icmp.0,
            IpProtocol::Other(number) => number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IPv4Header {
    pub version: u8,
    /// IHL × 4。常に4の倍数で [20, 60] の範囲
    pub header_length_bytes: u8,
    pub type_of_service: u8,
    pub total_length: u16,
    pub identification: u16,
    pub flags: u8,
    pub fragment_offset: u16,
    pub time_to_live: u8,
    pub protocol: IpProtocol,
    /// 検証しない
    pub checksum: u16,
    pub src_addr: Ipv4Addr,
    pub dst_addr: Ipv4Addr,
    /// ヘッダー長が20バイトを超える場合のみ。中身は解釈しない
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<WideUint>,
}

/// IPv4層のデコード結果
#[derive(Debug)]
pub enum Ipv4Parse<'a> {
    Decoded(IPv4Header, &'a [u8]),
    /// バージョンが4以外 (IPv6など)。このフレームのデコードはここで止まる
    NotIpv4 { version: u8 },
}

impl IPv4Header {
    /// Ethernetヘッダー直後のバイト列からIPv4ヘッダーを読み、ヘッダー長分進めた残りを返す
    pub fn parse(data: &[u8]) -> Result<Ipv4Parse<'_>, DecodeError> {
        let first = match data.first() {
            Some(&byte) => byte,
            None => {
                return Err(DecodeError::TruncatedFrame {
                    layer: Layer::IPv4,
                    needed: IPV4_MIN_HEADER_LEN,
                    available: 0,
                })
            }
        };

        let version = high_nibble(first);
        if version != 4 {
            return Ok(Ipv4Parse::NotIpv4 { version });
        }

        let header_length = low_nibble(first) as usize * 4;
        if header_length < IPV4_MIN_HEADER_LEN {
            return Err(DecodeError::MalformedHeader {
                layer: Layer::IPv4,
                reason: format!(
                    "ヘッダー長 {} バイトは最小値 {} バイト未満です (IHL = {})",
                    header_length,
                    IPV4_MIN_HEADER_LEN,
                    low_nibble(first)
                ),
            });
        }

        if data.len() < header_length {
            return Err(DecodeError::TruncatedFrame {
                layer: Layer::IPv4,
                needed: header_length,
                available: data.len(),
            });
        }

        let type_of_service = data[1];
        let total_length = be_u16([data[2], data[3]]);
        let identification = be_u16([data[4], data[5]]);
        let flags = ipv4_flags(data[6], data[7]);
        let fragment_offset = ipv4_fragment_offset(data[6], data[7]);
        let time_to_live = data[8];
        let protocol = IpProtocol::from(data[9]);
        let checksum = be_u16([data[10], data[11]]);
        let src_addr = Ipv4Addr::new(data[12], data[13], data[14], data[15]);
        let dst_addr = Ipv4Addr::new(data[16], data[17], data[18], data[19]);

        // オプションは生のバイト列をそのまま整数として保持する
        let options = if header_length > IPV4_MIN_HEADER_LEN {
            Some(assemble_be(&data[IPV4_MIN_HEADER_LEN..header_length]))
        } else {
            None
        };

        Ok(Ipv4Parse::Decoded(
            Self {
                version,
                header_length_bytes: header_length as u8,
                type_of_service,
                total_length,
                identification,
                flags,
                fragment_offset,
                time_to_live,
                protocol,
                checksum,
                src_addr,
                dst_addr,
                options,
            },
            &data[header_length..],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(version_ihl: u8, protocol: u8) -> Vec<u8> {
        vec![
            version_ihl, 0x10, // TOS
            0x00, 0x3C, // 全長 60
            0x1C, 0x46, // ID
            0x40, 0x00, // DF
            0x40, // TTL 64
            protocol, 0xB1, 0xE6, // チェックサム
            0xC0, 0xA8, 0x00, 0x68, // 192.168.0.104
            0xC0, 0xA8, 0x00, 0x01, // 192.168.0.1
        ]
    }

    fn decoded(data: &[u8]) -> (IPv4Header, &[u8]) {
        match IPv4Header::parse(data).unwrap() {
            Ipv4Parse::Decoded(header, rest) => (header, rest),
            Ipv4Parse::NotIpv4 { version } => panic!("IPv4ではありません: version {}", version),
        }
    }

    #[test]
    fn test_parse_fixed_fields() {
        let mut data = header_bytes(0x45, 6);
        data.extend_from_slice(&[0xAB, 0xCD]);

        let (header, rest) = decoded(&data);
        assert_eq!(header.version, 4);
        assert_eq!(header.header_length_bytes, 20);
        assert_eq!(header.type_of_service, 0x10);
        assert_eq!(header.total_length, 60);
        assert_eq!(header.identification, 0x1C46);
        assert_eq!(header.flags, 0b010);
        assert_eq!(header.fragment_offset, 0);
        assert_eq!(header.time_to_live, 64);
        assert_eq!(header.protocol, IpProtocol::Tcp);
        assert_eq!(header.checksum, 0xB1E6);
        assert_eq!(header.src_addr.to_string(), "192.168.0.104");
        assert_eq!(header.dst_addr.to_string(), "192.168.0.1");
        assert_eq!(header.options, None);
        assert_eq!(rest, &[0xAB, 0xCD]);
    }

    #[test]
    fn test_checksum_does_not_overlap_protocol() {
        let data = header_bytes(0x45, 17);
        let (header, _) = decoded(&data);
        assert_eq!(header.protocol, IpProtocol::Udp);
        assert_eq!(header.checksum, 0xB1E6);
    }

    #[test]
    fn test_ihl_four_is_malformed() {
        let data = header_bytes(0x44, 6);
        let err = IPv4Header::parse(&data).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::MalformedHeader {
                layer: Layer::IPv4,
                ..
            }
        ));
    }

    #[test]
    fn test_ihl_zero_is_malformed_even_when_short() {
        let err = IPv4Header::parse(&[0x40]).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedHeader { .. }));
    }

    #[test]
    fn test_ihl_six_reads_four_option_bytes() {
        let mut data = header_bytes(0x46, 17);
        data.extend_from_slice(&[0x94, 0x04, 0x00, 0x00]); // Router Alert
        data.extend_from_slice(&[0xFF]);

        let (header, rest) = decoded(&data);
        assert_eq!(header.header_length_bytes, 24);
        assert_eq!(header.options, Some(assemble_be(&[0x94, 0x04, 0x00, 0x00])));
        assert_eq!(header.options.as_ref().unwrap(), &0x9404_0000u64);
        assert_eq!(rest, &[0xFF]);
    }

    #[test]
    fn test_max_header_length_options() {
        let mut data = header_bytes(0x4F, 1);
        data.extend_from_slice(&[0x01; 40]);

        let (header, rest) = decoded(&data);
        assert_eq!(header.header_length_bytes as usize, IPV4_MAX_HEADER_LEN);
        assert_eq!(header.options.unwrap().as_be_bytes(), &[0x01; 40][..]);
        assert!(rest.is_empty());
    }

    #[test]
    fn test_header_length_always_multiple_of_four() {
        for ihl in 5u8..=15 {
            let mut data = header_bytes(0x40 | ihl, 6);
            data.resize(60, 0);
            let (header, rest) = decoded(&data);
            let len = header.header_length_bytes as usize;
            assert_eq!(len % 4, 0);
            assert!((IPV4_MIN_HEADER_LEN..=IPV4_MAX_HEADER_LEN).contains(&len));
            assert_eq!(rest.len(), 60 - len);
        }
    }

    #[test]
    fn test_options_past_buffer_end_is_truncated() {
        let data = header_bytes(0x46, 6);
        let err = IPv4Header::parse(&data).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TruncatedFrame {
                layer: Layer::IPv4,
                needed: 24,
                available: 20,
            }
        );
    }

    #[test]
    fn test_empty_buffer_is_truncated() {
        let err = IPv4Header::parse(&[]).unwrap_err();
        assert!(matches!(err, DecodeError::TruncatedFrame { available: 0, .. }));
    }

    #[test]
    fn test_ipv6_is_not_ipv4() {
        let data = [0x60, 0x00, 0x00, 0x00];
        match IPv4Header::parse(&data).unwrap() {
            Ipv4Parse::NotIpv4 { version } => assert_eq!(version, 6),
            Ipv4Parse::Decoded(..) => panic!("IPv6をIPv4としてデコードしました"),
        }
    }

    #[test]
    fn test_protocol_numbers() {
        assert_eq!(IpProtocol::from(6), IpProtocol::Tcp);
        assert_eq!(IpProtocol::from(17), IpProtocol::Udp);
        assert_eq!(IpProtocol::from(1), IpProtocol::Icmp);
        assert_eq!(IpProtocol::from(47), IpProtocol::Other(47));
        assert_eq!(u8::from(IpProtocol::Other(47)), 47);
        assert_eq!(u8::from(IpProtocol::Udp), 17);
    }

    #[test]
    fn test_serialize() {
        let mut data = header_bytes(0x46, 47);
        data.extend_from_slice(&[0x00, 0x00, 0x01, 0x02]);
        let (header, _) = decoded(&data);

        let json = serde_json::to_value(&header).unwrap();
        assert_eq!(json["headerLengthBytes"], 24);
        assert_eq!(json["protocol"], 47);
        assert_eq!(json["srcAddr"], "192.168.0.104");
        assert_eq!(json["options"], "258");

        let (plain, _) = decoded(&header_bytes(0x45, 6));
        let json = serde_json::to_value(&plain).unwrap();
        assert!(json.get("options").is_none());
    }
}
