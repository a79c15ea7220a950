pub mod ethernet;
pub mod field;
pub mod ipv4;
pub mod tcp;
pub mod udp;

use crate::error::DecodeError;
use crate::network::packet::ethernet::EthernetHeader;
use crate::network::packet::ipv4::{IPv4Header, IpProtocol, Ipv4Parse};
use crate::network::packet::tcp::TCPHeader;
use crate::network::packet::udp::UDPHeader;
use serde::Serialize;

/// キャプチャから取り出した1フレーム分の生データ
///
/// フレームソースが所有し、デコーダーは1回のデコード中だけ借用する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    ordinal: u64,
    data: Vec<u8>,
}

impl RawFrame {
    /// `ordinal` はキャプチャ内での1始まりの通し番号
    pub fn new(ordinal: u64, data: Vec<u8>) -> Self {
        Self { ordinal, data }
    }

    pub fn ordinal(&self) -> u64 {
        self.ordinal
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum TransportHeader {
    #[serde(rename = "TCP")]
    Tcp(TCPHeader),
    #[serde(rename = "UDP")]
    Udp(UDPHeader),
    /// フィールドは取り出さない
    #[serde(rename = "ICMP")]
    Icmp,
    Other,
}

impl TransportHeader {
    /// IPv4のプロトコル番号で振り分けてデコードする
    ///
    /// ICMPとその他のプロトコルはバイトを消費しない。
    pub fn parse(protocol: IpProtocol, data: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        match protocol {
            IpProtocol::Tcp => {
                let (tcp, remainder) = TCPHeader::parse(data)?;
                Ok((TransportHeader::Tcp(tcp), remainder))
            }
            IpProtocol::Udp => {
                let (udp, remainder) = UDPHeader::parse(data)?;
                Ok((TransportHeader::Udp(udp), remainder))
            }
            IpProtocol::Icmp => Ok((TransportHeader::Icmp, data)),
            IpProtocol::Other(_) => Ok((TransportHeader::Other, data)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TransportHeader::Tcp(_) => "TCP",
            TransportHeader::Udp(_) => "UDP",
            TransportHeader::Icmp => "ICMP",
            TransportHeader::Other => "Other",
        }
    }
}

/// シンクに渡す完成済みのパケット
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedPacket {
    /// 1始まりで、出力されたパケットごとに1ずつ増える
    pub index: u64,
    pub ethernet: EthernetHeader,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<IPv4Header>,
    pub transport: TransportHeader,
    /// 小文字16進
    pub payload: String,
}

impl DecodedPacket {
    pub fn payload_len(&self) -> usize {
        self.payload.len() / 2
    }
}

/// インデックス付与前のデコード結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketLayers {
    pub ethernet: EthernetHeader,
    pub ip: IPv4Header,
    pub transport: TransportHeader,
    pub payload: String,
}

#[derive(Debug)]
pub enum FrameOutcome<'a> {
    Decoded(PacketLayers),
    /// IPバージョンが4以外。Ethernetヘッダーとその後ろのバイト列だけ返す
    NotIpv4 {
        ethernet: EthernetHeader,
        version: u8,
        remainder: &'a [u8],
    },
}

/// Ethernet → IPv4 → トランスポートの順にデコードする
///
/// 途中のどの層で失敗してもフレーム全体が失敗となり、部分的な結果は返さない。
pub fn decode_frame(data: &[u8]) -> Result<FrameOutcome<'_>, DecodeError> {
    let (ethernet, remainder) = EthernetHeader::parse(data)?;

    let (ip, transport_data) = match IPv4Header::parse(remainder)? {
        Ipv4Parse::Decoded(ip, rest) => (ip, rest),
        Ipv4Parse::NotIpv4 { version } => {
            return Ok(FrameOutcome::NotIpv4 {
                ethernet,
                version,
                remainder,
            })
        }
    };

    let (transport, payload) = TransportHeader::parse(ip.protocol, transport_data)?;

    Ok(FrameOutcome::Decoded(PacketLayers {
        ethernet,
        ip,
        transport,
        payload: hex::encode(payload),
    }))
}


#[cfg(test)]
mod tests {
    use super::test_frames::*;
    use super::*;
    use pnet::packet::ip::IpNextHeaderProtocols;
    use rand::{Rng, SeedableRng};
    use std::net::Ipv4Addr;

    fn layers(data: &[u8]) -> PacketLayers {
        match decode_frame(data).unwrap() {
            FrameOutcome::Decoded(layers) => layers,
            FrameOutcome::NotIpv4 { version, .. } => panic!("IPv4ではありません: {}", version),
        }
    }

    #[test]
    fn test_udp_round_trip() {
        let frame = udp_frame(40000, 53, &[0xDE, 0xAD, 0xBE, 0xEF]);
        let decoded = layers(&frame);

        assert_eq!(decoded.ethernet.dst_mac.to_string(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(decoded.ethernet.src_mac.to_string(), "00:11:22:33:44:55");
        assert_eq!(decoded.ethernet.ether_type, 0x0800);

        assert_eq!(decoded.ip.version, 4);
        assert_eq!(decoded.ip.header_length_bytes, 20);
        assert_eq!(decoded.ip.total_length, 32);
        assert_eq!(decoded.ip.identification, 0x1234);
        assert_eq!(decoded.ip.flags, 0b010);
        assert_eq!(decoded.ip.time_to_live, 64);
        assert_eq!(decoded.ip.protocol, IpProtocol::Udp);
        assert_eq!(decoded.ip.checksum, 0xABCD);
        assert_eq!(decoded.ip.src_addr, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(decoded.ip.dst_addr, Ipv4Addr::new(10, 0, 0, 2));

        match &decoded.transport {
            TransportHeader::Udp(udp) => {
                assert_eq!(udp.src_port, 40000);
                assert_eq!(udp.dst_port, 53);
                assert_eq!(udp.length, 12);
                assert_eq!(udp.checksum, 0x0F0F);
            }
            other => panic!("UDPではありません: {:?}", other),
        }
        assert_eq!(decoded.payload, "deadbeef");
    }

    #[test]
    fn test_udp_destination_port_53() {
        let mut transport = vec![0x30, 0x39, 0x00, 0x35, 0x00, 0x08, 0x00, 0x00];
        transport.extend_from_slice(&[0x01]);
        let frame = ipv4_frame(IpNextHeaderProtocols::Udp, &transport);

        match layers(&frame).transport {
            TransportHeader::Udp(udp) => assert_eq!(udp.dst_port, 53),
            other => panic!("UDPではありません: {:?}", other),
        }
    }

    #[test]
    fn test_tcp_frame() {
        let frame = tcp_frame(51000, 80, 0xCAFEBABE, b"hi");
        let decoded = layers(&frame);

        match decoded.transport {
            TransportHeader::Tcp(tcp) => {
                assert_eq!(tcp.src_port, 51000);
                assert_eq!(tcp.dst_port, 80);
                assert_eq!(tcp.seq, 0xCAFEBABE);
                assert_eq!(tcp.ack, 0xCAFEBABF);
                assert_eq!(tcp.window_size, 1024);
                assert_eq!(tcp.checksum, 0x5A5A);
                assert_eq!(tcp.urgent_pointer, 0);
            }
            other => panic!("TCPではありません: {:?}", other),
        }
        assert_eq!(decoded.payload, "6869");
    }

    #[test]
    fn test_icmp_keeps_all_bytes_as_payload() {
        let echo = [0x08, 0x00, 0xF7, 0xFF, 0x00, 0x01, 0x00, 0x01];
        let frame = ipv4_frame(IpNextHeaderProtocols::Icmp, &echo);
        let decoded = layers(&frame);

        assert_eq!(decoded.transport, TransportHeader::Icmp);
        assert_eq!(decoded.payload, "0800f7ff00010001");
    }

    #[test]
    fn test_unknown_protocol_is_other() {
        let frame = ipv4_frame(IpNextHeaderProtocols::Gre, &[0x00, 0x00, 0x08, 0x00]);
        let decoded = layers(&frame);

        assert_eq!(decoded.ip.protocol, IpProtocol::Other(47));
        assert_eq!(decoded.transport, TransportHeader::Other);
        assert_eq!(decoded.payload, "00000800");
    }

    #[test]
    fn test_truncated_transport_fails_whole_frame() {
        let frame = ipv4_frame(IpNextHeaderProtocols::Tcp, &[0x00; 12]);
        let err = decode_frame(&frame).unwrap_err();
        assert!(matches!(err, DecodeError::TruncatedFrame { .. }));
    }

    #[test]
    fn test_ipv6_stops_after_ethernet() {
        let mut frame = vec![0u8; 14];
        frame[12] = 0x86;
        frame[13] = 0xDD;
        frame.extend_from_slice(&[0x60, 0x00, 0x00, 0x00]);

        match decode_frame(&frame).unwrap() {
            FrameOutcome::NotIpv4 {
                ethernet,
                version,
                remainder,
            } => {
                assert_eq!(ethernet.ether_type, 0x86DD);
                assert_eq!(version, 6);
                assert_eq!(remainder, &[0x60, 0x00, 0x00, 0x00]);
            }
            FrameOutcome::Decoded(_) => panic!("IPv6をデコードしました"),
        }
    }

    #[test]
    fn test_serialized_packet_shape() {
        let decoded = layers(&udp_frame(1, 2, &[]));
        let packet = DecodedPacket {
            index: 1,
            ethernet: decoded.ethernet,
            ip: Some(decoded.ip),
            transport: decoded.transport,
            payload: decoded.payload,
        };

        let json = serde_json::to_value(&packet).unwrap();
        assert_eq!(json["index"], 1);
        assert_eq!(json["transport"]["type"], "UDP");
        assert_eq!(json["transport"]["srcPort"], 1);
        assert_eq!(json["transport"]["dstPort"], 2);
        assert_eq!(json["ip"]["protocol"], 17);
        assert_eq!(json["payload"], "");
    }

    #[test]
    fn test_random_frames_never_panic() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x5EED);
        for _ in 0..5000 {
            let len = rng.gen_range(0..128);
            let mut data: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            if data.len() > 14 && rng.gen_bool(0.5) {
                // IPv4らしい先頭バイトを多めに混ぜる
                data[14] = 0x40 | rng.gen_range(0..16);
            }
            let _ = decode_frame(&data);
        }
    }
}
