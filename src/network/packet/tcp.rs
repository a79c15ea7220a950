// 0                   1                   2                   3
// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |          Source Port          |       Destination Port        |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                        Sequence Number                        |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                    Acknowledgment Number                      |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |  Data |           |U|A|P|R|S|F|                               |
// | Offset| Reserved  |R|C|S|S|Y|I|            Window             |
// |       |           |G|K|H|T|N|N|                               |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |           Checksum            |         Urgent Pointer        |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
use crate::error::{DecodeError, Layer};
use crate::network::packet::field::{be_u16, be_u32};
use serde::Serialize;

/// 固定で読み進めるTCPヘッダー長
///
/// Data Offsetは読まないため、TCPオプションがあるセグメントでは
/// オプション部分がそのままペイロードの先頭に含まれる。
pub const TCP_HEADER_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TCPHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq: u32,
    pub ack: u32,
    pub window_size: u16,
    pub checksum: u16,
    pub urgent_pointer: u16,
}

impl TCPHeader {
    pub fn parse(data: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        if data.len() < TCP_HEADER_LEN {
            return Err(DecodeError::TruncatedFrame {
                layer: Layer::Tcp,
                needed: TCP_HEADER_LEN,
                available: data.len(),
            });
        }

        let src_port = be_u16([data[0], data[1]]);
        let dst_port = be_u16([data[2], data[3]]);
        let seq = be_u32([data[4], data[5], data[6], data[7]]);
        let ack = be_u32([data[8], data[9], data[10], data[11]]);
        // data[12..14]: Data Offset / Reserved / フラグ (デコードしない)
        let window_size = be_u16([data[14], data[15]]);
        let checksum = be_u16([data[16], data[17]]);
        let urgent_pointer = be_u16([data[18], data[19]]);

        Ok((
            Self {
                src_port,
                dst_port,
                seq,
                ack,
                window_size,
                checksum,
                urgent_pointer,
            },
            &data[TCP_HEADER_LEN..],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(data_offset_flags: [u8; 2]) -> Vec<u8> {
        let mut data = vec![
            0x01, 0xBB, // 443
            0xC3, 0x50, // 50000
            0x00, 0x00, 0x10, 0x00, // seq
            0xFF, 0xFF, 0xFF, 0xFF, // ack
        ];
        data.extend_from_slice(&data_offset_flags);
        data.extend_from_slice(&[
            0x72, 0x10, // ウィンドウ
            0x12, 0x34, // チェックサム
            0x00, 0x07, // 緊急ポインタ
        ]);
        data
    }

    #[test]
    fn test_parse_segment() {
        let mut data = segment([0x50, 0x18]);
        data.extend_from_slice(b"GET");

        let (header, rest) = TCPHeader::parse(&data).unwrap();
        assert_eq!(header.src_port, 443);
        assert_eq!(header.dst_port, 50000);
        assert_eq!(header.seq, 0x1000);
        assert_eq!(header.ack, u32::MAX);
        assert_eq!(header.window_size, 0x7210);
        assert_eq!(header.checksum, 0x1234);
        assert_eq!(header.urgent_pointer, 7);
        assert_eq!(rest, b"GET");
    }

    #[test]
    fn test_always_advances_twenty_bytes() {
        // Data Offset = 8 (32バイト) でも20バイトだけ進む
        let mut data = segment([0x80, 0x02]);
        let options = [0x02, 0x04, 0x05, 0xB4, 0x01, 0x01, 0x04, 0x02, 0x01, 0x03, 0x03, 0x07];
        data.extend_from_slice(&options);

        let (_, rest) = TCPHeader::parse(&data).unwrap();
        assert_eq!(rest, &options[..]);
    }

    #[test]
    fn test_truncated_segment() {
        let data = segment([0x50, 0x10]);
        let err = TCPHeader::parse(&data[..19]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TruncatedFrame {
                layer: Layer::Tcp,
                needed: 20,
                available: 19,
            }
        );
    }
}
