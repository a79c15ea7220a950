use crate::network::packet::ipv4::IPv4Header;
use crate::network::packet::DecodedPacket;
use bytes::{BufMut, BytesMut};
use postgres_types::{to_sql_checked, IsNull, ToSql, Type};
use std::net::Ipv4Addr;

/// PostgreSQLのINET型 (バイナリ形式) として書き込むIPv4アドレス
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InetAddr(pub Ipv4Addr);

/// PostgreSQL内部のアドレスファミリー値 (PGSQL_AF_INET)
const PGSQL_AF_INET: u8 = 2;

impl ToSql for InetAddr {
    fn to_sql(
        &self,
        _ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        // アドレスファミリー
        out.put_u8(PGSQL_AF_INET);
        // ネットマスク長
        out.put_u8(32);
        // is_cidr (INETなので0)
        out.put_u8(0);
        // アドレスバイト数
        out.put_u8(4);
        out.extend_from_slice(&self.0.octets());
        Ok(IsNull::No)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::INET
    }

    to_sql_checked!();
}

/// `ethernet_headers` テーブルの1行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEthernet {
    pub packet_index: i64,
    pub dst_mac: String,
    pub src_mac: String,
    pub ether_type: i32,
}

/// `ipv4_headers` テーブルの1行
///
/// PostgreSQLには符号なし整数型が無いため、1段広い符号付き型に格納する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredIPv4 {
    pub version: i16,
    pub header_length: i16,
    pub type_of_service: i16,
    pub total_length: i32,
    pub identification: i32,
    pub flags: i16,
    pub fragment_offset: i32,
    pub time_to_live: i16,
    pub protocol: i16,
    pub checksum: i32,
    pub src_addr: InetAddr,
    pub dst_addr: InetAddr,
    /// NUMERIC列に10進文字列で渡す
    pub options: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPacket {
    pub ethernet: StoredEthernet,
    pub ip: Option<StoredIPv4>,
}

impl StoredPacket {
    pub fn from_decoded(packet: &DecodedPacket) -> Self {
        StoredPacket {
            ethernet: StoredEthernet {
                packet_index: packet.index as i64,
                dst_mac: packet.ethernet.dst_mac.to_string(),
                src_mac: packet.ethernet.src_mac.to_string(),
                ether_type: i32::from(packet.ethernet.ether_type),
            },
            ip: packet.ip.as_ref().map(StoredIPv4::from_header),
        }
    }
}

impl StoredIPv4 {
    fn from_header(header: &IPv4Header) -> Self {
        StoredIPv4 {
            version: i16::from(header.version),
            header_length: i16::from(header.header_length_bytes),
            type_of_service: i16::from(header.type_of_service),
            total_length: i32::from(header.total_length),
            identification: i32::from(header.identification),
            flags: i16::from(header.flags),
            fragment_offset: i32::from(header.fragment_offset),
            time_to_live: i16::from(header.time_to_live),
            protocol: i16::from(u8::from(header.protocol)),
            checksum: i32::from(header.checksum),
            src_addr: InetAddr(header.src_addr),
            dst_addr: InetAddr(header.dst_addr),
            options: header.options.as_ref().map(|o| o.to_string()),
        }
    }
}
