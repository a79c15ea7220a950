use crate::error::SinkError;
use crate::network::packet::DecodedPacket;
use crate::storage::RecordSink;
use async_trait::async_trait;
use log::info;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// 全パケットをタブインデントのJSON配列として書き出す
pub struct JsonSink<W: Write + Send> {
    writer: W,
    packets: Vec<DecodedPacket>,
    finished: bool,
}

impl JsonSink<BufWriter<File>> {
    /// 出力ファイルは先に作成しておき、書き込めない場合はデコード前に失敗させる
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write + Send> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            packets: Vec::new(),
            finished: false,
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }
}

#[async_trait]
impl<W: Write + Send> RecordSink for JsonSink<W> {
    async fn accept(&mut self, packet: DecodedPacket) -> Result<(), SinkError> {
        self.packets.push(packet);
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        if self.finished {
            return Ok(());
        }

        let formatter = PrettyFormatter::with_indent(b"\t");
        let mut serializer = serde_json::Serializer::with_formatter(&mut self.writer, formatter);
        self.packets.serialize(&mut serializer)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;

        self.finished = true;
        info!("{} 件のパケットをJSONに書き出しました", self.packets.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::packet::ethernet::EthernetHeader;
    use crate::network::packet::field::assemble_be;
    use crate::network::packet::ipv4::{IPv4Header, IpProtocol};
    use crate::network::packet::TransportHeader;
    use std::net::Ipv4Addr;

    fn packet(index: u64) -> DecodedPacket {
        DecodedPacket {
            index,
            ethernet: EthernetHeader::new([0xAA; 6], [0xBB; 6], 0x0800),
            ip: Some(IPv4Header {
                version: 4,
                header_length_bytes: 28,
                type_of_service: 0,
                total_length: 28,
                identification: 1,
                flags: 0,
                fragment_offset: 0,
                time_to_live: 1,
                protocol: IpProtocol::Icmp,
                checksum: 0,
                src_addr: Ipv4Addr::new(127, 0, 0, 1),
                dst_addr: Ipv4Addr::new(127, 0, 0, 2),
                options: Some(assemble_be(&[0xFF; 8])),
            }),
            transport: TransportHeader::Icmp,
            payload: String::new(),
        }
    }

    #[tokio::test]
    async fn test_writes_tab_indented_array() {
        let mut sink = JsonSink::new(Vec::new());
        sink.accept(packet(1)).await.unwrap();
        sink.accept(packet(2)).await.unwrap();
        sink.finish().await.unwrap();

        let text = String::from_utf8(sink.get_ref().clone()).unwrap();
        assert!(text.starts_with("[\n\t{"));
        assert!(text.contains("\n\t\t\"index\": 1"));

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["index"], 2);
        assert_eq!(items[0]["transport"]["type"], "ICMP");
        // 64ビットを超えうるため文字列
        assert_eq!(items[0]["ip"]["options"], "18446744073709551615");
    }

    #[tokio::test]
    async fn test_empty_run_writes_empty_array() {
        let mut sink = JsonSink::new(Vec::new());
        sink.finish().await.unwrap();
        assert_eq!(sink.get_ref().as_slice(), b"[]\n");
    }

    #[tokio::test]
    async fn test_finish_twice_writes_once() {
        let mut sink = JsonSink::new(Vec::new());
        sink.accept(packet(1)).await.unwrap();
        sink.finish().await.unwrap();
        let written = sink.get_ref().len();
        sink.finish().await.unwrap();
        assert_eq!(sink.get_ref().len(), written);
    }
}
