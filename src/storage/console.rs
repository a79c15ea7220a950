use crate::error::SinkError;
use crate::network::packet::{DecodedPacket, TransportHeader};
use crate::storage::RecordSink;
use async_trait::async_trait;
use comfy_table::{Cell, Table};
use std::io::Write;

/// パケットごとに要約テーブルを表示する
pub struct ConsoleSink<W: Write + Send> {
    writer: W,
}

impl ConsoleSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    fn table(packet: &DecodedPacket) -> Table {
        let mut table = Table::new();
        table.set_header(vec![Cell::new("レイヤー"), Cell::new("内容")]);

        let ethernet = &packet.ethernet;
        table.add_row(vec![
            Cell::new("Ethernet"),
            Cell::new(format!(
                "{} -> {}  type 0x{:04x}",
                ethernet.src_mac, ethernet.dst_mac, ethernet.ether_type
            )),
        ]);

        if let Some(ip) = &packet.ip {
            table.add_row(vec![
                Cell::new("IPv4"),
                Cell::new(format!(
                    "{} -> {}  hlen {}  tos 0x{:02x}  len {}  id 0x{:04x}",
                    ip.src_addr,
                    ip.dst_addr,
                    ip.header_length_bytes,
                    ip.type_of_service,
                    ip.total_length,
                    ip.identification
                )),
            ]);
            table.add_row(vec![
                Cell::new(""),
                Cell::new(format!(
                    "flags 0b{:03b}  frag {}  ttl {}  proto {}  csum 0x{:04x}",
                    ip.flags,
                    ip.fragment_offset,
                    ip.time_to_live,
                    u8::from(ip.protocol),
                    ip.checksum
                )),
            ]);
            if let Some(options) = &ip.options {
                table.add_row(vec![Cell::new("Options"), Cell::new(format!("{:#x}", options))]);
            }
        }

        let transport = match &packet.transport {
            TransportHeader::Tcp(tcp) => format!(
                "{} -> {}  seq {}  ack {}  win {}  csum 0x{:04x}  urg {}",
                tcp.src_port,
                tcp.dst_port,
                tcp.seq,
                tcp.ack,
                tcp.window_size,
                tcp.checksum,
                tcp.urgent_pointer
            ),
            TransportHeader::Udp(udp) => format!(
                "{} -> {}  len {}  csum 0x{:04x}",
                udp.src_port, udp.dst_port, udp.length, udp.checksum
            ),
            _ => "-".to_string(),
        };
        table.add_row(vec![Cell::new(packet.transport.name()), Cell::new(transport)]);

        table.add_row(vec![
            Cell::new("Payload"),
            Cell::new(format!("{} バイト", packet.payload_len())),
        ]);
        table
    }

    fn render(&mut self, packet: &DecodedPacket) -> std::io::Result<()> {
        writeln!(self.writer, "パケット #{}", packet.index)?;
        writeln!(self.writer, "{}", Self::table(packet))?;
        writeln!(self.writer)
    }
}

#[async_trait]
impl<W: Write + Send> RecordSink for ConsoleSink<W> {
    async fn accept(&mut self, packet: DecodedPacket) -> Result<(), SinkError> {
        self.render(&packet)?;
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}
