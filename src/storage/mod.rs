use crate::error::SinkError;
use crate::network::packet::DecodedPacket;
use async_trait::async_trait;

pub mod console;
pub mod json;
pub mod migrations;
pub mod models;
pub mod repository;

pub use console::ConsoleSink;
pub use json::JsonSink;
pub use repository::PostgresSink;

/// デコード済みパケットの受け取り先
///
/// パケットは1回だけ渡され、以降はシンクが所有する。シンクは内容を書き換えない。
#[async_trait]
pub trait RecordSink: Send {
    async fn accept(&mut self, packet: DecodedPacket) -> Result<(), SinkError>;

    /// 全フレームの処理後に1回だけ呼ばれる
    async fn finish(&mut self) -> Result<(), SinkError>;
}
