use crate::core::config::DatabaseConfig;
use crate::error::SinkError;
use crate::network::packet::DecodedPacket;
use crate::storage::migrations::run_migrations;
use crate::storage::models::StoredPacket;
use crate::storage::RecordSink;
use async_trait::async_trait;
use bb8::Pool;
use bb8_postgres::PostgresConnectionManager;
use chrono::Utc;
use log::{debug, error, info};
use tokio_postgres::NoTls;

const INSERT_ETHERNET: &str = "INSERT INTO ethernet_headers (
        run_id, packet_index, dst_mac, src_mac, ether_type
    ) VALUES ($1, $2, $3, $4, $5)
    RETURNING id";

const INSERT_IPV4: &str = "INSERT INTO ipv4_headers (
        ethernet_id, version, header_length, type_of_service, total_length,
        identification, flags, fragment_offset, time_to_live, protocol,
        checksum, src_addr, dst_addr, options
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14::text::numeric)";

/// Ethernet / IPv4ヘッダーを正規化したテーブルに保存する
///
/// 実行ごとに `decode_runs` に1行追加し、各ヘッダーはその行を参照する。
/// パケットはバッファに溜め、`batch_size` 件ごとに1トランザクションで書き込む。
pub struct PostgresSink {
    pool: Pool<PostgresConnectionManager<NoTls>>,
    run_id: i64,
    batch_size: usize,
    buffer: Vec<StoredPacket>,
    written: u64,
}

impl PostgresSink {
    pub async fn connect(
        connection_string: &str,
        capture_file: &str,
        config: &DatabaseConfig,
    ) -> Result<Self, SinkError> {
        let manager = PostgresConnectionManager::new_from_stringlike(connection_string, NoTls)?;
        let pool = Pool::builder()
            .max_size(config.max_connections)
            .build(manager)
            .await?;

        let run_id = {
            let client = pool.get().await?;
            run_migrations(&client).await?;

            let row = client
                .query_one(
                    "INSERT INTO decode_runs (capture_file, started_at) VALUES ($1, $2) RETURNING id",
                    &[&capture_file, &Utc::now()],
                )
                .await?;
            row.get::<_, i64>(0)
        };

        info!("データベースに接続しました (run_id = {})", run_id);

        Ok(Self {
            pool,
            run_id,
            batch_size: config.batch_size,
            buffer: Vec::with_capacity(config.batch_size),
            written: 0,
        })
    }

    /// 失敗した場合はバッファを残し、次回の書き込みで再送する
    async fn flush(&mut self) -> Result<(), SinkError> {
        if self.buffer.is_empty() {
            debug!("バッファにパケットがありません");
            return Ok(());
        }

        let mut client = self.pool.get().await?;
        let transaction = client.transaction().await?;
        let insert_ethernet = transaction.prepare(INSERT_ETHERNET).await?;
        let insert_ipv4 = transaction.prepare(INSERT_IPV4).await?;

        for packet in &self.buffer {
            let ethernet = &packet.ethernet;
            let row = transaction
                .query_one(
                    &insert_ethernet,
                    &[
                        &self.run_id,
                        &ethernet.packet_index,
                        &ethernet.dst_mac,
                        &ethernet.src_mac,
                        &ethernet.ether_type,
                    ],
                )
                .await?;
            let ethernet_id: i64 = row.get(0);

            if let Some(ip) = &packet.ip {
                transaction
                    .execute(
                        &insert_ipv4,
                        &[
                            &ethernet_id,
                            &ip.version,
                            &ip.header_length,
                            &ip.type_of_service,
                            &ip.total_length,
                            &ip.identification,
                            &ip.flags,
                            &ip.fragment_offset,
                            &ip.time_to_live,
                            &ip.protocol,
                            &ip.checksum,
                            &ip.src_addr,
                            &ip.dst_addr,
                            &ip.options,
                        ],
                    )
                    .await?;
            }
        }

        if let Err(e) = transaction.commit().await {
            error!("トランザクションのコミットに失敗しました: {}", e);
            return Err(e.into());
        }

        self.written += self.buffer.len() as u64;
        debug!("{} 件のパケットを書き込みました", self.buffer.len());
        self.buffer.clear();
        Ok(())
    }
}

#[async_trait]
impl RecordSink for PostgresSink {
    async fn accept(&mut self, packet: DecodedPacket) -> Result<(), SinkError> {
        self.buffer.push(StoredPacket::from_decoded(&packet));
        if self.buffer.len() >= self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        self.flush().await?;
        info!(
            "{} 件のパケットをデータベースに保存しました (run_id = {})",
            self.written, self.run_id
        );
        Ok(())
    }
}
