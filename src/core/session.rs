use crate::error::{AppResult, DecodeError};
use crate::network::capture::FrameSource;
use crate::network::packet::{decode_frame, DecodedPacket, FrameOutcome, RawFrame, TransportHeader};
use crate::storage::RecordSink;
use log::{debug, info, warn};

/// IPv4以外のフレームの扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NonIpv4Policy {
    /// レコードを出力せず、インデックスも消費しない
    #[default]
    Skip,
    /// `ip` なし・トランスポートは `Other` として出力し、インデックスを1つ消費する
    EmitLinkOnly,
}

impl std::str::FromStr for NonIpv4Policy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(NonIpv4Policy::Skip),
            "emit" => Ok(NonIpv4Policy::EmitLinkOnly),
            other => Err(format!("skip または emit を指定してください: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_seen: u64,
    pub packets_emitted: u64,
    /// IPv4以外でスキップしたフレーム
    pub frames_skipped: u64,
    /// デコードエラーで破棄したフレーム
    pub frames_discarded: u64,
}

/// フレームごとに Ethernet → IPv4 → トランスポートを順に実行し、インデックスを振る
///
/// フレームをまたいで保持する状態はインデックスのカウンターと集計値だけ。
/// `&mut self` で駆動するため、インデックスは入力順に厳密に増加する。
#[derive(Debug)]
pub struct DecoderSession {
    next_index: u64,
    policy: NonIpv4Policy,
    summary: RunSummary,
}

impl DecoderSession {
    pub fn new(policy: NonIpv4Policy) -> Self {
        Self {
            next_index: 1,
            policy,
            summary: RunSummary::default(),
        }
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// 1フレームをデコードする
    ///
    /// 成功時は次のインデックスを付けたパケットを返す。スキップ対象なら `Ok(None)`。
    /// エラー時はインデックスを消費しない。
    pub fn decode(&mut self, frame: &RawFrame) -> Result<Option<DecodedPacket>, DecodeError> {
        self.summary.frames_seen += 1;

        let outcome = match decode_frame(frame.data()) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.summary.frames_discarded += 1;
                return Err(e);
            }
        };

        let packet = match outcome {
            FrameOutcome::Decoded(layers) => DecodedPacket {
                index: self.take_index(),
                ethernet: layers.ethernet,
                ip: Some(layers.ip),
                transport: layers.transport,
                payload: layers.payload,
            },
            FrameOutcome::NotIpv4 {
                ethernet,
                version,
                remainder,
            } => match self.policy {
                NonIpv4Policy::Skip => {
                    debug!(
                        "フレーム #{} はIPv{}のためスキップします",
                        frame.ordinal(),
                        version
                    );
                    self.summary.frames_skipped += 1;
                    return Ok(None);
                }
                NonIpv4Policy::EmitLinkOnly => DecodedPacket {
                    index: self.take_index(),
                    ethernet,
                    ip: None,
                    transport: TransportHeader::Other,
                    payload: hex::encode(remainder),
                },
            },
        };

        self.summary.packets_emitted += 1;
        Ok(Some(packet))
    }

    fn take_index(&mut self) -> u64 {
        let index = self.next_index;
        self.next_index += 1;
        index
    }

    /// ソースが終端に達するまでデコードし、出力されたパケットをシンクへ渡す
    ///
    /// デコードエラーは警告を出してそのフレームだけ破棄する。
    /// ソースとシンクのエラーは処理を中断する。
    pub async fn run<S, K>(&mut self, source: &mut S, sink: &mut K) -> AppResult<RunSummary>
    where
        S: FrameSource + ?Sized,
        K: RecordSink + ?Sized,
    {
        info!("デコードを開始します");

        while let Some(frame) = source.next_frame()? {
            match self.decode(&frame) {
                Ok(Some(packet)) => sink.accept(packet).await?,
                Ok(None) => {}
                Err(e) => warn!("フレーム #{} を破棄しました: {}", frame.ordinal(), e),
            }
        }

        sink.finish().await?;

        let summary = self.summary;
        info!(
            "デコードが完了しました: フレーム {} 件, 出力 {} 件, スキップ {} 件, 破棄 {} 件",
            summary.frames_seen,
            summary.packets_emitted,
            summary.frames_skipped,
            summary.frames_discarded
        );
        Ok(summary)
    }
}

impl Default for DecoderSession {
    fn default() -> Self {
        Self::new(NonIpv4Policy::default())
    }
}
