use std::fmt;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

/// デコード中のレイヤー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Ethernet,
    IPv4,
    Tcp,
    Udp,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Layer::Ethernet => "Ethernet",
            Layer::IPv4 => "IPv4",
            Layer::Tcp => "TCP",
            Layer::Udp => "UDP",
        };
        f.write_str(name)
    }
}

/// 1フレームのデコード失敗。フレームは破棄されるが処理は継続する
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{layer}ヘッダーに必要なバイト数が足りません: 必要 {needed} バイト, 残り {available} バイト")]
    TruncatedFrame {
        layer: Layer,
        needed: usize,
        available: usize,
    },

    #[error("{layer}ヘッダーが不正です: {reason}")]
    MalformedHeader { layer: Layer, reason: String },
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("キャプチャファイルを開けませんでした: {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("キャプチャファイルの読み込みに失敗しました: {0}")]
    Io(#[from] std::io::Error),

    #[error("未対応のファイル形式です (マジックナンバー: {0:02x?})")]
    UnknownFormat([u8; 4]),

    #[error("キャプチャファイルの解析に失敗しました: {0}")]
    Parse(String),
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("出力の書き込みに失敗しました: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSONのシリアライズに失敗しました: {0}")]
    Json(#[from] serde_json::Error),

    #[error("データベースエラー: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("コネクションプールエラー: {0}")]
    Pool(String),
}

impl From<bb8::RunError<tokio_postgres::Error>> for SinkError {
    fn from(e: bb8::RunError<tokio_postgres::Error>) -> Self {
        match e {
            bb8::RunError::User(e) => SinkError::Database(e),
            bb8::RunError::TimedOut => SinkError::Pool("接続の取得がタイムアウトしました".to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum InitProcessError {
    #[error("ロガーのセットアップに失敗しました: {0}")]
    LoggerError(String),

    #[error("環境変数ファイルの読み込みに失敗しました: {0}")]
    EnvFileReadError(String),

    #[error("環境変数の解析に失敗しました: {name}: {reason}")]
    EnvVarParseError { name: String, reason: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("初期化エラー: {0}")]
    Init(#[from] InitProcessError),

    #[error("フレームソースエラー: {0}")]
    Source(#[from] SourceError),

    #[error("出力先エラー: {0}")]
    Sink(#[from] SinkError),
}
