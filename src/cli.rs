use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;

/// キャプチャファイルのEthernet / IPv4 / TCP / UDP / ICMP ヘッダーをデコードする
#[derive(Parser, Debug)]
#[command(name = "pcap-header-decoder")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// 読み込むpcap / pcapngファイル
    #[arg(value_name = "CAPTURE_FILE")]
    pub capture: PathBuf,

    /// デコード結果をJSON配列として書き出すファイル
    #[arg(short = 'o', long = "output", value_name = "OUTPUT_FILE", conflicts_with = "database")]
    pub output: Option<PathBuf>,

    /// ヘッダーを保存するPostgreSQLの接続文字列
    #[arg(long = "database", value_name = "DATABASE_URL")]
    pub database: Option<String>,

    /// IPv4以外のフレームもEthernetヘッダーだけで出力する
    #[arg(long = "emit-non-ipv4")]
    pub emit_non_ipv4: bool,

    /// ログレベル (error, warn, info, debug, trace, off)
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<LevelFilter>,
}

/// 出力先は常にどれか1つ
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    Console,
    Json(PathBuf),
    Database(String),
}

impl Args {
    pub fn output_mode(&self) -> OutputMode {
        match (&self.output, &self.database) {
            (Some(path), _) => OutputMode::Json(path.clone()),
            (None, Some(url)) => OutputMode::Database(url.clone()),
            (None, None) => OutputMode::Console,
        }
    }
}
