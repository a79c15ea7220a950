use clap::Parser;
use log::{error, info};
use pcap_header_decoder::cli::{Args, OutputMode};
use pcap_header_decoder::core::{Configuration, DecoderSession};
use pcap_header_decoder::error::AppError;
use pcap_header_decoder::network::PcapFileSource;
use pcap_header_decoder::setup_logger::setup_logger;
use pcap_header_decoder::storage::{ConsoleSink, JsonSink, PostgresSink, RecordSink};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();

    // 設定の読み込み (.env → 環境変数 → コマンドライン引数)
    let mut config = Configuration::from_env()?;
    config.apply_args(&args);

    setup_logger(&config.log)?;
    info!("キャプチャファイルを開きます: {}", args.capture.display());

    let mut source = PcapFileSource::open(&args.capture).map_err(|e| {
        error!("キャプチャファイルを開けませんでした: {}", e);
        e
    })?;

    // 出力先の選択
    let mut sink: Box<dyn RecordSink> = match args.output_mode() {
        OutputMode::Console => Box::new(ConsoleSink::stdout()),
        OutputMode::Json(path) => {
            info!("JSONファイルに書き出します: {}", path.display());
            Box::new(JsonSink::create(&path)?)
        }
        OutputMode::Database(url) => {
            let capture_file = args.capture.display().to_string();
            Box::new(PostgresSink::connect(&url, &capture_file, &config.database).await?)
        }
    };

    let mut session = DecoderSession::new(config.decode.non_ipv4);
    session.run(&mut source, sink.as_mut()).await?;

    Ok(())
}
