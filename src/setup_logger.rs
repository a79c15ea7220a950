use crate::core::config::LogConfig;
use crate::error::InitProcessError;
use env_logger::{Builder, Target};
use std::fs::File;
use std::io::Write;

/// ログの出力先を設定する
///
/// 標準出力はコンソール表示に使うため、ログはファイルか標準エラー出力に書く。
pub fn setup_logger(config: &LogConfig) -> Result<(), InitProcessError> {
    let target = match &config.file {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                InitProcessError::LoggerError(format!("{}: {}", path.display(), e))
            })?;
            Target::Pipe(Box::new(file))
        }
        None => Target::Stderr,
    };

    Builder::new()
        // ログレベルの設定
        .filter_level(config.level)
        // タイムスタンプ付きのフォーマット
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(), // モジュールパスが表示される
                record.args()
            )
        })
        .target(target)
        .try_init()
        .map_err(|e| InitProcessError::LoggerError(e.to_string()))?;

    Ok(())
}
