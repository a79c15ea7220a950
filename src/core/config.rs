use crate::cli::Args;
use crate::core::session::NonIpv4Policy;
use crate::error::InitProcessError;
use log::LevelFilter;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Configuration {
    pub log: LogConfig,
    pub decode: DecodeConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LevelFilter,
    /// 未指定なら標準エラー出力
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct DecodeConfig {
    pub non_ipv4: NonIpv4Policy,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    /// 1トランザクションで書き込む最大パケット数
    pub batch_size: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            log: LogConfig {
                level: LevelFilter::Info,
                file: None,
            },
            decode: DecodeConfig {
                non_ipv4: NonIpv4Policy::Skip,
            },
            database: DatabaseConfig {
                max_connections: 4,
                batch_size: 500,
            },
        }
    }
}

impl Configuration {
    /// `.env` と環境変数から読み込む
    pub fn from_env() -> Result<Self, InitProcessError> {
        match dotenv::dotenv() {
            Ok(_) => {}
            // .envが無いのは問題ない
            Err(dotenv::Error::Io(_)) => {}
            Err(e) => return Err(InitProcessError::EnvFileReadError(e.to_string())),
        }

        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, InitProcessError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(level) = lookup("DECODER_LOG_LEVEL") {
            config.log.level = parse_var("DECODER_LOG_LEVEL", &level)?;
        }
        config.log.file = lookup("DECODER_LOG_FILE")
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);

        if let Some(policy) = lookup("DECODER_NON_IPV4") {
            config.decode.non_ipv4 = parse_var("DECODER_NON_IPV4", &policy)?;
        }

        if let Some(max) = lookup("DB_MAX_CONNECTIONS") {
            config.database.max_connections = parse_var("DB_MAX_CONNECTIONS", &max)?;
        }
        if let Some(batch) = lookup("DB_BATCH_SIZE") {
            config.database.batch_size = parse_var("DB_BATCH_SIZE", &batch)?;
        }

        if config.database.max_connections == 0 {
            return Err(InitProcessError::EnvVarParseError {
                name: "DB_MAX_CONNECTIONS".to_string(),
                reason: "1以上を指定してください".to_string(),
            });
        }
        if config.database.batch_size == 0 {
            return Err(InitProcessError::EnvVarParseError {
                name: "DB_BATCH_SIZE".to_string(),
                reason: "1以上を指定してください".to_string(),
            });
        }

        Ok(config)
    }

    /// コマンドライン引数で上書きする
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(level) = args.log_level {
            self.log.level = level;
        }
        if args.emit_non_ipv4 {
            self.decode.non_ipv4 = NonIpv4Policy::EmitLinkOnly;
        }
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T, InitProcessError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| InitProcessError::EnvVarParseError {
            name: name.to_string(),
            reason: e.to_string(),
        })
}
