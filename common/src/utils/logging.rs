//! ロギング機能
//!
//! `log` ファサードのバックエンドとして `env_logger` を初期化します。
//! `RUST_LOG` 環境変数が設定されていればそちらを優先します。

use log::LevelFilter;
use serde::{Deserialize, Serialize};

/// ログレベル
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// トレース情報
    Trace = 0,
    /// デバッグ情報
    Debug = 1,
    /// 一般情報
    #[default]
    Info = 2,
    /// 警告
    Warn = 3,
    /// エラー
    Error = 4,
}

impl LogLevel {
    /// ログレベルを文字列に変換
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// 文字列からログレベルを解析
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "TRACE" => Some(LogLevel::Trace),
            "DEBUG" => Some(LogLevel::Debug),
            "INFO" => Some(LogLevel::Info),
            "WARN" | "WARNING" => Some(LogLevel::Warn),
            "ERROR" | "ERR" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// `log` クレートのフィルタに変換
    pub fn to_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
        }
    }
}

/// グローバルロガーを初期化
///
/// 2回目以降の呼び出しはエラーを返すだけでパニックしない。
pub fn init_logger(level: LogLevel) -> Result<(), log::SetLoggerError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.as_str()))
        .format_timestamp_millis()
        .try_init()
}

/// パニック時のログ記録ハンドラーを設定
pub fn set_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let message = match panic_info.payload().downcast_ref::<&str>() {
            Some(s) => *s,
            None => match panic_info.payload().downcast_ref::<String>() {
                Some(s) => s.as_str(),
                None => "Unknown panic payload",
            },
        };

        let location = match panic_info.location() {
            Some(loc) => format!(" at {}:{}", loc.file(), loc.line()),
            None => String::new(),
        };

        log::error!("パニックが発生しました: {}{}", message, location);
        default_hook(panic_info);
    }));
}
