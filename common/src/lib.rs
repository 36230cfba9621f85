//! ローバー遠隔制御リンク共通ライブラリ
//!
//! このクレートは、シミュレーション側のリンク（クライアント）と判断サーバーの
//! 両方で使用される共通の機能を提供します。

pub mod config;
pub mod error;
pub mod protocol;
pub mod utils;

// 主要コンポーネントを再エクスポート
pub use config::LoggingSettings;
pub use error::{CommonError, ConfigError, Result};
pub use protocol::{decode, encode_actions, Action, CommandFrame, OutgoingFrame};
pub use utils::logging::LogLevel;

/// ライブラリのバージョン
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 既定の判断サーバーアドレス
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// 既定の判断サーバーポート
pub const DEFAULT_PORT: u16 = 60260;

/// 既定の送受信バッファサイズ（バイト）
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// ライブラリを初期化
///
/// ロガーとパニックハンドラを設定する。バイナリの起動直後に1回だけ呼ぶ。
pub fn initialize(level: LogLevel) -> Result<()> {
    utils::logging::init_logger(level).map_err(|e| CommonError::LoggerError(e.to_string()))?;

    // パニックハンドラを設定
    utils::logging::set_panic_hook();

    log::info!(
        "ローバーリンク共通ライブラリ初期化 - バージョン: {}, ログレベル: {}",
        VERSION,
        level.as_str()
    );

    Ok(())
}
