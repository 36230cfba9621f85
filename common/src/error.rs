//! エラー型定義
//!
//! 遠隔制御リンクで使用する共通エラー型を定義します。

use std::io;
use thiserror::Error;

/// 共通エラー
#[derive(Error, Debug)]
pub enum CommonError {
    /// ロガー初期化エラー
    #[error("ロガーの初期化に失敗しました: {0}")]
    LoggerError(String),
}

/// 設定エラー
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O エラー
    #[error("設定の読み書き中にI/Oエラーが発生しました: {0}")]
    IoError(#[from] io::Error),

    /// JSON エラー
    #[error("JSONの解析に失敗しました: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML デシリアライズエラー
    #[error("TOMLの解析に失敗しました: {0}")]
    TomlDeError(#[from] toml::de::Error),

    /// TOML シリアライズエラー
    #[error("TOMLのシリアライズに失敗しました: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    /// 設定値が不正
    #[error("設定値 '{key}' が不正です: {reason}")]
    InvalidValue {
        /// 設定キー
        key: String,
        /// 理由
        reason: String,
    },
}

impl ConfigError {
    /// 不正な設定値エラーを作成
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// 結果型のエイリアス
pub type Result<T> = std::result::Result<T, CommonError>;
