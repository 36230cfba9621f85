//! サーバー設定
//!
//! 判断サーバーの設定情報を管理するモジュール

use rover_link_common::config::{self, LoggingSettings};
use rover_link_common::{ConfigError, DEFAULT_BUFFER_SIZE, DEFAULT_HOST, DEFAULT_PORT};

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// サーバー設定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// ネットワーク設定
    pub network: NetworkSettings,
    /// 判断設定
    pub decision: DecisionSettings,
    /// ログ設定
    pub logging: LoggingSettings,
}

/// ネットワーク設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// バインドアドレス
    pub bind_address: String,
    /// ポート番号（0 で空きポートを自動選択）
    pub port: u16,
    /// 受信チャンクサイズ（バイト）
    pub buffer_size: usize,
    /// 最大接続数
    pub max_connections: usize,
    /// クライアントタイムアウト（秒、未設定なら無制限）
    pub client_timeout_secs: Option<u64>,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_connections: 5,
            client_timeout_secs: None,
        }
    }
}

impl NetworkSettings {
    /// `address:port` 形式のバインドアドレス
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// クライアントの読み込みタイムアウト
    pub fn client_timeout(&self) -> Option<Duration> {
        self.client_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// 判断設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionSettings {
    /// 返信するコマンド文字列（複数なら順番に返す）
    pub replies: Vec<String>,
}

impl Default for DecisionSettings {
    fn default() -> Self {
        Self {
            replies: vec!["U".to_string()],
        }
    }
}

impl ServerSettings {
    /// ファイルから読み込み、検証する
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings: Self = config::load_from_file(path)?;
        settings.validate()?;
        Ok(settings)
    }

    /// ファイルに保存
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        config::save_to_file(self, path)
    }

    /// 設定値を検証
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.bind_address.trim().is_empty() {
            return Err(ConfigError::invalid("network.bind_address", "空にはできません"));
        }
        if self.network.buffer_size == 0 {
            return Err(ConfigError::invalid("network.buffer_size", "1 以上を指定してください"));
        }
        if self.network.max_connections == 0 {
            return Err(ConfigError::invalid("network.max_connections", "1 以上を指定してください"));
        }
        Ok(())
    }
}
