//! 接続情報と接続状態の定義

use rover_link_common::{DEFAULT_BUFFER_SIZE, DEFAULT_HOST, DEFAULT_PORT};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// 接続状態
///
/// `Disconnected → Connecting → Connected → {Faulted, Disconnected}`。
/// `Faulted` と `Disconnected` からの復帰には明示的な `connect` が必要。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// 未接続
    Disconnected,
    /// 接続中
    Connecting,
    /// 接続済み
    Connected,
    /// 通信エラーで切断された
    Faulted,
}

impl ConnectionState {
    /// 文字列表現を取得
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Faulted => "Faulted",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 接続情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionInfo {
    /// 判断サーバーのホスト
    pub host: String,
    /// 判断サーバーのポート
    pub port: u16,
    /// 送受信バッファサイズ（バイト）
    pub buffer_size: usize,
    /// 接続タイムアウト（ミリ秒、0 で無制限）
    pub connect_timeout_ms: u64,
    /// 応答タイムアウト（ミリ秒、未設定なら無制限）
    pub reply_timeout_ms: Option<u64>,
}

impl ConnectionInfo {
    /// 指定アドレスの接続情報を作成
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// 接続タイムアウト
    pub fn connect_timeout(&self) -> Option<Duration> {
        match self.connect_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// 応答タイムアウト
    pub fn reply_timeout(&self) -> Option<Duration> {
        self.reply_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// `host:port` 形式のアドレス
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ConnectionInfo {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            buffer_size: DEFAULT_BUFFER_SIZE,
            connect_timeout_ms: 5000,
            reply_timeout_ms: None,
        }
    }
}
