//! ネットワークモジュール
//!
//! 判断サーバーとの TCP 通信を担当します。
//! フレームの送信と応答の受信は I/O 用のランタイム上で非同期に行われ、
//! シミュレーションのスレッドはブロックされません。

mod protocol;
mod tcp_client;

pub use protocol::{ConnectionInfo, ConnectionState};
pub use tcp_client::ConnectionManager;

use std::io;
use thiserror::Error;

/// リンクのエラー
#[derive(Error, Debug)]
pub enum LinkError {
    /// 接続の確立に失敗した（再試行はしない）
    #[error("接続エラー: {0}")]
    ConnectFailure(String),

    /// 送受信に失敗した（接続は Faulted になる）
    #[error("通信エラー: {0}")]
    TransportFailure(String),

    /// 送信できる状態ではない
    #[error("接続されていません (状態: {0})")]
    NotConnected(ConnectionState),

    /// 前回の応答をまだ待っている
    #[error("前回の応答を待っています")]
    Busy,

    /// 既に接続処理中または接続済み
    #[error("既に接続処理中または接続済みです (状態: {0})")]
    AlreadyActive(ConnectionState),

    /// タイムアウト
    #[error("タイムアウト: {0}")]
    Timeout(String),

    /// ランタイムエラー
    #[error("ランタイムエラー: {0}")]
    Runtime(String),

    /// IO エラー
    #[error("IO エラー: {0}")]
    Io(#[from] io::Error),
}
