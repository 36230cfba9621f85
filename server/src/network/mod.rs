//! ネットワークモジュール
//!
//! 判断サーバーのネットワーク通信機能を提供します。
//! リンクからの接続を受け付け、フレームごとに判断ポリシーの返信を送ります。

pub mod session;
pub mod tcp_server;

pub use session::SessionInfo;
pub use tcp_server::{receive_frame, TcpServer};

use thiserror::Error;

/// サーバーエラー
#[derive(Error, Debug)]
pub enum ServerError {
    /// I/O エラー
    #[error("I/O エラー: {0}")]
    IoError(#[from] std::io::Error),

    /// バインドエラー
    #[error("バインドできません: {0}")]
    BindError(String),

    /// 既に起動している
    #[error("サーバーは既に起動しています")]
    AlreadyRunning,

    /// スレッドエラー
    #[error("スレッドエラー: {0}")]
    ThreadError(String),
}
