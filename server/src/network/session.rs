//! クライアントセッション管理
//!
//! 接続中のクライアントごとの情報を保持します。

use chrono::{DateTime, Local};
use std::net::{Shutdown, SocketAddr, TcpStream};

/// セッション情報
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// セッション ID
    pub id: String,
    /// クライアントのアドレス
    pub peer: SocketAddr,
    /// 接続時刻
    pub connected_at: DateTime<Local>,
    /// 受信したフレーム数
    pub frames_received: u64,
    /// 送信した返信数
    pub replies_sent: u64,
}

impl SessionInfo {
    pub fn new(peer: SocketAddr) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            peer,
            connected_at: Local::now(),
            frames_received: 0,
            replies_sent: 0,
        }
    }

    /// 接続からの経過時間（秒）
    pub fn elapsed_secs(&self) -> i64 {
        (Local::now() - self.connected_at).num_seconds()
    }
}

/// 登録中のセッション
///
/// 停止時に読み込みを中断させるため、ストリームの複製を持つ。
pub(crate) struct SessionEntry {
    pub(crate) info: SessionInfo,
    stream: TcpStream,
}

impl SessionEntry {
    pub(crate) fn new(info: SessionInfo, stream: TcpStream) -> Self {
        Self { info, stream }
    }

    /// ソケットを閉じ、セッションのスレッドの読み込みを終わらせる
    pub(crate) fn shutdown(&self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}
