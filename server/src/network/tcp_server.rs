//! TCP サーバー実装
//!
//! リンクからのフレームを受け付け、判断ポリシーの返信を書き戻すサーバーを実装します。
//! 接続の受け付けは専用スレッドで行い、クライアントごとに1スレッドを起動します。

use super::session::{SessionEntry, SessionInfo};
use super::ServerError;
use crate::config::NetworkSettings;
use crate::decision::DecisionPolicy;

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

/// 接続要求がないときの待機時間
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// フレームを1つ受信する
///
/// `chunk_size` バイトずつ読み、読めた量が `chunk_size` 未満になった時点で
/// フレームの終わりとみなす。フレーム長が `chunk_size` のちょうど倍数だと
/// 次のデータが届くまで読み込みが続く。空のフレームは切断を表す。
pub fn receive_frame<R: Read>(reader: &mut R, chunk_size: usize) -> io::Result<Vec<u8>> {
    let chunk_size = chunk_size.max(1);
    let mut frame = Vec::new();
    let mut chunk = vec![0u8; chunk_size];

    loop {
        let read = match reader.read(&mut chunk) {
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        frame.extend_from_slice(&chunk[..read]);
        if read < chunk_size {
            return Ok(frame);
        }
    }
}

type Sessions = Arc<Mutex<HashMap<String, SessionEntry>>>;

/// TCP サーバー
pub struct TcpServer {
    /// ネットワーク設定
    config: NetworkSettings,
    /// 判断ポリシー
    policy: Arc<dyn DecisionPolicy>,
    /// リスナースレッド
    listener_thread: Option<thread::JoinHandle<()>>,
    /// スレッド管理用チャネル
    thread_control: Option<mpsc::Sender<()>>,
    /// クライアントセッション
    sessions: Sessions,
    /// 起動中フラグ
    running: Arc<AtomicBool>,
    /// サーバーアドレス
    server_addr: Option<SocketAddr>,
}

impl TcpServer {
    /// 新しい TCP サーバーを作成
    pub fn new(config: NetworkSettings, policy: Arc<dyn DecisionPolicy>) -> Self {
        Self {
            config,
            policy,
            listener_thread: None,
            thread_control: None,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            running: Arc::new(AtomicBool::new(false)),
            server_addr: None,
        }
    }

    /// サーバーを起動し、待ち受けアドレスを返す
    pub fn start(&mut self) -> Result<SocketAddr, ServerError> {
        if self.is_running() {
            return Err(ServerError::AlreadyRunning);
        }

        let bind_addr = self.config.address();
        let listener = TcpListener::bind(&bind_addr)
            .map_err(|e| ServerError::BindError(format!("{}: {}", bind_addr, e)))?;
        listener.set_nonblocking(true)?;

        let local_addr = listener.local_addr()?;
        self.server_addr = Some(local_addr);

        let (tx, rx) = mpsc::channel();
        self.thread_control = Some(tx);

        let config = self.config.clone();
        let policy = self.policy.clone();
        let sessions = self.sessions.clone();
        let running = self.running.clone();
        running.store(true, Ordering::SeqCst);

        let listener_thread = thread::Builder::new()
            .name("rover-link-accept".to_string())
            .spawn(move || {
                info!("TCP サーバー起動: {}", local_addr);

                loop {
                    // サーバー終了要求をチェック
                    match rx.try_recv() {
                        Ok(()) | Err(mpsc::TryRecvError::Disconnected) => break,
                        Err(mpsc::TryRecvError::Empty) => {}
                    }

                    match listener.accept() {
                        Ok((stream, addr)) => {
                            let session_count = sessions.lock().len();
                            if session_count >= config.max_connections {
                                warn!(
                                    "最大接続数到達のため接続を拒否: {} ({}/{})",
                                    addr, session_count, config.max_connections
                                );
                                drop(stream);
                                continue;
                            }

                            if let Err(e) = Self::handle_client(stream, addr, &config, &policy, &sessions) {
                                error!("クライアント処理の開始に失敗: {}: {}", addr, e);
                            }
                        }
                        Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                            thread::sleep(ACCEPT_POLL_INTERVAL);
                        }
                        Err(e) => {
                            error!("接続受付エラー: {}", e);
                            thread::sleep(ACCEPT_POLL_INTERVAL);
                        }
                    }
                }

                running.store(false, Ordering::SeqCst);
                info!("TCP サーバー停止: {}", local_addr);
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                ServerError::ThreadError(e.to_string())
            })?;

        self.listener_thread = Some(listener_thread);
        Ok(local_addr)
    }

    /// クライアントのセッションを登録し、処理スレッドを起動
    fn handle_client(
        stream: TcpStream,
        addr: SocketAddr,
        config: &NetworkSettings,
        policy: &Arc<dyn DecisionPolicy>,
        sessions: &Sessions,
    ) -> Result<(), ServerError> {
        // リスナーの非ブロッキング設定を引き継がないようにする
        stream.set_nonblocking(false)?;
        let _ = stream.set_nodelay(true);
        stream.set_read_timeout(config.client_timeout())?;

        let info = SessionInfo::new(addr);
        let session_id = info.id.clone();
        sessions
            .lock()
            .insert(session_id.clone(), SessionEntry::new(info, stream.try_clone()?));

        info!("クライアント接続: {} (セッション: {})", addr, session_id);

        let buffer_size = config.buffer_size;
        let policy = policy.clone();
        let sessions = sessions.clone();

        let spawned = thread::Builder::new()
            .name(format!("rover-link-session-{}", addr))
            .spawn({
                let session_id = session_id.clone();
                let sessions = sessions.clone();
                move || {
                    Self::serve(stream, &session_id, buffer_size, policy.as_ref(), &sessions);

                    if let Some(entry) = sessions.lock().remove(&session_id) {
                        info!(
                            "クライアント切断: {} (セッション: {}, 接続時間: {} 秒, 受信 {} / 返信 {})",
                            entry.info.peer,
                            session_id,
                            entry.info.elapsed_secs(),
                            entry.info.frames_received,
                            entry.info.replies_sent
                        );
                    }
                }
            });

        if let Err(e) = spawned {
            sessions.lock().remove(&session_id);
            return Err(ServerError::ThreadError(e.to_string()));
        }
        Ok(())
    }

    /// 1クライアント分の受信・返信ループ
    fn serve(
        mut stream: TcpStream,
        session_id: &str,
        buffer_size: usize,
        policy: &dyn DecisionPolicy,
        sessions: &Sessions,
    ) {
        loop {
            let frame = match receive_frame(&mut stream, buffer_size) {
                Ok(frame) if frame.is_empty() => break,
                Ok(frame) => frame,
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                    info!("クライアントタイムアウト (セッション: {})", session_id);
                    break;
                }
                Err(e) => {
                    warn!("受信エラー (セッション: {}): {}", session_id, e);
                    break;
                }
            };

            if let Some(entry) = sessions.lock().get_mut(session_id) {
                entry.info.frames_received += 1;
            }

            let reply = policy.decide(&frame);
            debug!(
                "フレーム受信 {} バイト -> 返信 {:?} (セッション: {})",
                frame.len(),
                reply,
                session_id
            );

            if reply.is_empty() {
                continue;
            }

            if let Err(e) = stream.write_all(reply.as_bytes()).and_then(|_| stream.flush()) {
                warn!("送信エラー (セッション: {}): {}", session_id, e);
                break;
            }

            if let Some(entry) = sessions.lock().get_mut(session_id) {
                entry.info.replies_sent += 1;
            }
        }
    }

    /// サーバーを停止
    ///
    /// 接続中のセッションはソケットを閉じて終了させる。
    pub fn stop(&mut self) {
        if let Some(tx) = self.thread_control.take() {
            let _ = tx.send(());
        }

        if let Some(handle) = self.listener_thread.take() {
            if handle.join().is_err() {
                error!("リスナースレッドの終了に失敗しました");
            }
        }

        let mut sessions = self.sessions.lock();
        for entry in sessions.values() {
            entry.shutdown();
        }
        sessions.clear();

        self.running.store(false, Ordering::SeqCst);
        self.server_addr = None;
    }

    /// 起動中か
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// 待ち受けアドレス（起動中のみ）
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server_addr
    }

    /// 接続中のセッション数
    pub fn active_sessions(&self) -> usize {
        self.sessions.lock().len()
    }

    /// 接続中のセッション情報
    pub fn sessions(&self) -> Vec<SessionInfo> {
        self.sessions.lock().values().map(|entry| entry.info.clone()).collect()
    }
}

impl Drop for TcpServer {
    fn drop(&mut self) {
        self.stop();
    }
}
