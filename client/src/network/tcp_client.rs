//! TCP クライアント実装
//!
//! 判断サーバーとの接続を管理します。
//!
//! 送信は「フレームを書き込み、応答を1回だけ読む」を1組として I/O ランタイム上の
//! タスクで実行します。同時に進行できる組は1つだけで、応答待ちの間の `send` は
//! `LinkError::Busy` で拒否されます（キューイングもパイプライン化もしない）。
//!
//! 受信した応答はデコードされ、`watch` チャネルで最新の1件だけが公開されます。
//! 読み込み1回分を1つの応答として扱うため、応答が分割されて届くとそれぞれが
//! 別の応答としてデコードされます。

use super::{ConnectionInfo, ConnectionState, LinkError};
use rover_link_common::protocol::{self, CommandFrame, OutgoingFrame};

use log::{debug, info, warn};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpSocket, TcpStream};
use tokio::runtime::{Handle, Runtime};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// 接続セッションの状態
///
/// 状態遷移はすべてこのロックの下で行う。`generation` は `connect` と `close` の
/// たびに進み、古い接続に属するタスクの結果を破棄するのに使う。
struct Session {
    /// 接続状態
    state: ConnectionState,
    /// 接続先アドレス
    peer: Option<SocketAddr>,
    /// 待機中のストリーム（送受信中はタスクが所有する）
    stream: Option<TcpStream>,
    /// 応答待ちの送信があるか
    in_flight: bool,
    /// 接続世代
    generation: u64,
}

impl Session {
    fn is_healthy(&self) -> bool {
        self.state == ConnectionState::Connected && (self.stream.is_some() || self.in_flight)
    }
}

/// I/O タスクと共有する状態
struct Shared {
    session: Mutex<Session>,
    commands: watch::Sender<CommandFrame>,
}

impl Shared {
    /// 接続試行の完了を反映
    fn finish_connect(&self, generation: u64, result: Result<(TcpStream, SocketAddr), LinkError>) {
        let mut session = self.session.lock();
        if session.generation != generation || session.state != ConnectionState::Connecting {
            debug!("破棄された接続試行の結果を無視します");
            return;
        }

        match result {
            Ok((stream, addr)) => {
                session.stream = Some(stream);
                session.peer = Some(addr);
                session.state = ConnectionState::Connected;
                info!("判断サーバーに接続しました: {}", addr);
            }
            Err(e) => {
                session.state = ConnectionState::Faulted;
                warn!("判断サーバーへの接続に失敗しました: {}", e);
            }
        }
    }

    /// 送受信の完了を反映
    fn finish_exchange(&self, generation: u64, stream: TcpStream, outcome: Result<Vec<u8>, LinkError>) {
        let mut session = self.session.lock();
        if session.generation != generation {
            debug!("閉じられた接続の応答を破棄します");
            return;
        }

        match outcome {
            Ok(reply) => {
                let command = protocol::decode(&reply);
                debug!("応答を受信しました ({} バイト): {}", reply.len(), command);
                // 次の送信を受け付ける前に公開する
                self.commands.send_replace(command);
                session.stream = Some(stream);
                session.in_flight = false;
            }
            Err(e) => {
                // ストリームを破棄してソケットを閉じる
                drop(stream);
                session.in_flight = false;
                session.peer = None;
                session.state = ConnectionState::Faulted;
                warn!("通信エラーのため接続を閉じました: {}", e);
            }
        }
    }
}

/// 実行中のタスク
#[derive(Default)]
struct Tasks {
    connect: Option<JoinHandle<()>>,
    exchange: Option<JoinHandle<()>>,
}

/// 判断サーバーとの接続マネージャ
pub struct ConnectionManager {
    /// 接続情報
    info: ConnectionInfo,
    /// I/O タスクと共有する状態
    shared: Arc<Shared>,
    /// I/O ランタイムのハンドル
    handle: Handle,
    /// 自前で作成したランタイム（外部ハンドル使用時は `None`）
    runtime: Option<Runtime>,
    /// 実行中のタスク
    tasks: Mutex<Tasks>,
}

impl ConnectionManager {
    /// 専用の I/O ランタイムを持つ接続マネージャを作成
    pub fn new(info: ConnectionInfo) -> Result<Self, LinkError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("rover-link-io")
            .enable_all()
            .build()
            .map_err(|e| LinkError::Runtime(format!("Tokio ランタイムの作成に失敗しました: {}", e)))?;

        let handle = runtime.handle().clone();
        Ok(Self::build(info, handle, Some(runtime)))
    }

    /// 既存のランタイム上で動く接続マネージャを作成
    pub fn with_handle(info: ConnectionInfo, handle: Handle) -> Self {
        Self::build(info, handle, None)
    }

    fn build(info: ConnectionInfo, handle: Handle, runtime: Option<Runtime>) -> Self {
        let (commands, _) = watch::channel(CommandFrame::IDLE);
        let session = Session {
            state: ConnectionState::Disconnected,
            peer: None,
            stream: None,
            in_flight: false,
            generation: 0,
        };

        Self {
            info,
            shared: Arc::new(Shared {
                session: Mutex::new(session),
                commands,
            }),
            handle,
            runtime,
            tasks: Mutex::new(Tasks::default()),
        }
    }

    /// 設定済みのアドレスへ接続を開始
    pub fn connect(&self) -> Result<(), LinkError> {
        let host = self.info.host.clone();
        self.connect_to(&host, self.info.port)
    }

    /// 指定アドレスへ接続を開始
    ///
    /// ブロックせずに戻る。失敗しても再試行はせず、状態が `Faulted` になるだけ。
    pub fn connect_to(&self, host: &str, port: u16) -> Result<(), LinkError> {
        let generation = {
            let mut session = self.shared.session.lock();
            if matches!(session.state, ConnectionState::Connecting | ConnectionState::Connected) {
                return Err(LinkError::AlreadyActive(session.state));
            }
            session.generation += 1;
            session.state = ConnectionState::Connecting;
            session.peer = None;
            session.stream = None;
            session.in_flight = false;
            session.generation
        };

        info!("判断サーバーへの接続を開始します: {}:{}", host, port);

        let shared = self.shared.clone();
        let host = host.to_string();
        let buffer_size = self.info.buffer_size;
        let connect_timeout = self.info.connect_timeout();

        let task = self.handle.spawn(async move {
            let result = match connect_timeout {
                Some(limit) => tokio::time::timeout(limit, open_stream(&host, port, buffer_size))
                    .await
                    .unwrap_or_else(|_| {
                        Err(LinkError::Timeout(format!("{:?} 以内に接続できませんでした", limit)))
                    }),
                None => open_stream(&host, port, buffer_size).await,
            };
            shared.finish_connect(generation, result);
        });

        self.tasks.lock().connect = Some(task);
        Ok(())
    }

    /// フレームを送信し、応答の受信を開始
    ///
    /// 接続が健全でなければ送信せずにエラーを返す。
    /// 応答待ちの送信がある間は `LinkError::Busy` を返す。
    pub fn send(&self, frame: OutgoingFrame) -> Result<(), LinkError> {
        let (stream, generation) = {
            let mut session = self.shared.session.lock();
            if !session.is_healthy() {
                warn!("接続が確立していないため送信を中止しました (状態: {})", session.state);
                return Err(LinkError::NotConnected(session.state));
            }
            if session.in_flight {
                return Err(LinkError::Busy);
            }
            let stream = match session.stream.take() {
                Some(stream) => stream,
                None => return Err(LinkError::NotConnected(session.state)),
            };
            session.in_flight = true;
            (stream, session.generation)
        };

        debug!("フレームを送信します: {} バイト", frame.len());

        let shared = self.shared.clone();
        let buffer_size = self.info.buffer_size;
        let reply_timeout = self.info.reply_timeout();

        let task = self.handle.spawn(async move {
            let mut stream = stream;
            let outcome = exchange(&mut stream, &frame, buffer_size, reply_timeout).await;
            shared.finish_exchange(generation, stream, outcome);
        });

        self.tasks.lock().exchange = Some(task);
        Ok(())
    }

    /// 接続を閉じる
    ///
    /// 進行中の接続試行と送受信は中断される。何度呼んでもよい。
    pub fn close(&self) {
        {
            let mut tasks = self.tasks.lock();
            if let Some(task) = tasks.connect.take() {
                task.abort();
            }
            if let Some(task) = tasks.exchange.take() {
                task.abort();
            }
        }

        let mut session = self.shared.session.lock();
        let previous = session.state;
        session.generation += 1;
        session.state = ConnectionState::Disconnected;
        session.peer = None;
        session.stream = None;
        session.in_flight = false;

        if previous != ConnectionState::Disconnected {
            info!("接続を閉じました (直前の状態: {})", previous);
        }
    }

    /// 接続が健全か（接続済みでストリームが生きている）
    pub fn is_healthy(&self) -> bool {
        self.shared.session.lock().is_healthy()
    }

    /// 応答待ちの送信があるか
    pub fn is_busy(&self) -> bool {
        self.shared.session.lock().in_flight
    }

    /// 接続状態を取得
    pub fn state(&self) -> ConnectionState {
        self.shared.session.lock().state
    }

    /// 接続先アドレスを取得
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.shared.session.lock().peer
    }

    /// 最新のコマンドを取得
    pub fn current_command(&self) -> CommandFrame {
        *self.shared.commands.borrow()
    }

    /// コマンドの更新を購読
    pub fn subscribe(&self) -> watch::Receiver<CommandFrame> {
        self.shared.commands.subscribe()
    }

    /// 接続情報を取得
    pub fn info(&self) -> &ConnectionInfo {
        &self.info
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close();
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// ソケットを作成して接続
async fn open_stream(host: &str, port: u16, buffer_size: usize) -> Result<(TcpStream, SocketAddr), LinkError> {
    let addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| LinkError::ConnectFailure(format!("アドレスを解決できません {}:{}: {}", host, port, e)))?;

    let buffer_size = u32::try_from(buffer_size).unwrap_or(u32::MAX);
    let mut last_error = None;

    for addr in addrs {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };

        // バッファサイズを設定
        if let Err(e) = socket.set_recv_buffer_size(buffer_size) {
            debug!("受信バッファサイズを設定できませんでした: {}", e);
        }
        if let Err(e) = socket.set_send_buffer_size(buffer_size) {
            debug!("送信バッファサイズを設定できませんでした: {}", e);
        }

        match socket.connect(addr).await {
            Ok(stream) => {
                // Nagle アルゴリズムを無効化
                stream.set_nodelay(true)?;
                return Ok((stream, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(LinkError::ConnectFailure(match last_error {
        Some(e) => format!("{}:{} に接続できません: {}", host, port, e),
        None => format!("{}:{} に対応するアドレスがありません", host, port),
    }))
}

/// フレームを書き込み、応答を1回読む
async fn exchange(
    stream: &mut TcpStream,
    frame: &OutgoingFrame,
    buffer_size: usize,
    reply_timeout: Option<Duration>,
) -> Result<Vec<u8>, LinkError> {
    stream
        .write_all(frame.as_bytes())
        .await
        .map_err(|e| LinkError::TransportFailure(format!("送信に失敗しました: {}", e)))?;
    stream
        .flush()
        .await
        .map_err(|e| LinkError::TransportFailure(format!("送信に失敗しました: {}", e)))?;

    let mut buffer = vec![0u8; buffer_size.max(1)];
    let read = match reply_timeout {
        Some(limit) => tokio::time::timeout(limit, stream.read(&mut buffer))
            .await
            .map_err(|_| LinkError::Timeout(format!("{:?} 以内に応答がありませんでした", limit)))?,
        None => stream.read(&mut buffer).await,
    };

    let len = read.map_err(|e| LinkError::TransportFailure(format!("受信に失敗しました: {}", e)))?;
    if len == 0 {
        return Err(LinkError::TransportFailure("サーバーが接続を閉じました".to_string()));
    }

    buffer.truncate(len);
    Ok(buffer)
}
