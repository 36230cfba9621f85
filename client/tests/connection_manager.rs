//! 接続マネージャの結合テスト
//!
//! ループバックの `TcpListener` を相手に、接続・送受信・障害時の状態遷移を確認する。

use rover_link_client::{ConnectionInfo, ConnectionManager, ConnectionState, LinkError};
use rover_link_common::OutgoingFrame;

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

fn manager_for(addr: SocketAddr) -> ConnectionManager {
    ConnectionManager::new(ConnectionInfo::new("127.0.0.1", addr.port())).unwrap()
}

/// 接続を確立し、相手側のストリームを返す
fn connect_pair(listener: &TcpListener, manager: &ConnectionManager) -> TcpStream {
    manager.connect().unwrap();
    let (peer, _) = listener.accept().unwrap();
    peer.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    assert!(wait_until(|| manager.is_healthy()));
    peer
}

fn frame(bytes: &[u8]) -> OutgoingFrame {
    OutgoingFrame::new(bytes.to_vec())
}

#[test]
fn test_connect_becomes_healthy() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let manager = manager_for(addr);

    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert!(!manager.is_healthy());
    assert!(manager.current_command().is_idle());

    let _peer = connect_pair(&listener, &manager);
    assert_eq!(manager.state(), ConnectionState::Connected);
    assert_eq!(manager.peer_addr(), Some(addr));

    // 接続中の再接続は拒否
    assert!(matches!(manager.connect(), Err(LinkError::AlreadyActive(ConnectionState::Connected))));
}

#[test]
fn test_send_updates_command() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let manager = manager_for(listener.local_addr().unwrap());
    let mut peer = connect_pair(&listener, &manager);

    manager.send(frame(b"frame")).unwrap();

    let mut buf = [0u8; 64];
    let n = peer.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"frame");

    peer.write_all(b"RRF").unwrap();
    assert!(wait_until(|| !manager.is_busy()));

    let command = manager.current_command();
    assert_eq!(command.strafe_delta, 2.0);
    assert_eq!(command.forward_delta, 1.0);
    assert!(manager.is_healthy());

    // 次の応答はコマンドを置き換える（積算しない）
    manager.send(frame(b"frame")).unwrap();
    let _ = peer.read(&mut buf).unwrap();
    peer.write_all(b"J").unwrap();
    assert!(wait_until(|| manager.current_command().jump));
    let command = manager.current_command();
    assert_eq!(command.strafe_delta, 0.0);
    assert_eq!(command.forward_delta, 0.0);
}

#[test]
fn test_second_send_is_busy() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let manager = manager_for(listener.local_addr().unwrap());
    let mut peer = connect_pair(&listener, &manager);

    manager.send(frame(b"first")).unwrap();
    assert!(manager.is_busy());
    assert!(matches!(manager.send(frame(b"second")), Err(LinkError::Busy)));
    // 応答待ちの間も健全
    assert!(manager.is_healthy());

    let mut buf = [0u8; 64];
    let n = peer.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"first");
    peer.write_all(b"l").unwrap();

    assert!(wait_until(|| !manager.is_busy()));
    assert_eq!(manager.current_command().yaw_delta, -1.0);
    manager.send(frame(b"third")).unwrap();
}

#[test]
fn test_peer_close_faults_and_keeps_command() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let manager = manager_for(listener.local_addr().unwrap());
    let mut peer = connect_pair(&listener, &manager);

    manager.send(frame(b"frame")).unwrap();
    let mut buf = [0u8; 64];
    let _ = peer.read(&mut buf).unwrap();
    peer.write_all(b"FF").unwrap();
    assert!(wait_until(|| manager.current_command().forward_delta == 2.0));
    assert!(wait_until(|| !manager.is_busy()));

    manager.send(frame(b"frame")).unwrap();
    let _ = peer.read(&mut buf).unwrap();
    drop(peer);

    assert!(wait_until(|| manager.state() == ConnectionState::Faulted));
    assert!(!manager.is_healthy());
    assert!(!manager.is_busy());
    // 直前のコマンドは維持される
    assert_eq!(manager.current_command().forward_delta, 2.0);

    assert!(matches!(
        manager.send(frame(b"frame")),
        Err(LinkError::NotConnected(ConnectionState::Faulted))
    ));
}

#[test]
fn test_reply_timeout_faults() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let mut info = ConnectionInfo::new("127.0.0.1", listener.local_addr().unwrap().port());
    info.reply_timeout_ms = Some(100);
    let manager = ConnectionManager::new(info).unwrap();
    let mut peer = connect_pair(&listener, &manager);

    manager.send(frame(b"frame")).unwrap();
    let mut buf = [0u8; 64];
    let _ = peer.read(&mut buf).unwrap();

    // 応答しない
    assert!(wait_until(|| manager.state() == ConnectionState::Faulted));
    assert!(manager.current_command().is_idle());
}

#[test]
fn test_connect_failure_is_not_retried() {
    // 空きポートを確保してから閉じる
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let manager = manager_for(addr);

    manager.connect().unwrap();
    assert!(wait_until(|| manager.state() == ConnectionState::Faulted));
    assert_eq!(manager.peer_addr(), None);

    thread::sleep(Duration::from_millis(200));
    assert_eq!(manager.state(), ConnectionState::Faulted);
    assert!(matches!(manager.send(frame(b"frame")), Err(LinkError::NotConnected(_))));
}

#[test]
fn test_reconnect_after_fault() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let manager = manager_for(listener.local_addr().unwrap());
    let peer = connect_pair(&listener, &manager);

    manager.send(frame(b"frame")).unwrap();
    drop(peer);
    assert!(wait_until(|| manager.state() == ConnectionState::Faulted));

    // 明示的に接続し直せる
    let mut peer = connect_pair(&listener, &manager);
    manager.send(frame(b"again")).unwrap();
    let mut buf = [0u8; 64];
    let n = peer.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"again");
}

#[test]
fn test_close_is_idempotent() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let manager = manager_for(listener.local_addr().unwrap());

    // 未接続のまま閉じてもよい
    manager.close();
    assert_eq!(manager.state(), ConnectionState::Disconnected);

    let mut peer = connect_pair(&listener, &manager);
    manager.send(frame(b"frame")).unwrap();

    manager.close();
    manager.close();
    assert_eq!(manager.state(), ConnectionState::Disconnected);
    assert!(!manager.is_healthy());
    assert!(!manager.is_busy());

    // 閉じた後に届いた応答は反映されない
    let mut buf = [0u8; 64];
    let _ = peer.read(&mut buf);
    let _ = peer.write_all(b"FFFF");
    thread::sleep(Duration::from_millis(100));
    assert!(manager.current_command().is_idle());

    assert!(matches!(
        manager.send(frame(b"frame")),
        Err(LinkError::NotConnected(ConnectionState::Disconnected))
    ));
}

#[test]
fn test_send_without_connect() {
    let manager = ConnectionManager::new(ConnectionInfo::default()).unwrap();
    assert!(matches!(
        manager.send(frame(b"frame")),
        Err(LinkError::NotConnected(ConnectionState::Disconnected))
    ));
}

#[test]
fn test_with_external_runtime() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let info = ConnectionInfo::new("127.0.0.1", listener.local_addr().unwrap().port());
    let manager = ConnectionManager::with_handle(info, runtime.handle().clone());
    let mut peer = connect_pair(&listener, &manager);

    let receiver = manager.subscribe();
    manager.send(frame(b"frame")).unwrap();
    let mut buf = [0u8; 64];
    let _ = peer.read(&mut buf).unwrap();
    peer.write_all(b"D").unwrap();

    assert!(wait_until(|| receiver.borrow().pitch_delta == -2.0));
    drop(manager);
}
