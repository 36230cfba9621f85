//! リンクモジュール
//!
//! レートゲートと接続マネージャを組み合わせ、シミュレーションの1ティックごとに
//! 「送信するか判断 → フレームを用意 → 送信」を行います。
//! 受信したコマンドの読み出しは送信とは独立しており、ホストは毎ティック
//! `current_command` を読めば最新の応答が得られます。

mod rate_gate;

pub use rate_gate::RateGate;

use crate::capture::FrameSource;
use crate::config::ClientSettings;
use crate::network::{ConnectionManager, LinkError};
use rover_link_common::CommandFrame;

use log::debug;

/// 遠隔制御リンク
pub struct Link {
    /// 接続マネージャ
    connection: ConnectionManager,
    /// 送信レートゲート
    gate: RateGate,
    /// 送信したフレーム数
    frames_sent: u64,
}

impl Link {
    /// 設定からリンクを作成（接続はまだ開始しない）
    pub fn new(settings: &ClientSettings) -> Result<Self, LinkError> {
        let connection = ConnectionManager::new(settings.network.clone())?;
        let gate = RateGate::new(settings.rate.send_interval_secs);
        Ok(Self::from_parts(connection, gate))
    }

    /// 構成要素からリンクを作成
    pub fn from_parts(connection: ConnectionManager, gate: RateGate) -> Self {
        Self {
            connection,
            gate,
            frames_sent: 0,
        }
    }

    /// 判断サーバーへの接続を開始
    pub fn start(&self) -> Result<(), LinkError> {
        self.connection.connect()
    }

    /// 1ティック進める
    ///
    /// フレームを送信した場合は `true` を返す。送信の失敗はログに残すだけで、
    /// 呼び出し側にはエラーを返さない。
    ///
    /// 応答待ちの間やフレームを用意できなかったときはゲートを発火済みのまま残し、
    /// 送信できるようになった最初のティックで送る。
    pub fn tick(&mut self, delta_time: f32, frames: &mut dyn FrameSource) -> bool {
        let healthy = self.connection.is_healthy();
        if !self.gate.tick(delta_time, healthy) {
            return false;
        }

        // 応答待ちならフレームを作らずに次のティックへ持ち越す
        if self.connection.is_busy() {
            self.gate.prime();
            return false;
        }

        let frame = match frames.produce_frame() {
            Some(frame) => frame,
            None => {
                debug!("送信するフレームがありません");
                self.gate.prime();
                return false;
            }
        };

        match self.connection.send(frame) {
            Ok(()) => {
                self.frames_sent += 1;
                true
            }
            Err(LinkError::Busy) => {
                self.gate.prime();
                false
            }
            Err(e) => {
                // 詳細は接続マネージャが記録済み
                debug!("フレームを送信できませんでした: {}", e);
                false
            }
        }
    }

    /// 最新のコマンドを取得
    pub fn current_command(&self) -> CommandFrame {
        self.connection.current_command()
    }

    /// 接続が健全か
    pub fn is_healthy(&self) -> bool {
        self.connection.is_healthy()
    }

    /// 送信したフレーム数
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// 接続マネージャを取得
    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    /// レートゲートを取得
    pub fn gate(&self) -> &RateGate {
        &self.gate
    }

    /// 接続を閉じる
    pub fn close(&self) {
        self.connection.close();
    }
}
