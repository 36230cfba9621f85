//! メインアプリケーション
//!
//! ホスト（シミュレーション）のティックを代行するドライバを実装します。
//! 毎ティック、コマンド供給元を進め、最新のコマンドから移動意図を作ります。

use crate::capture::FrameSource;
use crate::config::ClientSettings;
use crate::input::{self, CommandSource, ControlMode, LocalInput};
use crate::motion::{MotionIntent, MovementSettings};
use crate::network::LinkError;
use rover_link_common::CommandFrame;

use log::{debug, info, warn};

/// アプリケーション
pub struct App {
    /// コマンド供給元
    source: Box<dyn CommandSource>,
    /// フレーム供給元
    frames: Box<dyn FrameSource>,
    /// 移動設定
    movement: MovementSettings,
    /// 直前のティックのコマンド
    last_command: CommandFrame,
    /// 直前のティックの健全性
    last_healthy: Option<bool>,
    /// 経過ティック数
    ticks: u64,
}

impl App {
    /// 設定からアプリケーションを作成
    ///
    /// 遠隔モードではここで接続を開始する。
    pub fn new(settings: &ClientSettings, frames: Box<dyn FrameSource>) -> Result<Self, LinkError> {
        let source = input::build_source(settings)?;
        Ok(Self::with_source(source, frames, settings.movement.clone()))
    }

    /// 任意のコマンド供給元で作成
    pub fn with_source(
        source: Box<dyn CommandSource>,
        frames: Box<dyn FrameSource>,
        movement: MovementSettings,
    ) -> Self {
        Self {
            source,
            frames,
            movement,
            last_command: CommandFrame::IDLE,
            last_healthy: None,
            ticks: 0,
        }
    }

    /// 1ティック進め、このティックの移動意図を返す
    pub fn step(&mut self, delta_time: f32) -> MotionIntent {
        self.source.tick(delta_time, self.frames.as_mut());
        self.ticks += 1;

        let healthy = self.source.is_healthy();
        if self.last_healthy != Some(healthy) {
            if healthy {
                info!("コマンド供給元が利用可能になりました ({})", self.source.mode());
            } else if self.last_healthy.is_some() {
                warn!("コマンド供給元が利用できなくなりました ({})", self.source.mode());
            }
            self.last_healthy = Some(healthy);
        }

        let command = self.source.current_command();
        let intent = self.movement.plan(&command);
        if command != self.last_command {
            debug!("コマンド更新: {} -> {}", command, intent);
            self.last_command = command;
        }

        intent
    }

    /// 操作モード
    pub fn mode(&self) -> ControlMode {
        self.source.mode()
    }

    /// ローカル入力（ローカルモードのときのみ）
    pub fn local_input(&mut self) -> Option<&mut LocalInput> {
        self.source.local_input()
    }

    /// 供給元が健全か
    pub fn is_healthy(&self) -> bool {
        self.source.is_healthy()
    }

    /// 経過ティック数
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
