//! コマンド入力モジュール
//!
//! ローバーを動かすコマンドの出どころを抽象化します。
//! 遠隔モードでは判断サーバーの応答（`Link`）、ローカルモードではホスト側で
//! 直接設定したコマンド（`LocalInput`）が使われます。

use crate::capture::FrameSource;
use crate::config::ClientSettings;
use crate::link::Link;
use crate::network::LinkError;
use rover_link_common::CommandFrame;

use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 操作モード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    /// 判断サーバーによる遠隔操作
    #[default]
    Remote,
    /// ホスト側での直接操作
    Local,
}

impl ControlMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlMode::Remote => "remote",
            ControlMode::Local => "local",
        }
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControlMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "remote" => Ok(ControlMode::Remote),
            "local" => Ok(ControlMode::Local),
            other => Err(format!("不明な操作モード: {}", other)),
        }
    }
}

/// コマンドの供給元
pub trait CommandSource {
    /// 1ティック進める（遠隔モードではここでフレームを送信する）
    fn tick(&mut self, delta_time: f32, frames: &mut dyn FrameSource);

    /// このティックで適用するコマンド
    fn current_command(&self) -> CommandFrame;

    /// 供給元が健全か
    fn is_healthy(&self) -> bool;

    /// 操作モード
    fn mode(&self) -> ControlMode;

    /// ローカル入力として操作できる場合はその参照
    fn local_input(&mut self) -> Option<&mut LocalInput> {
        None
    }
}

/// ホスト側で直接設定するコマンド
#[derive(Debug, Clone, Default)]
pub struct LocalInput {
    command: CommandFrame,
}

impl LocalInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// コマンドを設定（次に設定されるまで維持される）
    pub fn set_command(&mut self, command: CommandFrame) {
        self.command = command;
    }

    /// 停止状態に戻す
    pub fn clear(&mut self) {
        self.command = CommandFrame::IDLE;
    }
}

impl CommandSource for LocalInput {
    fn tick(&mut self, _delta_time: f32, _frames: &mut dyn FrameSource) {}

    fn current_command(&self) -> CommandFrame {
        self.command
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn mode(&self) -> ControlMode {
        ControlMode::Local
    }

    fn local_input(&mut self) -> Option<&mut LocalInput> {
        Some(self)
    }
}

impl CommandSource for Link {
    fn tick(&mut self, delta_time: f32, frames: &mut dyn FrameSource) {
        Link::tick(self, delta_time, frames);
    }

    fn current_command(&self) -> CommandFrame {
        Link::current_command(self)
    }

    fn is_healthy(&self) -> bool {
        Link::is_healthy(self)
    }

    fn mode(&self) -> ControlMode {
        ControlMode::Remote
    }
}

/// 設定に応じたコマンド供給元を作成
///
/// 遠隔モードでは接続を1回だけ開始する。接続に失敗しても再試行はしない。
pub fn build_source(settings: &ClientSettings) -> Result<Box<dyn CommandSource>, LinkError> {
    match settings.control.mode {
        ControlMode::Remote => {
            let link = Link::new(settings)?;
            link.start()?;
            info!("遠隔操作モードで起動します: {}", settings.network.address());
            Ok(Box::new(link))
        }
        ControlMode::Local => {
            info!("ローカル操作モードで起動します");
            Ok(Box::new(LocalInput::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::StaticFrameSource;
    use rover_link_common::decode;

    #[test]
    fn test_control_mode_parse() {
        assert_eq!("remote".parse::<ControlMode>(), Ok(ControlMode::Remote));
        assert_eq!(" Local ".parse::<ControlMode>(), Ok(ControlMode::Local));
        assert!("auto".parse::<ControlMode>().is_err());
        assert_eq!(ControlMode::default(), ControlMode::Remote);
        assert_eq!(ControlMode::Local.to_string(), "local");
    }

    #[test]
    fn test_local_input() {
        let mut source = LocalInput::new();
        let mut frames = StaticFrameSource::placeholder();

        assert!(source.is_healthy());
        assert!(source.current_command().is_idle());

        source.set_command(decode(b"FFl"));
        source.tick(0.5, &mut frames);
        assert_eq!(source.current_command().forward_delta, 2.0);
        // ローカルモードではフレームを要求しない
        assert_eq!(frames.produced(), 0);

        source.clear();
        assert!(source.current_command().is_idle());
    }

    #[test]
    fn test_build_local_source() {
        let mut settings = ClientSettings::default();
        settings.control.mode = ControlMode::Local;

        let mut source = build_source(&settings).unwrap();
        assert_eq!(source.mode(), ControlMode::Local);

        source
            .local_input()
            .expect("ローカル入力")
            .set_command(decode(b"J"));
        assert!(source.current_command().jump);
    }
}
