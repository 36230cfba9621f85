//! ローバー遠隔制御リンク（シミュレーション側）
//!
//! 一定のシミュレーション時間ごとにフレームを判断サーバーへ送り、
//! 応答として返るコマンド文字列をデコードしてホストに提供します。

pub mod app;
pub mod capture;
pub mod config;
pub mod input;
pub mod link;
pub mod motion;
pub mod network;

pub use app::App;
pub use capture::{FrameSource, StaticFrameSource};
pub use config::ClientSettings;
pub use input::{build_source, CommandSource, ControlMode, LocalInput};
pub use link::{Link, RateGate};
pub use motion::{MotionIntent, MovementSettings};
pub use network::{ConnectionInfo, ConnectionManager, ConnectionState, LinkError};
