//! ローバー遠隔制御リンクの判断サーバー
//!
//! リンクから届くフレームを受け取り、コマンド文字列を返す参照用のサーバーです。

pub mod config;
pub mod decision;
pub mod network;

pub use config::ServerSettings;
pub use decision::{CyclingReply, DecisionPolicy, FixedReply};
pub use network::{ServerError, SessionInfo, TcpServer};
