//! 判断ポリシー
//!
//! 受信したフレームに対して返すコマンド文字列を決めます。
//! 参照用のサーバーなので画像の中身は見ず、設定された文字列を返すだけです。

use crate::config::DecisionSettings;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// 判断ポリシー
pub trait DecisionPolicy: Send + Sync {
    /// フレームに対する返信（コマンド文字列）を決める
    fn decide(&self, frame: &[u8]) -> String;
}

/// 常に同じ返信をするポリシー
#[derive(Debug, Clone)]
pub struct FixedReply {
    reply: String,
}

impl FixedReply {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

impl Default for FixedReply {
    /// 視点を少し上げるだけの返信
    fn default() -> Self {
        Self::new("U")
    }
}

impl DecisionPolicy for FixedReply {
    fn decide(&self, _frame: &[u8]) -> String {
        self.reply.clone()
    }
}

/// 返信リストを順番に巡回するポリシー
///
/// 全セッションで1つのカーソルを共有する。
#[derive(Debug)]
pub struct CyclingReply {
    replies: Vec<String>,
    next: AtomicUsize,
}

impl CyclingReply {
    pub fn new(replies: Vec<String>) -> Self {
        Self {
            replies,
            next: AtomicUsize::new(0),
        }
    }
}

impl DecisionPolicy for CyclingReply {
    fn decide(&self, _frame: &[u8]) -> String {
        if self.replies.is_empty() {
            return String::new();
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.replies.len();
        self.replies[index].clone()
    }
}

/// 設定からポリシーを作成
pub fn from_settings(settings: &DecisionSettings) -> Arc<dyn DecisionPolicy> {
    match settings.replies.as_slice() {
        [] => Arc::new(FixedReply::new("")),
        [reply] => Arc::new(FixedReply::new(reply.clone())),
        replies => Arc::new(CyclingReply::new(replies.to_vec())),
    }
}
