//! 通信プロトコル定義
//!
//! シミュレーションと判断サーバーの間でやり取りされるデータを定義します。
//!
//! - 送信側: エンコード済みのフレーム（JPEG等）をそのままバイト列で送る。
//!   長さプレフィックスや区切り文字は付けない。
//! - 受信側: ASCII 文字列。1文字が1つの操作を表し、1回の読み込みで届いた分が
//!   1つの応答として扱われる（終端文字はない）。
//!
//! 応答が複数の読み込みに分割された場合の扱いは定義されていない。
//! 分割されると、それぞれが独立した応答としてデコードされる。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 判断サーバーへ送信するフレーム
///
/// 外部のエンコーダが生成した不透明なバイト列。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingFrame(Vec<u8>);

impl OutgoingFrame {
    /// バイト列からフレームを作成
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// フレームのバイト列を取得
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// バイト数
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 空かどうか
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for OutgoingFrame {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for OutgoingFrame {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

/// デコード済みの移動コマンド
///
/// 最新の応答1件分だけを表す。応答をまたいだ累積は行わない。
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandFrame {
    /// 横移動量（正が右）
    pub strafe_delta: f32,
    /// 前後移動量（正が前）
    pub forward_delta: f32,
    /// ヨー回転量
    pub yaw_delta: f32,
    /// ピッチ回転量
    pub pitch_delta: f32,
    /// ジャンプ
    pub jump: bool,
    /// 走行モード
    pub run: bool,
}

impl CommandFrame {
    /// すべてゼロのコマンド
    pub const IDLE: CommandFrame = CommandFrame {
        strafe_delta: 0.0,
        forward_delta: 0.0,
        yaw_delta: 0.0,
        pitch_delta: 0.0,
        jump: false,
        run: false,
    };

    /// 移動入力があるかどうか
    pub fn has_movement(&self) -> bool {
        self.strafe_delta != 0.0 || self.forward_delta != 0.0
    }

    /// 何も操作を含まないかどうか
    pub fn is_idle(&self) -> bool {
        *self == Self::IDLE
    }
}

impl fmt::Display for CommandFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "strafe={} forward={} yaw={} pitch={} jump={} run={}",
            self.strafe_delta,
            self.forward_delta,
            self.yaw_delta,
            self.pitch_delta,
            self.jump,
            self.run
        )
    }
}

/// 応答文字列を構成する操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// ジャンプ (`J`)
    Jump,
    /// 走行 (`T`)
    Run,
    /// 左へ移動 (`L`)
    StrafeLeft,
    /// 右へ移動 (`R`)
    StrafeRight,
    /// 後退 (`V`)
    Backward,
    /// 前進 (`F`)
    Forward,
    /// 左へ旋回 (`l`)
    TurnLeft,
    /// 右へ旋回 (`r`)
    TurnRight,
    /// 上を向く (`U`)
    LookUp,
    /// 下を向く (`D`)
    LookDown,
}

impl Action {
    /// すべての操作
    pub const ALL: [Action; 10] = [
        Action::Jump,
        Action::Run,
        Action::StrafeLeft,
        Action::StrafeRight,
        Action::Backward,
        Action::Forward,
        Action::TurnLeft,
        Action::TurnRight,
        Action::LookUp,
        Action::LookDown,
    ];

    /// プロトコル上の文字
    pub fn as_char(&self) -> char {
        match self {
            Action::Jump => 'J',
            Action::Run => 'T',
            Action::StrafeLeft => 'L',
            Action::StrafeRight => 'R',
            Action::Backward => 'V',
            Action::Forward => 'F',
            Action::TurnLeft => 'l',
            Action::TurnRight => 'r',
            Action::LookUp => 'U',
            Action::LookDown => 'D',
        }
    }

    /// バイトから操作を取得（対象外の文字は `None`）
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'J' => Some(Action::Jump),
            b'T' => Some(Action::Run),
            b'L' => Some(Action::StrafeLeft),
            b'R' => Some(Action::StrafeRight),
            b'V' => Some(Action::Backward),
            b'F' => Some(Action::Forward),
            b'l' => Some(Action::TurnLeft),
            b'r' => Some(Action::TurnRight),
            b'U' => Some(Action::LookUp),
            b'D' => Some(Action::LookDown),
            _ => None,
        }
    }
}

/// 応答バッファをコマンドにデコード
///
/// 常にゼロのコマンドから開始し、文字の出現回数だけで結果が決まる。
/// 文字の順序には依存しない。対象外のバイトは無視する。
/// 空のバッファはゼロのコマンドになる（エラーではない）。
pub fn decode(bytes: &[u8]) -> CommandFrame {
    let mut counts = [0u32; Action::ALL.len()];
    for action in bytes.iter().filter_map(|b| Action::from_byte(*b)) {
        counts[action as usize] += 1;
    }
    let count = |action: Action| counts[action as usize] as f32;

    CommandFrame {
        strafe_delta: count(Action::StrafeRight) - count(Action::StrafeLeft),
        forward_delta: count(Action::Forward) - count(Action::Backward),
        yaw_delta: count(Action::TurnRight) - count(Action::TurnLeft),
        // ピッチは1文字あたり2
        pitch_delta: 2.0 * (count(Action::LookUp) - count(Action::LookDown)),
        jump: counts[Action::Jump as usize] > 0,
        run: counts[Action::Run as usize] > 0,
    }
}

/// 操作列を応答文字列にエンコード
pub fn encode_actions(actions: &[Action]) -> String {
    actions.iter().map(Action::as_char).collect()
}
