//! 移動計画
//!
//! デコード済みのコマンドを、ホストの物理処理が使う移動意図に変換します。
//! 力の適用や斜面補正は行いません（ホスト側の責務）。

use rover_link_common::CommandFrame;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 移動設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementSettings {
    /// 前進速度
    pub forward_speed: f32,
    /// 後退速度
    pub backward_speed: f32,
    /// 横移動速度
    pub strafe_speed: f32,
    /// 走行時の速度倍率
    pub run_multiplier: f32,
    /// ジャンプの力
    pub jump_force: f32,
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            forward_speed: 8.0,
            backward_speed: 4.0,
            strafe_speed: 4.0,
            run_multiplier: 2.0,
            jump_force: 30.0,
        }
    }
}

/// 1ティック分の移動意図
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionIntent {
    /// 横方向の入力
    pub strafe: f32,
    /// 前後方向の入力
    pub forward: f32,
    /// 目標速度（移動入力がなければ `None` で、ホストは直前の値を維持する）
    pub target_speed: Option<f32>,
    /// 走行中か
    pub running: bool,
    /// ジャンプの力（ジャンプしないなら 0）
    pub jump_impulse: f32,
    /// ヨー回転量
    pub yaw: f32,
    /// ピッチ回転量
    pub pitch: f32,
}

impl fmt::Display for MotionIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "move=({}, {})", self.strafe, self.forward)?;
        if let Some(speed) = self.target_speed {
            write!(f, " speed={}", speed)?;
        }
        write!(f, " look=({}, {})", self.yaw, self.pitch)?;
        if self.running {
            f.write_str(" running")?;
        }
        if self.jump_impulse > 0.0 {
            write!(f, " jump={}", self.jump_impulse)?;
        }
        Ok(())
    }
}

impl MovementSettings {
    /// コマンドに対する目標速度
    ///
    /// 横移動・後退・前進の順に上書きするため、前進が最優先になる。
    pub fn target_speed(&self, command: &CommandFrame) -> Option<f32> {
        if !command.has_movement() {
            return None;
        }

        let mut speed = 0.0;
        if command.strafe_delta != 0.0 {
            speed = self.strafe_speed;
        }
        if command.forward_delta < 0.0 {
            speed = self.backward_speed;
        }
        if command.forward_delta > 0.0 {
            speed = self.forward_speed;
        }
        if command.run {
            speed *= self.run_multiplier;
        }
        Some(speed)
    }

    /// コマンドから移動意図を作成
    pub fn plan(&self, command: &CommandFrame) -> MotionIntent {
        let target_speed = self.target_speed(command);
        MotionIntent {
            strafe: command.strafe_delta,
            forward: command.forward_delta,
            target_speed,
            running: command.run && target_speed.is_some(),
            jump_impulse: if command.jump { self.jump_force } else { 0.0 },
            yaw: command.yaw_delta,
            pitch: command.pitch_delta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_link_common::decode;

    #[test]
    fn test_no_movement_keeps_speed() {
        let settings = MovementSettings::default();
        assert_eq!(settings.target_speed(&decode(b"")), None);
        // 回転とジャンプだけなら速度は変えない
        assert_eq!(settings.target_speed(&decode(b"lUJT")), None);
        // 打ち消し合う入力も移動なし
        assert_eq!(settings.target_speed(&decode(b"LR")), None);
    }

    #[test]
    fn test_speed_precedence() {
        let settings = MovementSettings::default();
        assert_eq!(settings.target_speed(&decode(b"R")), Some(4.0));
        assert_eq!(settings.target_speed(&decode(b"V")), Some(4.0));
        assert_eq!(settings.target_speed(&decode(b"F")), Some(8.0));
        // 横移動と前進が同時なら前進速度
        assert_eq!(settings.target_speed(&decode(b"LF")), Some(8.0));

        let custom = MovementSettings {
            strafe_speed: 3.0,
            backward_speed: 2.0,
            ..Default::default()
        };
        assert_eq!(custom.target_speed(&decode(b"LV")), Some(2.0));
    }

    #[test]
    fn test_run_multiplier() {
        let settings = MovementSettings::default();
        assert_eq!(settings.target_speed(&decode(b"FT")), Some(16.0));
        assert_eq!(settings.target_speed(&decode(b"RT")), Some(8.0));
    }

    #[test]
    fn test_plan() {
        let settings = MovementSettings::default();
        let intent = settings.plan(&decode(b"FFJrDT"));

        assert_eq!(intent.forward, 2.0);
        assert_eq!(intent.strafe, 0.0);
        assert_eq!(intent.target_speed, Some(16.0));
        assert!(intent.running);
        assert_eq!(intent.jump_impulse, 30.0);
        assert_eq!(intent.yaw, 1.0);
        assert_eq!(intent.pitch, -2.0);

        let idle = settings.plan(&CommandFrame::IDLE);
        assert_eq!(idle.target_speed, None);
        assert!(!idle.running);
        assert_eq!(idle.jump_impulse, 0.0);
    }
}
