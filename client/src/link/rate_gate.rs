//! 送信レート制御
//!
//! シミュレーション時間を積算し、しきい値に達したら送信を許可します。

use std::time::Duration;

/// 送信レートゲート
///
/// - 接続が健全でない間は発火せず、`elapsed` をしきい値に戻す（再接続直後に即送信）。
/// - 健全な間は `delta_time` を積算し、しきい値以上で発火して 0 に戻す。
#[derive(Debug, Clone, PartialEq)]
pub struct RateGate {
    /// 前回の発火からの経過時間（秒）
    elapsed: f32,
    /// 発火間隔（秒）
    threshold: f32,
}

impl RateGate {
    /// 発火間隔（秒）を指定して作成
    ///
    /// 作成直後は最初の健全なティックで発火する。
    pub fn new(threshold: f32) -> Self {
        // NaN と負数は 0（毎ティック発火）として扱う
        let threshold = threshold.max(0.0);
        Self {
            elapsed: threshold,
            threshold,
        }
    }

    /// 発火間隔を `Duration` で指定して作成
    pub fn from_interval(interval: Duration) -> Self {
        Self::new(interval.as_secs_f32())
    }

    /// 1ティック進め、送信すべきかを返す
    pub fn tick(&mut self, delta_time: f32, connection_healthy: bool) -> bool {
        if !connection_healthy {
            self.elapsed = self.threshold;
            return false;
        }

        if delta_time.is_finite() && delta_time > 0.0 {
            self.elapsed += delta_time;
        }

        if self.elapsed >= self.threshold {
            self.elapsed = 0.0;
            true
        } else {
            false
        }
    }

    /// 次の健全なティックで発火させる
    pub fn prime(&mut self) {
        self.elapsed = self.threshold;
    }

    /// 経過時間（秒）
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// 発火間隔（秒）
    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

impl Default for RateGate {
    /// シミュレーション時間1秒に1回
    fn default() -> Self {
        Self::new(1.0)
    }
}
