//! クライアント設定
//!
//! リンクの設定情報を管理するモジュール

use crate::input::ControlMode;
use crate::motion::MovementSettings;
use crate::network::ConnectionInfo;
use rover_link_common::config::{self, LoggingSettings};
use rover_link_common::ConfigError;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// クライアント設定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// 接続設定
    pub network: ConnectionInfo,
    /// 送信レート設定
    pub rate: RateSettings,
    /// 操作設定
    pub control: ControlSettings,
    /// 移動設定
    pub movement: MovementSettings,
    /// ログ設定
    pub logging: LoggingSettings,
}

/// 送信レート設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateSettings {
    /// フレームの送信間隔（シミュレーション時間の秒）
    pub send_interval_secs: f32,
}

impl Default for RateSettings {
    fn default() -> Self {
        Self {
            send_interval_secs: 1.0,
        }
    }
}

/// 操作設定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    /// 操作モード
    pub mode: ControlMode,
}

impl ClientSettings {
    /// ファイルから読み込み、検証する
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings: Self = config::load_from_file(path)?;
        settings.validate()?;
        Ok(settings)
    }

    /// ファイルに保存
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        config::save_to_file(self, path)
    }

    /// 設定値を検証
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.host.trim().is_empty() {
            return Err(ConfigError::invalid("network.host", "空にはできません"));
        }
        if self.network.port == 0 {
            return Err(ConfigError::invalid("network.port", "0 は指定できません"));
        }
        if self.network.buffer_size == 0 {
            return Err(ConfigError::invalid("network.buffer_size", "1 以上を指定してください"));
        }

        let interval = self.rate.send_interval_secs;
        if !interval.is_finite() || interval < 0.0 {
            return Err(ConfigError::invalid(
                "rate.send_interval_secs",
                format!("0 以上の有限値を指定してください: {}", interval),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_link_common::LogLevel;

    #[test]
    fn test_defaults() {
        let settings = ClientSettings::default();
        assert_eq!(settings.network.host, "127.0.0.1");
        assert_eq!(settings.network.port, 60260);
        assert_eq!(settings.rate.send_interval_secs, 1.0);
        assert_eq!(settings.control.mode, ControlMode::Remote);
        assert_eq!(settings.logging.level, LogLevel::Info);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.toml");
        std::fs::write(
            &path,
            "[network]\nport = 7000\n\n[rate]\nsend_interval_secs = 0.5\n\n[control]\nmode = \"local\"\n",
        )
        .unwrap();

        let settings = ClientSettings::load(&path).unwrap();
        assert_eq!(settings.network.port, 7000);
        // 省略した項目は既定値
        assert_eq!(settings.network.host, "127.0.0.1");
        assert_eq!(settings.rate.send_interval_secs, 0.5);
        assert_eq!(settings.control.mode, ControlMode::Local);
        assert_eq!(settings.movement, MovementSettings::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.json");

        let mut settings = ClientSettings::default();
        settings.network.reply_timeout_ms = Some(250);
        settings.movement.jump_force = 12.0;
        settings.save(&path).unwrap();

        assert_eq!(ClientSettings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_validate() {
        let mut settings = ClientSettings::default();
        settings.network.port = 0;
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));

        let mut settings = ClientSettings::default();
        settings.network.host = " ".to_string();
        assert!(settings.validate().is_err());

        let mut settings = ClientSettings::default();
        settings.rate.send_interval_secs = -1.0;
        assert!(settings.validate().is_err());

        let mut settings = ClientSettings::default();
        settings.rate.send_interval_secs = f32::NAN;
        assert!(settings.validate().is_err());

        // 0 は毎ティック送信として許可
        let mut settings = ClientSettings::default();
        settings.rate.send_interval_secs = 0.0;
        assert!(settings.validate().is_ok());
    }
}
