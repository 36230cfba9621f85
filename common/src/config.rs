//! 設定管理
//!
//! 設定ファイルの読み込みと保存を提供します。
//! 形式はファイル拡張子（`.json` / `.toml`）から判定し、不明な場合は JSON として扱います。
//! 設定の中身はクライアント・サーバーそれぞれの型付き設定構造体が定義します。

use crate::error::ConfigError;
use crate::utils::logging::LogLevel;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 設定形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    /// JSON 形式
    #[default]
    Json,
    /// TOML 形式
    Toml,
}

impl ConfigFormat {
    /// ファイル拡張子から設定形式を判定
    pub fn from_extension(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }

    /// 文字列を解析
    pub fn parse<T: DeserializeOwned>(&self, content: &str) -> Result<T, ConfigError> {
        Ok(match self {
            ConfigFormat::Json => serde_json::from_str(content)?,
            ConfigFormat::Toml => toml::from_str(content)?,
        })
    }

    /// 文字列に変換
    pub fn render<T: Serialize>(&self, value: &T) -> Result<String, ConfigError> {
        Ok(match self {
            ConfigFormat::Json => serde_json::to_string_pretty(value)?,
            ConfigFormat::Toml => toml::to_string(value)?,
        })
    }
}

/// ログ設定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// ログレベル（`RUST_LOG` が設定されていればそちらが優先）
    pub level: LogLevel,
}

/// ファイルから設定を読み込み
pub fn load_from_file<T, P>(path: P) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let format = ConfigFormat::from_extension(path).unwrap_or_default();
    let content = fs::read_to_string(path)?;

    let value = format.parse(&content)?;
    log::debug!("設定ファイルを読み込みました: {}", path.display());
    Ok(value)
}

/// 設定をファイルに保存
pub fn save_to_file<T, P>(value: &T, path: P) -> Result<(), ConfigError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    // ディレクトリが存在することを確認
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let format = ConfigFormat::from_extension(path).unwrap_or_default();
    let content = format.render(value)?;
    fs::write(path, content)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Sample {
        host: String,
        port: u16,
        #[serde(default)]
        interval: f32,
    }

    fn sample() -> Sample {
        Sample {
            host: "127.0.0.1".to_string(),
            port: 60260,
            interval: 1.5,
        }
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension(Path::new("a.json")), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension(Path::new("a.TOML")), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension(Path::new("a.yaml")), None);
        assert_eq!(ConfigFormat::from_extension(Path::new("noext")), None);
    }

    #[test]
    fn test_save_and_load_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("link.toml");

        save_to_file(&sample(), &path).unwrap();
        let loaded: Sample = load_from_file(&path).unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_save_and_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("link.json");

        save_to_file(&sample(), &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"port\": 60260"));

        let loaded: Sample = load_from_file(&path).unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();

        // 存在しないファイル
        let missing = load_from_file::<Sample, _>(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::IoError(_))));

        // 壊れた TOML
        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "host = ").unwrap();
        let result = load_from_file::<Sample, _>(&broken);
        assert!(matches!(result, Err(ConfigError::TomlDeError(_))));
    }

    #[test]
    fn test_logging_settings_default() {
        let settings: LoggingSettings = ConfigFormat::Toml.parse("").unwrap();
        assert_eq!(settings.level, LogLevel::Info);

        let settings: LoggingSettings = ConfigFormat::Toml.parse("level = \"debug\"").unwrap();
        assert_eq!(settings.level, LogLevel::Debug);
    }
}
