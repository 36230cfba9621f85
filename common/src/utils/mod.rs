//! ユーティリティモジュール
//!
//! 各種ユーティリティ機能を提供します。

pub mod logging;

/// パス関連のユーティリティ
pub mod path {
    use std::path::{Path, PathBuf};

    /// 設定ディレクトリを取得
    pub fn get_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rover-link")
    }

    /// 設定ディレクトリ内の既定ファイルパスを取得
    pub fn default_config_file(file_name: &str) -> PathBuf {
        get_config_dir().join(file_name)
    }

    /// 指定パスが存在すればそれを、なければ `None` を返す
    pub fn existing(path: &Path) -> Option<PathBuf> {
        if path.is_file() {
            Some(path.to_path_buf())
        } else {
            None
        }
    }
}
