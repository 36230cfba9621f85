//! フレーム供給モジュール
//!
//! 送信するフレームはホスト側（描画・エンコード）が用意します。
//! このモジュールはその受け口となるトレイトと、固定のバイト列を返す簡易実装を提供します。

use rover_link_common::OutgoingFrame;
use std::io;
use std::path::Path;

/// フレームの供給元
pub trait FrameSource {
    /// 送信するフレームを1枚生成（用意できなければ `None`）
    fn produce_frame(&mut self) -> Option<OutgoingFrame>;
}

impl<F> FrameSource for F
where
    F: FnMut() -> Option<OutgoingFrame>,
{
    fn produce_frame(&mut self) -> Option<OutgoingFrame> {
        self()
    }
}

/// 同じバイト列を繰り返し返すフレーム供給元
#[derive(Debug, Clone)]
pub struct StaticFrameSource {
    /// 返すフレーム
    frame: OutgoingFrame,
    /// これまでに返した枚数
    produced: u64,
}

impl StaticFrameSource {
    /// バイト列から作成
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            frame: OutgoingFrame::new(bytes),
            produced: 0,
        }
    }

    /// ファイル（エンコード済み画像など）から作成
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self::new(bytes))
    }

    /// 画像を用意できない場合の代替フレーム（JPEG の SOI/EOI マーカーのみ）
    pub fn placeholder() -> Self {
        Self::new(vec![0xFF, 0xD8, 0xFF, 0xD9])
    }

    /// これまでに返した枚数
    pub fn produced(&self) -> u64 {
        self.produced
    }
}

impl FrameSource for StaticFrameSource {
    fn produce_frame(&mut self) -> Option<OutgoingFrame> {
        self.produced += 1;
        Some(self.frame.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_frame_source() {
        let mut source = StaticFrameSource::new(b"frame".to_vec());
        assert_eq!(source.produce_frame().unwrap().as_bytes(), b"frame");
        assert_eq!(source.produce_frame().unwrap().as_bytes(), b"frame");
        assert_eq!(source.produced(), 2);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.jpg");
        std::fs::write(&path, [0xFF, 0xD8, 0x00, 0xFF, 0xD9]).unwrap();

        let mut source = StaticFrameSource::from_file(&path).unwrap();
        assert_eq!(source.produce_frame().unwrap().len(), 5);
        assert!(StaticFrameSource::from_file(dir.path().join("missing.jpg")).is_err());
    }

    #[test]
    fn test_closure_source() {
        let mut count = 0;
        let mut source = || {
            count += 1;
            if count > 1 {
                None
            } else {
                Some(OutgoingFrame::new(vec![count as u8]))
            }
        };
        assert!(source.produce_frame().is_some());
        assert!(source.produce_frame().is_none());
    }
}
