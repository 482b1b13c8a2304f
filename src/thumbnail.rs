//! サムネイルファイルによるプレビュー
//!
//! 確保時に 256px の PNG サムネイルを一時ディレクトリへ書き出し、解放時に削除する。

use focuslens_common::{Error as CommonError, ImageInput, PreviewHandle, PreviewHost};
use image::ImageFormat;
use std::path::{Path, PathBuf};

const THUMBNAIL_SIZE: u32 = 256;

#[derive(Debug)]
pub struct ThumbnailPreviewHost {
    dir: PathBuf,
}

impl ThumbnailPreviewHost {
    /// プロセスごとの一時ディレクトリに作成
    pub fn new() -> crate::error::Result<Self> {
        let dir = std::env::temp_dir()
            .join("focuslens-previews")
            .join(uuid::Uuid::new_v4().simple().to_string());
        Self::in_dir(dir)
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> crate::error::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl PreviewHost for ThumbnailPreviewHost {
    fn acquire(&mut self, image: &ImageInput) -> focuslens_common::Result<PreviewHandle> {
        let decoded = image::load_from_memory(&image.bytes).map_err(|e| {
            CommonError::Validation(format!("无法解码图片 {}: {}", image.file_name, e))
        })?;

        let path = self
            .dir
            .join(format!("{}.png", uuid::Uuid::new_v4().simple()));
        decoded
            .thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE)
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| CommonError::Io(std::io::Error::other(e.to_string())))?;

        tracing::debug!(file = %image.file_name, preview = %path.display(), "preview created");
        Ok(PreviewHandle::new(path.to_string_lossy()))
    }

    fn release(&mut self, handle: PreviewHandle) {
        if let Err(e) = std::fs::remove_file(handle.locator()) {
            tracing::warn!(preview = handle.locator(), error = %e, "failed to remove preview");
        }
    }
}

impl Drop for ThumbnailPreviewHost {
    fn drop(&mut self) {
        // 全ハンドル解放済みなら空のはず
        let _ = std::fs::remove_dir(&self.dir);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};
    use std::io::Cursor;
    use tempfile::tempdir;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_acquire_writes_thumbnail_and_release_deletes() {
        let dir = tempdir().unwrap();
        let mut host = ThumbnailPreviewHost::in_dir(dir.path().join("previews")).unwrap();

        let handle = host
            .acquire(&ImageInput::new("big.png", png_bytes(800, 400)))
            .unwrap();
        let path = PathBuf::from(handle.locator());
        assert!(path.exists());

        let thumb = image::open(&path).unwrap();
        assert!(thumb.width() <= THUMBNAIL_SIZE && thumb.height() <= THUMBNAIL_SIZE);

        host.release(handle);
        assert!(!path.exists());
    }

    #[test]
    fn test_acquire_rejects_non_image() {
        let dir = tempdir().unwrap();
        let mut host = ThumbnailPreviewHost::in_dir(dir.path()).unwrap();
        let result = host.acquire(&ImageInput::new("fake.jpg", b"not an image".to_vec()));
        assert!(matches!(result, Err(CommonError::Validation(_))));
    }
}
