//! プレビューリソース管理
//!
//! プレビューは一時的な表示用リソース（サムネイルファイル、Blob URL 等）で、
//! 自動では回収されない。`PreviewHandle` は Clone できないトークンで、
//! `PreviewHost::release` に値で渡すことで1回だけ解放される。

use std::collections::HashSet;

use crate::error::Result;
use crate::types::ImageInput;

/// 一時プレビューへの参照
#[derive(Debug, PartialEq, Eq)]
pub struct PreviewHandle(String);

impl PreviewHandle {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    /// 表示側が使う参照文字列（パスや URL）
    pub fn locator(&self) -> &str {
        &self.0
    }
}

/// プレビューの確保と解放を担う境界
pub trait PreviewHost {
    fn acquire(&mut self, image: &ImageInput) -> Result<PreviewHandle>;
    fn release(&mut self, handle: PreviewHandle);
}

/// メモリ上でハンドルだけを管理するホスト
#[derive(Debug, Default)]
pub struct MemoryPreviewHost {
    live: HashSet<String>,
    next: u64,
    released: usize,
}

impl MemoryPreviewHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// 未解放のハンドル数
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// 解放済みのハンドル数
    pub fn released_count(&self) -> usize {
        self.released
    }
}

impl PreviewHost for MemoryPreviewHost {
    fn acquire(&mut self, image: &ImageInput) -> Result<PreviewHandle> {
        self.next += 1;
        let locator = format!("memory://{}/{}", self.next, image.file_name);
        self.live.insert(locator.clone());
        Ok(PreviewHandle::new(locator))
    }

    fn release(&mut self, handle: PreviewHandle) {
        if self.live.remove(handle.locator()) {
            self.released += 1;
        } else {
            tracing::warn!(locator = handle.locator(), "unknown preview handle released");
        }
    }
}
