use crate::error::{FocusLensError, Result};
use focuslens_common::ImageInput;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub file_name: String,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
}

fn is_image_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| is_image_extension(&ext.to_string_lossy()))
        .unwrap_or(false)
}

fn image_info(path: &Path) -> ImageInfo {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    ImageInfo {
        path: path.to_path_buf(),
        file_name,
    }
}

/// フォルダ直下の画像を列挙（ファイル名順）
pub fn scan_folder(folder: &Path) -> Result<Vec<ImageInfo>> {
    if !folder.exists() {
        return Err(FocusLensError::FileNotFound(folder.display().to_string()));
    }

    let mut images: Vec<ImageInfo> = WalkDir::new(folder)
        .max_depth(1)  // 直下のみ（再帰しない）
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file() && is_image_path(e.path()))
        .map(|e| image_info(e.path()))
        .collect();

    images.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    Ok(images)
}

/// ファイル/フォルダの混在指定を展開（指定順を保つ）
pub fn scan_paths(paths: &[PathBuf]) -> Result<Vec<ImageInfo>> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_dir() {
            images.extend(scan_folder(path)?);
        } else if path.is_file() {
            if !is_image_path(path) {
                return Err(FocusLensError::ImageLoad(format!(
                    "不支持的图片格式: {}",
                    path.display()
                )));
            }
            images.push(image_info(path));
        } else {
            return Err(FocusLensError::FileNotFound(path.display().to_string()));
        }
    }

    Ok(images)
}

/// 画像を読み込んでセッション入力に変換
pub fn read_images(images: &[ImageInfo]) -> Result<Vec<ImageInput>> {
    images
        .iter()
        .map(|img| {
            let bytes = std::fs::read(&img.path)
                .map_err(|e| FocusLensError::ImageLoad(format!("{}: {}", img.path.display(), e)))?;
            Ok(ImageInput::new(img.file_name.clone(), bytes))
        })
        .collect()
}
