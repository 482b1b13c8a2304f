//! 評審フローの型定義
//!
//! CLIとHTTPエンドポイントで共有される型:
//! - ImageInput / UploadedImage / ImageSnapshot: 画像のライフサイクル
//! - EvaluationResult: モデルが返したレポート
//! - HistoryRecord: 成功した評審1回分の履歴

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::preview::PreviewHandle;

/// 新しい不透明IDを生成
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// セッションに渡す前の生画像
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageInput {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_type_for_file_name(&file_name).to_string();
        Self { file_name, mime_type, bytes }
    }

    /// スナップショットから復元（Data URL をデコード）
    pub fn from_snapshot(snapshot: &ImageSnapshot) -> Result<Self> {
        let payload = extract_base64_from_data_url(&snapshot.data_url);
        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| Error::Validation(format!("{}: {}", snapshot.file_name, e)))?;
        Ok(Self {
            file_name: snapshot.file_name.clone(),
            mime_type: extract_mime_type_from_data_url(&snapshot.data_url).to_string(),
            bytes,
        })
    }
}

/// セッションが所有するアップロード済み画像
///
/// プレビューハンドルは移動専用のため Clone しない。
/// 解放は `Session` がハンドルを `PreviewHost` に返すことで行う。
#[derive(Debug)]
pub struct UploadedImage {
    pub id: String,
    pub file_name: String,
    pub mime_type: String,
    pub raw_bytes: Vec<u8>,
    pub data_url: String,
    pub(crate) preview: PreviewHandle,
}

impl UploadedImage {
    pub(crate) fn new(id: String, input: ImageInput, preview: PreviewHandle) -> Self {
        let data_url = to_data_url(&input.mime_type, &input.bytes);
        Self {
            id,
            file_name: input.file_name,
            mime_type: input.mime_type,
            raw_bytes: input.bytes,
            data_url,
            preview,
        }
    }

    pub fn preview(&self) -> &PreviewHandle {
        &self.preview
    }

    pub fn snapshot(&self) -> ImageSnapshot {
        ImageSnapshot {
            id: self.id.clone(),
            file_name: self.file_name.clone(),
            data_url: self.data_url.clone(),
        }
    }
}

/// 履歴に保存される画像のコピー
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSnapshot {
    pub id: String,
    #[serde(default)]
    pub file_name: String,
    pub data_url: String,
}

/// 総合評価
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rating {
    S,
    A,
    B,
    C,
    D,
    #[default]
    #[serde(rename = "-")]
    Unrated,
}

impl Rating {
    pub fn from_letter(letter: char) -> Self {
        match letter.to_ascii_uppercase() {
            'S' => Rating::S,
            'A' => Rating::A,
            'B' => Rating::B,
            'C' => Rating::C,
            'D' => Rating::D,
            _ => Rating::Unrated,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::S => "S",
            Rating::A => "A",
            Rating::B => "B",
            Rating::C => "C",
            Rating::D => "D",
            Rating::Unrated => "-",
        }
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// モデルが返したレポート（生成後は不変）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub report_text: String,
    /// 生成時刻（UNIXミリ秒）
    pub produced_at: i64,
}

impl EvaluationResult {
    pub fn new(report_text: impl Into<String>) -> Self {
        Self {
            report_text: report_text.into(),
            produced_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// ローカル日付（YYYY-MM-DD）
    pub fn local_date(&self) -> String {
        self.local_time("%Y-%m-%d")
    }

    pub fn local_time(&self, format: &str) -> String {
        Local
            .timestamp_millis_opt(self.produced_at)
            .single()
            .map(|t| t.format(format).to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

/// 評審履歴1件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: String,
    pub images: Vec<ImageSnapshot>,
    pub result: EvaluationResult,
    #[serde(default)]
    pub rating: Rating,
}

impl HistoryRecord {
    /// 一覧表示用の1行サマリ
    pub fn summary(&self) -> String {
        let first = self
            .images
            .first()
            .map(|img| img.file_name.as_str())
            .unwrap_or("-");
        format!(
            "[{}] {}  {}张  {}",
            self.rating,
            self.result.local_time("%Y-%m-%d %H:%M"),
            self.images.len(),
            first
        )
    }
}

/// バイト列から Data URL を生成
pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

/// Data URLからBase64データ部分を抽出
///
/// カンマがない場合は入力全体を Base64 とみなす
pub fn extract_base64_from_data_url(data_url: &str) -> &str {
    match data_url.split_once(',') {
        Some((_, payload)) if !payload.is_empty() => payload,
        _ => data_url,
    }
}

/// Data URLからMIMEタイプを抽出（不明時は image/jpeg）
pub fn extract_mime_type_from_data_url(data_url: &str) -> &str {
    data_url
        .strip_prefix("data:")
        .and_then(|s| s.split(';').next())
        .filter(|s| !s.is_empty())
        .unwrap_or("image/jpeg")
}

/// 拡張子から MIME タイプを推定
pub fn mime_type_for_file_name(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => "image/jpeg",
    }
}
