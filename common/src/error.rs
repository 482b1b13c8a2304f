//! エラー型定義
//!
//! 評審フローのエラー分類:
//! - Config: APIキー未設定（外部呼び出し前に中断）
//! - Validation: 画像未選択など（外部呼び出し前に中断）
//! - External: モデル提供側の失敗（セッションは Error 状態へ）
//! - Persistence: ローカル保存データの破損（ログのみ、表面化しない）

use thiserror::Error;

/// 外部呼び出し失敗の分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// APIキーが拒否された
    InvalidCredential,
    /// リクエスト不正（Base URL の形式など）
    InvalidRequest,
    /// モデルまたはエンドポイントが見つからない
    ModelUnavailable,
    /// 空レスポンス（安全フィルタ等）
    EmptyResponse,
    /// その他のネットワーク/プロバイダ障害
    Other,
}

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{message}")]
    External { kind: FailureKind, message: String },

    #[error("Persistence error: {0}")]
    Persistence(String),
}

pub const HINT_INVALID_CREDENTIAL: &str =
    "API Key 校验失败。请确保您使用的是有效的 Google Gemini API Key。";
pub const HINT_INVALID_REQUEST: &str =
    "请求参数错误。如果是自定义地址，请确保 Base URL 格式正确（不包含 /v1/beta 等后缀）。";
pub const HINT_MODEL_UNAVAILABLE: &str =
    "模型或接口地址不存在。请检查模型名称与 Base URL 配置。";
pub const HINT_EMPTY_RESPONSE: &str = "模型返回了空内容，可能是由于图片内容触发了安全过滤。";
pub const GENERIC_FAILURE: &str = "AI 评审过程中发生错误，请检查网络或 API 配置。";

impl Error {
    /// プロバイダ側の失敗メッセージを分類し、対処ヒント付きのエラーに変換
    pub fn external(raw: &str) -> Self {
        let kind = classify_failure(raw);
        let message = match kind {
            FailureKind::InvalidCredential => HINT_INVALID_CREDENTIAL.to_string(),
            FailureKind::InvalidRequest => HINT_INVALID_REQUEST.to_string(),
            FailureKind::ModelUnavailable => HINT_MODEL_UNAVAILABLE.to_string(),
            FailureKind::EmptyResponse => HINT_EMPTY_RESPONSE.to_string(),
            FailureKind::Other if raw.trim().is_empty() => GENERIC_FAILURE.to_string(),
            FailureKind::Other => raw.trim().to_string(),
        };
        Error::External { kind, message }
    }

    /// ローカル保存データの読み書き失敗
    pub fn persistence(context: &str, source: impl std::fmt::Display) -> Self {
        Error::Persistence(format!("{}: {}", context, source))
    }

    /// 空レスポンス
    pub fn empty_response() -> Self {
        Error::External {
            kind: FailureKind::EmptyResponse,
            message: HINT_EMPTY_RESPONSE.to_string(),
        }
    }

    /// 外部呼び出し失敗の分類（External 以外は None）
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Error::External { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// 既知の部分文字列で失敗を分類
pub fn classify_failure(raw: &str) -> FailureKind {
    if raw.contains("API_KEY_INVALID") {
        FailureKind::InvalidCredential
    } else if raw.contains("400") || raw.contains("INVALID_ARGUMENT") {
        FailureKind::InvalidRequest
    } else if raw.contains("404") || raw.contains("NOT_FOUND") {
        FailureKind::ModelUnavailable
    } else {
        FailureKind::Other
    }
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
