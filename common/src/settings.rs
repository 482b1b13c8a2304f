//! 設定と接続先の解決
//!
//! CLI直接呼び出しとHTTPエンドポイントの両方がここで APIキー・Base URL・モデルを解決する。
//! 優先順位は項目ごとに「サーバ側設定（空でなければ） > ユーザ設定」。

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::store::{KeyValueStore, SETTINGS_KEY};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const API_VERSION: &str = "v1beta";

/// 永続化される設定
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &self.api_key.as_deref().map(mask_secret))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl Settings {
    /// ストアから読み込み（欠落・破損時はデフォルト）
    pub fn load(store: &dyn KeyValueStore) -> Self {
        Self::try_load(store).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "settings unavailable, using defaults");
            Self::default()
        })
    }

    /// 読み込み失敗・破損を Persistence として返す版
    pub fn try_load(store: &dyn KeyValueStore) -> Result<Self> {
        match store
            .get(SETTINGS_KEY)
            .map_err(|e| Error::persistence(SETTINGS_KEY, e))?
        {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| Error::persistence(SETTINGS_KEY, e)),
            None => Ok(Self::default()),
        }
    }

    /// 明示的な保存操作
    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<()> {
        let content = serde_json::to_string(self)?;
        store.set(SETTINGS_KEY, &content)
    }

    pub fn has_api_key(&self) -> bool {
        non_blank(self.api_key.as_deref()).is_some()
    }
}

/// サーバ側設定とユーザ設定の組
#[derive(Debug, Clone, Default)]
pub struct CredentialSources {
    pub server: Settings,
    pub user: Settings,
}

impl CredentialSources {
    pub fn new(server: Settings, user: Settings) -> Self {
        Self { server, user }
    }

    /// ユーザ設定を持たない（サーバ専用）
    pub fn server_only(server: Settings) -> Self {
        Self { server, user: Settings::default() }
    }

    /// 接続先を解決（APIキー未設定は Config エラー）
    pub fn resolve(&self) -> Result<ResolvedEndpoint> {
        let api_key = pick(&self.server.api_key, &self.user.api_key)
            .ok_or_else(|| Error::Config("未配置 API Key，请先在设置中填写。".into()))?;

        let base_url = pick(&self.server.base_url, &self.user.base_url)
            .and_then(|raw| normalize_base_url(&raw))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let model = pick(&self.server.model, &self.user.model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(ResolvedEndpoint { api_key, base_url, model })
    }
}

/// 解決済みの接続先
#[derive(Clone, PartialEq)]
pub struct ResolvedEndpoint {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl std::fmt::Debug for ResolvedEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedEndpoint")
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl ResolvedEndpoint {
    /// generateContent の URL（キーはクエリで別途付与）
    pub fn generate_content_url(&self) -> String {
        format!(
            "{}/{}/models/{}:generateContent",
            self.base_url, API_VERSION, self.model
        )
    }
}

/// Base URL を正規化
///
/// - 前後の空白と末尾のスラッシュを除去
/// - 末尾の `/v1` / `/v1beta` を除去（クライアントが付与するため）
/// - スキームがなければ `https://` を付与
///
/// 空文字列は None
pub fn normalize_base_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let stripped = trimmed
        .strip_suffix("/v1beta")
        .or_else(|| trimmed.strip_suffix("/v1"))
        .unwrap_or(trimmed)
        .trim_end_matches('/');

    if stripped.is_empty() {
        return None;
    }

    if stripped.starts_with("http") {
        Some(stripped.to_string())
    } else {
        Some(format!("https://{}", stripped))
    }
}

/// 表示用にキーを伏せる
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}

fn pick(server: &Option<String>, user: &Option<String>) -> Option<String> {
    non_blank(server.as_deref())
        .or_else(|| non_blank(user.as_deref()))
        .map(str::to_string)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
