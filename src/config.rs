use crate::error::Result;
use crate::file_store::FileStore;
use focuslens_common::settings::{mask_secret, normalize_base_url, DEFAULT_BASE_URL, DEFAULT_MODEL};
use focuslens_common::{CredentialSources, Settings};

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const BASE_URL_ENV: &str = "GOOGLE_GEMINI_BASE_URL";
pub const MODEL_ENV: &str = "GEMINI_MODEL";

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 120;
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// ユーザ設定（ストアに保存）とサーバ側設定（環境変数）
#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    store: FileStore,
}

impl Config {
    pub fn load() -> Result<Self> {
        Ok(Self::load_from(FileStore::open_default()?))
    }

    pub fn load_from(store: FileStore) -> Self {
        let settings = Settings::load(&store);
        Self { settings, store }
    }

    pub fn save(&mut self) -> Result<()> {
        self.settings.save(&mut self.store)?;
        Ok(())
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub fn set_api_key(&mut self, key: String) -> Result<()> {
        let key = key.trim().to_string();
        self.settings.api_key = (!key.is_empty()).then_some(key);
        self.save()
    }

    /// Base URL を設定（None または空で既定値に戻す）
    pub fn set_base_url(&mut self, url: Option<String>) -> Result<()> {
        self.settings.base_url = url.as_deref().and_then(normalize_base_url);
        self.save()
    }

    pub fn set_model(&mut self, model: String) -> Result<()> {
        let model = model.trim().to_string();
        self.settings.model = (!model.is_empty()).then_some(model);
        self.save()
    }

    /// 環境変数のサーバ側設定
    pub fn server_settings() -> Settings {
        Settings {
            api_key: std::env::var(API_KEY_ENV).ok(),
            base_url: std::env::var(BASE_URL_ENV).ok(),
            model: std::env::var(MODEL_ENV).ok(),
        }
    }

    pub fn credential_sources(&self) -> CredentialSources {
        CredentialSources::new(Self::server_settings(), self.settings.clone())
    }

    /// `config --show` 用の表示行
    pub fn describe(&self) -> Vec<String> {
        let server = Self::server_settings();
        let key_line = match (server.has_api_key(), self.settings.api_key.as_deref()) {
            (true, _) => format!("已设置（环境变量 {}）", API_KEY_ENV),
            (false, Some(key)) if !key.trim().is_empty() => format!("已设置 ({})", mask_secret(key)),
            _ => "未设置".to_string(),
        };
        let base_url = self
            .credential_sources()
            .resolve()
            .map(|endpoint| endpoint.base_url)
            .unwrap_or_else(|_| {
                self.settings
                    .base_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            });
        let model = server
            .model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| self.settings.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        vec![
            format!("  API Key: {}", key_line),
            format!("  Base URL: {}", base_url),
            format!("  模型: {}", model),
            format!("  数据目录: {}", self.store.dir().display()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_settings_persist_across_loads() {
        let dir = tempdir().unwrap();
        let mut config = Config::load_from(FileStore::open(dir.path()).unwrap());
        config.set_api_key("  my-key  ".into()).unwrap();
        config.set_base_url(Some("proxy.example.com/v1beta/".into())).unwrap();
        config.set_model("gemini-2.5-flash".into()).unwrap();

        let reloaded = Config::load_from(FileStore::open(dir.path()).unwrap());
        assert_eq!(reloaded.settings.api_key.as_deref(), Some("my-key"));
        assert_eq!(reloaded.settings.base_url.as_deref(), Some("https://proxy.example.com"));
        assert_eq!(reloaded.settings.model.as_deref(), Some("gemini-2.5-flash"));
    }

    #[test]
    fn test_clear_base_url() {
        let dir = tempdir().unwrap();
        let mut config = Config::load_from(FileStore::open(dir.path()).unwrap());
        config.set_base_url(Some("https://p".into())).unwrap();
        config.set_base_url(None).unwrap();
        assert_eq!(config.settings.base_url, None);
    }

    #[test]
    fn test_corrupt_settings_fall_back_to_default() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("focuslens_settings.json"), "not json").unwrap();
        let config = Config::load_from(FileStore::open(dir.path()).unwrap());
        assert_eq!(config.settings, Settings::default());
    }
}
