//! プロセス共通のキー・バリューストア

use std::collections::HashMap;

use crate::error::Result;

/// 履歴の保存キー
pub const HISTORY_KEY: &str = "focuslens_history";
/// 設定の保存キー
pub const SETTINGS_KEY: &str = "focuslens_settings";

/// 文字列キーで JSON 文字列を保存するストア
///
/// 書き込みは後勝ち。排他制御はしない。
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// メモリ上のストア
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
