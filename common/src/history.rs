//! 評審履歴ストア
//!
//! 新しい順に最大 `MAX_HISTORY` 件を保持する。変更のたびに全件を再保存する。
//! 保存データの破損や書き込み失敗はログに残すだけで、呼び出し側には返さない。

use crate::error::{Error, Result};
use crate::store::{KeyValueStore, HISTORY_KEY};
use crate::types::HistoryRecord;

/// 履歴の上限件数
pub const MAX_HISTORY: usize = 20;

pub struct HistoryStore<S: KeyValueStore> {
    records: Vec<HistoryRecord>,
    store: S,
}

impl<S: KeyValueStore> HistoryStore<S> {
    /// ストアから履歴を読み込み（欠落・破損時は空）
    pub fn load(store: S) -> Self {
        let records = read_records(&store).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "history unavailable, starting empty");
            Vec::new()
        });
        Self { records, store }
    }

    /// 新しい順の履歴
    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&HistoryRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 先頭に追加し、上限を超えた古い履歴を落とす
    pub fn append(&mut self, record: HistoryRecord) {
        self.records.insert(0, record);
        self.records.truncate(MAX_HISTORY);
        self.persist();
    }

    /// IDで削除（存在しなければ何もしない）
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        if self.records.len() == before {
            return false;
        }
        self.persist();
        true
    }

    /// 全削除（確認はUI側の責務）
    pub fn clear(&mut self) {
        self.records.clear();
        self.persist();
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn persist(&mut self) {
        if let Err(e) = self.write_records() {
            tracing::warn!(error = %e, "failed to persist history");
        }
    }

    fn write_records(&mut self) -> Result<()> {
        let keep = &self.records[..self.records.len().min(MAX_HISTORY)];
        let content =
            serde_json::to_string(keep).map_err(|e| Error::persistence(HISTORY_KEY, e))?;
        self.store
            .set(HISTORY_KEY, &content)
            .map_err(|e| Error::persistence(HISTORY_KEY, e))
    }
}

/// 保存済みの履歴を読む（欠落は空、読み込み失敗・破損は Persistence）
fn read_records<S: KeyValueStore>(store: &S) -> Result<Vec<HistoryRecord>> {
    let raw = match store
        .get(HISTORY_KEY)
        .map_err(|e| Error::persistence(HISTORY_KEY, e))?
    {
        Some(raw) => raw,
        None => return Ok(Vec::new()),
    };
    let mut records: Vec<HistoryRecord> =
        serde_json::from_str(&raw).map_err(|e| Error::persistence(HISTORY_KEY, e))?;
    records.truncate(MAX_HISTORY);
    Ok(records)
}
