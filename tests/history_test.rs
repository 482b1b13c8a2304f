//! 履歴の永続化テスト
//!
//! FileStore 上で HistoryStore を読み書きし、再起動後の状態を検証

use focuslens::file_store::FileStore;
use focuslens_common::{
    EvaluationResult, HistoryRecord, HistoryStore, ImageSnapshot, Rating, HISTORY_KEY, MAX_HISTORY,
};
use tempfile::tempdir;

fn record(n: usize) -> HistoryRecord {
    HistoryRecord {
        id: format!("record-{:02}", n),
        images: vec![ImageSnapshot {
            id: format!("img-{}", n),
            file_name: format!("photo_{}.jpg", n),
            data_url: "data:image/jpeg;base64,AAAA".to_string(),
        }],
        result: EvaluationResult::new(format!("**综合评分**: [A] #{}", n)),
        rating: Rating::A,
    }
}

#[test]
fn test_history_survives_restart() {
    let dir = tempdir().unwrap();

    {
        let mut history = HistoryStore::load(FileStore::open(dir.path()).unwrap());
        history.append(record(1));
        history.append(record(2));
    }

    let history = HistoryStore::load(FileStore::open(dir.path()).unwrap());
    let ids: Vec<&str> = history.records().iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["record-02", "record-01"]);
    assert_eq!(history.get("record-01").unwrap().rating, Rating::A);
    assert_eq!(history.records()[0].images[0].file_name, "photo_2.jpg");
}

#[test]
fn test_history_capped_on_disk() {
    let dir = tempdir().unwrap();
    let mut history = HistoryStore::load(FileStore::open(dir.path()).unwrap());
    for n in 0..25 {
        history.append(record(n));
    }
    assert_eq!(history.len(), MAX_HISTORY);

    let reloaded = HistoryStore::load(FileStore::open(dir.path()).unwrap());
    assert_eq!(reloaded.len(), MAX_HISTORY);
    assert_eq!(reloaded.records()[0].id, "record-24");
    assert_eq!(reloaded.records()[MAX_HISTORY - 1].id, "record-05");
}

#[test]
fn test_corrupt_history_file_starts_empty() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path()).unwrap();
    std::fs::write(store.path_for(HISTORY_KEY), "{ not json").unwrap();

    let mut history = HistoryStore::load(store);
    assert!(history.is_empty());

    // 破損ファイルは次の書き込みで置き換わる
    history.append(record(7));
    let reloaded = HistoryStore::load(FileStore::open(dir.path()).unwrap());
    assert_eq!(reloaded.len(), 1);
}

#[test]
fn test_remove_and_clear_persist() {
    let dir = tempdir().unwrap();
    let mut history = HistoryStore::load(FileStore::open(dir.path()).unwrap());
    for n in 0..3 {
        history.append(record(n));
    }

    assert!(history.remove("record-01"));
    assert!(!history.remove("missing"));
    let reloaded = HistoryStore::load(FileStore::open(dir.path()).unwrap());
    assert_eq!(reloaded.len(), 2);
    assert!(reloaded.get("record-01").is_none());

    history.clear();
    let reloaded = HistoryStore::load(FileStore::open(dir.path()).unwrap());
    assert!(reloaded.is_empty());
}
