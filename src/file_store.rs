//! ファイルベースのキー・バリューストア
//!
//! キーごとに `<dir>/<key>.json` を1ファイル持つ。
//! 書き込みは一時ファイル経由の置き換えで、途中で落ちても前の内容が残る。

use focuslens_common::store::KeyValueStore;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{FocusLensError, Result};

const HOME_ENV: &str = "FOCUSLENS_HOME";

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// ディレクトリを作成して開く
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// 既定の保存先を開く
    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_dir()?)
    }

    /// `FOCUSLENS_HOME`、なければ `~/.config/focuslens`
    pub fn default_dir() -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        let home = dirs::home_dir()
            .ok_or_else(|| FocusLensError::Config("找不到用户主目录".into()))?;
        Ok(home.join(".config").join("focuslens"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> focuslens_common::Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> focuslens_common::Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}
