//! FocusLens Common Library
//!
//! CLIとHTTPエンドポイントで共有される評審コア:
//! レポート変換、評価抽出、履歴、セッション状態、接続先解決

pub mod error;
pub mod history;
pub mod markdown;
pub mod preview;
pub mod prompts;
pub mod rating;
pub mod report;
pub mod session;
pub mod settings;
pub mod store;
pub mod types;

pub use error::{Error, FailureKind, Result};
pub use history::{HistoryStore, MAX_HISTORY};
pub use markdown::{render_document, render_markdown};
pub use preview::{MemoryPreviewHost, PreviewHandle, PreviewHost};
pub use prompts::{GenerationParams, GENERATION_PARAMS, SYSTEM_PROMPT, USER_PROMPT};
pub use rating::extract_rating;
pub use report::ReportFile;
pub use session::{EvaluationRequest, Evaluator, Session, SessionState};
pub use settings::{normalize_base_url, CredentialSources, ResolvedEndpoint, Settings};
pub use store::{KeyValueStore, MemoryStore, HISTORY_KEY, SETTINGS_KEY};
pub use types::{
    EvaluationResult, HistoryRecord, ImageInput, ImageSnapshot, Rating, UploadedImage,
};
