//! FocusLens
//!
//! 写真を Gemini に送って講評レポートを得る CLI と HTTP エンドポイント。
//! 評審のコア（レポート変換・履歴・セッション）は `focuslens-common` にある。

pub mod cli;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod file_store;
pub mod gemini;
pub mod logging;
pub mod scanner;
pub mod server;
pub mod thumbnail;

pub use error::{FocusLensError, Result};
