//! レポートのダウンロード用ファイル

use crate::types::EvaluationResult;

pub const REPORT_FILE_PREFIX: &str = "FocusLens_评审报告";

/// ダウンロード用レポート（内容は元の Markdown をそのまま）
#[derive(Debug, Clone, PartialEq)]
pub struct ReportFile {
    pub file_name: String,
    pub content: String,
}

impl ReportFile {
    pub fn from_result(result: &EvaluationResult) -> Self {
        Self {
            file_name: format!("{}_{}.md", REPORT_FILE_PREFIX, result.local_date()),
            content: result.report_text.clone(),
        }
    }
}
