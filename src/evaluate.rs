//! `evaluate` コマンド
//!
//! 画像の読み込み → セッションへ追加 → 評審（失敗時は確認して再試行）→ レポート保存。

use dialoguer::Confirm;
use focuslens_common::{
    render_document, render_markdown, CredentialSources, Error as CommonError, EvaluationResult,
    Evaluator, HistoryStore, KeyValueStore, PreviewHost, ReportFile, Session, SessionState,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;
use crate::error::{FocusLensError, Result};
use crate::gemini::GeminiClient;
use crate::scanner;
use crate::thumbnail::ThumbnailPreviewHost;

pub const HTML_TITLE: &str = "FocusLens 评审报告";

#[derive(Debug, Clone)]
pub struct EvaluateOptions {
    pub paths: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub html: Option<PathBuf>,
    pub no_retry: bool,
    pub timeout_seconds: u64,
}

pub async fn run(config: &Config, options: &EvaluateOptions) -> Result<()> {
    let client = GeminiClient::new(options.timeout_seconds)?;
    let previews = ThumbnailPreviewHost::new()?;
    let mut history = HistoryStore::load(config.store().clone());
    let no_retry = options.no_retry;

    let result = evaluate_paths(
        &client,
        previews,
        &config.credential_sources(),
        &mut history,
        &options.paths,
        |message| {
            eprintln!("✖ {}", message);
            if no_retry {
                return Ok(false);
            }
            Ok(Confirm::new()
                .with_prompt("是否重试？")
                .default(true)
                .interact()?)
        },
    )
    .await?;

    println!("\n{}\n", result.report_text.trim_end());

    let report_path = save_report(&ReportFile::from_result(&result), &options.output_dir)?;
    println!("✔ 报告已保存: {}", report_path.display());

    if let Some(html_path) = &options.html {
        save_html(&result, html_path)?;
        println!("✔ HTML 已保存: {}", html_path.display());
    }

    Ok(())
}

/// 画像パスを評審し、成功した結果を返す
///
/// 失敗時は `retry` にエラーメッセージを渡し、true なら同じ画像で再実行する。
pub async fn evaluate_paths<E, P, S, F>(
    evaluator: &E,
    previews: P,
    sources: &CredentialSources,
    history: &mut HistoryStore<S>,
    paths: &[PathBuf],
    mut retry: F,
) -> Result<EvaluationResult>
where
    E: Evaluator + ?Sized,
    P: PreviewHost,
    S: KeyValueStore,
    F: FnMut(&str) -> Result<bool>,
{
    // 画像より先にキーを確認
    sources.resolve().map_err(map_start_error)?;

    let images = scanner::scan_paths(paths)?;
    if images.is_empty() {
        let joined: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        return Err(FocusLensError::NoImagesFound(joined.join(", ")));
    }
    println!("✔ 已载入 {} 张图片", images.len());

    let mut session = Session::new(previews);
    session.add_images(scanner::read_images(&images)?)?;

    loop {
        let spinner = loading_spinner();
        let state = session
            .run_evaluation(evaluator, sources, history)
            .await
            .map(Clone::clone);
        spinner.finish_and_clear();

        match state.map_err(map_start_error)? {
            SessionState::Success(result) => return Ok(result),
            SessionState::Error(message) => {
                if !retry(&message)? {
                    return Err(FocusLensError::EvaluationFailed(message));
                }
                tracing::info!("retrying evaluation");
            }
            other => {
                return Err(FocusLensError::EvaluationFailed(format!(
                    "unexpected session state: {:?}",
                    other
                )))
            }
        }
    }
}

/// レポートを出力ディレクトリへ書き出す
pub fn save_report(report: &ReportFile, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(&report.file_name);
    std::fs::write(&path, &report.content)?;
    Ok(path)
}

/// レポートを単体 HTML として書き出す
pub fn save_html(result: &EvaluationResult, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let html = render_document(HTML_TITLE, &render_markdown(&result.report_text));
    std::fs::write(path, html)?;
    Ok(())
}

fn map_start_error(e: CommonError) -> FocusLensError {
    match e {
        CommonError::Config(_) => FocusLensError::MissingApiKey,
        other => other.into(),
    }
}

fn loading_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("AI 正在评审中...");
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}
