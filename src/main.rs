use clap::Parser;
use dialoguer::Confirm;
use focuslens::{cli, config, error, evaluate, file_store, logging, server, thumbnail};
use cli::{Cli, Commands, HistoryAction};
use config::Config;
use error::{FocusLensError, Result};
use evaluate::EvaluateOptions;
use focuslens_common::{render_document, render_markdown, HistoryRecord, HistoryStore, Session};
use std::path::Path;
use std::process::ExitCode;

type History = HistoryStore<file_store::FileStore>;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("✖ {}", e);
            ExitCode::FAILURE
        }
    }
}

/// ストアを使うのは evaluate / history / config のみ
async fn run(cli: Cli) -> Result<()> {
    let timeout_seconds = cli.timeout;

    match cli.command {
        Commands::Evaluate { paths, output, html, no_retry } => {
            let config = Config::load()?;
            println!("📷 FocusLens - 摄影作品评审\n");
            let options = EvaluateOptions {
                paths,
                output_dir: output,
                html,
                no_retry,
                timeout_seconds,
            };
            evaluate::run(&config, &options).await?;
        }

        Commands::History { action } => {
            let config = Config::load()?;
            let mut history = HistoryStore::load(config.store().clone());
            run_history(&mut history, action)?;
        }

        Commands::Config { set_api_key, set_base_url, clear_base_url, set_model, show } => {
            let mut config = Config::load()?;

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ API Key 已保存");
            }

            if let Some(url) = set_base_url {
                config.set_base_url(Some(url))?;
                println!("✔ Base URL 已保存");
            }

            if clear_base_url {
                config.set_base_url(None)?;
                println!("✔ Base URL 已恢复默认");
            }

            if let Some(model) = set_model {
                config.set_model(model)?;
                println!("✔ 模型已保存");
            }

            if show {
                println!("设置:");
                for line in config.describe() {
                    println!("{}", line);
                }
            }
        }

        Commands::Render { input, output } => {
            let markdown = std::fs::read_to_string(&input)
                .map_err(|_| FocusLensError::FileNotFound(input.display().to_string()))?;
            let fragment = render_markdown(&markdown);

            match output {
                Some(path) => {
                    std::fs::write(&path, render_document(evaluate::HTML_TITLE, &fragment))?;
                    println!("✔ HTML 已保存: {}", path.display());
                }
                None => println!("{}", fragment),
            }
        }

        Commands::Serve { bind } => {
            server::serve(&bind, timeout_seconds)
                .await
                .map_err(|e| FocusLensError::Server(e.to_string()))?;
        }
    }

    Ok(())
}

fn run_history(history: &mut History, action: HistoryAction) -> Result<()> {
    match action {
        HistoryAction::List => {
            if history.is_empty() {
                println!("暂无历史记录");
                return Ok(());
            }
            println!("历史记录（{} 条）:", history.len());
            for record in history.records() {
                println!("  {}  {}", short_id(&record.id), record.summary());
            }
        }

        HistoryAction::Show { id, html } => {
            let record = find_record(history, &id)?.clone();

            // 画像と結果をセッションに復元（外部呼び出しなし）
            let mut session = Session::new(thumbnail::ThumbnailPreviewHost::new()?);
            session.load_from_history(&record)?;

            println!("{}", record.summary());
            for image in session.images() {
                println!("  - {}", image.file_name);
            }
            if let Some(report) = session.report() {
                println!("\n{}", report.content.trim_end());
            }

            if let Some(path) = html {
                evaluate::save_html(&record.result, &path)?;
                println!("\n✔ HTML 已保存: {}", path.display());
            }
        }

        HistoryAction::Remove { id } => {
            let full_id = find_record(history, &id)?.id.clone();
            history.remove(&full_id);
            println!("✔ 已删除: {}", short_id(&full_id));
        }

        HistoryAction::Clear { yes } => {
            if history.is_empty() {
                println!("暂无历史记录");
                return Ok(());
            }
            let confirmed = yes
                || Confirm::new()
                    .with_prompt(format!("确定要清空全部 {} 条历史记录吗？", history.len()))
                    .default(false)
                    .interact()?;
            if confirmed {
                history.clear();
                println!("✔ 历史记录已清空");
            } else {
                println!("已取消");
            }
        }

        HistoryAction::Export { id, output } => {
            let record = find_record(history, &id)?;
            let report = focuslens_common::ReportFile::from_result(&record.result);
            let path = evaluate::save_report(&report, Path::new(&output))?;
            println!("✔ 报告已保存: {}", path.display());
        }
    }
    Ok(())
}

/// 完全一致、なければ一意な前方一致で履歴を探す
fn find_record<'a>(history: &'a History, id: &str) -> Result<&'a HistoryRecord> {
    if let Some(record) = history.get(id) {
        return Ok(record);
    }
    let mut matches = history.records().iter().filter(|r| r.id.starts_with(id));
    match (matches.next(), matches.next()) {
        (Some(record), None) if !id.is_empty() => Ok(record),
        _ => Err(FocusLensError::HistoryNotFound(id.to_string())),
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
