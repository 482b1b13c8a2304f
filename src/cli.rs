use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{DEFAULT_BIND, DEFAULT_TIMEOUT_SECONDS};

#[derive(Parser)]
#[command(name = "focuslens")]
#[command(version, about = "摄影作品 AI 评审工具", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Gemini API のタイムアウト（秒）
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_TIMEOUT_SECONDS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: u64,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 写真を評審してレポートを出力
    Evaluate {
        /// 画像ファイルまたはフォルダ（複数可）
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// レポート(.md)の出力ディレクトリ
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// HTML レポートの出力先
        #[arg(long)]
        html: Option<PathBuf>,

        /// 失敗時に再試行を確認しない
        #[arg(long)]
        no_retry: bool,
    },

    /// 評審履歴
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// 設定を表示/編集
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// Base URL を設定（プロキシ等）
        #[arg(long, conflicts_with = "clear_base_url")]
        set_base_url: Option<String>,

        /// Base URL を既定値に戻す
        #[arg(long)]
        clear_base_url: bool,

        /// モデル名を設定
        #[arg(long)]
        set_model: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },

    /// Markdown レポートを HTML に変換
    Render {
        /// 入力 Markdown ファイル
        #[arg(required = true)]
        input: PathBuf,

        /// 出力ファイル（省略時は標準出力に断片を出力）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// HTTP エンドポイントを起動
    Serve {
        /// 待ち受けアドレス
        #[arg(short, long, default_value = DEFAULT_BIND)]
        bind: String,
    },
}

#[derive(Subcommand)]
pub enum HistoryAction {
    /// 一覧（新しい順）
    List,

    /// 1件表示
    Show {
        /// 履歴ID（前方一致可）
        id: String,

        /// HTML レポートの出力先
        #[arg(long)]
        html: Option<PathBuf>,
    },

    /// 1件削除
    Remove {
        /// 履歴ID（前方一致可）
        id: String,
    },

    /// 全件削除
    Clear {
        /// 確認を省略
        #[arg(short, long)]
        yes: bool,
    },

    /// レポート(.md)を書き出す
    Export {
        /// 履歴ID（前方一致可）
        id: String,

        /// 出力ディレクトリ
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
}
