//! ログ初期化
//!
//! `RUST_LOG` があればそれを使い、なければ `--verbose` で debug、通常は warn。
//! レポートを標準出力に流すため、ログは標準エラーに出す。

use tracing_subscriber::EnvFilter;

pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "focuslens=debug,focuslens_common=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
