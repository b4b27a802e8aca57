//! ログ設定
//!
//! stderr と追記専用のプレーンテキストログファイルの2系統に出力する。
//! フィルタは `RUST_LOG` を優先する。

use crate::error::{PriceSyncError, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 既定のログファイル名
pub const DEFAULT_LOG_FILE: &str = "price_sync.log";

fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "price_sync=debug,price_sync_common=debug"
    } else {
        "price_sync=info"
    }
}

/// グローバルsubscriberを初期化
pub fn init(log_file: Option<&Path>, verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| PriceSyncError::Config(format!("ログ初期化エラー: {}", e)))
}
