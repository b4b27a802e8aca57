pub mod excel;

pub use excel::{generate_match_report, generate_outcome_report};

use crate::error::Result;
use crate::pipeline::RunSummary;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// 既定の結果ファイル名
pub const DEFAULT_RESULTS_FILE: &str = "price_sync_results.json";

/// 出力先がディレクトリなら既定ファイル名を付ける
pub fn results_path(output: &Path) -> PathBuf {
    if output.is_dir() || output.extension().is_none() {
        output.join(DEFAULT_RESULTS_FILE)
    } else {
        output.to_path_buf()
    }
}

/// 実行結果をJSONで保存
pub fn write_summary(summary: &RunSummary, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, summary)?;
    Ok(())
}

pub fn read_summary(path: &Path) -> Result<RunSummary> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
