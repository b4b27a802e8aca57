use crate::error::{PriceSyncError, Result};
use crate::retry::RetryPolicy;
use crate::sheet::SheetSource;
use clap::{Args, Parser, Subcommand};
use price_sync_common::{BrandAliases, MatchOptions};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "price-sync")]
#[command(about = "スプレッドシートの在庫をAI見積りで価格更新するツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// ログファイル（追記）
    #[arg(long, global = true, default_value = crate::logging::DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// ログファイルに書き出さない
    #[arg(long, global = true)]
    pub no_log_file: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 照合・見積り・価格更新を一括実行
    Run {
        #[command(flatten)]
        sheet: SheetArgs,

        /// 結果JSONファイル（ディレクトリ指定時は price_sync_results.json）
        #[arg(short, long, default_value = crate::export::DEFAULT_RESULTS_FILE)]
        output: PathBuf,

        /// 結果のExcelレポート
        #[arg(long)]
        report: Option<PathBuf>,

        #[command(flatten)]
        matching: MatchArgs,

        #[command(flatten)]
        retry: RetryArgs,

        /// 処理する行数の上限
        #[arg(long)]
        limit: Option<usize>,

        /// 更新を送信せずにプレビュー
        #[arg(long)]
        dry_run: bool,

        /// 処理済み台帳の置き場所（省略時は結果ファイルと同じ場所）
        #[arg(long)]
        ledger_dir: Option<PathBuf>,

        /// 処理済み台帳を使わない
        #[arg(long)]
        no_ledger: bool,
    },

    /// 在庫との照合だけを行いレポートを出力
    Match {
        #[command(flatten)]
        sheet: SheetArgs,

        /// 在庫JSONファイル（省略時はZohoから取得）
        #[arg(short, long)]
        inventory: Option<PathBuf>,

        /// Zohoから取得した在庫をJSONに保存
        #[arg(long)]
        save_inventory: Option<PathBuf>,

        /// 照合結果のExcelレポート
        #[arg(long)]
        report: Option<PathBuf>,

        /// 照合結果JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        matching: MatchArgs,
    },

    /// 設定を表示
    Config {
        /// 認証情報の有無を表示（値はマスク）
        #[arg(long)]
        show: bool,
    },

    /// 処理済み台帳の管理
    Ledger {
        /// 台帳を削除
        #[arg(long)]
        clear: bool,

        /// 台帳の置き場所（省略時はカレント）
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// 台帳情報を表示
        #[arg(long)]
        info: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SheetArgs {
    /// スプレッドシート（.xlsx/.xls/.ods/.csv またはCSVエクスポートURL）
    #[arg(short, long)]
    pub sheet: SheetSource,

    /// ワークシート名（省略時は先頭）
    #[arg(short, long)]
    pub worksheet: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct MatchArgs {
    /// 一致とみなす最低スコア（0-100）
    #[arg(long, default_value = "30")]
    pub threshold: f64,

    /// 名前類似度の重み
    #[arg(long, default_value = "0.7")]
    pub name_weight: f64,

    /// ブランド一致の重み
    #[arg(long, default_value = "0.3")]
    pub brand_weight: f64,

    /// ブランド別名プリセット (lab/none)
    #[arg(long)]
    pub brand_preset: Option<String>,

    /// ブランド別名ファイル（JSON）
    #[arg(long)]
    pub brand_aliases: Option<PathBuf>,
}

impl MatchArgs {
    pub fn to_options(&self) -> Result<MatchOptions> {
        if !(0.0..=100.0).contains(&self.threshold) {
            return Err(PriceSyncError::Config(format!(
                "--threshold は0〜100で指定してください: {}",
                self.threshold
            )));
        }
        if self.name_weight < 0.0 || self.brand_weight < 0.0 {
            return Err(PriceSyncError::Config("重みは0以上で指定してください".into()));
        }

        let mut aliases = BrandAliases::default();
        if let Some(preset) = &self.brand_preset {
            let preset_aliases = BrandAliases::from_preset(preset).ok_or_else(|| {
                PriceSyncError::Config(format!("不明なプリセット: {}。lab / none を指定してください", preset))
            })?;
            aliases.merge(&preset_aliases);
        }
        if let Some(path) = &self.brand_aliases {
            aliases.merge(&BrandAliases::from_file(path)?);
        }

        Ok(MatchOptions {
            name_weight: self.name_weight,
            brand_weight: self.brand_weight,
            threshold: self.threshold,
            brand_aliases: aliases,
        })
    }
}

#[derive(Args, Debug, Clone)]
pub struct RetryArgs {
    /// 外部API呼び出し間の待機（ミリ秒）
    #[arg(long, default_value = "2000")]
    pub delay_ms: u64,

    /// レート制限時の最大試行回数
    #[arg(long, default_value = "3")]
    pub max_attempts: u32,

    /// 初回バックオフ（ミリ秒、以降倍々）
    #[arg(long, default_value = "5000")]
    pub backoff_ms: u64,
}

impl RetryArgs {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            backoff: Duration::from_millis(self.backoff_ms),
            call_delay: Duration::from_millis(self.delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_defaults() {
        let cli = Cli::parse_from(["price-sync", "run", "--sheet", "inventory.xlsx"]);
        match cli.command {
            Commands::Run { sheet, matching, retry, dry_run, .. } => {
                assert_eq!(sheet.sheet, SheetSource::Local(PathBuf::from("inventory.xlsx")));
                assert!(!dry_run);
                let options = matching.to_options().unwrap();
                assert_eq!(options, MatchOptions::default());
                assert_eq!(retry.to_policy(), RetryPolicy::default());
            }
            _ => panic!("Expected Run"),
        }
    }

    #[test]
    fn test_invalid_threshold() {
        let cli = Cli::parse_from(["price-sync", "match", "--sheet", "a.csv", "--threshold", "150"]);
        match cli.command {
            Commands::Match { matching, .. } => assert!(matching.to_options().is_err()),
            _ => panic!("Expected Match"),
        }
    }

    #[test]
    fn test_unknown_preset() {
        let cli = Cli::parse_from(["price-sync", "match", "--sheet", "a.csv", "--brand-preset", "food"]);
        match cli.command {
            Commands::Match { matching, .. } => {
                assert!(matches!(matching.to_options(), Err(PriceSyncError::Config(_))))
            }
            _ => panic!("Expected Match"),
        }
    }

    #[test]
    fn test_lab_preset_loaded() {
        let cli = Cli::parse_from(["price-sync", "match", "--sheet", "a.csv", "--brand-preset", "lab"]);
        match cli.command {
            Commands::Match { matching, .. } => {
                assert!(!matching.to_options().unwrap().brand_aliases.is_empty())
            }
            _ => panic!("Expected Match"),
        }
    }
}
