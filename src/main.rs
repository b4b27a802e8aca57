use anyhow::Context;
use clap::Parser;
use price_sync::{cli, config, export, inventory, logging, pipeline, sheet};
use price_sync::estimator::OpenAiEstimator;
use price_sync::inventory::{InventoryStore, JsonInventory, ZohoInventory};
use price_sync::pipeline::{Ledger, RunOptions};
use price_sync::retry::RetryPolicy;
use price_sync_common::{match_all, MatchResult};
use cli::{Cli, Commands};
use config::{mask_secret, Config};
use std::path::{Path, PathBuf};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log_file = (!cli.no_log_file).then_some(cli.log_file.as_path());
    logging::init(log_file, cli.verbose)?;
    let config = Config::load();

    match cli.command {
        Commands::Run { sheet, output, report, matching, retry, limit, dry_run, ledger_dir, no_ledger } => {
            println!("💰 price-sync - 価格同期{}\n", if dry_run { "（ドライラン）" } else { "" });

            config.validate_for_run()?;
            let match_options = matching.to_options()?;

            // 1. シート読み込み
            println!("[1/4] シートを読み込み中...");
            let items = sheet::load_sheet(&sheet.sheet, sheet.worksheet.as_deref())
                .await
                .with_context(|| format!("シートを読み込めません: {}", sheet.sheet))?;
            println!("✔ {}行を検出\n", items.len());

            // 2. 接続準備
            println!("[2/4] 見積りAPI・在庫APIに接続中...");
            let policy = retry.to_policy();
            let estimator = OpenAiEstimator::new(config.estimator_settings()?)?;
            let store = ZohoInventory::new(config.inventory_settings()?, policy.call_delay)?;
            println!("✔ モデル: {}\n", estimator.model());

            let output_path = export::results_path(&output);
            let ledger_dir = ledger_dir.unwrap_or_else(|| parent_dir(&output_path));
            let mut ledger = if no_ledger { Ledger::default() } else { Ledger::load(&ledger_dir) };
            if !ledger.is_empty() {
                println!("- 台帳: {}件が処理済み", ledger.len());
            }

            // 3. 照合・見積り・更新
            println!("[3/4] 照合・価格更新中...");
            let options = RunOptions {
                match_options,
                retry: policy,
                dry_run,
                limit,
                show_progress: !cli.verbose,
            };
            let result = pipeline::run(&items, &estimator, &store, &mut ledger, &options).await;

            // 中断時もそれまでの記録は残す
            if !dry_run && !no_ledger {
                ledger.save(&ledger_dir)?;
            }
            let summary = match result {
                Ok(summary) => summary,
                Err(aborted) => {
                    // 中断までの結果も残してから終了する
                    export::write_summary(&aborted.summary, &output_path)?;
                    println!(
                        "⚠ 中断までの結果を保存: {}（処理 {} / 更新 {} / エラー {}）",
                        output_path.display(),
                        aborted.summary.processed,
                        aborted.summary.updated,
                        aborted.summary.errored
                    );
                    return Err(anyhow::Error::new(aborted));
                }
            };
            println!(
                "✔ 処理 {} / 一致 {} / 更新 {} / 変更なし {} / 一致なし {} / スキップ {} / エラー {}\n",
                summary.processed,
                summary.matched,
                summary.updated,
                summary.unchanged,
                summary.unmatched,
                summary.skipped,
                summary.errored
            );

            // 4. 結果保存
            println!("[4/4] 結果を保存中...");
            export::write_summary(&summary, &output_path)?;
            println!("✔ 結果を保存: {}", output_path.display());
            if let Some(report_path) = report {
                export::generate_outcome_report(&summary, &report_path)?;
                println!("✔ レポート出力: {}", report_path.display());
            }

            println!("\n✅ 完了");
        }

        Commands::Match { sheet, inventory, save_inventory, report, output, matching } => {
            println!("🔍 price-sync - 照合プレビュー\n");

            let match_options = matching.to_options()?;

            println!("[1/3] シートを読み込み中...");
            let items = sheet::load_sheet(&sheet.sheet, sheet.worksheet.as_deref())
                .await
                .with_context(|| format!("シートを読み込めません: {}", sheet.sheet))?;
            println!("✔ {}行を検出\n", items.len());

            println!("[2/3] 在庫を取得中...");
            let records = match &inventory {
                Some(path) => JsonInventory::load(path)?.list_records().await?,
                None => {
                    let store = ZohoInventory::new(config.inventory_settings()?, RetryPolicy::default().call_delay)?;
                    store.list_records().await?
                }
            };
            println!("✔ {}件の在庫レコード\n", records.len());
            if let Some(path) = save_inventory {
                inventory::save_records(&records, &path)?;
                println!("✔ 在庫を保存: {}", path.display());
            }

            println!("[3/3] 照合中...");
            let results = match_all(&items, &records, &match_options);
            print_match_results(&results);

            if let Some(path) = output {
                let json = serde_json::to_string_pretty(&results)?;
                std::fs::write(&path, json)?;
                println!("✔ 照合結果を保存: {}", path.display());
            }
            if let Some(path) = report {
                export::generate_match_report(&results, &path)?;
                println!("✔ レポート出力: {}", path.display());
            }

            println!("\n✅ 照合完了");
        }

        Commands::Config { show } => {
            if show {
                println!("設定:");
                println!("  OPENAI_API_KEY: {}", mask_secret(config.openai_api_key.as_deref()));
                println!("  OPENAI_MODEL: {}", config.openai_model);
                println!("  OPENAI_BASE_URL: {}", config.openai_base_url);
                println!("  ZOHO_TOKEN: {}", mask_secret(config.zoho_token.as_deref()));
                println!("  ZOHO_ORG_ID: {}", config.zoho_org_id.as_deref().unwrap_or("未設定"));
                println!(
                    "  ZOHO_REFRESH_TOKEN: {}",
                    mask_secret(config.zoho_refresh.as_ref().map(|r| r.refresh_token.as_str()))
                );
                println!("  ZOHO_API_BASE: {}", config.zoho_api_base);
            }

            match config.validate_for_run() {
                Ok(()) => println!("✔ 必要な認証情報は揃っています"),
                Err(e) => println!("⚠ {}", e),
            }
        }

        Commands::Ledger { clear, dir, info } => {
            let target = dir.unwrap_or_else(|| PathBuf::from("."));
            let ledger_path = Ledger::ledger_path(&target);

            if info || !clear {
                // デフォルトまたは--info: 情報表示
                if ledger_path.exists() {
                    let ledger = Ledger::load(&target);
                    println!("台帳情報:");
                    println!("  パス: {}", ledger_path.display());
                    println!("  件数: {}", ledger.len());
                    if let Ok(meta) = std::fs::metadata(&ledger_path) {
                        println!("  サイズ: {} bytes", meta.len());
                    }
                } else {
                    println!("台帳ファイルが存在しません: {}", ledger_path.display());
                }
            }

            if clear {
                match Ledger::clear(&target) {
                    Ok(true) => println!("✔ 台帳を削除しました: {}", ledger_path.display()),
                    Ok(false) => println!("台帳ファイルが存在しません"),
                    Err(e) => println!("台帳削除エラー: {}", e),
                }
            }
        }
    }

    Ok(())
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn print_match_results(results: &[MatchResult]) {
    let matched = results.iter().filter(|r| r.is_match()).count();
    for result in results {
        let item = &result.sheet_item;
        match &result.inventory_record {
            Some(record) => println!(
                "  行{:>4} {} → {} ({}) 信頼度 {}",
                item.row, item.name, record.sku, record.name, result.confidence
            ),
            None => println!("  行{:>4} {} → 一致なし (最高 {})", item.row, item.name, result.confidence),
        }
    }
    println!("✔ {}/{}行が一致\n", matched, results.len());
}
