//! price-sync
//!
//! スプレッドシートの在庫行を在庫APIのレコードと照合し、
//! AIによる価格見積りで在庫価格を更新する。

pub mod cli;
pub mod config;
pub mod error;
pub mod estimator;
pub mod export;
pub mod inventory;
pub mod logging;
pub mod pipeline;
pub mod retry;
pub mod sheet;
