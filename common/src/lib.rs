//! Price Sync Common Library
//!
//! CLIとテストで共有される型・照合ロジック・レスポンスパーサー

pub mod types;
pub mod alias;
pub mod error;
pub mod matcher;
pub mod parser;
pub mod prompts;

pub use types::{InventoryRecord, MatchResult, PriceQuote, SheetItem};
pub use alias::BrandAliases;
pub use error::{Error, Result};
pub use matcher::{find_best_match, match_all, word_overlap_ratio, MatchOptions};
pub use parser::{extract_json_object, parse_quote_json, summarize_prices, QuoteResponse};
pub use prompts::{build_price_prompt, PRICE_SYSTEM_PROMPT};
