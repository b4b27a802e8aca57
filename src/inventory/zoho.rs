//! Zoho Inventory REST クライアント
//!
//! - 一覧: `GET /items?organization_id=..&per_page=200&page=N`（has_more_page まで）
//! - 更新: `PUT /items/{item_id}`（rate / selling_rate / purchase_rate）
//!
//! 更新はレコードの item_id で行う。item_id がない場合のみ、
//! 直前の一覧取得結果からSKUで item_id を引く。

use super::{sku_key, InventoryStore, TokenManager};
use crate::config::InventorySettings;
use crate::error::{PriceSyncError, Result};
use price_sync_common::InventoryRecord;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

const PER_PAGE: u32 = 200;
const MAX_PAGES: u32 = 500;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// 仕入価格は販売価格の70%
const PURCHASE_RATE_RATIO: f64 = 0.7;

#[derive(Debug, Deserialize)]
struct ItemsPage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    items: Vec<ZohoItem>,
    #[serde(default)]
    page_context: Option<PageContext>,
}

#[derive(Debug, Deserialize)]
struct PageContext {
    #[serde(default)]
    has_more_page: bool,
}

#[derive(Debug, Deserialize)]
struct ZohoItem {
    #[serde(default)]
    item_id: serde_json::Value,
    #[serde(default)]
    name: String,
    #[serde(default)]
    sku: String,
    #[serde(default)]
    rate: Option<f64>,
    #[serde(default)]
    brand: Option<String>,
    #[serde(default)]
    manufacturer: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: Option<String>,
}

impl ZohoItem {
    fn into_record(self) -> InventoryRecord {
        let non_empty = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let brand = non_empty(self.brand).or_else(|| non_empty(self.manufacturer));

        InventoryRecord {
            item_id: item_id_string(&self.item_id),
            sku: self.sku.trim().to_string(),
            name: self.name,
            brand,
            price: self.rate.unwrap_or(0.0),
        }
    }
}

/// item_id は文字列・数値（指数表記を含む）のどちらでも来る
fn item_id_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => match (n.as_u64(), n.as_f64()) {
            (Some(id), _) => id.to_string(),
            (None, Some(id)) => format!("{:.0}", id),
            _ => n.to_string(),
        },
        _ => String::new(),
    }
}

/// 更新リクエストの本文
fn price_update_body(price: f64) -> serde_json::Value {
    let purchase = (price * PURCHASE_RATE_RATIO * 100.0).round() / 100.0;
    serde_json::json!({
        "rate": price,
        "selling_rate": price,
        "purchase_rate": purchase,
    })
}

/// エラー応答の本文から message を取り出す
fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiMessage>(body)
        .ok()
        .and_then(|m| m.message)
        .unwrap_or_else(|| body.trim().chars().take(200).collect())
}

pub struct ZohoInventory {
    client: reqwest::Client,
    api_base: String,
    org_id: String,
    page_delay: Duration,
    tokens: Mutex<TokenManager>,
    item_ids: Mutex<HashMap<String, String>>,
}

impl ZohoInventory {
    /// * `page_delay` - ページ取得間の待機
    pub fn new(settings: InventorySettings, page_delay: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let tokens = TokenManager::new(settings.token, settings.refresh, settings.accounts_url);

        Ok(Self {
            client,
            api_base: settings.api_base,
            org_id: settings.org_id,
            page_delay,
            tokens: Mutex::new(tokens),
            item_ids: Mutex::new(HashMap::new()),
        })
    }

    async fn access_token(&self) -> Result<String> {
        let mut tokens = self.tokens.lock().await;
        match tokens.cached() {
            Some(token) => Ok(token),
            None => tokens.refresh(&self.client).await,
        }
    }

    /// 認証ヘッダーを付けて送信。401ならトークンを更新して1回だけ再送する
    async fn send<F>(&self, build: F) -> Result<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let token = self.access_token().await?;
        let response = self.send_with(&build, &token).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            let mut tokens = self.tokens.lock().await;
            if tokens.can_refresh() {
                tracing::warn!("Zohoが401を返しました。トークンを更新して再送します");
                tokens.invalidate();
                let token = tokens.refresh(&self.client).await?;
                drop(tokens);
                return self.send_with(&build, &token).await;
            }
        }
        Ok(response)
    }

    async fn send_with<F>(&self, build: &F, token: &str) -> Result<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        build()
            .header(AUTHORIZATION, format!("Zoho-oauthtoken {}", token))
            .send()
            .await
            .map_err(|e| PriceSyncError::Unavailable(format!("Zoho接続エラー: {}", e)))
    }

    /// 非2xxを失敗種別に変換し、成功なら本文を返す
    async fn read_body(response: reqwest::Response, context: &str) -> Result<String> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(PriceSyncError::from_status(
                status.as_u16(),
                format!("{}: {}", context, error_message(&body)),
            ));
        }
        Ok(body)
    }

    async fn fetch_page(&self, page: u32) -> Result<ItemsPage> {
        let url = format!("{}/items", self.api_base);
        let query = [
            ("organization_id", self.org_id.clone()),
            ("per_page", PER_PAGE.to_string()),
            ("page", page.to_string()),
        ];
        let response = self.send(|| self.client.get(&url).query(&query)).await?;
        let body = Self::read_body(response, "在庫一覧").await?;

        let parsed: ItemsPage = serde_json::from_str(&body)
            .map_err(|e| PriceSyncError::Malformed(format!("在庫一覧レスポンス: {}", e)))?;
        if parsed.code != 0 {
            return Err(PriceSyncError::Unavailable(format!(
                "在庫一覧 code {}: {}",
                parsed.code,
                parsed.message.as_deref().unwrap_or("")
            )));
        }
        Ok(parsed)
    }
}

impl InventoryStore for ZohoInventory {
    async fn list_records(&self) -> Result<Vec<InventoryRecord>> {
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let parsed = self.fetch_page(page).await?;
            let has_more = parsed.page_context.map(|c| c.has_more_page).unwrap_or(false);
            tracing::debug!(page, items = parsed.items.len(), has_more, "在庫ページを取得");
            records.extend(parsed.items.into_iter().map(ZohoItem::into_record));

            if !has_more {
                break;
            }
            if page >= MAX_PAGES {
                tracing::warn!(pages = page, "ページ数の上限に達したため一覧取得を打ち切ります");
                break;
            }
            page += 1;
            if !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }
        }

        let mut ids = self.item_ids.lock().await;
        ids.clear();
        for record in &records {
            if record.sku.is_empty() || record.item_id.is_empty() {
                continue;
            }
            // SKU重複時は先のレコードを採用
            ids.entry(sku_key(&record.sku)).or_insert_with(|| record.item_id.clone());
        }

        tracing::info!(records = records.len(), pages = page, "Zoho在庫を取得しました");
        Ok(records)
    }

    async fn update_price(&self, record: &InventoryRecord, price: f64) -> Result<()> {
        let item_id = match record.item_id.trim() {
            "" => self
                .item_ids
                .lock()
                .await
                .get(&sku_key(&record.sku))
                .cloned()
                .ok_or_else(|| {
                    PriceSyncError::NotFound(format!("SKU '{}' に対応するitem_idがありません", record.sku))
                })?,
            id => id.to_string(),
        };

        let url = format!("{}/items/{}", self.api_base, item_id);
        let body = price_update_body(price);
        let query = [("organization_id", self.org_id.as_str())];
        let response = self
            .send(|| self.client.put(&url).query(&query).json(&body))
            .await?;
        let text = Self::read_body(response, &format!("item {}", item_id)).await?;

        if let Ok(message) = serde_json::from_str::<ApiMessage>(&text) {
            if message.code != 0 {
                return Err(PriceSyncError::Unavailable(format!(
                    "item {} code {}: {}",
                    item_id,
                    message.code,
                    message.message.unwrap_or_default()
                )));
            }
        }

        tracing::info!(sku = %record.sku, item_id = %item_id, price, "価格を更新しました");
        Ok(())
    }
}
