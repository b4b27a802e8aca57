//! Zohoアクセストークン管理
//!
//! リフレッシュトークンがあれば期限切れ前（5分の余裕）に再取得する。

use crate::config::RefreshCredentials;
use crate::error::{PriceSyncError, Result};
use serde::Deserialize;
use std::time::{Duration, Instant};

const DEFAULT_EXPIRES_IN: u64 = 3600;
const EXPIRY_MARGIN: Duration = Duration::from_secs(300);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires_at) => now + EXPIRY_MARGIN < expires_at,
            None => true,
        }
    }
}

/// アクセストークンの保持と再取得
#[derive(Debug)]
pub struct TokenManager {
    accounts_url: String,
    refresh: Option<RefreshCredentials>,
    current: Option<CachedToken>,
}

impl TokenManager {
    /// * `token` - 環境変数で与えられた固定トークン（期限不明）
    pub fn new(token: Option<String>, refresh: Option<RefreshCredentials>, accounts_url: String) -> Self {
        Self {
            accounts_url,
            refresh,
            current: token.map(|value| CachedToken {
                value,
                expires_at: None,
            }),
        }
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh.is_some()
    }

    /// 期限内のトークンがあればそれを返す
    pub fn cached(&self) -> Option<String> {
        self.current
            .as_ref()
            .filter(|t| t.is_fresh(Instant::now()))
            .map(|t| t.value.clone())
    }

    /// 保持しているトークンを破棄（401受信時）
    pub fn invalidate(&mut self) {
        self.current = None;
    }

    /// リフレッシュトークンで新しいアクセストークンを取得
    pub async fn refresh(&mut self, client: &reqwest::Client) -> Result<String> {
        let Some(creds) = &self.refresh else {
            return Err(PriceSyncError::Unauthorized(
                "アクセストークンが無効で、リフレッシュ用の認証情報もありません".into(),
            ));
        };

        tracing::info!("Zohoアクセストークンを更新中");
        let form = [
            ("refresh_token", creds.refresh_token.as_str()),
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
            ("grant_type", "refresh_token"),
        ];
        let response = client
            .post(&self.accounts_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| PriceSyncError::Unavailable(format!("トークン更新接続エラー: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PriceSyncError::from_status(status.as_u16(), "トークン更新"));
        }

        let body = response.text().await?;
        let token = parse_token_response(&body, Instant::now())?;
        let value = token.value.clone();
        if let Some(expires_at) = token.expires_at {
            let secs = expires_at.saturating_duration_since(Instant::now()).as_secs();
            tracing::info!(expires_in_secs = secs, "アクセストークンを更新しました");
        }
        self.current = Some(token);
        Ok(value)
    }
}

fn parse_token_response(body: &str, now: Instant) -> Result<CachedToken> {
    let parsed: TokenResponse = serde_json::from_str(body)
        .map_err(|e| PriceSyncError::Malformed(format!("トークン応答: {}", e)))?;

    // Zohoは失敗時もHTTP 200で error を返す
    if let Some(error) = parsed.error {
        return Err(PriceSyncError::Unauthorized(format!("トークン更新失敗: {}", error)));
    }

    let value = parsed
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| PriceSyncError::Malformed("トークン応答に access_token がありません".into()))?;

    Ok(CachedToken {
        value,
        expires_at: Some(now + Duration::from_secs(parsed.expires_in.unwrap_or(DEFAULT_EXPIRES_IN))),
    })
}
