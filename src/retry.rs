//! 再試行ポリシー
//!
//! レート制限時は指数バックオフで上限回数まで再試行する。
//! 外部API呼び出しの間には固定の待機を挟む。

use crate::error::Result;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// 最大試行回数（初回を含む、最低1）
    pub max_attempts: u32,
    /// 初回バックオフ（以降は倍々）
    pub backoff: Duration,
    /// 外部API呼び出し後の待機
    pub call_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(5),
            call_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// 待機なしのポリシー（テスト・オフライン用）
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Duration::ZERO,
            call_delay: Duration::ZERO,
        }
    }

    /// n回目の失敗後のバックオフ（1始まり）
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.backoff.saturating_mul(1u32 << exponent)
    }

    /// 外部API呼び出し間の待機
    pub async fn pause(&self) {
        if !self.call_delay.is_zero() {
            tokio::time::sleep(self.call_delay).await;
        }
    }

    /// 再試行可能なエラーの間は上限回数まで繰り返す
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let wait = self.backoff_for(attempt);
                    tracing::warn!(
                        call = label,
                        attempt,
                        max_attempts,
                        wait_ms = wait.as_millis() as u64,
                        error = %e,
                        "レート制限のため再試行します"
                    );
                    if !wait.is_zero() {
                        tokio::time::sleep(wait).await;
                    }
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_retryable() {
                        tracing::error!(call = label, attempts = attempt, error = %e, "再試行上限に達しました");
                    }
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PriceSyncError;
    use std::cell::Cell;

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            backoff: Duration::from_millis(100),
            ..Default::default()
        };
        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_retries_rate_limited_until_success() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::immediate(3);
        let result = policy
            .run("test", || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n < 3 {
                        Err(PriceSyncError::RateLimited("429".into()))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::immediate(2);
        let result: Result<()> = policy
            .run("test", || {
                calls.set(calls.get() + 1);
                async { Err(PriceSyncError::RateLimited("429".into())) }
            })
            .await;
        assert!(matches!(result, Err(PriceSyncError::RateLimited(_))));
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn test_does_not_retry_other_errors() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::immediate(5);
        let result: Result<()> = policy
            .run("test", || {
                calls.set(calls.get() + 1);
                async { Err(PriceSyncError::Unavailable("503".into())) }
            })
            .await;
        assert!(matches!(result, Err(PriceSyncError::Unavailable(_))));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::immediate(0);
        let _ = policy
            .run("test", || {
                calls.set(calls.get() + 1);
                async { Ok::<_, PriceSyncError>(()) }
            })
            .await;
        assert_eq!(calls.get(), 1);
    }
}
