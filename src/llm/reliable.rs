use super::traits::{Provider, ResponseFormat};
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;

/// Check if an error is non-retryable (client errors that won't resolve with retries).
fn is_non_retryable(err: &anyhow::Error) -> bool {
    let msg = err.to_string();
    if is_quota_exhausted(&msg) {
        return true;
    }

    if let Some(reqwest_err) = err.downcast_ref::<reqwest::Error>()
        && let Some(status) = reqwest_err.status()
    {
        let code = status.as_u16();
        // 429 and 408 are transient even though they are 4xx.
        return status.is_client_error() && code != 429 && code != 408;
    }

    // Provider errors carry the status as "(401 Unauthorized)".
    for word in msg.split(|c: char| !c.is_ascii_digit()) {
        if let Ok(code) = word.parse::<u16>()
            && (400..500).contains(&code)
        {
            return code != 429 && code != 408;
        }
    }
    false
}

fn is_quota_exhausted(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("insufficient_quota") || lower.contains("exceeded your current quota")
}

/// Randomized exponential backoff bounds.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (0-based): uniform in
    /// `[min, min(max, min * 2^attempt)]`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let min_ms = u64::try_from(self.min_delay.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.max_delay.as_millis())
            .unwrap_or(u64::MAX)
            .max(min_ms);
        let ceiling = min_ms
            .saturating_mul(1_u64.checked_shl(attempt).unwrap_or(u64::MAX))
            .min(max_ms);

        if ceiling <= min_ms {
            return Duration::from_millis(min_ms);
        }
        Duration::from_millis(rand::rng().random_range(min_ms..=ceiling))
    }
}

/// Provider wrapper that retries transient failures with jittered backoff.
pub struct ReliableProvider {
    inner: Box<dyn Provider>,
    policy: BackoffPolicy,
}

impl ReliableProvider {
    pub fn new(inner: Box<dyn Provider>, policy: BackoffPolicy) -> Self {
        Self {
            inner,
            policy: BackoffPolicy {
                max_attempts: policy.max_attempts.max(1),
                ..policy
            },
        }
    }
}

#[async_trait]
impl Provider for ReliableProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        format: ResponseFormat,
    ) -> anyhow::Result<String> {
        let provider_name = self.inner.name();
        let mut failures = Vec::new();

        for attempt in 0..self.policy.max_attempts {
            match self.inner.generate(system_prompt, user_prompt, format).await {
                Ok(text) => {
                    if attempt > 0 {
                        tracing::info!(
                            provider = provider_name,
                            attempt,
                            "Provider recovered after retries"
                        );
                    }
                    return Ok(text);
                }
                Err(e) => {
                    let non_retryable = is_non_retryable(&e);
                    failures.push(format!(
                        "attempt {}/{}: {e}",
                        attempt + 1,
                        self.policy.max_attempts
                    ));

                    if non_retryable {
                        tracing::warn!(provider = provider_name, "Non-retryable provider error");
                        break;
                    }

                    if attempt + 1 < self.policy.max_attempts {
                        let delay = self.policy.delay_for(attempt);
                        tracing::warn!(
                            provider = provider_name,
                            attempt = attempt + 1,
                            max_attempts = self.policy.max_attempts,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            "Provider call failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        anyhow::bail!(
            "{provider_name} generation failed. Attempts:\n{}",
            failures.join("\n")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyProvider {
        calls: Arc<AtomicU32>,
        fail_times: u32,
        error: &'static str,
    }

    #[async_trait]
    impl Provider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn generate(
            &self,
            _system_prompt: &str,
            _user_prompt: &str,
            _format: ResponseFormat,
        ) -> anyhow::Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_times {
                anyhow::bail!("{}", self.error);
            }
            Ok("ok".into())
        }
    }

    fn fast_policy(max_attempts: u32) -> BackoffPolicy {
        BackoffPolicy {
            max_attempts,
            min_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    fn flaky(fail_times: u32, error: &'static str) -> (ReliableProvider, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let provider = ReliableProvider::new(
            Box::new(FlakyProvider {
                calls: Arc::clone(&calls),
                fail_times,
                error,
            }),
            fast_policy(3),
        );
        (provider, calls)
    }

    #[tokio::test]
    async fn succeeds_without_retry() {
        let (provider, calls) = flaky(0, "unused");
        let out = provider.generate("s", "u", ResponseFormat::Text).await.unwrap();
        assert_eq!(out, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let (provider, calls) = flaky(2, "OpenAI API error (503 Service Unavailable)");
        let out = provider.generate("s", "u", ResponseFormat::Json).await.unwrap();
        assert_eq!(out, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let (provider, calls) = flaky(10, "connection reset");
        let err = provider
            .generate("s", "u", ResponseFormat::Text)
            .await
            .unwrap_err()
            .to_string();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(err.contains("attempt 3/3"));
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let (provider, calls) = flaky(10, "OpenAI API error (401 Unauthorized): nope");
        assert!(provider.generate("s", "u", ResponseFormat::Text).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rate_limits_are_retried() {
        let (provider, calls) = flaky(1, "OpenAI API error (429 Too Many Requests)");
        assert!(provider.generate("s", "u", ResponseFormat::Text).await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn backoff_stays_within_bounds() {
        let policy = BackoffPolicy {
            max_attempts: 6,
            min_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1_000),
        };
        for attempt in 0..10 {
            let delay = policy.delay_for(attempt);
            assert!(delay >= Duration::from_millis(100), "attempt {attempt}: {delay:?}");
            assert!(delay <= Duration::from_millis(1_000), "attempt {attempt}: {delay:?}");
        }
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
    }

    #[test]
    fn quota_exhaustion_is_terminal() {
        let err = anyhow::anyhow!("insufficient_quota: add billing details");
        assert!(is_non_retryable(&err));
    }
}
