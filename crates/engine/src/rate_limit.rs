use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Token bucket shared by every task of one scanner.
///
/// One token is added every `period`, up to `burst`. Callers that find the
/// bucket empty sleep until the next token is due, so the steady-state rate
/// is one acquisition per `period` no matter how many tasks are waiting.
#[derive(Debug)]
pub struct RateLimiter {
    period: Duration,
    burst: f64,
    bucket: Mutex<Bucket>,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

impl RateLimiter {
    pub fn new(period: Duration, burst: u32) -> Self {
        let burst = f64::from(burst.max(1));
        Self {
            period,
            burst,
            bucket: Mutex::new(Bucket {
                tokens: burst,
                refilled_at: Instant::now(),
            }),
        }
    }

    /// One acquisition per `period`, no bursting.
    pub fn per_period(period: Duration) -> Self {
        Self::new(period, 1)
    }

    /// Wait for a token.
    pub async fn acquire(&self) {
        if self.period.is_zero() {
            return;
        }
        let period = self.period.as_secs_f64();

        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                let now = Instant::now();
                let elapsed = now.saturating_duration_since(bucket.refilled_at).as_secs_f64();
                bucket.tokens = (bucket.tokens + elapsed / period).min(self.burst);
                bucket.refilled_at = now;

                // tolerance keeps float residue from turning into a zero-length sleep
                if bucket.tokens >= 1.0 - 1e-9 {
                    bucket.tokens = (bucket.tokens - 1.0).max(0.0);
                    return;
                }
                Duration::from_secs_f64((1.0 - bucket.tokens) * period)
            };
            tokio::time::sleep(wait).await;
        }
    }
}
