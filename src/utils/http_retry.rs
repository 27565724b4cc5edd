use http::Extensions;
use reqwest::{Client, Request, Response};
use reqwest_middleware::{
    ClientBuilder, ClientWithMiddleware, Middleware, Next, Result as MwResult,
};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::Retry;

#[derive(Debug, Default, Clone)]
struct AttemptCount(pub u32);

struct AttemptLogger;

#[async_trait::async_trait]
impl Middleware for AttemptLogger {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> MwResult<Response> {
        let attempt = match extensions.get_mut::<AttemptCount>() {
            Some(c) => {
                c.0 += 1;
                c.0
            }
            None => {
                extensions.insert(AttemptCount(1));
                1
            }
        };

        let method = req.method().clone();
        let url = req.url().clone();
        let t0 = Instant::now();
        debug!("→ attempt #{attempt} {method} {url}");

        let res = next.run(req, extensions).await;

        match &res {
            Ok(resp) => {
                debug!(
                    "← attempt #{attempt} {} {} in {:?}",
                    resp.status(),
                    resp.url(),
                    t0.elapsed()
                );
            }
            Err(err) => {
                warn!("⇠ attempt #{attempt} error after {:?}: {err}", t0.elapsed());
            }
        }
        res
    }
}

struct SummaryLogger;

#[async_trait::async_trait]
impl Middleware for SummaryLogger {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> MwResult<Response> {
        let method = req.method().clone();
        let url = req.url().clone();
        let t0 = Instant::now();

        let res = next.run(req, extensions).await;

        let attempts = extensions.get::<AttemptCount>().map(|c| c.0).unwrap_or(1);
        match &res {
            Ok(resp) => debug!(
                "✔ {method} {url} -> {} in {:?} (attempts: {attempts})",
                resp.status(),
                t0.elapsed()
            ),
            Err(err) => warn!(
                "✖ {method} {url} failed after {:?} (attempts: {attempts}): {err}",
                t0.elapsed()
            ),
        }
        res
    }
}

/// Wrap a client with transient-failure retries (5xx, 429, connect errors).
/// 400 and 404 are not transient and pass straight through.
pub fn build_client_with_retry(reqwest_client: Client, config: &Retry) -> ClientWithMiddleware {
    let min = Duration::from_millis(config.min_delay_ms);
    let max = Duration::from_millis(config.max_delay_ms.max(config.min_delay_ms));
    let policy = ExponentialBackoff::builder()
        .retry_bounds(min, max)
        .build_with_max_retries(config.max_retries);

    ClientBuilder::new(reqwest_client)
        .with(SummaryLogger)
        .with(RetryTransientMiddleware::new_with_policy(policy))
        .with(AttemptLogger)
        .build()
}
