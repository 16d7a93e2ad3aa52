use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::RngCore;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use worker_core::WorkerCtx;
use worker_core::dispatch::LoadMethod;

use common::target::split_host_port;

/// Opens a TCP connection (optionally, per the platform's documented proxy
/// limitation, to the proxy instead of the target), sends 64 random bytes
/// on success, closes. 3s connect timeout, 10ms pacing.
pub struct TcpFlood;

#[async_trait]
impl LoadMethod for TcpFlood {
    async fn run_unit(&self, ctx: Arc<WorkerCtx>) -> Result<(), String> {
        let (host, port) =
            split_host_port(&ctx.target).ok_or_else(|| format!("bad target {}", ctx.target))?;

        while ctx.should_continue() {
            let connect_target = match ctx.pick_proxy() {
                Some(proxy) => (proxy.host.clone(), proxy.port),
                None => (host.clone(), port),
            };

            ctx.metrics.events_sent.inc();
            let connected =
                tokio::time::timeout(Duration::from_secs(3), TcpStream::connect(connect_target))
                    .await;
            match connected {
                Ok(Ok(mut stream)) => {
                    let mut payload = [0u8; 64];
                    rand::rng().fill_bytes(&mut payload);
                    if stream.write_all(&payload).await.is_ok() {
                        ctx.metrics.bytes_sent.inc_by(64);
                        ctx.metrics.successes.inc();
                    } else {
                        ctx.metrics.failures.inc();
                    }
                }
                _ => {
                    ctx.metrics.failures.inc();
                }
            }

            tokio::select! {
                _ = ctx.stop.cancelled() => break,
                _ = tokio::time::sleep(Duration::from_millis(10)) => {}
            }
        }
        Ok(())
    }
}
