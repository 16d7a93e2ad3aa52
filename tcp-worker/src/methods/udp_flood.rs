use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::RngCore;
use tokio::net::UdpSocket;
use worker_core::WorkerCtx;
use worker_core::dispatch::LoadMethod;

use common::target::split_host_port;

/// Sends 512 random bytes per datagram to `host:port`. 1ms pacing.
pub struct UdpFlood;

#[async_trait]
impl LoadMethod for UdpFlood {
    async fn run_unit(&self, ctx: Arc<WorkerCtx>) -> Result<(), String> {
        let (host, port) =
            split_host_port(&ctx.target).ok_or_else(|| format!("bad target {}", ctx.target))?;
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| format!("bind failed: {e}"))?;

        while ctx.should_continue() {
            let mut payload = [0u8; 512];
            rand::rng().fill_bytes(&mut payload);
            ctx.metrics.events_sent.inc();
            match socket.send_to(&payload, (host.as_str(), port)).await {
                Ok(n) => {
                    ctx.metrics.bytes_sent.inc_by(n as u64);
                    ctx.metrics.successes.inc();
                }
                Err(_) => {
                    ctx.metrics.failures.inc();
                }
            }

            tokio::select! {
                _ = ctx.stop.cancelled() => break,
                _ = tokio::time::sleep(Duration::from_millis(1)) => {}
            }
        }
        Ok(())
    }
}
