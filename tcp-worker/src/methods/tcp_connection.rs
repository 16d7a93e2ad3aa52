use std::os::fd::AsRawFd;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::RngCore;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use worker_core::dispatch::LoadMethod;
use worker_core::{ResourceHandle, WorkerCtx};

use common::target::split_host_port;

const MAX_CONNECTIONS: usize = 100;
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(1);

/// Maintains up to 100 simultaneous connections, sending 64 random bytes on
/// open and an 8-byte keepalive on every live connection each second;
/// connections that fail to write are evicted.
pub struct TcpConnection;

#[async_trait]
impl LoadMethod for TcpConnection {
    async fn run_unit(&self, ctx: Arc<WorkerCtx>) -> Result<(), String> {
        let (host, port) =
            split_host_port(&ctx.target).ok_or_else(|| format!("bad target {}", ctx.target))?;
        let connect_target = match ctx.pick_proxy() {
            Some(proxy) => (proxy.host.clone(), proxy.port),
            None => (host.clone(), port),
        };

        let mut connections: Vec<(TcpStream, ResourceHandle)> = Vec::with_capacity(MAX_CONNECTIONS);
        for _ in 0..MAX_CONNECTIONS {
            if !ctx.should_continue() {
                break;
            }
            ctx.metrics.events_sent.inc();
            match tokio::select! {
                _ = ctx.stop.cancelled() => break,
                res = TcpStream::connect(connect_target.clone()) => res,
            } {
                Ok(mut stream) => {
                    let mut payload = [0u8; 64];
                    rand::rng().fill_bytes(&mut payload);
                    if stream.write_all(&payload).await.is_ok() {
                        ctx.metrics.bytes_sent.inc_by(64);
                        ctx.metrics.successes.inc();
                        let handle = ctx.resources.register_socket(stream.as_raw_fd());
                        connections.push((stream, handle));
                    } else {
                        ctx.metrics.failures.inc();
                    }
                }
                Err(_) => {
                    ctx.metrics.failures.inc();
                }
            }
        }

        while ctx.should_continue() && !connections.is_empty() {
            tokio::select! {
                _ = ctx.stop.cancelled() => break,
                _ = tokio::time::sleep(KEEPALIVE_INTERVAL) => {}
            }
            if !ctx.should_continue() {
                break;
            }
            let mut keepalive = [0u8; 8];
            rand::rng().fill_bytes(&mut keepalive);
            let mut alive = Vec::with_capacity(connections.len());
            for (mut conn, handle) in connections {
                if conn.write_all(&keepalive).await.is_ok() {
                    ctx.metrics.bytes_sent.inc_by(8);
                    ctx.metrics.events_sent.inc();
                    ctx.metrics.successes.inc();
                    alive.push((conn, handle));
                } else {
                    ctx.metrics.failures.inc();
                }
            }
            connections = alive;
        }

        for (mut conn, _handle) in connections {
            let _ = conn.shutdown().await;
        }
        Ok(())
    }
}
