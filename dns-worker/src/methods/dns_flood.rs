use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{DNSClass, Name, RecordType};
use hickory_proto::serialize::binary::BinEncodable;
use rand::Rng;
use rand::distr::Alphanumeric;
use tokio::net::UdpSocket;
use worker_core::WorkerCtx;
use worker_core::dispatch::LoadMethod;

use common::target::split_host_port;

fn random_domain() -> String {
    let label: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect::<String>()
        .to_lowercase();
    format!("{label}.com.")
}

fn build_query(domain: &str, record_type: RecordType) -> Result<Vec<u8>, String> {
    let name = Name::from_str(domain).map_err(|e| format!("bad domain {domain}: {e}"))?;
    let mut query = Query::new();
    query.set_name(name).set_query_type(record_type).set_query_class(DNSClass::IN);

    let mut message = Message::new();
    message
        .set_id(rand::rng().random())
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .add_query(query);

    message.to_bytes().map_err(|e| format!("encode failed: {e}"))
}

/// Sends a randomly-labeled `.com` DNS query over UDP, one receive attempt
/// per query with a 2s socket timeout. 10ms pacing.
pub struct DnsFlood;

#[async_trait]
impl LoadMethod for DnsFlood {
    async fn run_unit(&self, ctx: Arc<WorkerCtx>) -> Result<(), String> {
        let (host, port) =
            split_host_port(&ctx.target).ok_or_else(|| format!("bad target {}", ctx.target))?;
        let record_type = ctx
            .parameters
            .get("query_type")
            .and_then(|v| RecordType::from_str(v).ok())
            .unwrap_or(RecordType::A);

        while ctx.should_continue() {
            let domain = random_domain();
            let wire = build_query(&domain, record_type)?;

            let socket = UdpSocket::bind("0.0.0.0:0")
                .await
                .map_err(|e| format!("bind failed: {e}"))?;

            ctx.metrics.events_sent.inc();
            match socket.send_to(&wire, (host.as_str(), port)).await {
                Ok(n) => {
                    ctx.metrics.bytes_sent.inc_by(n as u64);
                    let mut buf = [0u8; 4096];
                    match tokio::time::timeout(Duration::from_secs(2), socket.recv_from(&mut buf))
                        .await
                    {
                        Ok(Ok(_)) => ctx.metrics.successes.inc(),
                        _ => ctx.metrics.failures.inc(),
                    };
                }
                Err(_) => {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_valid_a_query_wire() {
        let wire = build_query("abcdefghij.com.", RecordType::A).unwrap();
        assert!(wire.len() > 12); // header + question
    }

    #[test]
    fn random_domain_is_a_dot_com_label() {
        let d = random_domain();
        assert!(d.ends_with(".com."));
        assert_eq!(d.len(), 10 + ".com.".len());
    }
}
