use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use worker_core::WorkerCtx;
use worker_core::dispatch::LoadMethod;

/// Accepts any certificate chain. `SSL_FLOOD` measures handshake cost, not
/// trust — cert verification is intentionally disabled, matching the
/// original module.
#[derive(Debug)]
struct AcceptAny;

impl ServerCertVerifier for AcceptAny {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ED25519,
            SignatureScheme::RSA_PSS_SHA256,
        ]
    }
}

fn insecure_tls_connector() -> TlsConnector {
    let config = ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAny))
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

/// Repeatedly opens a TCP socket to the target (forced HTTPS scheme i.e.
/// port 443 unless the target already names a port), completes a TLS
/// handshake with verification disabled, records one event, and closes.
/// Throttled 100ms.
pub struct SslFlood;

#[async_trait]
impl LoadMethod for SslFlood {
    async fn run_unit(&self, ctx: Arc<WorkerCtx>) -> Result<(), String> {
        let connector = insecure_tls_connector();
        let (host, port) = target_host_port(&ctx.target);
        let server_name = match ServerName::try_from(host.clone()) {
            Ok(name) => name,
            Err(e) => return Err(format!("invalid server name: {e}")),
        };

        while ctx.should_continue() {
            ctx.metrics.events_sent.inc();
            let connect_target = match ctx.pick_proxy() {
                Some(proxy) => (proxy.host.clone(), proxy.port),
                None => (host.clone(), port),
            };
            match TcpStream::connect(connect_target).await {
                Ok(stream) => {
                    match connector.connect(server_name.clone(), stream).await {
                        Ok(_tls) => {
                            ctx.metrics.successes.inc();
                        }
                        Err(_) => {
                            ctx.metrics.failures.inc();
                        }
                    }
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

fn target_host_port(target: &str) -> (String, u16) {
    let stripped = target
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let host_part = stripped.split('/').next().unwrap_or(stripped);
    match host_part.rsplit_once(':') {
        Some((h, p)) => (h.to_string(), p.parse().unwrap_or(443)),
        None => (host_part.to_string(), 443),
    }
}
