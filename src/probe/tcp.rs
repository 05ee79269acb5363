use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

use super::TcpProber;
use crate::model::ConnectionResult;
use crate::tray::{self, TrayInfo};

/// Production prober backed by `tokio::net::TcpStream`
#[derive(Debug, Default)]
pub struct TokioTcpProber;

impl TokioTcpProber {
    pub fn new() -> Self {
        Self
    }

    /// Map a connect failure into the closed taxonomy at the point of
    /// occurrence; no unclassified network error reaches the status resolver.
    fn classify_error(err: &io::Error) -> ConnectionResult {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => ConnectionResult::ConnectError,
            io::ErrorKind::HostUnreachable | io::ErrorKind::NetworkUnreachable => {
                ConnectionResult::HostUnreachable
            }
            _ => ConnectionResult::UnknownError,
        }
    }

    async fn connect(
        addr: SocketAddr,
        connect_timeout: Duration,
    ) -> Result<TcpStream, ConnectionResult> {
        match timeout(connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(err)) => Err(Self::classify_error(&err)),
            Err(_) => Err(ConnectionResult::TimeoutError),
        }
    }
}

#[async_trait]
impl TcpProber for TokioTcpProber {
    async fn probe(
        &self,
        addr: SocketAddr,
        connect_timeout: Duration,
        is_fallback: bool,
    ) -> ConnectionResult {
        let result = match Self::connect(addr, connect_timeout).await {
            Ok(_stream) if is_fallback => ConnectionResult::OkFallback,
            Ok(_stream) => ConnectionResult::Ok,
            Err(classified) => classified,
        };
        trace!(%addr, ?result, is_fallback, "probe");
        result
    }

    async fn probe_with_info(
        &self,
        addr: SocketAddr,
        connect_timeout: Duration,
    ) -> (ConnectionResult, Option<TrayInfo>) {
        match Self::connect(addr, connect_timeout).await {
            Ok(mut stream) => {
                let info =
                    tray::request_info(&mut stream, &addr.ip().to_string(), connect_timeout)
                        .await;
                trace!(%addr, got_info = info.is_some(), "probe with info");
                (ConnectionResult::Ok, info)
            }
            Err(classified) => (classified, None),
        }
    }
}
