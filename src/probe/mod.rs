use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;

use crate::model::ConnectionResult;
use crate::tray::TrayInfo;

pub mod device;
pub mod status;
pub mod tcp;

/// Seam over the platform socket layer so the engine itself carries no
/// platform dependency. Production (`TokioTcpProber`) and scripted test
/// implementations swap behind this trait.
#[async_trait]
pub trait TcpProber: Send + Sync {
    /// Attempt a TCP connect and classify the outcome. `is_fallback` marks
    /// the attempt against the Windows fallback port, turning a success into
    /// `OkFallback`.
    async fn probe(
        &self,
        addr: SocketAddr,
        timeout: Duration,
        is_fallback: bool,
    ) -> ConnectionResult;

    /// Primary connect attempt that, on success, issues the `INFO` exchange
    /// over the same connection to refresh identity metadata.
    async fn probe_with_info(
        &self,
        addr: SocketAddr,
        timeout: Duration,
    ) -> (ConnectionResult, Option<TrayInfo>);
}
