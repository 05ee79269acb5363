//! Client for the tray wire protocol: line-oriented ASCII over TCP.
//!
//! `SHUTDOWN <amount> <unit>\n` -> `ACK`
//! `CANCEL\n`                   -> `ACK`
//! `INFO <ip>\n`                -> `<hostname> <mac>` (hostname alone for
//! legacy trays). Empty or non-conforming replies are failures, never crashes.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::config::DelayUnit;
use crate::errors::LanWakeError;

/// Identity payload parsed from an `INFO` reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrayInfo {
    pub hostname: String,
    pub mac: Option<String>,
}

/// Parse an `INFO` reply line. Legacy trays report only the hostname.
pub fn parse_info_reply(line: &str) -> Option<TrayInfo> {
    let mut parts = line.split_whitespace();
    let hostname = parts.next()?.to_string();
    if hostname.is_empty() {
        return None;
    }
    let mac = parts.next().map(str::to_string);
    Some(TrayInfo { hostname, mac })
}

/// Send one command line and read one reply line over an already open stream
pub async fn exchange(
    stream: &mut TcpStream,
    command: &str,
    io_timeout: Duration,
) -> Result<String, LanWakeError> {
    let line = format!("{command}\n");
    timeout(io_timeout, stream.write_all(line.as_bytes()))
        .await
        .map_err(|_| LanWakeError::TrayError("write timed out".to_string()))??;

    let mut reply = String::new();
    let mut reader = BufReader::new(stream);
    timeout(io_timeout, reader.read_line(&mut reply))
        .await
        .map_err(|_| LanWakeError::TrayError("read timed out".to_string()))??;
    Ok(reply.trim().to_string())
}

/// Request identity info over an already open tray connection. Returns `None`
/// when the tray does not answer with a usable reply.
pub async fn request_info(
    stream: &mut TcpStream,
    local_ip: &str,
    io_timeout: Duration,
) -> Option<TrayInfo> {
    let reply = exchange(stream, &format!("INFO {local_ip}"), io_timeout)
        .await
        .ok()?;
    parse_info_reply(&reply)
}

/// Connect and issue a `SHUTDOWN` command. `true` iff the tray acknowledged.
pub async fn send_shutdown(
    addr: SocketAddr,
    amount: u32,
    unit: DelayUnit,
    io_timeout: Duration,
) -> Result<bool, LanWakeError> {
    let command = format!("SHUTDOWN {amount} {}", unit.as_wire_str());
    send_acked_command(addr, &command, io_timeout).await
}

/// Connect and issue a `CANCEL` command. `true` iff the tray acknowledged.
pub async fn send_cancel(
    addr: SocketAddr,
    io_timeout: Duration,
) -> Result<bool, LanWakeError> {
    send_acked_command(addr, "CANCEL", io_timeout).await
}

async fn send_acked_command(
    addr: SocketAddr,
    command: &str,
    io_timeout: Duration,
) -> Result<bool, LanWakeError> {
    let mut stream = timeout(io_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| LanWakeError::TrayError(format!("connect to {addr} timed out")))??;
    let reply = exchange(&mut stream, command, io_timeout).await?;
    debug!(%addr, command, reply, "tray exchange");
    Ok(reply == "ACK")
}
