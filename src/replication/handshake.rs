//! Outbound handshake from a replica to its primary
//!
//! The handshake is a single encoded `PING`; whatever the primary answers
//! is read once and discarded.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::core::errors::ServerResult;
use crate::protocol::value::RespValue;

/// Announce this replica to its primary with a single `PING`.
///
/// Runs once at startup, before the listener binds. An unreachable primary
/// aborts startup.
pub async fn announce_to_primary(host: &str, port: u16) -> ServerResult<()> {
    info!(host, port, "connecting to primary");
    let mut stream = TcpStream::connect((host, port)).await?;

    let ping = RespValue::Array(Some(vec![RespValue::bulk("PING")])).encode();
    stream.write_all(&ping).await?;

    // the reply is not interpreted
    let mut reply = [0u8; 512];
    let n = stream.read(&mut reply).await.unwrap_or(0);
    debug!(bytes = n, "discarded primary handshake reply");

    Ok(())
}
