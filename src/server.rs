//! TCP server: connection loop and command dispatch
//!
//! Accepts client connections and serves each one on its own task. A
//! connection accumulates socket reads into a buffer, decodes complete RESP
//! frames, dispatches the command against the shared key space, and writes
//! the encoded reply. Replies on one connection follow request order; no
//! ordering holds across connections.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::core::config::ServerConfig;
use crate::core::errors::{ServerError, ServerResult};
use crate::protocol::commands::Command;
use crate::protocol::parser::RespParser;
use crate::protocol::value::RespValue;
use crate::replication::state::ReplicationState;
use crate::storage::keyspace::KeySpace;
use crate::utils::timestamp::now_unix_millis;

/// Size of one buffered socket read. Requests larger than this accumulate
/// across reads until a complete frame decodes.
const READ_BUFFER_SIZE: usize = 4096;

/// State shared by every connection
struct Shared {
    config: ServerConfig,
    keyspace: KeySpace,
    replication: ReplicationState,
}

/// The key/value server: a bound listener plus the shared state
pub struct KvServer {
    listener: TcpListener,
    shared: Arc<Shared>,
}

impl KvServer {
    /// Bind the listener. A bind failure is fatal to startup.
    pub async fn bind(
        config: ServerConfig,
        keyspace: KeySpace,
        replication: ReplicationState,
    ) -> ServerResult<Self> {
        let listener = TcpListener::bind(("127.0.0.1", config.port)).await?;
        info!(
            port = listener.local_addr()?.port(),
            role = replication.role.wire_name(),
            "listening"
        );
        Ok(Self {
            listener,
            shared: Arc::new(Shared {
                config,
                keyspace,
                replication,
            }),
        })
    }

    /// Address the listener actually bound, useful with port 0
    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever, one task per client
    pub async fn run(self) -> ServerResult<()> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            debug!(%peer, "client connected");

            let shared = self.shared.clone();
            tokio::spawn(async move {
                match handle_connection(stream, shared).await {
                    Ok(()) => debug!(%peer, "client disconnected"),
                    Err(e) => warn!(%peer, error = %e, "connection closed"),
                }
            });
        }
    }
}

/// Per-client loop: read, decode, dispatch, reply, until end-of-stream.
///
/// Any error severs this connection only; nothing is written back for
/// malformed input.
async fn handle_connection(mut stream: TcpStream, shared: Arc<Shared>) -> ServerResult<()> {
    let mut pending: Vec<u8> = Vec::new();
    let mut chunk = [0u8; READ_BUFFER_SIZE];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        pending.extend_from_slice(&chunk[..n]);

        // drain every complete frame already buffered
        while let Some((request, consumed)) = RespParser::parse(&pending)? {
            pending.drain(..consumed);

            let command = Command::from_resp(request)?;
            let reply = execute(&shared, command)?;
            stream.write_all(&reply.encode()).await?;
        }
    }
}

/// Run one command against the shared state and build its reply
fn execute(shared: &Shared, command: Command) -> ServerResult<RespValue> {
    match command {
        Command::Ping => Ok(RespValue::bulk("PONG")),

        Command::Echo(arg) => Ok(RespValue::BulkString(Some(arg))),

        Command::Set {
            key,
            value,
            expire_ms,
        } => {
            let expires_at = expire_ms.map(|ms| now_unix_millis() + ms);
            shared.keyspace.set(key, value, expires_at);
            Ok(RespValue::SimpleString("OK".into()))
        }

        Command::Get(key) => Ok(match shared.keyspace.get(&key, now_unix_millis()) {
            Some(value) => RespValue::BulkString(Some(value)),
            None => RespValue::null_bulk(),
        }),

        Command::Keys(_pattern) => {
            // only `*` is honored; any pattern enumerates all live keys
            let keys = shared.keyspace.keys(now_unix_millis());
            Ok(RespValue::Array(Some(
                keys.into_iter().map(RespValue::bulk).collect(),
            )))
        }

        Command::ConfigGet(name) => {
            let value = shared.config.parameter(&name).ok_or_else(|| {
                ServerError::command(format!("Unknown CONFIG parameter: {}", name))
            })?;
            Ok(RespValue::Array(Some(vec![
                RespValue::bulk(name),
                RespValue::bulk(value),
            ])))
        }

        Command::Info => Ok(RespValue::bulk(shared.replication.replication_info())),
    }
}
