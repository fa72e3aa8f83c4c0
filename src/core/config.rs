//! Configuration management for the key/value server
//!
//! This module holds the settings captured at startup from the command line.
//! All fields are read-only after startup; the running server shares the
//! configuration behind an `Arc` without further synchronization.

use std::path::PathBuf;

use super::{ServerError, ServerResult};

/// Default listen port when `--port` is not given
pub const DEFAULT_PORT: u16 = 6379;

/// Server configuration captured at startup
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory containing the snapshot file, from `--dir`
    pub dir: Option<String>,
    /// Snapshot file name within `dir`, from `--dbfilename`
    pub dbfilename: Option<String>,
    /// TCP listen port
    pub port: u16,
    /// Primary address when running as a replica, from `--replicaof`
    pub replicaof: Option<(String, u16)>,
}

impl ServerConfig {
    /// Build and validate a configuration from command line values
    ///
    /// `replicaof` arrives as a single `"<host> <port>"` string and is split
    /// and validated here.
    pub fn new(
        dir: Option<String>,
        dbfilename: Option<String>,
        port: u16,
        replicaof: Option<String>,
    ) -> ServerResult<Self> {
        if let Some(ref d) = dir {
            if d.trim().is_empty() {
                return Err(ServerError::config("--dir cannot be empty"));
            }
        }
        if let Some(ref f) = dbfilename {
            if f.trim().is_empty() {
                return Err(ServerError::config("--dbfilename cannot be empty"));
            }
        }

        let replicaof = match replicaof {
            Some(address) => Some(Self::parse_primary_address(&address)?),
            None => None,
        };

        Ok(Self {
            dir,
            dbfilename,
            port,
            replicaof,
        })
    }

    /// Parse a `"<host> <port>"` primary address value
    fn parse_primary_address(address: &str) -> ServerResult<(String, u16)> {
        let mut parts = address.split_whitespace();

        let host = parts
            .next()
            .ok_or_else(|| ServerError::config("--replicaof is missing the host"))?;

        let port = parts
            .next()
            .ok_or_else(|| ServerError::config("--replicaof is missing the port"))?;
        let port: u16 = port.parse().map_err(|_| {
            ServerError::config(format!("--replicaof port is not a valid port: {}", port))
        })?;

        if parts.next().is_some() {
            return Err(ServerError::config(
                "--replicaof expects exactly \"<host> <port>\"",
            ));
        }

        Ok((host.to_string(), port))
    }

    /// Path of the snapshot file, present only when both `--dir` and
    /// `--dbfilename` were given
    pub fn snapshot_path(&self) -> Option<PathBuf> {
        match (&self.dir, &self.dbfilename) {
            (Some(dir), Some(file)) => Some(PathBuf::from(dir).join(file)),
            _ => None,
        }
    }

    /// Whether this server was started as a replica
    pub fn is_replica(&self) -> bool {
        self.replicaof.is_some()
    }

    /// Look up a configuration parameter by name for `CONFIG GET`
    ///
    /// Only `dir` and `dbfilename` are exposed. Unset values read as the
    /// empty string.
    pub fn parameter(&self, name: &str) -> Option<String> {
        match name.to_ascii_lowercase().as_str() {
            "dir" => Some(self.dir.clone().unwrap_or_default()),
            "dbfilename" => Some(self.dbfilename.clone().unwrap_or_default()),
            _ => None,
        }
    }
}
