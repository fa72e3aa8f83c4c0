//! Replication state management
//!
//! Tracks the role this server was started in and the identifiers surfaced
//! through `INFO replication`. The state is fixed at startup and shared
//! read-only across connections.

use uuid::Uuid;

/// Length of a replication id on the wire
const REPLICATION_ID_LEN: usize = 40;

/// Role this server plays in replication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Primary,
    Replica,
}

impl Role {
    /// Wire token used in the `INFO` reply (`role:` line)
    pub fn wire_name(&self) -> &'static str {
        match self {
            Role::Primary => "master",
            Role::Replica => "slave",
        }
    }
}

/// Replication identity, immutable after startup
#[derive(Debug, Clone)]
pub struct ReplicationState {
    pub role: Role,
    /// 40-character alphanumeric id, present only on a primary
    pub replication_id: Option<String>,
    pub replication_offset: i64,
    /// Address of the primary, present only on a replica
    pub primary_address: Option<(String, u16)>,
}

impl ReplicationState {
    /// State for a server started as primary, with a freshly generated id
    pub fn primary() -> Self {
        Self {
            role: Role::Primary,
            replication_id: Some(generate_replication_id()),
            replication_offset: 0,
            primary_address: None,
        }
    }

    /// State for a server started as a replica of the given primary
    pub fn replica(host: String, port: u16) -> Self {
        Self {
            role: Role::Replica,
            replication_id: None,
            replication_offset: 0,
            primary_address: Some((host, port)),
        }
    }

    /// Render the `INFO replication` section body: CRLF-separated
    /// `key:value` lines
    pub fn replication_info(&self) -> String {
        let mut lines = vec![format!("role:{}", self.role.wire_name())];
        if let Some(ref id) = self.replication_id {
            lines.push(format!("master_replid:{}", id));
            lines.push(format!("master_repl_offset:{}", self.replication_offset));
        }
        lines.join("\r\n")
    }
}

/// Generate a 40-character alphanumeric replication id
fn generate_replication_id() -> String {
    let mut id = format!(
        "{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    );
    id.truncate(REPLICATION_ID_LEN);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_has_id_and_zero_offset() {
        let state = ReplicationState::primary();
        assert_eq!(state.role, Role::Primary);
        assert_eq!(state.replication_offset, 0);
        assert!(state.primary_address.is_none());

        let id = state.replication_id.unwrap();
        assert_eq!(id.len(), 40);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_replication_ids_are_unique() {
        let a = ReplicationState::primary().replication_id.unwrap();
        let b = ReplicationState::primary().replication_id.unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_replica_records_primary_address() {
        let state = ReplicationState::replica("localhost".into(), 6379);
        assert_eq!(state.role, Role::Replica);
        assert!(state.replication_id.is_none());
        assert_eq!(state.primary_address, Some(("localhost".to_string(), 6379)));
    }

    #[test]
    fn test_primary_info_section() {
        let state = ReplicationState::primary();
        let info = state.replication_info();
        assert!(info.starts_with("role:master\r\n"));
        assert!(info.contains("master_replid:"));
        assert!(info.contains("master_repl_offset:0"));
    }

    #[test]
    fn test_replica_info_section() {
        let state = ReplicationState::replica("localhost".into(), 6379);
        let info = state.replication_info();
        assert_eq!(info, "role:slave");
    }
}
