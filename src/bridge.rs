//! Serialized payloads handed to the presentation layer.

use serde::Serialize;

use crate::sync::SyncState;

/// Summary of setup and sync progress, polled by the UI next to the ticket
/// list. The token itself is never part of it.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigStatus {
    pub configured: bool,
    pub state: SyncState,
    pub base_url: String,
    pub project_count: usize,
    pub has_token: bool,
    /// Epoch seconds, 0 = never synced.
    pub last_sync_time: i64,
    pub ticket_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case_with_snake_case_state() {
        let status = ConfigStatus {
            configured: true,
            state: SyncState::Idle,
            base_url: "https://h".to_string(),
            project_count: 2,
            has_token: true,
            last_sync_time: 42,
            ticket_count: 3,
        };
        let value = serde_json::to_value(&status).expect("serialize");
        assert_eq!(value["state"], "idle");
        assert_eq!(value["projectCount"], 2);
        assert_eq!(value["lastSyncTime"], 42);
        assert_eq!(value["hasToken"], true);
    }
}
