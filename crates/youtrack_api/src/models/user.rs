//! Identity models returned by `GET /api/users/me`.

use serde::{Deserialize, Serialize};

/// Represents the authenticated user: internal id, display name and email.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}
