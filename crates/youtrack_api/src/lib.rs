//! Typed YouTrack API client crate used by the sync engine.

pub mod client;
pub mod config;
pub mod error;
pub mod models;

pub use client::{
    build_ticket_query, fetch_current_user, fetch_projects, fetch_tickets, parse_tickets,
    validate_base_url, validate_connection, YouTrackClient,
};
pub use config::{normalize_base_url, ApiConfig};
pub use error::{ApiError, Result};
pub use models::{CustomField, CustomFieldValue, Project, RawIssue, Ticket, UserProfile};
