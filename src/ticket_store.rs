//! In-memory ticket snapshot and its JSON mirror on disk.

use log::{debug, info};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use youtrack_api::Ticket;

use crate::error::Result;
use crate::storage;

/// Thread-safe holder of the current ticket collection. Writers swap the
/// whole snapshot, so readers see either the old or the new collection.
#[derive(Clone, Default)]
pub struct TicketStore {
    tickets: Arc<RwLock<Arc<Vec<Ticket>>>>,
}

impl TicketStore {
    /// Replaces current in-memory ticket snapshot.
    pub fn set(&self, items: Vec<Ticket>) {
        *self.tickets.write() = Arc::new(items);
    }

    /// Returns the current snapshot without copying it.
    pub fn snapshot(&self) -> Arc<Vec<Ticket>> {
        self.tickets.read().clone()
    }

    pub fn len(&self) -> usize {
        self.tickets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finds a ticket by readable id in the current snapshot.
    pub fn find(&self, id: &str) -> Option<Ticket> {
        self.tickets
            .read()
            .iter()
            .find(|ticket| ticket.id == id)
            .cloned()
    }
}

/// Durable mirror of the ticket collection.
#[derive(Clone, Debug)]
pub struct TicketCache {
    path: PathBuf,
}

impl TicketCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the cached collection; any failure yields an empty list.
    pub fn load_from_disk(&self) -> Vec<Ticket> {
        let tickets: Vec<Ticket> =
            storage::load_json(&self.path, "ticket cache").unwrap_or_default();
        info!("Loaded {} cached tickets", tickets.len());
        tickets
    }

    /// Overwrites the cache file with the full collection.
    pub fn save_to_disk(&self, tickets: &[Ticket]) -> Result<()> {
        storage::save_json(&self.path, tickets)?;
        debug!("Wrote {} tickets to {}", tickets.len(), self.path.display());
        Ok(())
    }
}
