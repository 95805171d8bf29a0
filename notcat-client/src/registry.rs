//! Handle table behind the C façade.
//!
//! Handles are opaque non-zero integers; 0 is the connect-failure
//! sentinel. Each connection sits behind its own mutex, so the handle
//! API serializes send/close per handle while distinct handles proceed
//! in parallel.

use crate::connection::Connection;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct HandleRegistry {
    connections: RwLock<HashMap<u64, Arc<Mutex<Connection>>>>,
    next: AtomicU64,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            next: AtomicU64::new(1),
        }
    }

    pub fn insert(&self, connection: Connection) -> u64 {
        let handle = self.next.fetch_add(1, Ordering::Relaxed);
        self.connections
            .write()
            .insert(handle, Arc::new(Mutex::new(connection)));
        handle
    }

    /// Run `f` on the connection behind `handle`; `None` for unknown
    /// (or already-closed) handles.
    pub fn with_connection<T>(&self, handle: u64, f: impl FnOnce(&mut Connection) -> T) -> Option<T> {
        let connection = self.connections.read().get(&handle).cloned()?;
        let mut guard = connection.lock();
        Some(f(&mut guard))
    }

    /// Remove the handle. The connection is returned so the caller can
    /// close it outside the table lock.
    pub fn remove(&self, handle: u64) -> Option<Arc<Mutex<Connection>>> {
        self.connections.write().remove(&handle)
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
