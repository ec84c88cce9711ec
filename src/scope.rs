//! Per-request processing scope.
//!
//! A [`Scope`] lives exactly as long as one request-processing cycle. It
//! carries the caller identity resolved when the request started and, once
//! the first live write happens, the sink connection. Every later write in
//! the same scope reuses that connection; dropping the scope drops it.

use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::Result;
use crate::sink::{Sink, SinkConnector};

pub struct Scope {
    id: Uuid,
    identity: Option<String>,
    connection: Option<Arc<dyn Sink>>,
}

impl Scope {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            identity: None,
            connection: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn has_connection(&self) -> bool {
        self.connection.is_some()
    }

    /// Lazily connect on first use, then hand out the cached connection.
    pub fn get_or_create_connection(
        &mut self,
        connector: &dyn SinkConnector,
    ) -> Result<Arc<dyn Sink>> {
        if let Some(conn) = &self.connection {
            return Ok(conn.clone());
        }

        let conn = connector.connect()?;
        tracing::debug!(scope = %self.id, "sink connection opened");
        self.connection = Some(conn.clone());
        Ok(conn)
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable handle threaded through request extensions and the task-local
/// context, so every emission in one request shares one [`Scope`].
#[derive(Clone, Default)]
pub struct ScopeHandle(Arc<Mutex<Scope>>);

impl ScopeHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(identity: Option<String>) -> Self {
        let handle = Self::new();
        handle.0.lock().identity = identity;
        handle
    }

    pub fn id(&self) -> Uuid {
        self.0.lock().id()
    }

    pub fn identity(&self) -> Option<String> {
        self.0.lock().identity.clone()
    }

    pub fn has_connection(&self) -> bool {
        self.0.lock().has_connection()
    }

    pub fn connection(&self, connector: &dyn SinkConnector) -> Result<Arc<dyn Sink>> {
        self.0.lock().get_or_create_connection(connector)
    }
}

impl std::fmt::Debug for ScopeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scope = self.0.lock();
        f.debug_struct("ScopeHandle")
            .field("id", &scope.id)
            .field("identity", &scope.identity)
            .field("connected", &scope.has_connection())
            .finish()
    }
}
