//! Process-scoped routing of front end messages to canvas sessions.
//!
//! A host creates one [`PlotContext`] (backend identity plus the shared
//! message transport) and one [`CanvasRegistry`] per backend process. Each
//! shown plot registers a [`CanvasSession`] under a fresh `v-<uuid>` id; the
//! front end's `cell_fini` removes it again.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::DataRange;
use crate::error::{PlotError, PlotResult};
use crate::render::TileRenderer;

use super::{CanvasSession, InboundEnvelope, InboundMessage, ItemCatalog, MessageSink, PlotOptions};

/// Explicit backend context shared by every canvas of one process.
#[derive(Clone)]
pub struct PlotContext {
    backend_id: Uuid,
    sink: Arc<dyn MessageSink>,
}

impl fmt::Debug for PlotContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlotContext")
            .field("backend_id", &self.backend_id)
            .finish_non_exhaustive()
    }
}

impl PlotContext {
    #[must_use]
    pub fn new(sink: Arc<dyn MessageSink>) -> Self {
        Self {
            backend_id: Uuid::new_v4(),
            sink,
        }
    }

    /// Lets the front end tell a restarted backend from the one it talked to.
    #[must_use]
    pub fn backend_id(&self) -> Uuid {
        self.backend_id
    }

    #[must_use]
    pub fn sink(&self) -> &Arc<dyn MessageSink> {
        &self.sink
    }
}

/// Canvas id -> session, in registration order.
#[derive(Debug)]
pub struct CanvasRegistry {
    context: PlotContext,
    sessions: RwLock<IndexMap<String, Arc<CanvasSession>>>,
}

impl CanvasRegistry {
    #[must_use]
    pub fn new(context: PlotContext) -> Self {
        Self {
            context,
            sessions: RwLock::new(IndexMap::new()),
        }
    }

    #[must_use]
    pub fn context(&self) -> &PlotContext {
        &self.context
    }

    #[must_use]
    pub fn new_canvas_id() -> String {
        format!("v-{}", Uuid::new_v4())
    }

    /// Creates a session for one plot under a fresh canvas id.
    pub fn register(
        &self,
        options: PlotOptions,
        catalog: Arc<ItemCatalog>,
        data_range: DataRange,
        renderer: Arc<dyn TileRenderer>,
    ) -> PlotResult<Arc<CanvasSession>> {
        let canvas_id = Self::new_canvas_id();
        let session = Arc::new(CanvasSession::new(
            canvas_id.clone(),
            options,
            catalog,
            data_range,
            renderer,
            Arc::clone(self.context.sink()),
        )?);
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(canvas_id.clone(), Arc::clone(&session));
        info!(
            backend_id = %self.context.backend_id,
            canvas_id = %canvas_id,
            "registered canvas"
        );
        Ok(session)
    }

    #[must_use]
    pub fn session(&self, canvas_id: &str) -> Option<Arc<CanvasSession>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(canvas_id)
            .cloned()
    }

    pub fn deregister(&self, canvas_id: &str) -> Option<Arc<CanvasSession>> {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(canvas_id);
        if removed.is_some() {
            info!(canvas_id, "deregistered canvas");
        }
        removed
    }

    #[must_use]
    pub fn canvas_ids(&self) -> Vec<String> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers a parsed message to its canvas. The registry lock is not held
    /// while the session handles it.
    pub fn route(&self, envelope: InboundEnvelope) -> PlotResult<()> {
        let InboundEnvelope { canvas_id, message } = envelope;
        if message == InboundMessage::CellFini {
            return match self.deregister(&canvas_id) {
                Some(_) => Ok(()),
                None => Err(PlotError::UnknownCanvas(canvas_id)),
            };
        }

        let session = self
            .session(&canvas_id)
            .ok_or_else(|| PlotError::UnknownCanvas(canvas_id.clone()))?;
        session.handle(message)
    }

    /// Entry point for raw transport payloads. Anything that cannot be parsed
    /// or handled is logged and dropped; returns whether the message was
    /// handled.
    pub fn handle_json(&self, input: &str) -> bool {
        let envelope = match InboundEnvelope::from_json_str(input) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(error = %err, "dropping malformed message");
                return false;
            }
        };

        let canvas_id = envelope.canvas_id.clone();
        let kind = envelope.message.kind();
        match self.route(envelope) {
            Ok(()) => {
                debug!(canvas_id = %canvas_id, msg = kind, "message handled");
                true
            }
            Err(err) => {
                warn!(canvas_id = %canvas_id, msg = kind, error = %err, "dropping message");
                false
            }
        }
    }
}
