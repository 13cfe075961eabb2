use std::sync::{Mutex, PoisonError};

use crate::error::PlotResult;
use crate::render::{TileRenderRequest, TileRenderer};

/// Something a [`RecordingRenderer`] was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum RendererEvent {
    Acknowledged(Vec<i64>),
    Rendered(TileRenderRequest),
}

/// Headless renderer that records every call instead of drawing.
///
/// It still validates requests so tests catch malformed tile lists before a
/// bitmap backend is attached.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    events: Mutex<Vec<RendererEvent>>,
}

impl RecordingRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<RendererEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drains the log.
    pub fn take_events(&self) -> Vec<RendererEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Render requests only, in call order.
    #[must_use]
    pub fn rendered(&self) -> Vec<TileRenderRequest> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                RendererEvent::Rendered(request) => Some(request),
                RendererEvent::Acknowledged(_) => None,
            })
            .collect()
    }

    fn record(&self, event: RendererEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl TileRenderer for RecordingRenderer {
    fn acknowledge_seqs(&self, seqs: &[i64]) -> PlotResult<()> {
        self.record(RendererEvent::Acknowledged(seqs.to_vec()));
        Ok(())
    }

    fn render_tiles(&self, request: &TileRenderRequest) -> PlotResult<()> {
        request.validate()?;
        self.record(RendererEvent::Rendered(request.clone()));
        Ok(())
    }
}
