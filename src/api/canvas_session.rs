use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::core::{CanvasConfig, DataRange};
use crate::error::{PlotError, PlotResult};
use crate::render::TileRenderer;

use super::{
    AxisLabelEngine, AxisOrientation, AxisRequest, AxisTicksResponse, CanvasConfigRequest,
    CanvasConfigResponse, ConfigDerivation, InboundMessage, ItemCatalog, LabelEntry,
    LabelsResponse, MessageSink, OutboundMessage, PendingTileRequest, PlotOptions, PointRequest,
    PointResponse, SearchRequest, SelectionUpdate, SelectionUpdateRequest,
    SelectionVersionController, TileDispatch, TileRequest, TileRequestRouter, TileTarget,
    UpdateOutcome, nearest_visible_point,
};

/// Everything one canvas needs to answer front end messages: axis labeling,
/// versioned selection state, and the path to the tile renderer.
///
/// Handlers take `&self`; a session can be shared across threads and the
/// selection controller serializes the parts that must not interleave.
pub struct CanvasSession {
    canvas_id: String,
    options: PlotOptions,
    axes: AxisLabelEngine,
    data_range: DataRange,
    selection: SelectionVersionController<PendingTileRequest>,
    router: TileRequestRouter,
    sink: Arc<dyn MessageSink>,
}

impl fmt::Debug for CanvasSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanvasSession")
            .field("canvas_id", &self.canvas_id)
            .field("options", &self.options)
            .field("data_range", &self.data_range)
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}

impl CanvasSession {
    pub fn new(
        canvas_id: impl Into<String>,
        options: PlotOptions,
        catalog: Arc<ItemCatalog>,
        data_range: DataRange,
        renderer: Arc<dyn TileRenderer>,
        sink: Arc<dyn MessageSink>,
    ) -> PlotResult<Self> {
        options.validate()?;
        let axes = AxisLabelEngine::new(options.axis_config())?;
        Ok(Self {
            canvas_id: canvas_id.into(),
            options,
            axes,
            data_range,
            selection: SelectionVersionController::new(catalog, options.sync),
            router: TileRequestRouter::new(renderer),
            sink,
        })
    }

    #[must_use]
    pub fn canvas_id(&self) -> &str {
        &self.canvas_id
    }

    #[must_use]
    pub fn options(&self) -> &PlotOptions {
        &self.options
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<ItemCatalog> {
        self.selection.catalog()
    }

    #[must_use]
    pub fn selection(&self) -> &SelectionVersionController<PendingTileRequest> {
        &self.selection
    }

    pub fn handle(&self, message: InboundMessage) -> PlotResult<()> {
        if self.options.debug {
            info!(canvas_id = %self.canvas_id, msg = message.kind(), "handling message");
        } else {
            debug!(canvas_id = %self.canvas_id, msg = message.kind(), "handling message");
        }

        match message {
            InboundMessage::CanvasConfigReq(request) => {
                self.handle_canvas_config_req(&request).map(|_| ())
            }
            InboundMessage::AxisReq(request) => self.handle_axis_req(&request).map(|_| ()),
            InboundMessage::TileReq(request) => self.handle_tile_req(&request),
            InboundMessage::UpdateSelection(request) => {
                self.handle_update_selection(request).map(|_| ())
            }
            InboundMessage::Search(request) => self.handle_search(&request).map(|_| ()),
            InboundMessage::PtReq(request) => self.handle_pt_req(&request).map(|_| ()),
            // Teardown is owned by the registry.
            InboundMessage::CellFini => Ok(()),
        }
    }

    /// Derives a new canvas config, sends it with its axes, then queues the
    /// whole tile grid for rendering.
    pub fn handle_canvas_config_req(&self, request: &CanvasConfigRequest) -> PlotResult<CanvasConfig> {
        request.validate()?;
        let (id, w, h) = (request.config_id, request.w, request.h);
        let config = match (request.how, request.old_config, request.zoom) {
            (ConfigDerivation::Reset, None, None) => CanvasConfig::reset(id, w, h, self.data_range)?,
            (ConfigDerivation::Resize, Some(old), None) => old.resized(id, w, h)?,
            (ConfigDerivation::Zoom, Some(old), Some(region)) => {
                old.zoomed(id, w, h, region.corners())?
            }
            _ => {
                return Err(PlotError::MalformedMessage(format!(
                    "inconsistent canvas_config_req for config {id}"
                )));
            }
        };
        debug!(
            canvas_id = %self.canvas_id,
            config_id = id,
            how = ?request.how,
            width = w,
            height = h,
            "created canvas config"
        );

        self.sink.send(OutboundMessage::CanvasConfig(CanvasConfigResponse {
            canvas_id: self.canvas_id.clone(),
            config,
            axes: self.axes.labels(&config),
        }))?;
        let version = self.selection.current_version();
        if let Err(err) = self.router.dispatch_full_grid(config, version) {
            warn!(
                canvas_id = %self.canvas_id,
                config_id = id,
                version,
                error = %err,
                "full grid tile dispatch failed"
            );
        }
        Ok(config)
    }

    pub fn handle_axis_req(&self, request: &AxisRequest) -> PlotResult<AxisTicksResponse> {
        let view = request.view()?;
        let response = AxisTicksResponse {
            canvas_id: self.canvas_id.clone(),
            config_id: view.id(),
            axis_seq: request.axis_seq,
            x_offset: view.x_offset(),
            y_offset: view.y_offset(),
            axes: self.axes.labels(&view),
        };
        self.sink.send(OutboundMessage::AxisTicks(response.clone()))?;
        Ok(response)
    }

    /// Acknowledgements first, then each item: single-item requests go out
    /// immediately, selection requests wait for their version.
    ///
    /// A malformed item, a full pending buffer or a failed render only drops
    /// that item.
    pub fn handle_tile_req(&self, request: &TileRequest) -> PlotResult<()> {
        self.router.acknowledge(&request.ack_seqs)?;

        for item in &request.items {
            let target = match item.target() {
                Ok(target) => target,
                Err(err) => {
                    warn!(canvas_id = %self.canvas_id, error = %err, "dropping tile request item");
                    continue;
                }
            };

            match target {
                TileTarget::Item(item_id) => {
                    if item_id >= self.catalog().len() {
                        warn!(
                            canvas_id = %self.canvas_id,
                            item_id,
                            "dropping tile request for unknown item"
                        );
                        continue;
                    }
                    self.dispatch_logged(&PendingTileRequest {
                        canvas: request.config,
                        item_id: Some(item_id),
                        selection_version: self.selection.current_version(),
                        priority: item.prio.clone(),
                        regular: item.reg.clone(),
                    });
                }
                TileTarget::Selection(version) => {
                    let pending = PendingTileRequest {
                        canvas: request.config,
                        item_id: None,
                        selection_version: version,
                        priority: item.prio.clone(),
                        regular: item.reg.clone(),
                    };
                    match self.selection.dispatch_or_queue(version, pending) {
                        Ok(TileDispatch::Ready(ready)) => self.dispatch_logged(&ready),
                        Ok(TileDispatch::Queued { .. }) => {}
                        Err(PlotError::PendingLimit { .. }) => continue,
                        Err(err) => return Err(err),
                    }
                }
            }
        }
        Ok(())
    }

    /// Returns the selection version after the update was processed.
    pub fn handle_update_selection(&self, request: SelectionUpdateRequest) -> PlotResult<u64> {
        self.apply_selection_update(request.into_update()?)
    }

    /// Label search; with a `version` the matches also become the exact
    /// selection before the reply is built.
    pub fn handle_search(&self, request: &SearchRequest) -> PlotResult<LabelsResponse> {
        if let Some(update) = request.implied_update() {
            self.apply_selection_update(update)?;
        }

        let catalog = self.catalog();
        let mut matching = catalog.matching_ids(&request.query());
        let count = matching.len();
        matching.truncate(self.options.search_result_limit);
        let selected = self.selection.selected_flags(&matching);

        let labels = matching
            .into_iter()
            .zip(selected)
            .filter_map(|(item_id, selected)| {
                Some(LabelEntry {
                    item_id,
                    selected,
                    label: catalog.label(item_id)?.to_owned(),
                    style: catalog.style(item_id)?.to_style_string(),
                })
            })
            .collect();

        let response = LabelsResponse {
            canvas_id: self.canvas_id.clone(),
            count,
            labels,
        };
        self.sink.send(OutboundMessage::Labels(response.clone()))?;
        Ok(response)
    }

    /// Nearest visible point of one item to the mouse. Nothing is sent when
    /// none of the item's points is on screen.
    pub fn handle_pt_req(&self, request: &PointRequest) -> PlotResult<Option<PointResponse>> {
        let points = self.catalog().points(request.item_id).ok_or_else(|| {
            PlotError::MalformedMessage(format!("pt_req for unknown item {}", request.item_id))
        })?;
        let Some(nearest) =
            nearest_visible_point(&request.config, points, request.mouse_x, request.mouse_y)
        else {
            debug!(
                canvas_id = %self.canvas_id,
                item_id = request.item_id,
                "no visible point for pt_req"
            );
            return Ok(None);
        };

        let response = PointResponse {
            canvas_id: self.canvas_id.clone(),
            config: request.config,
            mouse_x: request.mouse_x,
            mouse_y: request.mouse_y,
            item_id: request.item_id,
            screen_x: nearest.screen_x,
            screen_y: nearest.screen_y,
            data_x: self.axes.generator(AxisOrientation::X).format_value(nearest.point.x),
            data_y: self.axes.generator(AxisOrientation::Y).format_value(nearest.point.y),
        };
        self.sink.send(OutboundMessage::Pt(response.clone()))?;
        Ok(Some(response))
    }

    // Released tile requests are dispatched here, after the controller has
    // dropped its lock. Rendering failures never undo the update.
    fn apply_selection_update(&self, update: SelectionUpdate) -> PlotResult<u64> {
        match self.selection.submit_update(update)? {
            UpdateOutcome::Applied {
                version, released, ..
            } => {
                for request in &released {
                    self.dispatch_logged(request);
                }
                Ok(version)
            }
            UpdateOutcome::Buffered { .. } | UpdateOutcome::Duplicate { .. } => {
                Ok(self.selection.current_version())
            }
        }
    }

    fn dispatch_logged(&self, request: &PendingTileRequest) {
        if let Err(err) = self.router.dispatch(request) {
            warn!(
                canvas_id = %self.canvas_id,
                config_id = request.canvas.id(),
                item_id = ?request.item_id,
                version = request.selection_version,
                error = %err,
                "tile dispatch failed"
            );
        }
    }
}
