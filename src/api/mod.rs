mod axis_config;
mod axis_label_engine;
mod canvas_registry;
mod canvas_session;
mod item_catalog;
mod json_contract;
mod messages;
mod nearest_point;
mod plot_options;
mod selection;
mod selection_controller;
mod tile_router;

pub use axis_config::{AxisConfig, AxisKind, AxisOrientation, TimeAxisTimeZone};
pub use axis_label_engine::{AxisLabel, AxisLabelEngine, AxisLabels, AxisWindow, TickGenerator};
pub use canvas_registry::{CanvasRegistry, PlotContext};
pub use canvas_session::CanvasSession;
pub use item_catalog::{ItemCatalog, ItemOptions, ItemStyle, LabelQuery};
pub use json_contract::{
    AXIS_TICKS_JSON_SCHEMA_V1, AxisTicksJsonContractV1, LABELS_JSON_SCHEMA_V1,
    LabelsJsonContractV1,
};
pub use messages::{
    AxisRequest, AxisTicksResponse, CanvasConfigRequest, CanvasConfigResponse, ConfigDerivation,
    InboundEnvelope, InboundMessage, LabelEntry, LabelsResponse, MessageSink, OutboundMessage,
    PointRequest, PointResponse, RecordingSink, SearchRequest, SelectionUpdateRequest,
    TileRequest, TileRequestItem, TileTarget, ZoomRegion,
};
pub use nearest_point::{NearestPoint, nearest_visible_point};
pub use plot_options::PlotOptions;
pub use selection::{SelectionMap, SelectionOp, SelectionTargets, SelectionUpdate};
pub use selection_controller::{
    SelectionSnapshot, SelectionSyncConfig, SelectionVersionController, TileDispatch,
    UpdateOutcome,
};
pub use tile_router::{
    PendingTileRequest, TileCoord, TileRequestRouter, UNSOLICITED_TILE_SEQ, flatten_coords,
};
