use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::core::CanvasConfig;
use crate::error::{PlotError, PlotResult};

use super::{AxisLabels, LabelQuery, SelectionOp, SelectionTargets, SelectionUpdate, TileCoord};

/// Message from the front end, addressed to one canvas.
///
/// Wire shape: `{"canvas_id": "...", "msg": "<kind>", ...payload}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEnvelope {
    pub canvas_id: String,
    #[serde(flatten)]
    pub message: InboundMessage,
}

impl InboundEnvelope {
    pub fn from_json_str(input: &str) -> PlotResult<Self> {
        serde_json::from_str(input)
            .map_err(|e| PlotError::MalformedMessage(format!("failed to parse inbound message: {e}")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg", rename_all = "snake_case")]
pub enum InboundMessage {
    CanvasConfigReq(CanvasConfigRequest),
    AxisReq(AxisRequest),
    TileReq(TileRequest),
    UpdateSelection(SelectionUpdateRequest),
    Search(SearchRequest),
    PtReq(PointRequest),
    /// The front end cell was torn down.
    CellFini,
}

impl InboundMessage {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CanvasConfigReq(_) => "canvas_config_req",
            Self::AxisReq(_) => "axis_req",
            Self::TileReq(_) => "tile_req",
            Self::UpdateSelection(_) => "update_selection",
            Self::Search(_) => "search",
            Self::PtReq(_) => "pt_req",
            Self::CellFini => "cell_fini",
        }
    }
}

/// How a new canvas config relates to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigDerivation {
    Reset,
    Resize,
    Zoom,
}

/// Pixel rectangle of the old config that becomes the new view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomRegion {
    pub px0: f64,
    pub py0: f64,
    pub px1: f64,
    pub py1: f64,
}

impl ZoomRegion {
    #[must_use]
    pub fn corners(self) -> (f64, f64, f64, f64) {
        (self.px0, self.py0, self.px1, self.py1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasConfigRequest {
    pub config_id: i64,
    pub w: u32,
    pub h: u32,
    pub how: ConfigDerivation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_config: Option<CanvasConfig>,
    #[serde(default, alias = "zoom_region", skip_serializing_if = "Option::is_none")]
    pub zoom: Option<ZoomRegion>,
}

impl CanvasConfigRequest {
    /// `reset` carries neither `old_config` nor `zoom`, `resize` carries
    /// `old_config` only, `zoom` carries both.
    pub fn validate(&self) -> PlotResult<()> {
        let expected = match self.how {
            ConfigDerivation::Reset => (false, false),
            ConfigDerivation::Resize => (true, false),
            ConfigDerivation::Zoom => (true, true),
        };
        let actual = (self.old_config.is_some(), self.zoom.is_some());
        if actual != expected {
            return Err(PlotError::MalformedMessage(format!(
                "canvas_config_req how={:?} with old_config={} zoom={}",
                self.how, actual.0, actual.1
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisRequest {
    pub config: CanvasConfig,
    pub axis_seq: u64,
    /// Overrides the pan offset stored in `config` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_offset: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_offset: Option<i32>,
}

impl AxisRequest {
    /// The config the axes should be computed for.
    pub fn view(&self) -> PlotResult<CanvasConfig> {
        self.config.with_view_state(
            self.config.zoom_level(),
            self.x_offset.unwrap_or(self.config.x_offset()),
            self.y_offset.unwrap_or(self.config.y_offset()),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileRequest {
    pub config: CanvasConfig,
    #[serde(default)]
    pub ack_seqs: Vec<i64>,
    #[serde(default)]
    pub items: Vec<TileRequestItem>,
}

/// Which content a requested tile batch shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileTarget {
    /// A single highlighted item, rendered regardless of selection.
    Item(usize),
    /// Every selected item as of this selection version.
    Selection(u64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileRequestItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(default)]
    pub prio: Vec<TileCoord>,
    #[serde(default)]
    pub reg: Vec<TileCoord>,
}

impl TileRequestItem {
    /// Exactly one of `id` and `version` must be set.
    pub fn target(&self) -> PlotResult<TileTarget> {
        match (self.id, self.version) {
            (Some(item_id), None) => Ok(TileTarget::Item(item_id)),
            (None, Some(version)) => Ok(TileTarget::Selection(version)),
            (Some(_), Some(_)) => Err(PlotError::MalformedMessage(
                "tile request item has both `id` and `version`".to_owned(),
            )),
            (None, None) => Err(PlotError::MalformedMessage(
                "tile request item has neither `id` nor `version`".to_owned(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionUpdateRequest {
    pub version: u64,
    pub how: SelectionOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pat: Option<String>,
    #[serde(default)]
    pub regex: bool,
}

impl SelectionUpdateRequest {
    /// Explicit `ids` win over a pattern.
    pub fn into_update(self) -> PlotResult<SelectionUpdate> {
        let targets = match (self.ids, self.pat) {
            (Some(ids), _) => SelectionTargets::Ids(ids),
            (None, Some(pat)) => SelectionTargets::Pattern(LabelQuery {
                pat,
                regex: self.regex,
            }),
            (None, None) => {
                return Err(PlotError::MalformedMessage(format!(
                    "update_selection version {} has neither `ids` nor `pat`",
                    self.version
                )));
            }
        };
        Ok(SelectionUpdate::new(self.version, self.how, targets))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub pat: String,
    #[serde(default)]
    pub regex: bool,
    /// When present the search also replaces the selection with its matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

impl SearchRequest {
    #[must_use]
    pub fn query(&self) -> LabelQuery {
        LabelQuery {
            pat: self.pat.clone(),
            regex: self.regex,
        }
    }

    #[must_use]
    pub fn implied_update(&self) -> Option<SelectionUpdate> {
        self.version.map(|version| {
            SelectionUpdate::new(version, SelectionOp::Exact, SelectionTargets::Pattern(self.query()))
        })
    }
}

/// Asks for the point of `item_id` nearest to the mouse, in pixels of
/// `config` (pan offset included).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRequest {
    pub config: CanvasConfig,
    pub mouse_x: f64,
    pub mouse_y: f64,
    pub item_id: usize,
}

/// Sent after a new canvas config is created; carries axes at zoom 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasConfigResponse {
    pub canvas_id: String,
    pub config: CanvasConfig,
    pub axes: AxisLabels,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisTicksResponse {
    pub canvas_id: String,
    pub config_id: i64,
    pub axis_seq: u64,
    pub x_offset: i32,
    pub y_offset: i32,
    pub axes: AxisLabels,
}

/// `[item_id, selected, label, style]` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(usize, bool, String, String)", into = "(usize, bool, String, String)")]
pub struct LabelEntry {
    pub item_id: usize,
    pub selected: bool,
    pub label: String,
    pub style: String,
}

impl From<(usize, bool, String, String)> for LabelEntry {
    fn from((item_id, selected, label, style): (usize, bool, String, String)) -> Self {
        Self {
            item_id,
            selected,
            label,
            style,
        }
    }
}

impl From<LabelEntry> for (usize, bool, String, String) {
    fn from(entry: LabelEntry) -> Self {
        (entry.item_id, entry.selected, entry.label, entry.style)
    }
}

/// Search result. `count` is the total number of matches; `labels` may be
/// truncated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelsResponse {
    pub canvas_id: String,
    pub count: usize,
    pub labels: Vec<LabelEntry>,
}

/// Answer to a [`PointRequest`]. The request fields are echoed back so the
/// front end can drop stale answers; `data_x`/`data_y` are formatted the way
/// the axis labels are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointResponse {
    pub canvas_id: String,
    pub config: CanvasConfig,
    pub mouse_x: f64,
    pub mouse_y: f64,
    pub item_id: usize,
    pub screen_x: i64,
    pub screen_y: i64,
    pub data_x: String,
    pub data_y: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg", rename_all = "snake_case")]
pub enum OutboundMessage {
    CanvasConfig(CanvasConfigResponse),
    AxisTicks(AxisTicksResponse),
    Labels(LabelsResponse),
    Pt(PointResponse),
}

impl OutboundMessage {
    #[must_use]
    pub fn canvas_id(&self) -> &str {
        match self {
            Self::CanvasConfig(response) => &response.canvas_id,
            Self::AxisTicks(response) => &response.canvas_id,
            Self::Labels(response) => &response.canvas_id,
            Self::Pt(response) => &response.canvas_id,
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CanvasConfig(_) => "canvas_config",
            Self::AxisTicks(_) => "axis_ticks",
            Self::Labels(_) => "labels",
            Self::Pt(_) => "pt",
        }
    }

    pub fn to_json_string(&self) -> PlotResult<String> {
        serde_json::to_string(self).map_err(|e| {
            PlotError::InvalidData(format!("failed to serialize {} message: {e}", self.kind()))
        })
    }
}

/// Transport to the front end.
pub trait MessageSink: Send + Sync {
    fn send(&self, message: OutboundMessage) -> PlotResult<()>;
}

/// Sink that keeps every message in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<OutboundMessage>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn take_messages(&self) -> Vec<OutboundMessage> {
        std::mem::take(&mut *self.messages.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl MessageSink for RecordingSink {
    fn send(&self, message: OutboundMessage) -> PlotResult<()> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigDerivation, InboundEnvelope, InboundMessage, TileTarget};

    #[test]
    fn zoom_region_alias_is_accepted() {
        let envelope = InboundEnvelope::from_json_str(
            r#"{"canvas_id":"v-1","msg":"canvas_config_req","config_id":3,"w":100,"h":80,
                "how":"zoom",
                "old_config":{"config_id":2,"w":100,"h":80,"x0":0,"y0":0,"x1":1,"y1":1},
                "zoom_region":{"px0":0,"py0":0,"px1":50,"py1":40}}"#,
        )
        .expect("valid envelope");
        let InboundMessage::CanvasConfigReq(request) = envelope.message else {
            panic!("expected canvas_config_req");
        };
        assert_eq!(request.how, ConfigDerivation::Zoom);
        request.validate().expect("zoom carries both");
    }

    #[test]
    fn tile_items_need_exactly_one_target() {
        let envelope = InboundEnvelope::from_json_str(
            r#"{"canvas_id":"v-1","msg":"tile_req",
                "config":{"config_id":1,"w":256,"h":256,"x0":0,"y0":0,"x1":1,"y1":1},
                "items":[{"version":4,"prio":["0:0:7"]},{"id":1,"version":2},{}]}"#,
        )
        .expect("valid envelope");
        let InboundMessage::TileReq(request) = envelope.message else {
            panic!("expected tile_req");
        };
        assert_eq!(request.items[0].target().expect("version item"), TileTarget::Selection(4));
        assert!(request.items[1].target().is_err());
        assert!(request.items[2].target().is_err());
    }

    #[test]
    fn pt_req_carries_mouse_and_item() {
        let envelope = InboundEnvelope::from_json_str(
            r#"{"canvas_id":"v-2","msg":"pt_req",
                "config":{"config_id":5,"w":101,"h":101,"x0":0,"y0":0,"x1":100,"y1":100,"x_offset":4},
                "mouse_x":12.5,"mouse_y":40,"item_id":3}"#,
        )
        .expect("valid envelope");
        assert_eq!(envelope.message.kind(), "pt_req");
        let InboundMessage::PtReq(request) = envelope.message else {
            panic!("expected pt_req");
        };
        assert_eq!(request.item_id, 3);
        assert_eq!(request.config.x_offset(), 4);
        assert_eq!((request.mouse_x, request.mouse_y), (12.5, 40.0));
    }

    #[test]
    fn cell_fini_has_no_payload() {
        let envelope =
            InboundEnvelope::from_json_str(r#"{"canvas_id":"v-9","msg":"cell_fini"}"#).expect("valid");
        assert_eq!(envelope.message, InboundMessage::CellFini);
    }
}
