use std::sync::Arc;

use serde_json::json;
use tileplot::api::{
    CanvasRegistry, CanvasSession, ItemCatalog, ItemOptions, OutboundMessage, PlotContext,
    PlotOptions, RecordingSink,
};
use tileplot::core::{CanvasConfig, DataPoint, DataRange};
use tileplot::render::{RecordingRenderer, RendererEvent};

struct Harness {
    registry: CanvasRegistry,
    session: Arc<CanvasSession>,
    renderer: Arc<RecordingRenderer>,
    sink: Arc<RecordingSink>,
}

impl Harness {
    fn new(options: PlotOptions) -> Self {
        let mut catalog = ItemCatalog::new();
        catalog
            .extend_labels(["Apple", "apricot", "banana", "Cherry", "grape"], None)
            .expect("labels");
        Self::with_catalog(options, catalog)
    }

    fn with_catalog(options: PlotOptions, catalog: ItemCatalog) -> Self {
        let sink = Arc::new(RecordingSink::new());
        let renderer = Arc::new(RecordingRenderer::new());
        let registry = CanvasRegistry::new(PlotContext::new(sink.clone()));

        let session = registry
            .register(
                options,
                Arc::new(catalog),
                DataRange::new(0.0, 100.0, 0.0, 10.0),
                renderer.clone(),
            )
            .expect("valid options");
        Self {
            registry,
            session,
            renderer,
            sink,
        }
    }

    fn send(&self, msg: &str, payload: serde_json::Value) -> bool {
        let mut envelope = payload;
        envelope["canvas_id"] = json!(self.session.canvas_id());
        envelope["msg"] = json!(msg);
        self.registry.handle_json(&envelope.to_string())
    }
}

fn config_json(config_id: i64, w: u32, h: u32) -> serde_json::Value {
    json!({"config_id": config_id, "w": w, "h": h, "x0": 0.0, "y0": 0.0, "x1": 100.0, "y1": 10.0})
}

#[test]
fn canvas_ids_are_prefixed_uuids() {
    let harness = Harness::new(PlotOptions::default());
    let canvas_id = harness.session.canvas_id();
    assert!(canvas_id.starts_with("v-"));
    assert_eq!(canvas_id.len(), 2 + 36);
    assert_eq!(harness.registry.canvas_ids(), vec![canvas_id.to_owned()]);
}

#[test]
fn reset_sends_config_with_axes_and_renders_full_grid() {
    let harness = Harness::new(PlotOptions::default());
    assert!(harness.send("canvas_config_req", json!({"config_id": 1, "w": 600, "h": 300, "how": "reset"})));

    let messages = harness.sink.take_messages();
    assert_eq!(messages.len(), 1);
    let OutboundMessage::CanvasConfig(response) = &messages[0] else {
        panic!("expected canvas_config, got {:?}", messages[0]);
    };
    assert_eq!(response.canvas_id, harness.session.canvas_id());
    assert_eq!(response.config.id(), 1);
    assert_eq!(response.config.x_range(), (-5.0, 105.0));
    assert!(response.axes.x.len() >= 2);
    assert!(response.axes.y.len() >= 2);

    let rendered = harness.renderer.rendered();
    assert_eq!(rendered.len(), 1);
    assert_eq!(rendered[0].selection_version, 0);
    assert_eq!(rendered[0].item_id, None);
    // 300x600 -> 2 rows x 3 cols.
    assert_eq!(rendered[0].tile_count(), 6);
    assert_eq!(&rendered[0].priority[..6], &[0, 0, -1, 0, 1, -1]);
    assert!(rendered[0].regular.is_empty());
}

#[test]
fn inconsistent_config_request_is_dropped() {
    let harness = Harness::new(PlotOptions::default());
    let dropped = !harness.send(
        "canvas_config_req",
        json!({"config_id": 2, "w": 600, "h": 300, "how": "resize"}),
    );
    assert!(dropped);
    assert!(harness.sink.messages().is_empty());
    assert!(harness.renderer.events().is_empty());
}

#[test]
fn zoom_request_derives_from_old_config() {
    let harness = Harness::new(PlotOptions::default());
    assert!(harness.send(
        "canvas_config_req",
        json!({
            "config_id": 2, "w": 101, "h": 11, "how": "zoom",
            "old_config": {"config_id": 1, "w": 101, "h": 11, "x0": 0.0, "y0": 0.0, "x1": 100.0, "y1": 10.0},
            "zoom": {"px0": 0, "py0": 0, "px1": 50, "py1": 10}
        })
    ));
    let messages = harness.sink.take_messages();
    let OutboundMessage::CanvasConfig(response) = &messages[0] else {
        panic!("expected canvas_config");
    };
    assert_eq!(response.config.x_range(), (0.0, 50.0));
    assert_eq!(response.config.y_range(), (0.0, 10.0));
}

#[test]
fn axis_request_echoes_sequence_and_offsets() {
    let harness = Harness::new(PlotOptions::default());
    assert!(harness.send(
        "axis_req",
        json!({"config": config_json(5, 500, 200), "axis_seq": 9, "x_offset": 40, "y_offset": -20})
    ));
    let messages = harness.sink.take_messages();
    let OutboundMessage::AxisTicks(response) = &messages[0] else {
        panic!("expected axis_ticks");
    };
    assert_eq!(response.config_id, 5);
    assert_eq!(response.axis_seq, 9);
    assert_eq!((response.x_offset, response.y_offset), (40, -20));
    assert!(
        response
            .axes
            .x
            .iter()
            .all(|label| (-40..=459).contains(&label.pixel_position))
    );
}

#[test]
fn acknowledgements_precede_dispatch_and_items_route_by_kind() {
    let harness = Harness::new(PlotOptions::default());
    assert!(harness.send(
        "tile_req",
        json!({
            "config": config_json(1, 512, 256),
            "ack_seqs": [3, 4],
            "items": [
                {"id": 2, "prio": ["0:1:10"], "reg": []},
                {"version": 0, "prio": [], "reg": ["0:0:11"]},
                {"version": 2, "prio": ["0:0:12"], "reg": []},
                {"id": 1, "version": 2, "prio": ["0:0:13"]}
            ]
        })
    ));

    let events = harness.renderer.take_events();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0], RendererEvent::Acknowledged(vec![3, 4]));
    let RendererEvent::Rendered(highlight) = &events[1] else {
        panic!("expected render");
    };
    assert_eq!(highlight.item_id, Some(2));
    assert_eq!(highlight.priority, vec![0, 1, 10]);
    let RendererEvent::Rendered(selected) = &events[2] else {
        panic!("expected render");
    };
    assert_eq!(selected.item_id, None);
    assert_eq!(selected.regular, vec![0, 0, 11]);
    assert_eq!(harness.session.selection().pending_tile_request_count(), 1);

    // The parked version-2 request is released once version 2 is applied.
    assert!(harness.send("update_selection", json!({"version": 2, "how": "exact", "ids": [0]})));
    let rendered = harness.renderer.rendered();
    assert_eq!(rendered.len(), 1);
    assert_eq!(rendered[0].selection_version, 2);
    assert_eq!(rendered[0].priority, vec![0, 0, 12]);
}

#[test]
fn failed_release_does_not_block_later_requests_or_the_update() {
    let harness = Harness::new(PlotOptions::default());
    assert!(harness.send(
        "tile_req",
        json!({
            "config": config_json(1, 256, 256),
            "items": [
                {"version": 2, "prio": ["5:5:1"]},
                {"version": 2, "prio": ["0:0:2"]}
            ]
        })
    ));
    assert_eq!(harness.session.selection().pending_tile_request_count(), 2);

    let version = harness
        .session
        .handle_update_selection(
            serde_json::from_value(json!({"version": 2, "how": "exact", "ids": [0]}))
                .expect("valid update"),
        )
        .expect("update is applied even when a render fails");
    assert_eq!(version, 2);
    assert_eq!(harness.session.selection().current_version(), 2);
    assert_eq!(harness.session.selection().pending_tile_request_count(), 0);

    let rendered = harness.renderer.rendered();
    assert_eq!(rendered.len(), 1);
    assert_eq!(rendered[0].priority, vec![0, 0, 2]);
    assert_eq!(rendered[0].selection_version, 2);
}

#[test]
fn failed_item_render_does_not_drop_the_rest_of_the_batch() {
    let harness = Harness::new(PlotOptions::default());
    assert!(harness.send(
        "tile_req",
        json!({
            "config": config_json(1, 256, 256),
            "items": [
                {"id": 1, "prio": ["0:3:1"]},
                {"id": 2, "prio": ["0:0:2"]},
                {"version": 0, "reg": ["9:0:3"]},
                {"version": 0, "reg": ["0:0:4"]}
            ]
        })
    ));

    let rendered = harness.renderer.rendered();
    assert_eq!(rendered.len(), 2);
    assert_eq!(rendered[0].item_id, Some(2));
    assert_eq!(rendered[0].priority, vec![0, 0, 2]);
    assert_eq!(rendered[1].item_id, None);
    assert_eq!(rendered[1].regular, vec![0, 0, 4]);
}

#[test]
fn malformed_tile_coordinates_drop_the_message() {
    let harness = Harness::new(PlotOptions::default());
    assert!(!harness.send(
        "tile_req",
        json!({"config": config_json(1, 256, 256), "ack_seqs": [], "items": [{"id": 0, "prio": ["0:0"]}]})
    ));
    assert!(harness.renderer.events().is_empty());
}

#[test]
fn search_reports_count_styles_and_selection() {
    let harness = Harness::new(PlotOptions::default().with_search_result_limit(2));
    assert!(harness.send("update_selection", json!({"version": 2, "how": "deselect", "ids": [1]})));
    assert!(harness.send("search", json!({"pat": "ap", "regex": false})));

    let messages = harness.sink.take_messages();
    let OutboundMessage::Labels(response) = &messages[0] else {
        panic!("expected labels");
    };
    // "Apple", "apricot" and "grape" match; only the first two are listed.
    assert_eq!(response.count, 3);
    assert_eq!(response.labels.len(), 2);
    assert_eq!(response.labels[0].item_id, 0);
    assert!(response.labels[0].selected);
    assert_eq!(response.labels[0].label, "Apple");
    assert_eq!(response.labels[0].style, "ff0000:3:3");
    assert_eq!(response.labels[1].item_id, 1);
    assert!(!response.labels[1].selected);
}

#[test]
fn search_with_version_selects_exactly_the_matches() {
    let harness = Harness::new(PlotOptions::default());
    assert!(harness.send("search", json!({"pat": "^[A-Z]", "regex": true, "version": 2})));

    let snapshot = harness.session.selection().snapshot();
    assert_eq!(snapshot.version, 2);
    assert_eq!(snapshot.selected, vec![true, false, false, true, false]);

    let messages = harness.sink.take_messages();
    let OutboundMessage::Labels(response) = &messages[0] else {
        panic!("expected labels");
    };
    assert_eq!(response.count, 2);
    assert!(response.labels.iter().all(|entry| entry.selected));
}

#[test]
fn invalid_regex_search_returns_no_labels() {
    let harness = Harness::new(PlotOptions::default());
    assert!(harness.send("search", json!({"pat": "[", "regex": true})));
    let messages = harness.sink.take_messages();
    let OutboundMessage::Labels(response) = &messages[0] else {
        panic!("expected labels");
    };
    assert_eq!(response.count, 0);
    assert!(response.labels.is_empty());
}

#[test]
fn odd_selection_version_is_dropped() {
    let harness = Harness::new(PlotOptions::default());
    assert!(!harness.send("update_selection", json!({"version": 3, "how": "select", "ids": [0]})));
    assert_eq!(harness.session.selection().current_version(), 0);
}

#[test]
fn unknown_and_malformed_messages_are_dropped() {
    let harness = Harness::new(PlotOptions::default());
    assert!(!harness.registry.handle_json("not json"));
    assert!(!harness.registry.handle_json(r#"{"canvas_id":"v-missing","msg":"search","pat":"a"}"#));
    assert!(!harness.send("pt_req", json!({})));
    assert!(!harness.send("update_selection", json!({"version": 2, "how": "exact"})));
    assert_eq!(harness.registry.len(), 1);
}

#[test]
fn cell_fini_deregisters_the_canvas() {
    let harness = Harness::new(PlotOptions::default());
    assert!(harness.send("cell_fini", json!({})));
    assert!(harness.registry.is_empty());
    assert!(harness.registry.session(harness.session.canvas_id()).is_none());
    // A second teardown has nothing to remove.
    assert!(!harness.send("cell_fini", json!({})));
}

#[test]
fn direct_handler_returns_the_new_config() {
    let harness = Harness::new(PlotOptions::default());
    let old = CanvasConfig::new(1, 200, 100, (0.0, 0.0), (100.0, 10.0)).expect("valid config");
    let request = serde_json::from_value(json!({
        "config_id": 2, "w": 400, "h": 100, "how": "resize", "old_config": old
    }))
    .expect("valid request");
    let config = harness
        .session
        .handle_canvas_config_req(&request)
        .expect("resize succeeds");
    assert_eq!((config.width(), config.height()), (400, 100));
    assert_eq!(config.id(), 2);
}

fn lines_harness() -> Harness {
    let point = |x: f64, y: f64| DataPoint { x, y };
    let mut catalog = ItemCatalog::new();
    catalog
        .add_lines(
            vec![
                vec![point(10.0, 10.0), point(50.0, 50.0), point(90.0, 90.0)],
                Vec::new(),
            ],
            &ItemOptions::new().with_labels(["diagonal", "empty"]),
        )
        .expect("two lines");
    Harness::with_catalog(PlotOptions::default(), catalog)
}

fn square_config(x_offset: i32) -> serde_json::Value {
    json!({
        "config_id": 7, "w": 101, "h": 101,
        "x0": 0.0, "y0": 0.0, "x1": 100.0, "y1": 100.0,
        "x_offset": x_offset
    })
}

#[test]
fn pt_req_answers_with_nearest_visible_point() {
    let harness = lines_harness();
    assert!(harness.send(
        "pt_req",
        json!({"config": square_config(0), "mouse_x": 47.0, "mouse_y": 53.0, "item_id": 0})
    ));

    let messages = harness.sink.take_messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].kind(), "pt");
    let OutboundMessage::Pt(response) = &messages[0] else {
        panic!("expected pt");
    };
    assert_eq!(response.config.id(), 7);
    assert_eq!((response.mouse_x, response.mouse_y), (47.0, 53.0));
    assert_eq!(response.item_id, 0);
    assert_eq!((response.screen_x, response.screen_y), (50, 50));
    assert_eq!(response.data_x, "      50");
    assert_eq!(response.data_y, "      50");
}

#[test]
fn pt_req_honors_pan_offset() {
    let harness = lines_harness();
    // Shifted right by 20 px, x=90 leaves the canvas and x=50 lands on px 70.
    let response = harness
        .session
        .handle_pt_req(
            &serde_json::from_value(
                json!({"config": square_config(20), "mouse_x": 100.0, "mouse_y": 10.0, "item_id": 0}),
            )
            .expect("valid request"),
        )
        .expect("known item")
        .expect("visible point");
    assert_eq!((response.screen_x, response.screen_y), (70, 50));
    assert_eq!(response.data_x.trim(), "50");
}

#[test]
fn pt_req_without_visible_points_sends_nothing() {
    let harness = lines_harness();
    assert!(harness.send(
        "pt_req",
        json!({"config": square_config(0), "mouse_x": 5.0, "mouse_y": 5.0, "item_id": 1})
    ));
    // Panned past the right edge, every point of item 0 is off screen.
    assert!(harness.send(
        "pt_req",
        json!({"config": square_config(200), "mouse_x": 5.0, "mouse_y": 5.0, "item_id": 0})
    ));
    assert!(harness.sink.messages().is_empty());
}

#[test]
fn pt_req_for_unknown_item_is_dropped() {
    let harness = lines_harness();
    assert!(!harness.send(
        "pt_req",
        json!({"config": square_config(0), "mouse_x": 5.0, "mouse_y": 5.0, "item_id": 9})
    ));
    assert!(harness.sink.messages().is_empty());
}
