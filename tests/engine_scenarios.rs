use eframe::egui::Pos2;
use evo_tree_viewer::engine::lod::visible_indices;
use evo_tree_viewer::engine::palette::{MAX_EDGE_WIDTH, MIN_EDGE_WIDTH};
use evo_tree_viewer::engine::render::RecordingCanvas;
use evo_tree_viewer::engine::{
    EdgeSpec, Engine, EngineError, EventBus, InputEvent, Modifiers, Payload, PointerButton,
    SEARCH_NODE, SceneNode, UPDATE_LOD, Viewport,
};
use glam::{Vec2, Vec3, vec3};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const VIEWPORT: Viewport = Viewport {
    x: 0.0,
    y: 0.0,
    width: 1024.0,
    height: 768.0,
};

fn engine_with(nodes: Vec<SceneNode>, edges: Vec<EdgeSpec>) -> Engine {
    let mut engine = Engine::headless();
    engine.set_viewport(VIEWPORT);
    engine.update_tree(nodes, edges).unwrap();
    engine
}

#[test]
fn lod_keeps_only_nodes_near_the_camera() {
    let mut engine = engine_with(
        vec![
            SceneNode::new("A", Vec3::ZERO),
            SceneNode::new("B", vec3(10.0, 0.0, 0.0)),
        ],
        Vec::new(),
    );
    engine.update_zoom(100.0);
    engine.update_lod(5.0);

    assert_eq!(engine.camera().position(), Vec3::ZERO);
    assert_eq!(visible_indices(engine.scene(), engine.camera()), vec![0]);
}

#[test]
fn reloading_without_the_highlighted_node_clears_it() {
    let mut engine = engine_with(
        vec![SceneNode::new("A", Vec3::ZERO), SceneNode::new("B", Vec3::ONE)],
        vec![EdgeSpec::new("A", "B", 2.0)],
    );
    engine.search_node("A").unwrap();

    engine
        .update_tree(vec![SceneNode::new("B", Vec3::ONE)], Vec::new())
        .unwrap();

    assert_eq!(engine.scene().highlighted(), None);
}

#[test]
fn picking_an_empty_scene_finds_nothing() {
    let engine = engine_with(Vec::new(), Vec::new());
    assert_eq!(engine.pick(Pos2::new(512.0, 384.0)), None);
}

#[test]
fn heaviest_edge_is_widest_and_zero_edge_thinnest() {
    let mut engine = engine_with(
        vec![
            SceneNode::new("A", Vec3::ZERO),
            SceneNode::new("B", vec3(5.0, 0.0, 0.0)),
            SceneNode::new("C", vec3(0.0, 5.0, 0.0)),
            SceneNode::new("D", vec3(0.0, 0.0, 5.0)),
        ],
        vec![
            EdgeSpec::new("A", "B", 0.0),
            EdgeSpec::new("A", "C", 5.0),
            EdgeSpec::new("A", "D", 10.0),
        ],
    );

    let mut canvas = RecordingCanvas::new(VIEWPORT);
    engine.render(&mut canvas).unwrap();

    assert_eq!(
        canvas.line_widths(),
        vec![MIN_EDGE_WIDTH, (MIN_EDGE_WIDTH + MAX_EDGE_WIDTH) / 2.0, MAX_EDGE_WIDTH]
    );
}

#[test]
fn infinite_weight_edges_are_dropped_before_drawing() {
    let mut engine = engine_with(
        vec![
            SceneNode::new("A", Vec3::ZERO),
            SceneNode::new("B", vec3(5.0, 0.0, 0.0)),
            SceneNode::new("C", vec3(0.0, 5.0, 0.0)),
        ],
        vec![
            EdgeSpec::new("A", "B", f32::INFINITY),
            EdgeSpec::new("A", "C", 3.0),
        ],
    );

    let mut canvas = RecordingCanvas::new(VIEWPORT);
    let stats = engine.render(&mut canvas).unwrap();

    assert_eq!(stats.drawn_edges, 1);
    assert_eq!(canvas.line_widths(), vec![MAX_EDGE_WIDTH]);
}

#[test]
fn deleting_a_node_drops_its_edges_and_rebuilds_the_buffer() {
    let mut engine = engine_with(
        vec![
            SceneNode::new("A", Vec3::ZERO),
            SceneNode::new("B", Vec3::X),
            SceneNode::new("C", Vec3::Y),
        ],
        vec![EdgeSpec::new("A", "B", 1.0), EdgeSpec::new("B", "C", 1.0)],
    );
    let mut canvas = RecordingCanvas::new(VIEWPORT);
    engine.render(&mut canvas).unwrap();
    assert_eq!(engine.buffers().vertex_count(), 3);

    engine.delete_node("B").unwrap();
    engine.render(&mut canvas).unwrap();

    assert_eq!(engine.scene().edge_count(), 0);
    assert_eq!(engine.buffers().vertex_count(), 2);
    assert_eq!(engine.buffers().packed(), &[0.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    assert!(matches!(engine.delete_node("B"), Err(EngineError::NotFound(_))));
}

#[test]
fn search_and_lod_travel_over_the_bus() {
    let mut engine = engine_with(
        vec![
            SceneNode::new("Homo sapiens", Vec3::ZERO),
            SceneNode::new("Pan troglodytes", Vec3::X),
        ],
        Vec::new(),
    );
    let mut bus = EventBus::new();
    let subscriptions = Engine::subscribe(&mut bus);

    let mut seen = Vec::new();
    let mut audit = EventBus::<Vec<String>>::new();
    audit.subscribe(SEARCH_NODE, |log, payload| {
        log.push(payload.as_text().unwrap_or_default().to_owned());
        Ok(())
    });

    let query = Payload::Text("troglo".to_owned());
    assert!(bus.publish(&mut engine, SEARCH_NODE, &query).is_clean());
    audit.publish(&mut seen, SEARCH_NODE, &query);
    assert!(bus.publish(&mut engine, UPDATE_LOD, &Payload::Scalar(75.0)).is_clean());

    assert_eq!(engine.scene().highlighted(), Some("Pan troglodytes"));
    assert_eq!(engine.camera().lod_threshold, 75.0);
    assert_eq!(seen, vec!["troglo".to_owned()]);

    let report = bus.publish(&mut engine, SEARCH_NODE, &Payload::Text("Quercus".to_owned()));
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].message.contains("Quercus"));

    Engine::unsubscribe(&mut bus, &subscriptions);
    assert_eq!(bus.publish(&mut engine, UPDATE_LOD, &Payload::Scalar(1.0)).delivered, 0);
    assert_eq!(engine.camera().lod_threshold, 75.0);
}

fn camera_op() -> impl Strategy<Value = (u8, f32)> {
    (0u8..5, -90.0f32..90.0)
}

proptest! {
    #[test]
    fn reset_view_restores_defaults_after_any_history(ops in prop::collection::vec(camera_op(), 0..40)) {
        let mut engine = engine_with(vec![SceneNode::new("A", Vec3::ZERO)], Vec::new());
        for (op, amount) in ops {
            match op {
                0 => engine.update_zoom(amount),
                1 => engine.update_rotation((amount.abs() as usize) % 3, amount).unwrap(),
                2 => engine.pan(amount, -amount),
                3 => engine.zoom_to_node("A").unwrap(),
                _ => engine.push_input(InputEvent::Drag {
                    button: PointerButton::Primary,
                    delta: eframe::egui::vec2(amount, amount),
                    modifiers: Modifiers::default(),
                }),
            }
        }
        engine.process_input();
        engine.reset_view();

        prop_assert_eq!(engine.camera().zoom, -100.0);
        prop_assert_eq!(engine.camera().rotation, [0.0; 3]);
        prop_assert_eq!(engine.camera().pan, Vec2::ZERO);
        prop_assert!(!engine.animator().is_active());
    }

    #[test]
    fn picking_twice_gives_the_same_answer(x in 0.0f32..1024.0, y in 0.0f32..768.0) {
        let mut engine = engine_with(
            (0..30)
                .map(|index| {
                    let t = index as f32;
                    SceneNode::new(format!("n{index}"), vec3(t.sin() * 20.0, t.cos() * 15.0, t - 15.0))
                })
                .collect(),
            Vec::new(),
        );
        engine.update_lod(500.0);
        let at = Pos2::new(x, y);
        prop_assert_eq!(engine.pick(at), engine.pick(at));
    }
}
