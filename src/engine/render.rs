use eframe::egui::Color32;
use glam::Mat4;

use super::animation::Animator;
use super::buffer::BufferHandle;
use super::camera::{Camera, ScreenPoint, Viewport, project_with};
use super::lod::visible_indices_into;
use super::palette::{ColorMap, HIGHLIGHT_COLOR, blend_color, edge_style};
use super::scene::Scene;

pub const DEFAULT_NODE_SIZE: f32 = 10.0;
pub const DEFAULT_BACKGROUND: Color32 = Color32::WHITE;
pub const DEFAULT_EDGE_COLOR: Color32 = Color32::from_rgb(199, 0, 57);
const HIGHLIGHT_SCALE: f32 = 1.6;

/// Drawing surface the frame is rendered onto. Points and lines arrive already
/// projected; `depth` is the window depth in `[0, 1]`.
pub trait Canvas {
    fn viewport(&self) -> Viewport;

    fn clear(&mut self, color: Color32);

    fn set_depth_test(&mut self, enabled: bool);

    fn vertical_gradient(&mut self, top: Color32, bottom: Color32);

    fn line(&mut self, from: ScreenPoint, to: ScreenPoint, width: f32, color: Color32);

    /// Draws the LOD-visible nodes. Positions come from the vertex buffer in
    /// `batch` when one is bound; `NodeRun::points` carry the same nodes
    /// already projected, for canvases that draw without one.
    fn nodes(&mut self, batch: &NodeBatch<'_>);

    fn label(&mut self, at: ScreenPoint, text: &str, color: Color32);
}

#[derive(Clone, Debug, PartialEq)]
pub struct FrameStyle {
    pub background: Color32,
    pub edge_color: Color32,
    pub node_size: f32,
    pub edge_width: f32,
    pub show_labels: bool,
}

impl Default for FrameStyle {
    fn default() -> Self {
        Self {
            background: DEFAULT_BACKGROUND,
            edge_color: DEFAULT_EDGE_COLOR,
            node_size: DEFAULT_NODE_SIZE,
            edge_width: 1.0,
            show_labels: true,
        }
    }
}

impl FrameStyle {
    fn gradient(&self) -> (Color32, Color32) {
        let bottom = blend_color(self.background, Color32::from_gray(160), 0.18);
        (self.background, bottom)
    }

    fn label_color(&self) -> Color32 {
        let luminance = self.background.r() as u32 + self.background.g() as u32 + self.background.b() as u32;
        if luminance > 384 {
            Color32::from_gray(20)
        } else {
            Color32::from_gray(235)
        }
    }
}

/// Consecutive nodes sharing a colour and size, in draw order.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeRun {
    pub color: Color32,
    pub diameter: f32,
    /// Vertex indices into the node buffer, which is in scene order.
    pub vertices: Vec<u32>,
    pub points: Vec<ScreenPoint>,
}

/// Node draw call for one frame. Runs are ordered back to front with the
/// highlighted node last.
#[derive(Clone, Copy, Debug)]
pub struct NodeBatch<'a> {
    pub buffer: Option<BufferHandle>,
    pub vertex_count: usize,
    pub view_projection: Mat4,
    pub runs: &'a [NodeRun],
}

impl NodeBatch<'_> {
    pub fn node_count(&self) -> usize {
        self.runs.iter().map(|run| run.vertices.len()).sum()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub visible_nodes: usize,
    pub drawn_edges: usize,
    /// Vertices in the buffer the nodes were drawn from; 0 when none was bound.
    pub buffered_vertices: usize,
}

pub struct FrameInputs<'a> {
    pub scene: &'a Scene,
    pub colors: &'a ColorMap,
    pub style: &'a FrameStyle,
    pub buffer: Option<BufferHandle>,
    pub vertex_count: usize,
}

fn push_node(runs: &mut Vec<NodeRun>, index: usize, point: ScreenPoint, color: Color32, diameter: f32) {
    match runs.last_mut() {
        Some(run) if run.color == color && run.diameter == diameter => {
            run.vertices.push(index as u32);
            run.points.push(point);
        }
        _ => runs.push(NodeRun {
            color,
            diameter,
            vertices: vec![index as u32],
            points: vec![point],
        }),
    }
}

/// Draws one frame and then advances any running camera animation.
pub fn render_frame(
    canvas: &mut dyn Canvas,
    inputs: FrameInputs<'_>,
    camera: &mut Camera,
    animator: &mut Animator,
    visible: &mut Vec<usize>,
) -> FrameStats {
    let FrameInputs {
        scene,
        colors,
        style,
        buffer,
        vertex_count,
    } = inputs;
    let viewport = canvas.viewport();

    canvas.clear(style.background);

    canvas.set_depth_test(false);
    let (top, bottom) = style.gradient();
    canvas.vertical_gradient(top, bottom);
    canvas.set_depth_test(true);

    let view_projection = camera.view_projection(viewport);

    let mut stats = FrameStats::default();
    let nodes = scene.nodes();
    let max_weight = scene.max_weight();
    for edge in scene.edges() {
        let (Some(from), Some(to)) = (
            camera.project_unclipped(viewport, nodes[edge.a].position),
            camera.project_unclipped(viewport, nodes[edge.b].position),
        ) else {
            continue;
        };
        let (width, color) = edge_style(edge.weight, max_weight, style.edge_color);
        canvas.line(from, to, width * style.edge_width, color);
        stats.drawn_edges += 1;
    }

    visible_indices_into(scene, camera, visible);
    stats.visible_nodes = visible.len();

    let highlighted = scene.highlighted().and_then(|id| scene.index_of(id));
    let mut ordered = visible
        .iter()
        .filter_map(|&index| {
            project_with(view_projection, viewport, nodes[index].position)
                .map(|point| (index, point))
        })
        .collect::<Vec<_>>();
    // Back to front, so canvases without a depth buffer still occlude correctly.
    ordered.sort_by(|a, b| b.1.depth.total_cmp(&a.1.depth));

    let mut runs = Vec::new();
    let mut highlighted_point = None;
    for &(index, point) in &ordered {
        if Some(index) == highlighted {
            highlighted_point = Some((index, point));
            continue;
        }
        let color = colors.color_for(&nodes[index].attribute);
        push_node(&mut runs, index, point, color, style.node_size);
    }
    if let Some((index, point)) = highlighted_point {
        runs.push(NodeRun {
            color: HIGHLIGHT_COLOR,
            diameter: style.node_size * HIGHLIGHT_SCALE,
            vertices: vec![index as u32],
            points: vec![point],
        });
    }

    // A buffer packed from another revision of the scene must not be drawn.
    let buffer = buffer.filter(|_| vertex_count == nodes.len());
    canvas.nodes(&NodeBatch {
        buffer,
        vertex_count: if buffer.is_some() { vertex_count } else { 0 },
        view_projection,
        runs: &runs,
    });
    stats.buffered_vertices = if buffer.is_some() { vertex_count } else { 0 };

    let label_color = style.label_color();
    for &(index, point) in &ordered {
        if style.show_labels || Some(index) == highlighted {
            canvas.label(point, &nodes[index].id, label_color);
        }
    }

    animator.advance(camera);
    stats
}

/// One recorded canvas call.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Clear(Color32),
    DepthTest(bool),
    Gradient { top: Color32, bottom: Color32 },
    Line { from: ScreenPoint, to: ScreenPoint, width: f32, color: Color32 },
    Nodes {
        buffer: Option<BufferHandle>,
        vertex_count: usize,
        runs: Vec<NodeRun>,
    },
    Label { at: ScreenPoint, text: String, color: Color32 },
}

/// Canvas that records calls instead of drawing; used headless and in tests.
#[derive(Debug)]
pub struct RecordingCanvas {
    viewport: Viewport,
    pub commands: Vec<DrawCommand>,
}

impl RecordingCanvas {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            commands: Vec::new(),
        }
    }

    pub fn line_widths(&self) -> Vec<f32> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Line { width, .. } => Some(*width),
                _ => None,
            })
            .collect()
    }

    /// Node runs of the last frame, in draw order.
    pub fn node_runs(&self) -> &[NodeRun] {
        self.commands
            .iter()
            .find_map(|command| match command {
                DrawCommand::Nodes { runs, .. } => Some(runs.as_slice()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// One colour per drawn node, in draw order.
    pub fn point_colors(&self) -> Vec<Color32> {
        self.node_runs()
            .iter()
            .flat_map(|run| run.vertices.iter().map(|_| run.color))
            .collect()
    }
}

impl Canvas for RecordingCanvas {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn clear(&mut self, color: Color32) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear(color));
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.commands.push(DrawCommand::DepthTest(enabled));
    }

    fn vertical_gradient(&mut self, top: Color32, bottom: Color32) {
        self.commands.push(DrawCommand::Gradient { top, bottom });
    }

    fn line(&mut self, from: ScreenPoint, to: ScreenPoint, width: f32, color: Color32) {
        self.commands.push(DrawCommand::Line {
            from,
            to,
            width,
            color,
        });
    }

    fn nodes(&mut self, batch: &NodeBatch<'_>) {
        self.commands.push(DrawCommand::Nodes {
            buffer: batch.buffer,
            vertex_count: batch.vertex_count,
            runs: batch.runs.to_vec(),
        });
    }

    fn label(&mut self, at: ScreenPoint, text: &str, color: Color32) {
        self.commands.push(DrawCommand::Label {
            at,
            text: text.to_owned(),
            color,
        });
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec3, vec3};

    use super::*;
    use crate::engine::animation::CameraAnimation;
    use crate::engine::palette::MIN_EDGE_WIDTH;
    use crate::engine::scene::EdgeSpec;
    use crate::engine::scene::SceneNode;

    const VIEWPORT: Viewport = Viewport {
        x: 0.0,
        y: 0.0,
        width: 800.0,
        height: 600.0,
    };

    struct Frame {
        scene: Scene,
        camera: Camera,
        animator: Animator,
        colors: ColorMap,
        style: FrameStyle,
        buffer: Option<BufferHandle>,
        vertex_count: usize,
    }

    impl Frame {
        fn new(scene: Scene) -> Self {
            let mut camera = Camera::default();
            camera.lod_threshold = 500.0;
            Self {
                scene,
                camera,
                animator: Animator::default(),
                colors: ColorMap::default(),
                style: FrameStyle::default(),
                buffer: None,
                vertex_count: 0,
            }
        }

        fn draw(&mut self) -> (RecordingCanvas, FrameStats) {
            let mut canvas = RecordingCanvas::new(VIEWPORT);
            let mut visible = Vec::new();
            let stats = render_frame(
                &mut canvas,
                FrameInputs {
                    scene: &self.scene,
                    colors: &self.colors,
                    style: &self.style,
                    buffer: self.buffer,
                    vertex_count: self.vertex_count,
                },
                &mut self.camera,
                &mut self.animator,
                &mut visible,
            );
            (canvas, stats)
        }
    }

    fn weighted_scene() -> Scene {
        let mut scene = Scene::new();
        scene
            .replace_graph(
                vec![
                    SceneNode::new("A", vec3(-10.0, 0.0, 0.0)),
                    SceneNode::new("B", Vec3::ZERO),
                    SceneNode::new("C", vec3(10.0, 0.0, 0.0)),
                    SceneNode::new("D", vec3(0.0, 10.0, 0.0)),
                ],
                vec![
                    EdgeSpec::new("A", "B", 0.0),
                    EdgeSpec::new("B", "C", 5.0),
                    EdgeSpec::new("C", "D", 10.0),
                ],
            )
            .unwrap();
        scene
    }

    #[test]
    fn frame_steps_run_in_order() {
        let mut frame = Frame::new(weighted_scene());
        let (canvas, _) = frame.draw();

        assert_eq!(canvas.commands[0], DrawCommand::Clear(DEFAULT_BACKGROUND));
        assert_eq!(canvas.commands[1], DrawCommand::DepthTest(false));
        assert!(matches!(canvas.commands[2], DrawCommand::Gradient { .. }));
        assert_eq!(canvas.commands[3], DrawCommand::DepthTest(true));

        let first_point = canvas
            .commands
            .iter()
            .position(|command| matches!(command, DrawCommand::Nodes { .. }))
            .unwrap();
        let last_line = canvas
            .commands
            .iter()
            .rposition(|command| matches!(command, DrawCommand::Line { .. }))
            .unwrap();
        assert!(last_line < first_point);
    }

    #[test]
    fn edge_width_grows_with_weight() {
        let mut frame = Frame::new(weighted_scene());
        let (canvas, stats) = frame.draw();

        assert_eq!(stats.drawn_edges, 3);
        assert_eq!(canvas.line_widths(), vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn all_zero_weights_draw_minimal_lines() {
        let mut scene = Scene::new();
        scene.add_node("A", Vec3::ZERO);
        scene.add_node("B", vec3(5.0, 0.0, 0.0));
        scene.add_edge("A", "B", 0.0).unwrap();

        let mut frame = Frame::new(scene);
        let (canvas, _) = frame.draw();
        assert_eq!(canvas.line_widths(), vec![MIN_EDGE_WIDTH]);
    }

    #[test]
    fn highlighted_node_is_drawn_last() {
        let mut scene = weighted_scene();
        scene.set_highlighted(Some("A")).unwrap();

        let mut frame = Frame::new(scene);
        let (canvas, stats) = frame.draw();

        assert_eq!(stats.visible_nodes, 4);
        let colors = canvas.point_colors();
        assert_eq!(colors.len(), 4);
        assert_eq!(colors.last(), Some(&HIGHLIGHT_COLOR));
        assert_eq!(colors.iter().filter(|c| **c == HIGHLIGHT_COLOR).count(), 1);
    }

    #[test]
    fn nodes_are_sorted_back_to_front() {
        let mut scene = Scene::new();
        scene.add_node("near", vec3(0.0, 0.0, 30.0));
        scene.add_node("far", vec3(0.0, 0.0, -30.0));
        let mut frame = Frame::new(scene);
        let (canvas, _) = frame.draw();

        let depths = canvas
            .node_runs()
            .iter()
            .flat_map(|run| run.points.iter().map(|point| point.depth))
            .collect::<Vec<_>>();
        assert_eq!(depths.len(), 2);
        assert!(depths[0] > depths[1]);
    }

    #[test]
    fn nodes_outside_lod_are_skipped() {
        let mut frame = Frame::new(weighted_scene());
        frame.camera.lod_threshold = 1.0;
        let (canvas, stats) = frame.draw();

        assert_eq!(stats.visible_nodes, 0);
        assert!(canvas.point_colors().is_empty());
    }

    #[test]
    fn each_frame_advances_the_animation() {
        let mut frame = Frame::new(weighted_scene());
        let target = CameraAnimation::new(&frame.camera, -50.0, [0.0; 3]);
        frame.animator.start(target);

        frame.draw();
        assert_eq!(frame.animator.current().map(|animation| animation.step), Some(1));
        assert!(frame.camera.zoom > -100.0);
    }

    #[test]
    fn nodes_are_drawn_from_the_bound_buffer() {
        let mut frame = Frame::new(weighted_scene());
        frame.buffer = Some(BufferHandle(7));
        frame.vertex_count = 4;
        let (canvas, stats) = frame.draw();

        let batch = canvas
            .commands
            .iter()
            .find_map(|command| match command {
                DrawCommand::Nodes {
                    buffer,
                    vertex_count,
                    runs,
                } => Some((*buffer, *vertex_count, runs.clone())),
                _ => None,
            })
            .unwrap();
        assert_eq!(batch.0, Some(BufferHandle(7)));
        assert_eq!(batch.1, 4);
        assert_eq!(stats.buffered_vertices, 4);

        let mut vertices = batch
            .2
            .iter()
            .flat_map(|run| run.vertices.iter().copied())
            .collect::<Vec<_>>();
        vertices.sort_unstable();
        assert_eq!(vertices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn buffer_from_another_scene_revision_is_not_bound() {
        let mut frame = Frame::new(weighted_scene());
        frame.buffer = Some(BufferHandle(7));
        frame.vertex_count = 3;
        let (canvas, stats) = frame.draw();

        assert_eq!(stats.buffered_vertices, 0);
        assert!(canvas.commands.iter().any(|command| matches!(
            command,
            DrawCommand::Nodes { buffer: None, vertex_count: 0, .. }
        )));
        assert_eq!(canvas.point_colors().len(), 4);
    }

    #[test]
    fn same_coloured_neighbours_share_a_run() {
        let mut frame = Frame::new(weighted_scene());
        frame.scene.set_highlighted(Some("C")).unwrap();
        let (canvas, _) = frame.draw();

        let runs = canvas.node_runs();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].vertices.len(), 3);
        assert_eq!(runs[1].vertices, vec![2]);
        assert_eq!(runs[1].color, HIGHLIGHT_COLOR);
    }
}
