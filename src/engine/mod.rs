//! Interactive 3D tree renderer.
//!
//! [`Engine`] owns the scene, the camera, the vertex buffer and the animation
//! state, and is driven once per frame by the UI: queued input is drained, then
//! a frame is drawn onto a [`Canvas`]. UI controls reach it either directly or
//! through an [`EventBus<Engine>`] on the `search_node` and `update_lod` topics.

use std::path::Path;

use anyhow::Context as _;
use eframe::egui::Pos2;
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use glam::{Mat4, Vec3};

pub mod animation;
pub mod buffer;
pub mod camera;
pub mod error;
pub mod events;
pub mod input;
pub mod lod;
pub mod palette;
pub mod picking;
pub mod render;
pub mod scene;
pub mod screenshot;

pub use animation::{Animator, CameraAnimation};
pub use buffer::{BufferHandle, GpuBufferManager, GpuDevice, HeadlessDevice};
pub use camera::{Camera, ScreenPoint, Viewport};
pub use error::{EngineError, EngineResult};
pub use events::{EventBus, Payload, PublishReport, SEARCH_NODE, SubscriptionId, UPDATE_LOD};
pub use input::{Gesture, InputEvent, Modifiers, PointerButton};
pub use palette::ColorMap;
pub use render::{Canvas, FrameStats, FrameStyle, NodeBatch, NodeRun};
pub use scene::{EdgeSpec, Scene, SceneNode};
pub use screenshot::{FrameCapture, RowOrigin};

use input::InputQueue;
use render::FrameInputs;

/// Distance kept between the camera and a node after zooming to it.
pub const ZOOM_TO_NODE_STANDOFF: f32 = 20.0;

/// Something the UI has to show in response to a pick.
#[derive(Clone, Debug, PartialEq)]
pub enum Interaction {
    ShowInfo { node: String },
    ContextMenu { node: String, at: Pos2 },
}

pub struct Engine {
    scene: Scene,
    camera: Camera,
    animator: Animator,
    buffers: GpuBufferManager,
    colors: ColorMap,
    style: FrameStyle,
    input: InputQueue,
    viewport: Viewport,
    visible_scratch: Vec<usize>,
    last_stats: FrameStats,
}

fn search_score(matcher: &SkimMatcherV2, id: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(id, query)
        .or_else(|| matcher.fuzzy_match(&id.to_lowercase(), &query.to_lowercase()))
}

impl Engine {
    pub fn new(device: Box<dyn GpuDevice>) -> Self {
        Self {
            scene: Scene::new(),
            camera: Camera::default(),
            animator: Animator::default(),
            buffers: GpuBufferManager::new(device),
            colors: ColorMap::default(),
            style: FrameStyle::default(),
            input: InputQueue::default(),
            viewport: Viewport::new(1.0, 1.0),
            visible_scratch: Vec::new(),
            last_stats: FrameStats::default(),
        }
    }

    pub fn headless() -> Self {
        Self::new(Box::new(HeadlessDevice::new()))
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    pub fn buffers(&self) -> &GpuBufferManager {
        &self.buffers
    }

    pub fn style(&self) -> &FrameStyle {
        &self.style
    }

    pub fn colors(&self) -> &ColorMap {
        &self.colors
    }

    pub fn set_appearance(&mut self, colors: ColorMap, style: FrameStyle) {
        self.colors = colors;
        self.style = style;
    }

    pub fn set_show_labels(&mut self, show: bool) {
        self.style.show_labels = show;
    }

    pub fn set_selection_radius(&mut self, radius: f32) {
        self.camera.selection_radius = radius.max(0.0);
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }

    // Camera controls. Direct manipulation cancels a running animation.

    pub fn update_zoom(&mut self, delta: f32) {
        self.animator.cancel();
        self.camera.zoom_by(delta);
    }

    pub fn update_rotation(&mut self, axis: usize, degrees: f32) -> EngineResult<()> {
        self.camera.rotate_by(axis, degrees)?;
        self.animator.cancel();
        Ok(())
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.animator.cancel();
        self.camera.pan_by(dx, dy);
    }

    pub fn reset_view(&mut self) {
        self.animator.cancel();
        self.camera.reset();
        log::debug!("view reset");
    }

    pub fn update_lod(&mut self, threshold: f32) {
        self.camera.lod_threshold = if threshold.is_nan() {
            0.0
        } else {
            threshold.max(0.0)
        };
        log::debug!("lod threshold set to {}", self.camera.lod_threshold);
    }

    // Scene edits.

    pub fn update_tree(&mut self, nodes: Vec<SceneNode>, edges: Vec<EdgeSpec>) -> EngineResult<()> {
        self.scene.replace_graph(nodes, edges)
    }

    pub fn add_node(&mut self, id: impl Into<String>, position: Vec3) {
        self.scene.add_node(id, position);
    }

    pub fn add_edge(&mut self, a: &str, b: &str, weight: f32) -> EngineResult<bool> {
        self.scene.add_edge(a, b, weight)
    }

    pub fn set_attribute(&mut self, id: &str, value: impl Into<String>) -> EngineResult<()> {
        self.scene.set_attribute(id, value)
    }

    pub fn annotate(&mut self, id: &str, text: impl Into<String>) -> EngineResult<()> {
        self.scene.add_annotation(id, text)
    }

    pub fn delete_node(&mut self, id: &str) -> EngineResult<SceneNode> {
        let removed = self.scene.remove_node(id)?;
        log::info!("node {id} deleted");
        Ok(removed)
    }

    pub fn select(&mut self, id: Option<&str>) -> EngineResult<()> {
        self.scene.set_highlighted(id)
    }

    /// Highlights the node best matching `query` and returns its id.
    ///
    /// An exact id wins, then a case-insensitive one, then the highest fuzzy
    /// score (earliest node on ties).
    pub fn search_node(&mut self, query: &str) -> EngineResult<String> {
        let query = query.trim();
        if query.is_empty() {
            return Err(EngineError::NotFound(String::new()));
        }

        let nodes = self.scene.nodes();
        let found = if self.scene.contains(query) {
            Some(query.to_owned())
        } else if let Some(node) = nodes.iter().find(|node| node.id.eq_ignore_ascii_case(query)) {
            Some(node.id.clone())
        } else {
            let matcher = SkimMatcherV2::default();
            nodes
                .iter()
                .filter_map(|node| search_score(&matcher, &node.id, query).map(|score| (score, node)))
                .fold(None::<(i64, &SceneNode)>, |best, (score, node)| match best {
                    Some((best_score, _)) if best_score >= score => best,
                    _ => Some((score, node)),
                })
                .map(|(_, node)| node.id.clone())
        };

        let id = found.ok_or_else(|| EngineError::NotFound(query.to_owned()))?;
        self.scene.set_highlighted(Some(&id))?;
        log::info!("search {query:?} highlighted {id}");
        Ok(id)
    }

    /// Centres `id` on screen and animates the camera in front of it, keeping
    /// the current rotation.
    pub fn zoom_to_node(&mut self, id: &str) -> EngineResult<()> {
        let position = self
            .scene
            .node(id)
            .ok_or_else(|| EngineError::NotFound(id.to_owned()))?
            .position;
        let [pitch, yaw, roll] = self.camera.rotation;
        let rotation = Mat4::from_rotation_x(pitch.to_radians())
            * Mat4::from_rotation_y(yaw.to_radians())
            * Mat4::from_rotation_z(roll.to_radians());
        let rotated = rotation.transform_point3(position);

        self.camera.pan = -rotated.truncate();
        let target_zoom = -rotated.z - ZOOM_TO_NODE_STANDOFF;
        self.animator.start(CameraAnimation::new(
            &self.camera,
            target_zoom,
            self.camera.rotation,
        ));
        self.scene.set_highlighted(Some(id))?;
        log::debug!("zooming to {id} (target zoom {target_zoom})");
        Ok(())
    }

    pub fn pick(&self, screen: Pos2) -> Option<String> {
        picking::pick(&self.scene, &self.camera, self.viewport, screen)
    }

    pub fn push_input(&mut self, event: InputEvent) {
        self.input.push(event);
    }

    pub fn pending_input(&self) -> usize {
        self.input.len()
    }

    /// Applies every queued input event in arrival order.
    pub fn process_input(&mut self) -> Vec<Interaction> {
        let events = self.input.drain().collect::<Vec<_>>();
        let mut interactions = Vec::new();
        for gesture in events.iter().filter_map(InputEvent::gesture) {
            match gesture {
                Gesture::Rotate { pitch, yaw } => {
                    self.animator.cancel();
                    self.camera.rotation[0] += pitch;
                    self.camera.rotation[1] += yaw;
                }
                Gesture::Pan { dx, dy } => self.pan(dx, dy),
                Gesture::Zoom(delta) => self.update_zoom(delta),
                Gesture::ShowInfo(at) => {
                    if let Some(node) = self.pick_and_select(at) {
                        interactions.push(Interaction::ShowInfo { node });
                    }
                }
                Gesture::ContextMenu(at) => {
                    if let Some(node) = self.pick_and_select(at) {
                        interactions.push(Interaction::ContextMenu { node, at });
                    }
                }
            }
        }
        interactions
    }

    fn pick_and_select(&mut self, at: Pos2) -> Option<String> {
        let node = self.pick(at)?;
        self.scene.set_highlighted(Some(&node)).ok()?;
        Some(node)
    }

    /// Uploads node positions if the scene geometry changed since the last
    /// upload. Returns whether a rebuild happened.
    pub fn sync_gpu(&mut self) -> EngineResult<bool> {
        if !self.scene.is_buffer_dirty() {
            return Ok(false);
        }
        self.buffers.rebuild(&self.scene)?;
        self.scene.take_buffer_dirty();
        Ok(true)
    }

    pub fn release_gpu(&mut self) {
        self.buffers.release();
    }

    /// Draws one frame. The buffer is synced first; the frame is drawn even if
    /// that fails, and the failure is returned afterwards.
    pub fn render(&mut self, canvas: &mut dyn Canvas) -> EngineResult<FrameStats> {
        let synced = self.sync_gpu();
        if let Err(error) = &synced {
            log::error!("vertex buffer rebuild failed: {error}");
        }

        self.viewport = canvas.viewport();
        self.last_stats = render::render_frame(
            canvas,
            FrameInputs {
                scene: &self.scene,
                colors: &self.colors,
                style: &self.style,
                buffer: self.buffers.handle(),
                vertex_count: self.buffers.vertex_count(),
            },
            &mut self.camera,
            &mut self.animator,
            &mut self.visible_scratch,
        );

        synced.map(|_| self.last_stats)
    }

    pub fn save_screenshot(&self, capture: FrameCapture, path: &Path) -> EngineResult<()> {
        screenshot::save_capture(capture, path)
    }

    /// Wires the engine's topics into `bus`. The returned ids must be passed to
    /// [`Engine::unsubscribe`] when the engine is torn down.
    pub fn subscribe(bus: &mut EventBus<Engine>) -> Vec<SubscriptionId> {
        let search = bus.subscribe(SEARCH_NODE, |engine: &mut Engine, payload: &Payload| {
            let query = payload
                .as_text()
                .context("search_node expects a text payload")?;
            engine.search_node(query)?;
            Ok(())
        });
        let lod = bus.subscribe(UPDATE_LOD, |engine: &mut Engine, payload: &Payload| {
            let threshold = payload
                .as_scalar()
                .context("update_lod expects a scalar payload")?;
            engine.update_lod(threshold);
            Ok(())
        });
        vec![search, lod]
    }

    pub fn unsubscribe(bus: &mut EventBus<Engine>, ids: &[SubscriptionId]) {
        for id in ids {
            bus.unsubscribe(*id);
        }
    }
}
