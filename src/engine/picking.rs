use eframe::egui::Pos2;
use glam::{Mat4, Vec3, vec3};

use super::camera::{Camera, Viewport};
use super::lod::visible_indices_into;
use super::scene::Scene;

/// Smallest half-size of the pick region, in pixels.
const MIN_PICK_HALF_SIZE: f32 = 0.5;

/// Pick name -> node id table for a single selection pass.
///
/// Names are 1-based; 0 is never handed out. The ids are borrowed from the scene,
/// so a map cannot outlive the scene state it was built from.
#[derive(Debug, Default)]
pub struct NodeIdMap<'scene> {
    ids: Vec<&'scene str>,
}

impl<'scene> NodeIdMap<'scene> {
    pub fn assign(&mut self, id: &'scene str) -> u32 {
        self.ids.push(id);
        self.ids.len() as u32
    }

    pub fn resolve(&self, name: u32) -> Option<&'scene str> {
        let index = name.checked_sub(1)? as usize;
        self.ids.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitRecord {
    pub name: u32,
    pub min_depth: f32,
    pub max_depth: f32,
}

/// Selection-mode render target: instead of shading, it records which named
/// primitives land inside the narrowed frustum.
struct SelectionPass<'scene> {
    matrix: Mat4,
    names: NodeIdMap<'scene>,
    current_name: u32,
    hits: Vec<HitRecord>,
}

impl<'scene> SelectionPass<'scene> {
    fn new(matrix: Mat4) -> Self {
        Self {
            matrix,
            names: NodeIdMap::default(),
            current_name: 0,
            hits: Vec::new(),
        }
    }

    fn load_name(&mut self, id: &'scene str) {
        self.current_name = self.names.assign(id);
    }

    fn submit_point(&mut self, world: Vec3) {
        let clip = self.matrix * world.extend(1.0);
        if clip.w <= f32::EPSILON {
            return;
        }
        let ndc = clip.truncate() / clip.w;
        if ndc.abs().max_element() > 1.0 {
            return;
        }

        let depth = (ndc.z + 1.0) * 0.5;
        match self.hits.last_mut() {
            Some(hit) if hit.name == self.current_name => {
                hit.min_depth = hit.min_depth.min(depth);
                hit.max_depth = hit.max_depth.max(depth);
            }
            _ => self.hits.push(HitRecord {
                name: self.current_name,
                min_depth: depth,
                max_depth: depth,
            }),
        }
    }

    fn nearest(&self) -> Option<HitRecord> {
        self.hits.iter().copied().min_by(|a, b| {
            a.min_depth
                .total_cmp(&b.min_depth)
                .then_with(|| a.name.cmp(&b.name))
        })
    }
}

/// Matrix that maps a `2 * half_size` pixel box centred on `center` (bottom-left
/// origin window coordinates) onto the whole clip volume.
pub fn pick_matrix(center: Pos2, half_size: f32, viewport: Viewport) -> Mat4 {
    let size = 2.0 * half_size.max(MIN_PICK_HALF_SIZE);
    let translate = vec3(
        (viewport.width - 2.0 * center.x) / size,
        (viewport.height - 2.0 * center.y) / size,
        0.0,
    );
    let scale = vec3(viewport.width / size, viewport.height / size, 1.0);
    Mat4::from_translation(translate) * Mat4::from_scale(scale)
}

/// Converts a y-down screen position into y-up window coordinates relative to
/// the viewport origin.
pub fn screen_to_window(viewport: Viewport, screen: Pos2) -> Pos2 {
    Pos2::new(
        screen.x - viewport.x,
        viewport.height - (screen.y - viewport.y),
    )
}

/// Finds the node under `screen`, within `camera.selection_radius` pixels.
///
/// Renders the LOD-visible nodes through a narrowed frustum, tagging each with a
/// fresh 1-based name, and returns the nearest hit.
pub fn pick(scene: &Scene, camera: &Camera, viewport: Viewport, screen: Pos2) -> Option<String> {
    if scene.is_empty() || viewport.width <= 0.0 || viewport.height <= 0.0 {
        return None;
    }

    let window = screen_to_window(viewport, screen);
    let matrix =
        pick_matrix(window, camera.selection_radius, viewport) * camera.view_projection(viewport);

    let mut visible = Vec::new();
    visible_indices_into(scene, camera, &mut visible);

    let nodes = scene.nodes();
    let mut pass = SelectionPass::new(matrix);
    for index in visible {
        let node = &nodes[index];
        pass.load_name(&node.id);
        pass.submit_point(node.position);
    }

    let hit = pass.nearest()?;
    pass.names.resolve(hit.name).map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Viewport = Viewport {
        x: 0.0,
        y: 0.0,
        width: 800.0,
        height: 600.0,
    };

    fn screen_of(camera: &Camera, world: Vec3) -> Pos2 {
        camera.project(VIEWPORT, world).unwrap().pos
    }

    #[test]
    fn names_are_one_based() {
        let mut names = NodeIdMap::default();
        assert_eq!(names.assign("A"), 1);
        assert_eq!(names.assign("B"), 2);
        assert_eq!(names.resolve(0), None);
        assert_eq!(names.resolve(2), Some("B"));
        assert_eq!(names.resolve(3), None);
    }

    #[test]
    fn empty_scene_picks_nothing() {
        let camera = Camera::default();
        assert_eq!(pick(&Scene::new(), &camera, VIEWPORT, Pos2::new(400.0, 300.0)), None);
    }

    #[test]
    fn picks_node_under_cursor_within_radius() {
        let mut scene = Scene::new();
        scene.add_node("A", Vec3::ZERO);
        scene.add_node("B", vec3(10.0, 0.0, 0.0));
        let mut camera = Camera::default();
        camera.lod_threshold = 500.0;

        let b = screen_of(&camera, vec3(10.0, 0.0, 0.0));
        assert_eq!(pick(&scene, &camera, VIEWPORT, b).as_deref(), Some("B"));

        let near_b = b + eframe::egui::vec2(3.0, -3.0);
        assert_eq!(pick(&scene, &camera, VIEWPORT, near_b).as_deref(), Some("B"));

        let outside = b + eframe::egui::vec2(0.0, 40.0);
        assert_eq!(pick(&scene, &camera, VIEWPORT, outside), None);
    }

    #[test]
    fn vertical_flip_separates_mirrored_nodes() {
        let mut scene = Scene::new();
        scene.add_node("up", vec3(0.0, 10.0, 0.0));
        scene.add_node("down", vec3(0.0, -10.0, 0.0));
        let mut camera = Camera::default();
        camera.lod_threshold = 500.0;

        let up = screen_of(&camera, vec3(0.0, 10.0, 0.0));
        assert!(up.y < 300.0);
        assert_eq!(pick(&scene, &camera, VIEWPORT, up).as_deref(), Some("up"));
    }

    #[test]
    fn nearest_node_wins_overlapping_hits() {
        let mut scene = Scene::new();
        scene.add_node("back", vec3(0.0, 0.0, -20.0));
        scene.add_node("front", vec3(0.0, 0.0, 20.0));
        let mut camera = Camera::default();
        camera.lod_threshold = 500.0;

        let center = Pos2::new(400.0, 300.0);
        assert_eq!(pick(&scene, &camera, VIEWPORT, center).as_deref(), Some("front"));
    }

    #[test]
    fn nodes_outside_lod_are_not_pickable() {
        let mut scene = Scene::new();
        scene.add_node("A", Vec3::ZERO);
        let camera = Camera::default();

        let center = Pos2::new(400.0, 300.0);
        assert_eq!(camera.lod_threshold, 50.0);
        assert_eq!(pick(&scene, &camera, VIEWPORT, center), None);
    }

    #[test]
    fn repeated_picks_agree() {
        let mut scene = Scene::new();
        for index in 0..20 {
            scene.add_node(format!("n{index}"), vec3(index as f32 * 2.0 - 20.0, 0.0, 0.0));
        }
        let mut camera = Camera::default();
        camera.lod_threshold = 500.0;

        let cursor = Pos2::new(415.0, 301.0);
        let first = pick(&scene, &camera, VIEWPORT, cursor);
        assert!(first.is_some());
        assert_eq!(pick(&scene, &camera, VIEWPORT, cursor), first);
    }
}
