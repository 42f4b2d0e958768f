use eframe::egui::{Pos2, Rect, pos2};
use glam::{DVec4, Mat4, Vec2, Vec3, Vec4, vec3};

use super::error::{EngineError, EngineResult};

pub const DEFAULT_ZOOM: f32 = -100.0;
pub const DEFAULT_LOD_THRESHOLD: f32 = 50.0;
pub const DEFAULT_SELECTION_RADIUS: f32 = 5.0;

const FIELD_OF_VIEW_DEGREES: f32 = 45.0;
const NEAR_PLANE: f32 = 0.1;
const FAR_PLANE: f32 = 1000.0;

/// Rendering surface rectangle in screen pixels (y grows downward).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }

    pub fn from_rect(rect: Rect) -> Self {
        Self {
            x: rect.left(),
            y: rect.top(),
            width: rect.width(),
            height: rect.height(),
        }
    }

    pub fn aspect(&self) -> f32 {
        if self.height.abs() <= f32::EPSILON {
            1.0
        } else {
            self.width / self.height
        }
    }
}

/// A projected point: screen position plus window depth in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenPoint {
    pub pos: Pos2,
    pub depth: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub zoom: f32,
    pub rotation: [f32; 3],
    pub pan: Vec2,
    pub lod_threshold: f32,
    pub selection_radius: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            zoom: DEFAULT_ZOOM,
            rotation: [0.0; 3],
            pan: Vec2::ZERO,
            lod_threshold: DEFAULT_LOD_THRESHOLD,
            selection_radius: DEFAULT_SELECTION_RADIUS,
        }
    }
}

impl Camera {
    pub fn zoom_by(&mut self, delta: f32) {
        self.zoom += delta;
    }

    pub fn rotate_by(&mut self, axis: usize, degrees: f32) -> EngineResult<()> {
        let angle = self
            .rotation
            .get_mut(axis)
            .ok_or(EngineError::InvalidAxis(axis))?;
        *angle += degrees;
        Ok(())
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.pan += Vec2::new(dx, dy);
    }

    /// Restores zoom, rotation and pan. LOD and selection settings are kept.
    pub fn reset(&mut self) {
        self.zoom = DEFAULT_ZOOM;
        self.rotation = [0.0; 3];
        self.pan = Vec2::ZERO;
    }

    /// Reference point for LOD distance tests. Rotation is not applied.
    pub fn position(&self) -> Vec3 {
        vec3(-self.pan.x, -self.pan.y, -self.zoom)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_translation(vec3(self.pan.x, self.pan.y, self.zoom))
            * Mat4::from_rotation_x(self.rotation[0].to_radians())
            * Mat4::from_rotation_y(self.rotation[1].to_radians())
            * Mat4::from_rotation_z(self.rotation[2].to_radians())
    }

    pub fn projection_matrix(viewport: Viewport) -> Mat4 {
        Mat4::perspective_rh_gl(
            FIELD_OF_VIEW_DEGREES.to_radians(),
            viewport.aspect(),
            NEAR_PLANE,
            FAR_PLANE,
        )
    }

    pub fn view_projection(&self, viewport: Viewport) -> Mat4 {
        Self::projection_matrix(viewport) * self.view_matrix()
    }

    /// Projects a world point to the screen, or `None` when it is behind the
    /// camera or outside the normalized device cube.
    pub fn project(&self, viewport: Viewport, world: Vec3) -> Option<ScreenPoint> {
        project_with(self.view_projection(viewport), viewport, world)
    }

    /// Like [`Camera::project`] but only rejects points behind the camera, for
    /// geometry that may extend past the viewport edges.
    pub fn project_unclipped(&self, viewport: Viewport, world: Vec3) -> Option<ScreenPoint> {
        let clip = self.view_projection(viewport) * world.extend(1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }
        Some(ndc_to_screen(viewport, clip.truncate() / clip.w))
    }

    /// Inverse of [`Camera::project`] for a screen position and window depth.
    ///
    /// The inversion runs in f64: window depths close to 1 sit where the f32
    /// perspective matrix is too ill-conditioned to invert accurately.
    pub fn unproject(&self, viewport: Viewport, screen: Pos2, depth: f32) -> Option<Vec3> {
        if viewport.width <= f32::EPSILON || viewport.height <= f32::EPSILON {
            return None;
        }
        let ndc = DVec4::new(
            f64::from(screen.x - viewport.x) / f64::from(viewport.width) * 2.0 - 1.0,
            1.0 - f64::from(screen.y - viewport.y) / f64::from(viewport.height) * 2.0,
            f64::from(depth) * 2.0 - 1.0,
            1.0,
        );
        let world = self.view_projection(viewport).as_dmat4().inverse() * ndc;
        if world.w.abs() <= f64::EPSILON {
            return None;
        }
        Some((world.truncate() / world.w).as_vec3())
    }
}

pub(super) fn project_with(matrix: Mat4, viewport: Viewport, world: Vec3) -> Option<ScreenPoint> {
    let clip: Vec4 = matrix * world.extend(1.0);
    if clip.w <= f32::EPSILON {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    if ndc.abs().max_element() > 1.0 {
        return None;
    }
    Some(ndc_to_screen(viewport, ndc))
}

fn ndc_to_screen(viewport: Viewport, ndc: Vec3) -> ScreenPoint {
    let x = viewport.x + (ndc.x + 1.0) * 0.5 * viewport.width;
    // The projection is y-up; the surface is y-down.
    let y_up = (ndc.y + 1.0) * 0.5 * viewport.height;
    ScreenPoint {
        pos: pos2(x, viewport.y + viewport.height - y_up),
        depth: (ndc.z + 1.0) * 0.5,
    }
}
