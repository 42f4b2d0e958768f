use super::camera::Camera;

pub const ANIMATION_STEPS: u32 = 60;

pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

/// In-flight camera transition. Dropped once finished or superseded.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraAnimation {
    pub start_zoom: f32,
    pub start_rotation: [f32; 3],
    pub target_zoom: f32,
    pub target_rotation: [f32; 3],
    pub step: u32,
    pub total_steps: u32,
}

impl CameraAnimation {
    pub fn new(camera: &Camera, target_zoom: f32, target_rotation: [f32; 3]) -> Self {
        Self {
            start_zoom: camera.zoom,
            start_rotation: camera.rotation,
            target_zoom,
            target_rotation,
            step: 0,
            total_steps: ANIMATION_STEPS,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.step >= self.total_steps
    }

    /// Advances one frame and writes the eased zoom and rotation into `camera`.
    pub fn tick(&mut self, camera: &mut Camera) {
        if self.is_finished() {
            return;
        }
        self.step += 1;

        let t = smoothstep(self.step as f32 / self.total_steps.max(1) as f32);
        camera.zoom = lerp(self.start_zoom, self.target_zoom, t);
        for (axis, angle) in camera.rotation.iter_mut().enumerate() {
            *angle = lerp(self.start_rotation[axis], self.target_rotation[axis], t);
        }
    }
}

/// Holds at most one animation; starting another replaces it.
#[derive(Debug, Default)]
pub struct Animator {
    active: Option<CameraAnimation>,
}

impl Animator {
    pub fn start(&mut self, animation: CameraAnimation) {
        if self.active.is_some() {
            log::debug!("camera animation superseded");
        }
        self.active = Some(animation);
    }

    pub fn cancel(&mut self) {
        self.active = None;
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn current(&self) -> Option<&CameraAnimation> {
        self.active.as_ref()
    }

    pub fn advance(&mut self, camera: &mut Camera) {
        let Some(animation) = self.active.as_mut() else {
            return;
        };
        animation.tick(camera);
        if animation.is_finished() {
            self.active = None;
        }
    }
}
