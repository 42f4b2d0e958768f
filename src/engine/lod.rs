use glam::Vec3;

use super::camera::Camera;
use super::scene::Scene;

pub fn within_lod(position: Vec3, camera_position: Vec3, threshold: f32) -> bool {
    position.distance(camera_position) < threshold
}

/// Collects indices of nodes close enough to the camera to draw or pick.
///
/// Shared by the draw pass and the selection pass so both always agree on
/// which nodes exist for the current frame.
pub fn visible_indices_into(scene: &Scene, camera: &Camera, out: &mut Vec<usize>) {
    out.clear();
    let camera_position = camera.position();
    let threshold = camera.lod_threshold;
    out.extend(
        scene
            .nodes()
            .iter()
            .enumerate()
            .filter(|(_, node)| within_lod(node.position, camera_position, threshold))
            .map(|(index, _)| index),
    );
}

pub fn visible_indices(scene: &Scene, camera: &Camera) -> Vec<usize> {
    let mut out = Vec::new();
    visible_indices_into(scene, camera, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use glam::vec3;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn threshold_is_exclusive() {
        assert!(within_lod(vec3(4.999, 0.0, 0.0), Vec3::ZERO, 5.0));
        assert!(!within_lod(vec3(5.0, 0.0, 0.0), Vec3::ZERO, 5.0));
    }

    #[test]
    fn rotation_does_not_change_the_visible_set() {
        let mut scene = Scene::new();
        scene.add_node("near", vec3(0.0, 0.0, 80.0));
        scene.add_node("far", vec3(0.0, 0.0, -80.0));

        let mut camera = Camera::default();
        let before = visible_indices(&scene, &camera);
        camera.rotate_by(1, 180.0).unwrap();
        camera.rotate_by(0, 33.0).unwrap();

        assert_eq!(visible_indices(&scene, &camera), before);
        assert_eq!(before, vec![0]);
    }

    proptest! {
        #[test]
        fn raising_the_threshold_never_hides_nodes(
            positions in prop::collection::vec((-200.0f32..200.0, -200.0f32..200.0, -200.0f32..200.0), 0..40),
            low in 0.0f32..300.0,
            extra in 0.0f32..300.0,
        ) {
            let mut scene = Scene::new();
            for (index, (x, y, z)) in positions.into_iter().enumerate() {
                scene.add_node(format!("n{index}"), vec3(x, y, z));
            }

            let mut camera = Camera::default();
            camera.lod_threshold = low;
            let narrow = visible_indices(&scene, &camera);
            camera.lod_threshold = low + extra;
            let wide = visible_indices(&scene, &camera);

            prop_assert!(narrow.iter().all(|index| wide.contains(index)));
        }
    }
}
