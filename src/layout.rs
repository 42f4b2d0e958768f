use std::f32::consts::PI;

use glam::{Vec3, vec3};

use crate::util::stable_triple;

/// Radius the finished layout is scaled to, centred on the origin.
pub const LAYOUT_RADIUS: f32 = 40.0;
pub const DEFAULT_ITERATIONS: usize = 300;

/// Weighted undirected edge between node indices; `length` in `[0, 1]` scales
/// the spring rest length.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutEdge {
    pub a: usize,
    pub b: usize,
    pub length: f32,
}

/// Deterministic 3D force-directed layout. The same ids, edges and seed always
/// produce the same positions.
pub fn force_layout(
    node_ids: &[String],
    edges: &[LayoutEdge],
    seed: u64,
    iterations: usize,
) -> Vec<Vec3> {
    let n = node_ids.len();
    if n == 0 {
        return Vec::new();
    }

    let base_radius = (n as f32).cbrt() * 360.0;
    let golden_angle = PI * (3.0 - 5.0_f32.sqrt());
    let mut positions = node_ids
        .iter()
        .enumerate()
        .map(|(index, id)| {
            // Fibonacci sphere start, jittered per id.
            let y = if n == 1 {
                0.0
            } else {
                1.0 - 2.0 * index as f32 / (n - 1) as f32
            };
            let ring = (1.0 - y * y).max(0.0).sqrt();
            let theta = golden_angle * index as f32;
            let [jx, jy, jz] = stable_triple(seed, id);
            vec3(theta.cos() * ring, y, theta.sin() * ring) * base_radius
                + vec3(jx, jy, jz) * 160.0
        })
        .collect::<Vec<_>>();

    if n > 1 {
        relax(&mut positions, edges, base_radius, iterations);
    }
    fit_to_radius(&mut positions, LAYOUT_RADIUS);
    positions
}

fn relax(positions: &mut [Vec3], edges: &[LayoutEdge], base_radius: f32, iterations: usize) {
    let n = positions.len();
    let volume = (base_radius * 2.4).powi(3);
    let k = (volume / n as f32).cbrt().max(24.0);
    let mut temperature = (k * 5.5).max(140.0);
    let mut disp = vec![Vec3::ZERO; n];

    for _ in 0..iterations {
        disp.fill(Vec3::ZERO);

        for i in 0..n {
            for j in (i + 1)..n {
                let delta = positions[i] - positions[j];
                let distance = delta.length().max(0.5);
                let direction = delta / distance;
                let force = k * k / distance;
                disp[i] += direction * force;
                disp[j] -= direction * force;
            }
        }

        for edge in edges {
            if edge.a >= n || edge.b >= n || edge.a == edge.b {
                continue;
            }
            let delta = positions[edge.a] - positions[edge.b];
            let distance = delta.length().max(0.5);
            let direction = delta / distance;
            let ideal_length = k * (0.6 + 0.8 * edge.length.clamp(0.0, 1.0));
            let force = (distance - ideal_length) * 0.18;
            disp[edge.a] -= direction * force;
            disp[edge.b] += direction * force;
        }

        for (d, position) in disp.iter_mut().zip(positions.iter()) {
            *d -= *position * 0.0012;
        }

        for (position, d) in positions.iter_mut().zip(&disp) {
            let length = d.length();
            if length > 0.0 {
                *position += *d / length * length.min(temperature) * 0.92;
            }
        }

        temperature *= 0.965;
        if temperature < 0.55 {
            break;
        }
    }
}

/// Centres the points on their centroid and scales the farthest one to `radius`.
pub fn fit_to_radius(positions: &mut [Vec3], radius: f32) {
    if positions.is_empty() {
        return;
    }
    let centroid = positions.iter().copied().sum::<Vec3>() / positions.len() as f32;
    let extent = positions
        .iter()
        .map(|position| position.distance(centroid))
        .fold(0.0_f32, f32::max);
    let scale = if extent > f32::EPSILON {
        radius / extent
    } else {
        0.0
    };
    for position in positions.iter_mut() {
        *position = (*position - centroid) * scale;
    }
}
