use std::collections::HashMap;

use crate::engine::{EdgeSpec, SceneNode};
use crate::layout::{DEFAULT_ITERATIONS, LayoutEdge, force_layout};

use super::distance::genetic_distance;
use super::loader::Record;

/// All records of one species, merged.
#[derive(Clone, Debug, PartialEq)]
pub struct SpeciesGroup {
    pub species: String,
    pub markers: Vec<String>,
    /// First non-empty attribute seen for the species.
    pub attribute: Option<String>,
    pub cluster: Option<i64>,
}

/// A laid-out tree ready to hand to the engine.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TreeGraph {
    pub nodes: Vec<SceneNode>,
    pub edges: Vec<EdgeSpec>,
}

/// Groups records by species, in first-seen order.
pub fn group_records(records: &[Record]) -> Vec<SpeciesGroup> {
    let mut groups: Vec<SpeciesGroup> = Vec::new();
    let mut index_by_species = HashMap::new();

    for record in records {
        let species = record.species.trim();
        let index = *index_by_species
            .entry(species.to_owned())
            .or_insert_with(|| {
                groups.push(SpeciesGroup {
                    species: species.to_owned(),
                    markers: Vec::new(),
                    attribute: None,
                    cluster: None,
                });
                groups.len() - 1
            });

        let group = &mut groups[index];
        if !record.genetic_marker.is_empty() {
            group.markers.push(record.genetic_marker.clone());
        }
        if group.attribute.is_none() {
            group.attribute = record
                .attribute
                .as_ref()
                .filter(|attribute| !attribute.is_empty())
                .cloned();
        }
        if group.cluster.is_none() {
            group.cluster = record.cluster;
        }
    }

    groups
}

/// Builds the species graph: one node per species, one edge per pair with a
/// finite genetic distance, positioned by a layout seeded with `seed`.
pub fn generate_tree(records: &[Record], seed: u64) -> TreeGraph {
    let groups = group_records(records);

    let mut distances = Vec::new();
    for (a, first) in groups.iter().enumerate() {
        for (offset, second) in groups[a + 1..].iter().enumerate() {
            if let Some(distance) = genetic_distance(&first.markers, &second.markers) {
                distances.push((a, a + 1 + offset, distance));
            }
        }
    }

    let max_distance = distances
        .iter()
        .map(|&(_, _, distance)| distance)
        .fold(0.0_f32, f32::max);
    let layout_edges = distances
        .iter()
        .map(|&(a, b, distance)| LayoutEdge {
            a,
            b,
            length: if max_distance > 0.0 {
                distance / max_distance
            } else {
                0.0
            },
        })
        .collect::<Vec<_>>();

    let ids = groups
        .iter()
        .map(|group| group.species.clone())
        .collect::<Vec<_>>();
    let positions = force_layout(&ids, &layout_edges, seed, DEFAULT_ITERATIONS);

    let edges = distances
        .iter()
        .map(|&(a, b, distance)| EdgeSpec::new(ids[a].clone(), ids[b].clone(), distance))
        .collect();
    let nodes = groups
        .into_iter()
        .zip(positions)
        .map(|(group, position)| {
            let mut node = SceneNode::new(group.species, position);
            if let Some(attribute) = group.attribute {
                node = node.with_attribute(attribute);
            }
            if let Some(cluster) = group.cluster {
                node = node.with_cluster(cluster);
            }
            node
        })
        .collect();

    log::debug!("generated tree with {} edges", layout_edges.len());
    TreeGraph { nodes, edges }
}
