use std::collections::{HashMap, HashSet};

use glam::Vec3;

use super::error::{EngineError, EngineResult};

pub const DEFAULT_ATTRIBUTE: &str = "default";

#[derive(Clone, Debug, PartialEq)]
pub struct SceneNode {
    pub id: String,
    pub position: Vec3,
    pub attribute: String,
    pub cluster: Option<i64>,
    pub annotations: Vec<String>,
}

impl SceneNode {
    pub fn new(id: impl Into<String>, position: Vec3) -> Self {
        Self {
            id: id.into(),
            position,
            attribute: DEFAULT_ATTRIBUTE.to_owned(),
            cluster: None,
            annotations: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = attribute.into();
        self
    }

    pub fn with_cluster(mut self, cluster: i64) -> Self {
        self.cluster = Some(cluster);
        self
    }
}

/// Edge description keyed by node ids, as handed over by the tree builder.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeSpec {
    pub a: String,
    pub b: String,
    pub weight: f32,
}

impl EdgeSpec {
    pub fn new(a: impl Into<String>, b: impl Into<String>, weight: f32) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
            weight,
        }
    }
}

/// Stored edge. Endpoints are node indices with `a < b`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneEdge {
    pub a: usize,
    pub b: usize,
    pub weight: f32,
}

/// Rendering-relevant graph state owned by the engine.
///
/// Node order is insertion order and is the order the vertex buffer is packed in.
/// Every mutation that changes the node set or a position raises `buffer_dirty`.
#[derive(Debug, Default)]
pub struct Scene {
    nodes: Vec<SceneNode>,
    edges: Vec<SceneEdge>,
    index_by_id: HashMap<String, usize>,
    highlighted: Option<String>,
    buffer_dirty: bool,
    revision: u64,
}

fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a < b { (a, b) } else { (b, a) }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[SceneEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&SceneNode> {
        self.index_by_id.get(id).map(|&index| &self.nodes[index])
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_by_id.contains_key(id)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn degree(&self, id: &str) -> usize {
        let Some(index) = self.index_of(id) else {
            return 0;
        };
        self.edges
            .iter()
            .filter(|edge| edge.a == index || edge.b == index)
            .count()
    }

    pub fn max_weight(&self) -> f32 {
        self.edges
            .iter()
            .map(|edge| edge.weight)
            .fold(0.0_f32, f32::max)
    }

    pub fn highlighted(&self) -> Option<&str> {
        self.highlighted.as_deref()
    }

    pub fn set_highlighted(&mut self, id: Option<&str>) -> EngineResult<()> {
        match id {
            Some(id) if !self.contains(id) => Err(EngineError::NotFound(id.to_owned())),
            Some(id) => {
                self.highlighted = Some(id.to_owned());
                Ok(())
            }
            None => {
                self.highlighted = None;
                Ok(())
            }
        }
    }

    pub fn is_buffer_dirty(&self) -> bool {
        self.buffer_dirty
    }

    /// Returns whether the vertex buffer needed a rebuild and clears the flag.
    pub fn take_buffer_dirty(&mut self) -> bool {
        std::mem::take(&mut self.buffer_dirty)
    }

    fn mark_geometry_changed(&mut self) {
        self.buffer_dirty = true;
        self.revision = self.revision.wrapping_add(1);
    }

    fn node_mut(&mut self, id: &str) -> EngineResult<&mut SceneNode> {
        let index = self
            .index_of(id)
            .ok_or_else(|| EngineError::NotFound(id.to_owned()))?;
        Ok(&mut self.nodes[index])
    }

    /// Adds a node, or moves it if the id already exists.
    pub fn add_node(&mut self, id: impl Into<String>, position: Vec3) {
        let id = id.into();
        if let Some(&index) = self.index_by_id.get(&id) {
            self.nodes[index].position = position;
        } else {
            self.index_by_id.insert(id.clone(), self.nodes.len());
            self.nodes.push(SceneNode::new(id, position));
        }
        self.mark_geometry_changed();
    }

    /// Removes a node and every edge touching it.
    pub fn remove_node(&mut self, id: &str) -> EngineResult<SceneNode> {
        let removed_index = self
            .index_by_id
            .remove(id)
            .ok_or_else(|| EngineError::NotFound(id.to_owned()))?;
        let removed = self.nodes.remove(removed_index);

        let shift = |index: usize| if index > removed_index { index - 1 } else { index };
        self.edges
            .retain(|edge| edge.a != removed_index && edge.b != removed_index);
        for edge in &mut self.edges {
            edge.a = shift(edge.a);
            edge.b = shift(edge.b);
        }
        for index in self.index_by_id.values_mut() {
            *index = shift(*index);
        }

        if self.highlighted.as_deref() == Some(id) {
            self.highlighted = None;
        }

        self.mark_geometry_changed();
        Ok(removed)
    }

    /// Inserts or replaces the weight of the edge between `a` and `b`.
    ///
    /// Self-loops and negative or non-finite weights are ignored; the return
    /// value says whether the edge was stored.
    pub fn add_edge(&mut self, a: &str, b: &str, weight: f32) -> EngineResult<bool> {
        let a_index = self
            .index_of(a)
            .ok_or_else(|| EngineError::NotFound(a.to_owned()))?;
        let b_index = self
            .index_of(b)
            .ok_or_else(|| EngineError::NotFound(b.to_owned()))?;
        if a_index == b_index || !usable_weight(weight) {
            return Ok(false);
        }

        let (a, b) = edge_key(a_index, b_index);
        if let Some(edge) = self.edges.iter_mut().find(|edge| edge.a == a && edge.b == b) {
            edge.weight = weight;
        } else {
            self.edges.push(SceneEdge { a, b, weight });
        }
        Ok(true)
    }

    pub fn set_attribute(&mut self, id: &str, value: impl Into<String>) -> EngineResult<()> {
        self.node_mut(id)?.attribute = value.into();
        Ok(())
    }

    pub fn set_cluster(&mut self, id: &str, cluster: Option<i64>) -> EngineResult<()> {
        self.node_mut(id)?.cluster = cluster;
        Ok(())
    }

    pub fn set_position(&mut self, id: &str, position: Vec3) -> EngineResult<()> {
        self.node_mut(id)?.position = position;
        self.mark_geometry_changed();
        Ok(())
    }

    pub fn add_annotation(&mut self, id: &str, text: impl Into<String>) -> EngineResult<()> {
        self.node_mut(id)?.annotations.push(text.into());
        Ok(())
    }

    /// Swaps in a whole new graph.
    ///
    /// Validation runs before anything is touched, so an edge naming an unknown
    /// node leaves the current graph intact. Duplicate node ids keep the first
    /// occurrence; self-loops and negative or non-finite weights are dropped.
    pub fn replace_graph(
        &mut self,
        nodes: Vec<SceneNode>,
        edges: Vec<EdgeSpec>,
    ) -> EngineResult<()> {
        let mut next_nodes = Vec::with_capacity(nodes.len());
        let mut next_index = HashMap::with_capacity(nodes.len());
        for node in nodes {
            if next_index.contains_key(&node.id) {
                log::warn!("duplicate node id {} in replacement graph, keeping the first", node.id);
                continue;
            }
            next_index.insert(node.id.clone(), next_nodes.len());
            next_nodes.push(node);
        }

        let mut seen = HashSet::with_capacity(edges.len());
        let mut next_edges = Vec::with_capacity(edges.len());
        for edge in edges {
            let a = *next_index
                .get(&edge.a)
                .ok_or_else(|| EngineError::NotFound(edge.a.clone()))?;
            let b = *next_index
                .get(&edge.b)
                .ok_or_else(|| EngineError::NotFound(edge.b.clone()))?;
            if a == b || !usable_weight(edge.weight) {
                continue;
            }
            let (a, b) = edge_key(a, b);
            if seen.insert((a, b)) {
                next_edges.push(SceneEdge {
                    a,
                    b,
                    weight: edge.weight,
                });
            }
        }

        if self
            .highlighted
            .as_ref()
            .is_some_and(|id| !next_index.contains_key(id))
        {
            self.highlighted = None;
        }

        self.nodes = next_nodes;
        self.edges = next_edges;
        self.index_by_id = next_index;
        self.mark_geometry_changed();
        log::info!(
            "scene replaced: {} nodes, {} edges",
            self.nodes.len(),
            self.edges.len()
        );
        Ok(())
    }
}

fn usable_weight(weight: f32) -> bool {
    weight.is_finite() && weight >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn two_node_scene() -> Scene {
        let mut scene = Scene::new();
        scene.add_node("A", Vec3::ZERO);
        scene.add_node("B", Vec3::new(10.0, 0.0, 0.0));
        scene.add_edge("A", "B", 3.0).unwrap();
        scene
    }

    #[test]
    fn remove_node_drops_incident_edges_and_reindexes() {
        let mut scene = two_node_scene();
        scene.add_node("C", Vec3::Y);
        scene.add_edge("B", "C", 1.0).unwrap();

        scene.remove_node("A").unwrap();

        assert_eq!(scene.node_count(), 2);
        assert_eq!(scene.edges(), &[SceneEdge { a: 0, b: 1, weight: 1.0 }]);
        assert_eq!(scene.index_of("C"), Some(1));
    }

    #[test]
    fn unknown_ids_report_not_found() {
        let mut scene = two_node_scene();
        assert!(matches!(
            scene.add_annotation("Z", "note"),
            Err(EngineError::NotFound(id)) if id == "Z"
        ));
        assert!(matches!(scene.set_attribute("Z", "x"), Err(EngineError::NotFound(_))));
        assert!(matches!(scene.remove_node("Z"), Err(EngineError::NotFound(_))));
        assert!(matches!(
            scene.set_position("Z", Vec3::ONE),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn attribute_changes_do_not_dirty_the_buffer() {
        let mut scene = two_node_scene();
        assert!(scene.take_buffer_dirty());

        scene.set_attribute("A", "mammal").unwrap();
        scene.add_annotation("A", "type specimen").unwrap();
        assert!(!scene.is_buffer_dirty());

        scene.set_position("A", Vec3::ONE).unwrap();
        assert!(scene.is_buffer_dirty());
    }

    #[test]
    fn self_loops_and_negative_weights_are_excluded() {
        let mut scene = two_node_scene();
        assert!(!scene.add_edge("A", "A", 1.0).unwrap());
        assert!(!scene.add_edge("A", "B", -1.0).unwrap());
        assert_eq!(scene.edge_count(), 1);

        scene
            .replace_graph(
                vec![SceneNode::new("X", Vec3::ZERO), SceneNode::new("Y", Vec3::ONE)],
                vec![
                    EdgeSpec::new("X", "X", 1.0),
                    EdgeSpec::new("X", "Y", -2.0),
                    EdgeSpec::new("Y", "X", 4.0),
                    EdgeSpec::new("X", "Y", 7.0),
                ],
            )
            .unwrap();
        assert_eq!(scene.edges(), &[SceneEdge { a: 0, b: 1, weight: 4.0 }]);
    }

    #[test]
    fn non_finite_weights_are_excluded() {
        let mut scene = two_node_scene();
        scene.add_node("C", Vec3::Y);
        assert!(!scene.add_edge("A", "C", f32::INFINITY).unwrap());
        assert!(!scene.add_edge("B", "C", f32::NAN).unwrap());
        assert_eq!(scene.edge_count(), 1);

        scene
            .replace_graph(
                vec![
                    SceneNode::new("X", Vec3::ZERO),
                    SceneNode::new("Y", Vec3::ONE),
                    SceneNode::new("Z", Vec3::X),
                ],
                vec![
                    EdgeSpec::new("X", "Y", f32::INFINITY),
                    EdgeSpec::new("X", "Z", 3.0),
                    EdgeSpec::new("Y", "Z", f32::NEG_INFINITY),
                ],
            )
            .unwrap();
        assert_eq!(scene.edges(), &[SceneEdge { a: 0, b: 2, weight: 3.0 }]);
        assert_eq!(scene.max_weight(), 3.0);
    }

    #[test]
    fn replace_graph_clears_missing_highlight() {
        let mut scene = two_node_scene();
        scene.set_highlighted(Some("A")).unwrap();

        scene
            .replace_graph(vec![SceneNode::new("C", Vec3::ZERO)], Vec::new())
            .unwrap();

        assert_eq!(scene.highlighted(), None);
    }

    #[test]
    fn replace_graph_keeps_surviving_highlight() {
        let mut scene = two_node_scene();
        scene.set_highlighted(Some("B")).unwrap();

        scene
            .replace_graph(vec![SceneNode::new("B", Vec3::ZERO)], Vec::new())
            .unwrap();

        assert_eq!(scene.highlighted(), Some("B"));
    }

    #[test]
    fn replace_graph_with_dangling_edge_leaves_scene_intact() {
        let mut scene = two_node_scene();
        let result = scene.replace_graph(
            vec![SceneNode::new("C", Vec3::ZERO)],
            vec![EdgeSpec::new("C", "missing", 1.0)],
        );

        assert!(matches!(result, Err(EngineError::NotFound(id)) if id == "missing"));
        assert_eq!(scene.node_count(), 2);
        assert!(scene.contains("A"));
    }

    #[test]
    fn removing_highlighted_node_clears_highlight() {
        let mut scene = two_node_scene();
        scene.set_highlighted(Some("A")).unwrap();
        scene.remove_node("A").unwrap();
        assert_eq!(scene.highlighted(), None);
    }
}
