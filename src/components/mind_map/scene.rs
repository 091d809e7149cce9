//! Retained scene kept in step with the graph.
//!
//! The canvas has no element tree of its own, so the scene plays that role:
//! one visual per node and per link, keyed by entity id. Each simulation tick
//! [`Scene::reconcile`] walks the current graph and
//! - creates visuals for entities it has not seen yet (enter),
//! - moves every surviving visual and restyles it only when its colour,
//!   label or image changed (update),
//! - drops visuals whose entity is gone (exit).
//!
//! Painting reads the scene only, links first so node bodies cover them.

use std::collections::{HashMap, HashSet};

use super::theme::Dimensions;
use super::types::{DEFAULT_COLOR, Graph, LinkId, Node, NodeId, NodeKind, Vec2};

/// Silhouette of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
	/// The root: a heart.
	Heart,
	/// Everyone else: a rectangular card.
	Card,
}

impl Shape {
	pub fn for_kind(kind: NodeKind) -> Self {
		match kind {
			NodeKind::Root => Shape::Heart,
			NodeKind::Child => Shape::Card,
		}
	}

	/// Whether `local` (relative to the node centre) lies on the shape.
	pub fn contains(self, local: Vec2, dims: &Dimensions) -> bool {
		match self {
			Shape::Heart => {
				// Bounding box of the heart outline: 120 wide, from -50 to +70.
				let s = dims.root_size / 120.0;
				local.x.abs() <= 60.0 * s && local.y >= -50.0 * s && local.y <= 70.0 * s
			}
			Shape::Card => {
				local.x.abs() <= dims.child_width / 2.0 && local.y.abs() <= dims.child_height / 2.0
			}
		}
	}
}

/// How the text label relates to the node picture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelMode {
	/// No picture: text straight on the node body.
	Plain,
	/// Root with a picture: the picture replaces the text.
	Hidden,
	/// Child with a picture: text on a panel above the picture.
	Overlay,
}

impl LabelMode {
	fn for_node(node: &Node) -> Self {
		match (node.kind, node.image.is_some()) {
			(_, false) => LabelMode::Plain,
			(NodeKind::Root, true) => LabelMode::Hidden,
			(NodeKind::Child, true) => LabelMode::Overlay,
		}
	}
}

/// Drawable state of one node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeVisual {
	pub id: NodeId,
	pub shape: Shape,
	pub position: Vec2,
	pub fill: String,
	pub label: String,
	pub image: Option<String>,
	pub label_mode: LabelMode,
}

impl NodeVisual {
	fn enter(node: &Node) -> Self {
		Self {
			id: node.id.clone(),
			shape: Shape::for_kind(node.kind),
			position: node.position,
			fill: fill_of(node),
			label: node.label.clone(),
			image: node.image.clone(),
			label_mode: LabelMode::for_node(node),
		}
	}

	/// Apply the node's current state. Returns whether any style changed.
	fn update(&mut self, node: &Node) -> bool {
		self.position = node.position;

		let mut restyled = false;
		let fill = node.color.as_deref().unwrap_or(DEFAULT_COLOR);
		if self.fill != fill {
			self.fill = fill.to_string();
			restyled = true;
		}
		if self.label != node.label {
			self.label = node.label.clone();
			restyled = true;
		}
		if self.image != node.image {
			self.image = node.image.clone();
			restyled = true;
		}
		let mode = LabelMode::for_node(node);
		if self.label_mode != mode {
			self.label_mode = mode;
			restyled = true;
		}
		restyled
	}
}

fn fill_of(node: &Node) -> String {
	node.color.as_deref().unwrap_or(DEFAULT_COLOR).to_string()
}

/// Drawable state of one link: a straight segment between node centres.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkVisual {
	pub id: LinkId,
	pub from: Vec2,
	pub to: Vec2,
}

/// Enter/update/exit counts of one reconciliation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Changes {
	pub entered: usize,
	/// Visuals whose style (not just position) changed.
	pub updated: usize,
	pub exited: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileStats {
	pub nodes: Changes,
	pub links: Changes,
}

/// Keyed set of visuals mirroring the graph.
#[derive(Debug, Default)]
pub struct Scene {
	nodes: HashMap<NodeId, NodeVisual>,
	links: HashMap<LinkId, LinkVisual>,
	node_order: Vec<NodeId>,
	link_order: Vec<LinkId>,
}

impl Scene {
	pub fn new() -> Self {
		Self::default()
	}

	/// Bring the scene in line with `graph`.
	pub fn reconcile(&mut self, graph: &Graph) -> ReconcileStats {
		let mut stats = ReconcileStats::default();

		let live: HashSet<&NodeId> = graph.nodes.iter().map(|n| &n.id).collect();
		let before = self.nodes.len();
		self.nodes.retain(|id, _| live.contains(id));
		stats.nodes.exited = before - self.nodes.len();

		self.node_order.clear();
		for node in &graph.nodes {
			match self.nodes.get_mut(&node.id) {
				Some(visual) => {
					if visual.update(node) {
						stats.nodes.updated += 1;
					}
				}
				None => {
					self.nodes.insert(node.id.clone(), NodeVisual::enter(node));
					stats.nodes.entered += 1;
				}
			}
			self.node_order.push(node.id.clone());
		}

		let positions: HashMap<&NodeId, Vec2> =
			graph.nodes.iter().map(|n| (&n.id, n.position)).collect();
		let drawable: Vec<(&LinkId, Vec2, Vec2)> = graph
			.links
			.iter()
			.filter_map(|l| Some((&l.id, *positions.get(&l.source)?, *positions.get(&l.target)?)))
			.collect();

		let live: HashSet<&LinkId> = drawable.iter().map(|(id, _, _)| *id).collect();
		let before = self.links.len();
		self.links.retain(|id, _| live.contains(id));
		stats.links.exited = before - self.links.len();

		self.link_order.clear();
		for (id, from, to) in drawable {
			match self.links.get_mut(id) {
				Some(visual) => {
					visual.from = from;
					visual.to = to;
				}
				None => {
					self.links.insert(
						id.clone(),
						LinkVisual {
							id: id.clone(),
							from,
							to,
						},
					);
					stats.links.entered += 1;
				}
			}
			self.link_order.push(id.clone());
		}

		stats
	}

	/// Node visuals in paint order.
	pub fn nodes(&self) -> impl Iterator<Item = &NodeVisual> {
		self.node_order.iter().filter_map(|id| self.nodes.get(id))
	}

	/// Link visuals in paint order.
	pub fn links(&self) -> impl Iterator<Item = &LinkVisual> {
		self.link_order.iter().filter_map(|id| self.links.get(id))
	}

	pub fn node(&self, id: &NodeId) -> Option<&NodeVisual> {
		self.nodes.get(id)
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Topmost node under `point` (graph space).
	pub fn node_at(&self, point: Vec2, dims: &Dimensions) -> Option<&NodeId> {
		self.node_order.iter().rev().find(|id| {
			self.nodes
				.get(*id)
				.is_some_and(|v| v.shape.contains(point - v.position, dims))
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::mind_map::store::GraphStore;
	use crate::components::mind_map::theme::Theme;
	use crate::components::mind_map::types::ROOT_ID;

	fn root() -> NodeId {
		NodeId::from(ROOT_ID)
	}

	#[test]
	fn first_pass_enters_everything() {
		let mut store = GraphStore::new(Graph::default(), 1);
		let (a, _) = store.add_child(&root(), "A", None).unwrap();
		let mut scene = Scene::new();

		let stats = scene.reconcile(store.graph());
		assert_eq!(stats.nodes.entered, 2);
		assert_eq!(stats.links.entered, 1);
		assert_eq!(scene.node(&root()).unwrap().shape, Shape::Heart);
		assert_eq!(scene.node(&a).unwrap().shape, Shape::Card);
	}

	#[test]
	fn moving_nodes_is_not_a_restyle() {
		let mut store = GraphStore::new(Graph::default(), 1);
		let (a, _) = store.add_child(&root(), "A", None).unwrap();
		let mut scene = Scene::new();
		scene.reconcile(store.graph());

		store.node_mut(&a).unwrap().position = Vec2::new(90.0, 10.0);
		let stats = scene.reconcile(store.graph());

		assert_eq!(stats, ReconcileStats::default());
		assert_eq!(scene.node(&a).unwrap().position, Vec2::new(90.0, 10.0));
		let link = scene.links().next().unwrap();
		assert_eq!(link.to, Vec2::new(90.0, 10.0));
	}

	#[test]
	fn edits_restyle_only_the_edited_node() {
		let mut store = GraphStore::new(Graph::default(), 1);
		let (a, _) = store.add_child(&root(), "A", None).unwrap();
		store.add_child(&root(), "B", None).unwrap();
		let mut scene = Scene::new();
		scene.reconcile(store.graph());

		store.update_node(&a, "A!", Some("data:image/png;base64,AAAA".into()), Some("#00ff00".into()));
		let stats = scene.reconcile(store.graph());

		assert_eq!(stats.nodes.updated, 1);
		let visual = scene.node(&a).unwrap();
		assert_eq!(visual.label, "A!");
		assert_eq!(visual.fill, "#00ff00");
		assert_eq!(visual.label_mode, LabelMode::Overlay);
	}

	#[test]
	fn root_label_hides_behind_its_picture() {
		let mut store = GraphStore::new(Graph::default(), 1);
		store.update_node(&root(), "MY PARTNER", Some("blob:xyz".into()), None);
		let mut scene = Scene::new();
		scene.reconcile(store.graph());

		let visual = scene.node(&root()).unwrap();
		assert_eq!(visual.label_mode, LabelMode::Hidden);
		assert_eq!(visual.fill, DEFAULT_COLOR);
	}

	#[test]
	fn deleted_subtree_exits() {
		let mut store = GraphStore::new(Graph::default(), 1);
		let (a, _) = store.add_child(&root(), "A", None).unwrap();
		store.add_child(&a, "B", None).unwrap();
		let mut scene = Scene::new();
		scene.reconcile(store.graph());

		store.delete_subtree(&a).unwrap();
		let stats = scene.reconcile(store.graph());

		assert_eq!(stats.nodes.exited, 2);
		assert_eq!(stats.links.exited, 2);
		assert_eq!(scene.len(), 1);
		assert_eq!(scene.links().count(), 0);
	}

	#[test]
	fn paint_order_follows_the_graph() {
		let mut store = GraphStore::new(Graph::default(), 1);
		let (a, _) = store.add_child(&root(), "A", None).unwrap();
		let (b, _) = store.add_child(&root(), "B", None).unwrap();
		let mut scene = Scene::new();
		scene.reconcile(store.graph());

		let order: Vec<_> = scene.nodes().map(|v| v.id.clone()).collect();
		assert_eq!(order, vec![root(), a, b]);
	}

	#[test]
	fn hit_test_prefers_topmost_node() {
		let dims = Theme::default().dimensions;
		let mut store = GraphStore::new(Graph::default(), 1);
		let (a, _) = store.add_child(&root(), "A", None).unwrap();
		store.node_mut(&a).unwrap().position = Vec2::new(40.0, 0.0);
		let mut scene = Scene::new();
		scene.reconcile(store.graph());

		assert_eq!(scene.node_at(Vec2::new(30.0, 0.0), &dims), Some(&a));
		assert_eq!(scene.node_at(Vec2::new(-55.0, 60.0), &dims), Some(&root()));
		assert_eq!(scene.node_at(Vec2::new(500.0, 500.0), &dims), None);
	}
}
