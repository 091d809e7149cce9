//! Authoritative graph state and its mutations.
//!
//! Every successful mutation bumps [`GraphStore::revision`], which the canvas
//! loop watches to schedule a save. Changes to nodes or links also bump
//! [`GraphStore::layout_revision`], which reheats the simulation and reconciles
//! the scene. The partner name is not part of the layout. An operation naming
//! an unknown node is a silent no-op and leaves both counters alone.

use std::collections::HashSet;

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::types::{DEFAULT_COLOR, Graph, Link, LinkId, Node, NodeId, NodeKind, Vec2};

/// Half-width of the square around the parent a new child spawns in.
pub const SPAWN_JITTER: f64 = 25.0;

/// Label given to nodes created from the context menu.
pub const NEW_NODE_LABEL: &str = "New Memory";

/// Milliseconds since the Unix epoch, used to mint node ids.
#[cfg(target_arch = "wasm32")]
fn now_ms() -> u64 {
	js_sys::Date::now() as u64
}

#[cfg(not(target_arch = "wasm32"))]
fn now_ms() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_millis() as u64)
		.unwrap_or_default()
}

/// Owns the graph and applies add/update/delete operations to it.
pub struct GraphStore {
	graph: Graph,
	rng: StdRng,
	revision: u64,
	layout_revision: u64,
}

impl GraphStore {
	/// Wrap `graph`; `seed` drives spawn jitter.
	pub fn new(graph: Graph, seed: u64) -> Self {
		Self {
			graph,
			rng: StdRng::seed_from_u64(seed),
			revision: 0,
			layout_revision: 0,
		}
	}

	pub fn graph(&self) -> &Graph {
		&self.graph
	}

	/// Mutable access for the simulation, which only moves nodes around.
	/// Does not bump the revision.
	pub fn graph_mut(&mut self) -> &mut Graph {
		&mut self.graph
	}

	pub fn node(&self, id: &NodeId) -> Option<&Node> {
		self.graph.node(id)
	}

	pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
		self.graph.node_mut(id)
	}

	/// Bumped by node, link and partner-name changes.
	pub fn revision(&self) -> u64 {
		self.revision
	}

	/// Bumped by node and link changes only.
	pub fn layout_revision(&self) -> u64 {
		self.layout_revision
	}

	fn touch(&mut self) {
		self.revision += 1;
	}

	fn touch_layout(&mut self) {
		self.layout_revision += 1;
		self.touch();
	}

	fn mint_id(&self) -> NodeId {
		let base = format!("node-{}", now_ms());
		let mut id = NodeId(base.clone());
		let mut n = 1;
		while self.graph.contains(&id) {
			id = NodeId(format!("{}-{}", base, n));
			n += 1;
		}
		id
	}

	/// Attach a new child under `parent_id`, spawned next to the parent.
	///
	/// Returns `None` when the parent does not exist.
	pub fn add_child(
		&mut self,
		parent_id: &NodeId,
		label: &str,
		color: Option<&str>,
	) -> Option<(NodeId, LinkId)> {
		let Some(parent) = self.graph.node(parent_id) else {
			debug!("partner-graph: add_child on unknown node {}", parent_id);
			return None;
		};
		let origin = parent.position;
		let jitter = Vec2::new(
			self.rng.gen_range(-SPAWN_JITTER..SPAWN_JITTER),
			self.rng.gen_range(-SPAWN_JITTER..SPAWN_JITTER),
		);

		let id = self.mint_id();
		let mut node = Node::new(id.clone(), label, NodeKind::Child, origin + jitter);
		node.color = Some(color.unwrap_or(DEFAULT_COLOR).to_string());
		let link = Link::new(parent_id.clone(), id.clone());
		let link_id = link.id.clone();

		self.graph.nodes.push(node);
		self.graph.links.push(link);
		self.touch_layout();
		Some((id, link_id))
	}

	/// Replace the editable fields of a node in place.
	pub fn update_node(
		&mut self,
		node_id: &NodeId,
		label: &str,
		image: Option<String>,
		color: Option<String>,
	) -> bool {
		let Some(node) = self.graph.node_mut(node_id) else {
			debug!("partner-graph: update_node on unknown node {}", node_id);
			return false;
		};
		node.label = label.to_string();
		node.image = image;
		node.color = color;
		self.touch_layout();
		true
	}

	/// Every id reachable from `node_id` through parent → child links,
	/// `node_id` included. Empty when the node does not exist.
	pub fn descendants(&self, node_id: &NodeId) -> HashSet<NodeId> {
		let mut visited = HashSet::new();
		if !self.graph.contains(node_id) {
			return visited;
		}

		let mut stack = vec![node_id.clone()];
		while let Some(current) = stack.pop() {
			if !visited.insert(current.clone()) {
				continue;
			}
			for child in self.graph.children(&current) {
				if !visited.contains(child) {
					stack.push(child.clone());
				}
			}
		}
		visited
	}

	/// Remove `node_id`, everything below it and every link touching the
	/// removed nodes. The root cannot be deleted.
	pub fn delete_subtree(&mut self, node_id: &NodeId) -> Option<HashSet<NodeId>> {
		match self.graph.node(node_id) {
			None => {
				debug!("partner-graph: delete_subtree on unknown node {}", node_id);
				return None;
			}
			Some(node) if node.is_root() => {
				debug!("partner-graph: refusing to delete the root");
				return None;
			}
			Some(_) => {}
		}

		let doomed = self.descendants(node_id);
		self.graph.nodes.retain(|n| !doomed.contains(&n.id));
		self.graph
			.links
			.retain(|l| !doomed.contains(&l.source) && !doomed.contains(&l.target));
		self.touch_layout();
		Some(doomed)
	}

	pub fn set_partner_name(&mut self, name: &str) {
		if self.graph.partner_name != name {
			self.graph.partner_name = name.to_string();
			self.touch();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::mind_map::types::ROOT_ID;

	fn root() -> NodeId {
		NodeId::from(ROOT_ID)
	}

	fn store() -> GraphStore {
		GraphStore::new(Graph::default(), 7)
	}

	fn link_pairs(graph: &Graph) -> Vec<(String, String)> {
		graph
			.links
			.iter()
			.map(|l| (l.source.0.clone(), l.target.0.clone()))
			.collect()
	}

	#[test]
	fn add_child_links_to_parent_and_spawns_nearby() {
		let mut store = store();
		let (id, link_id) = store.add_child(&root(), "A", None).expect("root exists");

		let node = store.node(&id).unwrap();
		assert_eq!(node.kind, NodeKind::Child);
		assert_eq!(node.label, "A");
		assert_eq!(node.color.as_deref(), Some(DEFAULT_COLOR));
		assert!(node.position.x.abs() <= SPAWN_JITTER);
		assert!(node.position.y.abs() <= SPAWN_JITTER);

		assert_eq!(link_id, LinkId::between(&root(), &id));
		assert_eq!(link_pairs(store.graph()), vec![(ROOT_ID.to_string(), id.0.clone())]);
		assert_eq!(store.revision(), 1);
	}

	#[test]
	fn add_child_mints_unique_ids_within_the_same_millisecond() {
		let mut store = store();
		let (a, _) = store.add_child(&root(), "A", None).unwrap();
		let (b, _) = store.add_child(&root(), "B", None).unwrap();
		let (c, _) = store.add_child(&root(), "C", None).unwrap();
		assert_ne!(a, b);
		assert_ne!(b, c);
		assert_ne!(a, c);
	}

	#[test]
	fn add_child_to_unknown_parent_is_a_no_op() {
		let mut store = store();
		let before = store.graph().clone();
		assert!(store.add_child(&NodeId::from("ghost"), "A", None).is_none());
		assert_eq!(store.graph(), &before);
		assert_eq!(store.revision(), 0);
	}

	#[test]
	fn add_then_delete_restores_previous_sets() {
		let mut store = store();
		store.add_child(&root(), "A", None).unwrap();
		let before = store.graph().clone();

		let (id, _) = store.add_child(&root(), "B", Some("#ff00ff")).unwrap();
		store.delete_subtree(&id).unwrap();

		assert_eq!(store.graph(), &before);
	}

	#[test]
	fn delete_removes_whole_subtree_and_its_links() {
		let mut store = store();
		let (a, _) = store.add_child(&root(), "A", None).unwrap();
		let (b, _) = store.add_child(&a, "B", None).unwrap();
		let (c, _) = store.add_child(&b, "C", None).unwrap();
		let (d, _) = store.add_child(&root(), "D", None).unwrap();

		let removed = store.delete_subtree(&a).unwrap();
		assert_eq!(removed, HashSet::from([a, b, c]));

		let ids: Vec<_> = store.graph().nodes.iter().map(|n| n.id.clone()).collect();
		assert_eq!(ids, vec![root(), d.clone()]);
		assert_eq!(link_pairs(store.graph()), vec![(ROOT_ID.to_string(), d.0)]);
		for link in &store.graph().links {
			assert!(store.graph().contains(&link.source));
			assert!(store.graph().contains(&link.target));
		}
	}

	#[test]
	fn root_cannot_be_deleted() {
		let mut store = store();
		store.add_child(&root(), "A", None).unwrap();
		let before = store.graph().clone();

		assert!(store.delete_subtree(&root()).is_none());
		assert_eq!(store.graph(), &before);
		assert!(store.graph().root().is_some());
	}

	#[test]
	fn delete_unknown_node_is_a_no_op() {
		let mut store = store();
		assert!(store.delete_subtree(&NodeId::from("ghost")).is_none());
		assert_eq!(store.revision(), 0);
	}

	#[test]
	fn traversal_terminates_on_cycles_and_shared_children() {
		let mut store = store();
		let (a, _) = store.add_child(&root(), "A", None).unwrap();
		let (b, _) = store.add_child(&a, "B", None).unwrap();
		let (c, _) = store.add_child(&a, "C", None).unwrap();
		// b -> a closes a cycle, c -> b gives b a second parent.
		store.graph_mut().links.push(Link::new(b.clone(), a.clone()));
		store.graph_mut().links.push(Link::new(c.clone(), b.clone()));

		assert_eq!(store.descendants(&a), HashSet::from([a.clone(), b, c]));
		store.delete_subtree(&a).unwrap();
		assert_eq!(store.graph().nodes.len(), 1);
		assert!(store.graph().links.is_empty());
	}

	#[test]
	fn scenario_build_chain_then_delete_it() {
		let mut store = store();
		let (a, _) = store.add_child(&root(), "A", None).unwrap();
		let (b, _) = store.add_child(&a, "B", None).unwrap();
		assert_eq!(
			link_pairs(store.graph()),
			vec![
				(ROOT_ID.to_string(), a.0.clone()),
				(a.0.clone(), b.0.clone())
			]
		);

		store.delete_subtree(&a).unwrap();
		assert_eq!(store.graph().nodes.len(), 1);
		assert!(store.graph().nodes[0].is_root());
		assert!(store.graph().links.is_empty());
	}

	#[test]
	fn update_root_keeps_identity_position_and_links() {
		let mut store = store();
		let (a, _) = store.add_child(&root(), "A", None).unwrap();
		store.node_mut(&root()).unwrap().position = Vec2::new(12.0, -4.0);
		store.node_mut(&root()).unwrap().pin(Vec2::new(12.0, -4.0));
		let links_before = store.graph().links.clone();

		assert!(store.update_node(&root(), "X", None, Some("#ff0000".into())));

		let root_node = store.node(&root()).unwrap();
		assert_eq!(root_node.id, root());
		assert_eq!(root_node.label, "X");
		assert_eq!(root_node.color.as_deref(), Some("#ff0000"));
		assert_eq!(root_node.position, Vec2::new(12.0, -4.0));
		assert_eq!(root_node.pin, Some(Vec2::new(12.0, -4.0)));
		assert_eq!(store.graph().links, links_before);
		assert!(store.graph().contains(&a));
	}

	#[test]
	fn update_unknown_node_is_a_no_op() {
		let mut store = store();
		assert!(!store.update_node(&NodeId::from("ghost"), "X", None, None));
		assert_eq!(store.revision(), 0);
	}

	#[test]
	fn node_edits_bump_both_counters() {
		let mut store = store();
		assert!(store.update_node(&NodeId::from(ROOT_ID), "US", None, None));
		assert_eq!(store.revision(), 1);
		assert_eq!(store.layout_revision(), 1);
	}

	#[test]
	fn partner_name_only_bumps_revision_on_change() {
		let mut store = store();
		store.set_partner_name("Sam");
		store.set_partner_name("Sam");
		assert_eq!(store.graph().partner_name, "Sam");
		assert_eq!(store.revision(), 1);
		assert_eq!(store.layout_revision(), 0);
	}
}
