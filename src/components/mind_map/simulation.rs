//! Force-directed layout engine.
//!
//! A velocity-Verlet simulation in the style of d3-force. Each tick cools
//! `alpha` towards `alpha_target`, lets every force add into node velocities,
//! then integrates positions. Forces:
//! - link springs pulling parent and child towards `link_distance`
//! - many-body repulsion through a Barnes-Hut [`QuadTree`]
//! - collision keeping node bodies from overlapping
//! - a weak pull towards the origin on each axis
//!
//! Nodes are owned by the graph store. The simulation borrows them for the
//! duration of a tick and resolves link endpoints to slice indices once per
//! tick, so edits made between ticks never invalidate its state.

use std::collections::HashMap;

use super::quadtree::{QuadTree, jiggle};
use super::types::{Graph, Link, Node, NodeId, NodeKind, Vec2};

/// Tunables for [`Simulation`]. Defaults reproduce the classic mind map feel.
#[derive(Clone, Debug)]
pub struct SimulationConfig {
	/// Rest length of link springs.
	pub link_distance: f64,
	/// Many-body strength; negative values repel.
	pub charge_strength: f64,
	/// Barnes-Hut accuracy. Lower is more exact.
	pub theta: f64,
	/// Collision radius of the root body.
	pub root_radius: f64,
	/// Collision radius of child bodies.
	pub child_radius: f64,
	/// How much of an overlap is resolved per tick.
	pub collide_strength: f64,
	/// Pull towards the origin, per axis.
	pub center_strength: f64,
	/// Alpha below which the layout counts as settled.
	pub alpha_min: f64,
	/// Fraction of the gap to `alpha_target` closed per tick.
	pub alpha_decay: f64,
	/// Fraction of velocity lost per tick.
	pub velocity_decay: f64,
	/// Alpha restored when the graph topology changes.
	pub reheat_alpha: f64,
	/// Alpha target held while a node is dragged.
	pub drag_alpha_target: f64,
}

impl Default for SimulationConfig {
	fn default() -> Self {
		let alpha_min: f64 = 0.001;
		Self {
			link_distance: 250.0,
			charge_strength: -800.0,
			theta: 0.9,
			root_radius: 150.0,
			child_radius: 120.0,
			collide_strength: 1.0,
			center_strength: 0.01,
			alpha_min,
			alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
			velocity_decay: 0.4,
			reheat_alpha: 0.3,
			drag_alpha_target: 0.3,
		}
	}
}

impl SimulationConfig {
	pub fn radius(&self, kind: NodeKind) -> f64 {
		match kind {
			NodeKind::Root => self.root_radius,
			NodeKind::Child => self.child_radius,
		}
	}
}

/// Cooling state and force parameters of the layout.
#[derive(Clone, Debug)]
pub struct Simulation {
	pub config: SimulationConfig,
	alpha: f64,
	alpha_target: f64,
	running: bool,
}

impl Default for Simulation {
	fn default() -> Self {
		Self::new(SimulationConfig::default())
	}
}

impl Simulation {
	pub fn new(config: SimulationConfig) -> Self {
		Self {
			config,
			alpha: 1.0,
			alpha_target: 0.0,
			running: true,
		}
	}

	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	pub fn alpha_target(&self) -> f64 {
		self.alpha_target
	}

	/// Whether ticks should keep being scheduled.
	pub fn is_running(&self) -> bool {
		self.running
	}

	/// Alpha dropped below `alpha_min` and ticking stopped.
	pub fn is_settled(&self) -> bool {
		!self.running
	}

	/// Resume ticking without touching alpha.
	pub fn restart(&mut self) {
		self.running = true;
	}

	/// Raise the temperature after the node or link set changed. Positions are
	/// kept, so the layout relaxes from where it is.
	pub fn reheat(&mut self) {
		self.alpha = self.config.reheat_alpha;
		self.restart();
	}

	/// Keep the layout responsive while a node follows the pointer.
	pub fn begin_drag(&mut self) {
		self.alpha_target = self.config.drag_alpha_target;
		self.restart();
	}

	/// Let the layout cool down again once the pointer lets go.
	pub fn end_drag(&mut self) {
		self.alpha_target = 0.0;
	}

	/// Advance the whole graph by one tick.
	pub fn step(&mut self, graph: &mut Graph) {
		self.tick(&mut graph.nodes, &graph.links);
	}

	/// Advance `nodes` by one tick under the forces implied by `links`.
	pub fn tick(&mut self, nodes: &mut [Node], links: &[Link]) {
		self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;

		let springs: Vec<(usize, usize)> = {
			let index: HashMap<&NodeId, usize> =
				nodes.iter().enumerate().map(|(i, n)| (&n.id, i)).collect();
			links
				.iter()
				.filter_map(|l| Some((*index.get(&l.source)?, *index.get(&l.target)?)))
				.collect()
		};

		self.apply_links(nodes, &springs);
		self.apply_charge(nodes);
		self.apply_collision(nodes);
		self.apply_centering(nodes);

		let keep = 1.0 - self.config.velocity_decay;
		for node in nodes.iter_mut() {
			match node.pin {
				Some(at) => {
					node.position = at;
					node.velocity = Vec2::ZERO;
				}
				None => {
					node.velocity = node.velocity * keep;
					node.position += node.velocity;
				}
			}
		}

		if self.alpha < self.config.alpha_min {
			self.running = false;
		}
	}

	fn apply_links(&self, nodes: &mut [Node], springs: &[(usize, usize)]) {
		let mut degree = vec![0usize; nodes.len()];
		for &(s, t) in springs {
			degree[s] += 1;
			degree[t] += 1;
		}

		for &(s, t) in springs {
			if s == t {
				continue;
			}
			let strength = 1.0 / degree[s].min(degree[t]) as f64;
			let bias = degree[s] as f64 / (degree[s] + degree[t]) as f64;

			let (src, tgt) = (&nodes[s], &nodes[t]);
			let mut d = (tgt.position + tgt.velocity) - (src.position + src.velocity);
			if d.x == 0.0 && d.y == 0.0 {
				d.x = jiggle(s, t);
			}
			let l = d.length();
			let pull = d * ((l - self.config.link_distance) / l * self.alpha * strength);

			nodes[t].velocity = nodes[t].velocity - pull * bias;
			nodes[s].velocity += pull * (1.0 - bias);
		}
	}

	fn apply_charge(&self, nodes: &mut [Node]) {
		let positions: Vec<Vec2> = nodes.iter().map(|n| n.position).collect();
		let tree = QuadTree::build(&positions);
		let theta2 = self.config.theta * self.config.theta;
		let scale = self.config.charge_strength * self.alpha;

		for (i, node) in nodes.iter_mut().enumerate() {
			node.velocity += tree.accumulate(i, positions[i], theta2) * scale;
		}
	}

	fn apply_collision(&self, nodes: &mut [Node]) {
		let strength = self.config.collide_strength;
		for i in 0..nodes.len() {
			let ri = self.config.radius(nodes[i].kind);
			for j in (i + 1)..nodes.len() {
				let rj = self.config.radius(nodes[j].kind);
				let reach = ri + rj;

				let mut d = (nodes[i].position + nodes[i].velocity)
					- (nodes[j].position + nodes[j].velocity);
				let mut l = d.x * d.x + d.y * d.y;
				if l >= reach * reach {
					continue;
				}
				if d.x == 0.0 && d.y == 0.0 {
					d.x = jiggle(j, i);
					l = d.x * d.x;
				}
				let l = l.sqrt();
				let push = d * ((reach - l) / l * strength);
				let share = rj * rj / (ri * ri + rj * rj);

				nodes[i].velocity += push * share;
				nodes[j].velocity = nodes[j].velocity - push * (1.0 - share);
			}
		}
	}

	fn apply_centering(&self, nodes: &mut [Node]) {
		let k = self.config.center_strength * self.alpha;
		for node in nodes.iter_mut() {
			node.velocity = node.velocity - node.position * k;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::mind_map::store::GraphStore;
	use crate::components::mind_map::types::ROOT_ID;

	fn chain_store() -> (GraphStore, NodeId, NodeId) {
		let mut store = GraphStore::new(Graph::default(), 3);
		let (a, _) = store.add_child(&NodeId::from(ROOT_ID), "A", None).unwrap();
		let (b, _) = store.add_child(&a, "B", None).unwrap();
		(store, a, b)
	}

	fn run(sim: &mut Simulation, graph: &mut Graph, ticks: usize) {
		for _ in 0..ticks {
			sim.step(graph);
		}
	}

	#[test]
	fn alpha_decays_until_settled() {
		let mut graph = Graph::default();
		let mut sim = Simulation::default();
		let mut ticks = 0;
		while sim.is_running() {
			sim.step(&mut graph);
			ticks += 1;
			assert!(ticks < 1000, "simulation never settled");
		}
		assert!(sim.alpha() < sim.config.alpha_min);
		assert!((290..=310).contains(&ticks));
	}

	#[test]
	fn reheat_keeps_positions() {
		let (mut store, a, _) = chain_store();
		let mut sim = Simulation::default();
		run(&mut sim, store.graph_mut(), 400);
		assert!(sim.is_settled());

		let before = store.node(&a).unwrap().position;
		sim.reheat();
		assert!(sim.is_running());
		assert_eq!(sim.alpha(), 0.3);
		assert_eq!(store.node(&a).unwrap().position, before);
	}

	#[test]
	fn overlapping_nodes_spread_out() {
		let (mut store, a, b) = chain_store();
		let mut sim = Simulation::default();
		run(&mut sim, store.graph_mut(), 300);

		let graph = store.graph();
		let root = graph.root().unwrap().position;
		let a = graph.node(&a).unwrap().position;
		let b = graph.node(&b).unwrap().position;
		// Collision radii sum to 270 for root/child and 240 for child/child.
		assert!(root.distance(a) > 200.0, "root/a too close: {}", root.distance(a));
		assert!(a.distance(b) > 200.0, "a/b too close: {}", a.distance(b));
		assert!(root.distance(b) > 200.0);
	}

	#[test]
	fn layout_stays_near_origin() {
		let (mut store, _, _) = chain_store();
		let mut sim = Simulation::default();
		run(&mut sim, store.graph_mut(), 300);
		for node in &store.graph().nodes {
			assert!(node.position.length() < 2000.0, "{} drifted", node.id);
			assert!(node.position.x.is_finite() && node.position.y.is_finite());
		}
	}

	#[test]
	fn pinned_node_follows_pin() {
		let (mut store, a, _) = chain_store();
		let mut sim = Simulation::default();
		let target = Vec2::new(400.0, -300.0);
		store.node_mut(&a).unwrap().pin(target);
		run(&mut sim, store.graph_mut(), 5);

		let node = store.node(&a).unwrap();
		assert_eq!(node.position, target);
		assert_eq!(node.velocity, Vec2::ZERO);
	}

	#[test]
	fn drag_and_release_leaves_node_free_near_drop_point() {
		let (mut store, a, b) = chain_store();
		let mut sim = Simulation::default();
		run(&mut sim, store.graph_mut(), 300);

		let drop = Vec2::new(600.0, 450.0);
		sim.begin_drag();
		store.node_mut(&a).unwrap().pin(Vec2::new(300.0, 200.0));
		run(&mut sim, store.graph_mut(), 10);
		store.node_mut(&a).unwrap().pin(drop);
		run(&mut sim, store.graph_mut(), 10);
		assert!(sim.alpha() > 0.05, "drag should keep the layout warm");

		store.node_mut(&a).unwrap().unpin();
		sim.end_drag();
		let b_before = store.node(&b).unwrap().position;
		sim.step(store.graph_mut());

		let node = store.node(&a).unwrap();
		assert!(node.pin.is_none());
		assert!(node.position.distance(drop) < 60.0);
		assert_ne!(store.node(&b).unwrap().position, b_before);
		assert!(sim.is_running());
	}

	#[test]
	fn dangling_links_are_ignored() {
		let mut graph = Graph::default();
		graph
			.links
			.push(Link::new(NodeId::from(ROOT_ID), NodeId::from("ghost")));
		let mut sim = Simulation::default();
		run(&mut sim, &mut graph, 10);
		assert!(graph.nodes[0].position.length() < 1e-9);
	}
}
