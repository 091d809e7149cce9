//! Graph data structures shared by the store, the simulation and the scene.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub};

/// A 2D point or displacement in graph space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
	pub x: f64,
	pub y: f64,
}

impl Vec2 {
	pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	pub fn length(self) -> f64 {
		(self.x * self.x + self.y * self.y).sqrt()
	}

	pub fn distance(self, other: Vec2) -> f64 {
		(self - other).length()
	}
}

impl Add for Vec2 {
	type Output = Vec2;

	fn add(self, rhs: Vec2) -> Vec2 {
		Vec2::new(self.x + rhs.x, self.y + rhs.y)
	}
}

impl AddAssign for Vec2 {
	fn add_assign(&mut self, rhs: Vec2) {
		self.x += rhs.x;
		self.y += rhs.y;
	}
}

impl Sub for Vec2 {
	type Output = Vec2;

	fn sub(self, rhs: Vec2) -> Vec2 {
		Vec2::new(self.x - rhs.x, self.y - rhs.y)
	}
}

impl Mul<f64> for Vec2 {
	type Output = Vec2;

	fn mul(self, rhs: f64) -> Vec2 {
		Vec2::new(self.x * rhs, self.y * rhs)
	}
}

/// Stable identifier of a node. Survives edits and reloads.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub String);

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for NodeId {
	fn from(s: &str) -> Self {
		NodeId(s.to_string())
	}
}

/// Identifier of a link, derived from its endpoint pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub String);

impl LinkId {
	/// `"<source>-<target>"`, the format saved snapshots already use.
	pub fn between(source: &NodeId, target: &NodeId) -> Self {
		LinkId(format!("{}-{}", source, target))
	}
}

impl fmt::Display for LinkId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Whether a node is the single root or one of its descendants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
	Root,
	Child,
}

/// A node of the mind map.
///
/// `position`, `velocity` and `pin` belong to the simulation; the remaining
/// fields are edited through the store. Both sides mutate the same record in
/// place, so an edit never resets layout state.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
	pub id: NodeId,
	pub label: String,
	pub kind: NodeKind,
	/// Data URI or URL of the node picture.
	pub image: Option<String>,
	/// CSS colour of the node body.
	pub color: Option<String>,
	pub position: Vec2,
	pub velocity: Vec2,
	/// Forced position while the node is dragged.
	pub pin: Option<Vec2>,
}

impl Node {
	pub fn new(id: NodeId, label: impl Into<String>, kind: NodeKind, position: Vec2) -> Self {
		Self {
			id,
			label: label.into(),
			kind,
			image: None,
			color: None,
			position,
			velocity: Vec2::ZERO,
			pin: None,
		}
	}

	pub fn is_root(&self) -> bool {
		self.kind == NodeKind::Root
	}

	pub fn pin(&mut self, at: Vec2) {
		self.pin = Some(at);
	}

	pub fn unpin(&mut self) {
		self.pin = None;
	}
}

/// A directed parent → child edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
	pub id: LinkId,
	pub source: NodeId,
	pub target: NodeId,
}

impl Link {
	pub fn new(source: NodeId, target: NodeId) -> Self {
		Self {
			id: LinkId::between(&source, &target),
			source,
			target,
		}
	}
}

/// Id of the root node in a fresh graph.
pub const ROOT_ID: &str = "root";
/// Label of the root node in a fresh graph.
pub const ROOT_LABEL: &str = "MY PARTNER";
/// Body colour given to new nodes.
pub const DEFAULT_COLOR: &str = "#ffffff";

/// Complete mind map: nodes, links and the partner's name.
#[derive(Clone, Debug, PartialEq)]
pub struct Graph {
	pub nodes: Vec<Node>,
	pub links: Vec<Link>,
	pub partner_name: String,
}

impl Default for Graph {
	/// A lone root at the origin.
	fn default() -> Self {
		let mut root = Node::new(ROOT_ID.into(), ROOT_LABEL, NodeKind::Root, Vec2::ZERO);
		root.color = Some(DEFAULT_COLOR.to_string());
		Self {
			nodes: vec![root],
			links: Vec::new(),
			partner_name: String::new(),
		}
	}
}

impl Graph {
	pub fn node(&self, id: &NodeId) -> Option<&Node> {
		self.nodes.iter().find(|n| &n.id == id)
	}

	pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
		self.nodes.iter_mut().find(|n| &n.id == id)
	}

	pub fn contains(&self, id: &NodeId) -> bool {
		self.node(id).is_some()
	}

	pub fn root(&self) -> Option<&Node> {
		self.nodes.iter().find(|n| n.is_root())
	}

	/// Ids of the direct children of `id`.
	pub fn children<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a NodeId> + 'a {
		self.links
			.iter()
			.filter(move |l| &l.source == id)
			.map(|l| &l.target)
	}
}
