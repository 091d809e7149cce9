//! Saving and restoring the mind map.
//!
//! The graph is written as a JSON snapshot under a fixed `localStorage` key.
//! Loading never fails: anything missing or unreadable falls back to the
//! default single-root graph. Saves are debounced so a burst of edits turns
//! into a single write.

use std::cell::RefCell;
use std::collections::HashSet;
use std::f64::consts::PI;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{Graph, Link, LinkId, Node, NodeId, NodeKind, Vec2};

/// Key the snapshot lives under in `localStorage`.
pub const STORAGE_KEY: &str = "architecture_of_love_data";

/// Quiet time after the last change before a snapshot is written.
pub const SAVE_DELAY_MS: f64 = 1000.0;

/// Failures talking to the snapshot storage.
#[derive(Debug, Error)]
pub enum PersistError {
	#[error("storage is not available: {0}")]
	Unavailable(String),
	#[error("failed to read snapshot: {0}")]
	Read(String),
	#[error("failed to write snapshot: {0}")]
	Write(String),
	#[error("snapshot is not valid JSON: {0}")]
	Parse(#[from] serde_json::Error),
	#[error("snapshot has {0} root nodes, expected exactly one")]
	Roots(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum KindRecord {
	Root,
	Child,
}

impl From<NodeKind> for KindRecord {
	fn from(kind: NodeKind) -> Self {
		match kind {
			NodeKind::Root => KindRecord::Root,
			NodeKind::Child => KindRecord::Child,
		}
	}
}

impl From<KindRecord> for NodeKind {
	fn from(kind: KindRecord) -> Self {
		match kind {
			KindRecord::Root => NodeKind::Root,
			KindRecord::Child => NodeKind::Child,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeRecord {
	id: String,
	#[serde(default)]
	label: String,
	#[serde(rename = "type")]
	kind: KindRecord,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	image_url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	background_color: Option<String>,
	#[serde(default)]
	x: Option<f64>,
	#[serde(default)]
	y: Option<f64>,
	#[serde(default)]
	fx: Option<f64>,
	#[serde(default)]
	fy: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct LinkRecord {
	#[serde(default)]
	id: Option<String>,
	source: String,
	target: String,
}

/// On-disk form of a [`Graph`]. Link endpoints are plain ids.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
	#[serde(default)]
	nodes: Option<Vec<NodeRecord>>,
	#[serde(default)]
	links: Option<Vec<LinkRecord>>,
	#[serde(default)]
	partner_name: Option<String>,
}

impl Snapshot {
	pub fn capture(graph: &Graph) -> Self {
		let nodes = graph
			.nodes
			.iter()
			.map(|n| NodeRecord {
				id: n.id.0.clone(),
				label: n.label.clone(),
				kind: n.kind.into(),
				image_url: n.image.clone(),
				background_color: n.color.clone(),
				x: Some(n.position.x),
				y: Some(n.position.y),
				fx: n.pin.map(|p| p.x),
				fy: n.pin.map(|p| p.y),
			})
			.collect();
		let links = graph
			.links
			.iter()
			.map(|l| LinkRecord {
				id: Some(l.id.0.clone()),
				source: l.source.0.clone(),
				target: l.target.0.clone(),
			})
			.collect();
		Self {
			nodes: Some(nodes),
			links: Some(links),
			partner_name: Some(graph.partner_name.clone()),
		}
	}

	pub fn to_json(&self) -> Result<String, PersistError> {
		Ok(serde_json::to_string(self)?)
	}

	pub fn from_json(json: &str) -> Result<Self, PersistError> {
		Ok(serde_json::from_str(json)?)
	}

	/// Rebuild a graph. Missing node or link lists fall back to the default
	/// ones, links with unknown endpoints are dropped and nodes without a
	/// saved position are laid out on a spiral around the origin.
	pub fn restore(self) -> Result<Graph, PersistError> {
		let fallback = Graph::default();

		let nodes = match self.nodes {
			Some(records) => {
				let mut seen = HashSet::new();
				records
					.into_iter()
					.filter(|r| seen.insert(r.id.clone()))
					.enumerate()
					.map(|(i, r)| restore_node(i, r))
					.collect()
			}
			None => fallback.nodes,
		};

		let roots = nodes.iter().filter(|n: &&Node| n.is_root()).count();
		if roots != 1 {
			return Err(PersistError::Roots(roots));
		}

		let ids: HashSet<&NodeId> = nodes.iter().map(|n| &n.id).collect();
		let mut seen_links = HashSet::new();
		let links = self
			.links
			.unwrap_or_default()
			.into_iter()
			.filter_map(|r| {
				let (source, target) = (NodeId(r.source), NodeId(r.target));
				if !ids.contains(&source) || !ids.contains(&target) {
					debug!("partner-graph: dropping dangling link {}-{}", source, target);
					return None;
				}
				let id = r.id.map(LinkId).unwrap_or_else(|| LinkId::between(&source, &target));
				if !seen_links.insert(id.clone()) {
					debug!("partner-graph: dropping duplicate link {}", id);
					return None;
				}
				Some(Link { id, source, target })
			})
			.collect();

		Ok(Graph {
			nodes,
			links,
			partner_name: self.partner_name.unwrap_or_default(),
		})
	}
}

/// Starting point of the `i`-th node without a saved position, on the same
/// phyllotaxis spiral d3 seeds fresh nodes on.
fn spiral(i: usize) -> Vec2 {
	let radius = 10.0 * (0.5 + i as f64).sqrt();
	let angle = i as f64 * PI * (3.0 - 5f64.sqrt());
	Vec2::new(radius * angle.cos(), radius * angle.sin())
}

fn restore_node(i: usize, r: NodeRecord) -> Node {
	// A saved pin is only a drag caught mid-flight; it seeds the position.
	let position = match (r.fx.or(r.x), r.fy.or(r.y)) {
		(Some(x), Some(y)) if x.is_finite() && y.is_finite() => Vec2::new(x, y),
		_ => spiral(i),
	};
	let mut node = Node::new(NodeId(r.id), r.label, r.kind.into(), position);
	node.image = r.image_url.filter(|s| !s.is_empty());
	node.color = r.background_color.filter(|s| !s.is_empty());
	node
}

/// Where snapshots are kept.
pub trait SnapshotStorage {
	fn read(&self) -> Result<Option<String>, PersistError>;
	fn write(&self, json: &str) -> Result<(), PersistError>;
}

/// The browser's `localStorage`, under [`STORAGE_KEY`].
pub struct BrowserStorage {
	storage: web_sys::Storage,
}

impl BrowserStorage {
	pub fn open() -> Result<Self, PersistError> {
		let window =
			web_sys::window().ok_or_else(|| PersistError::Unavailable("no window".into()))?;
		let storage = window
			.local_storage()
			.map_err(|e| PersistError::Unavailable(format!("{:?}", e)))?
			.ok_or_else(|| PersistError::Unavailable("localStorage disabled".into()))?;
		Ok(Self { storage })
	}
}

impl SnapshotStorage for BrowserStorage {
	fn read(&self) -> Result<Option<String>, PersistError> {
		self.storage
			.get_item(STORAGE_KEY)
			.map_err(|e| PersistError::Read(format!("{:?}", e)))
	}

	fn write(&self, json: &str) -> Result<(), PersistError> {
		self.storage
			.set_item(STORAGE_KEY, json)
			.map_err(|e| PersistError::Write(format!("{:?}", e)))
	}
}

/// In-process storage, used when `localStorage` is unavailable and in tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
	slot: RefCell<Option<String>>,
}

impl MemoryStorage {
	pub fn with(json: &str) -> Self {
		Self {
			slot: RefCell::new(Some(json.to_string())),
		}
	}
}

impl SnapshotStorage for MemoryStorage {
	fn read(&self) -> Result<Option<String>, PersistError> {
		Ok(self.slot.borrow().clone())
	}

	fn write(&self, json: &str) -> Result<(), PersistError> {
		*self.slot.borrow_mut() = Some(json.to_string());
		Ok(())
	}
}

/// Loads the graph at startup and writes snapshots afterwards.
pub struct Persistence {
	storage: Box<dyn SnapshotStorage>,
}

impl Persistence {
	pub fn new(storage: Box<dyn SnapshotStorage>) -> Self {
		Self { storage }
	}

	/// `localStorage` when the browser offers it, memory otherwise.
	pub fn browser() -> Self {
		match BrowserStorage::open() {
			Ok(storage) => Self::new(Box::new(storage)),
			Err(e) => {
				warn!("partner-graph: {}; changes will not survive a reload", e);
				Self::new(Box::new(MemoryStorage::default()))
			}
		}
	}

	fn try_load(&self) -> Result<Option<Graph>, PersistError> {
		let Some(json) = self.storage.read()? else {
			return Ok(None);
		};
		Snapshot::from_json(&json)?.restore().map(Some)
	}

	/// The saved graph, or the default one when nothing usable is stored.
	pub fn load(&self) -> Graph {
		match self.try_load() {
			Ok(Some(graph)) => graph,
			Ok(None) => Graph::default(),
			Err(e) => {
				warn!("partner-graph: failed to load saved graph: {}", e);
				Graph::default()
			}
		}
	}

	/// Write a snapshot of `graph`. Failures are logged and otherwise ignored.
	pub fn save(&self, graph: &Graph) {
		let result = Snapshot::capture(graph)
			.to_json()
			.and_then(|json| self.storage.write(&json));
		if let Err(e) = result {
			warn!("partner-graph: failed to save graph: {}", e);
		}
	}
}

/// Cancel-and-reschedule timer. Every [`schedule`](Self::schedule) replaces
/// the pending deadline; [`fire`](Self::fire) reports true once per quiet period.
#[derive(Clone, Debug)]
pub struct Debouncer {
	delay_ms: f64,
	deadline: Option<f64>,
}

impl Debouncer {
	pub fn new(delay_ms: f64) -> Self {
		Self {
			delay_ms,
			deadline: None,
		}
	}

	pub fn schedule(&mut self, now_ms: f64) {
		self.deadline = Some(now_ms + self.delay_ms);
	}

	pub fn cancel(&mut self) {
		self.deadline = None;
	}

	pub fn is_pending(&self) -> bool {
		self.deadline.is_some()
	}

	/// True if the deadline passed; clears it.
	pub fn fire(&mut self, now_ms: f64) -> bool {
		match self.deadline {
			Some(deadline) if now_ms >= deadline => {
				self.deadline = None;
				true
			}
			_ => false,
		}
	}
}

impl Default for Debouncer {
	fn default() -> Self {
		Self::new(SAVE_DELAY_MS)
	}
}
