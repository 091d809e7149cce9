//! Everything the canvas needs per frame, minus the browser.
//!
//! [`MindMapModel`] owns the store, the simulation, the retained scene and
//! the interaction controller. The component feeds it pointer events and
//! [`Command`]s from the overlay widgets, and calls [`MindMapModel::frame`]
//! once per animation frame.

use log::{debug, info};

use super::interaction::{Controller, EditPayload, Overlay, Release, ViewTransform};
use super::persistence::Debouncer;
use super::scene::Scene;
use super::simulation::Simulation;
use super::store::GraphStore;
use super::theme::Dimensions;
use super::types::{Graph, Vec2};

/// Requests coming from the DOM widgets layered over the canvas.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
	ExpandStructure,
	ModifyData,
	Save(EditPayload),
	Delete,
	Cancel,
	RenamePartner(String),
}

/// What one frame did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Frame {
	pub ticked: bool,
	/// The debounced save came due; write the graph out now.
	pub save_due: bool,
}

pub struct MindMapModel {
	pub store: GraphStore,
	pub sim: Simulation,
	pub scene: Scene,
	pub controller: Controller,
	debouncer: Debouncer,
	seen_revision: u64,
	seen_layout: u64,
}

impl MindMapModel {
	pub fn new(graph: Graph, seed: u64, transform: ViewTransform) -> Self {
		let store = GraphStore::new(graph, seed);
		let mut scene = Scene::new();
		let stats = scene.reconcile(store.graph());
		info!(
			"partner-graph: {} nodes, {} links on screen",
			stats.nodes.entered, stats.links.entered
		);
		Self {
			seen_revision: store.revision(),
			seen_layout: store.layout_revision(),
			store,
			sim: Simulation::default(),
			scene,
			controller: Controller::new(transform),
			debouncer: Debouncer::default(),
		}
	}

	pub fn overlay(&self) -> &Overlay {
		self.controller.overlay()
	}

	pub fn partner_name(&self) -> &str {
		&self.store.graph().partner_name
	}

	pub fn save_pending(&self) -> bool {
		self.debouncer.is_pending()
	}

	pub fn apply(&mut self, command: Command) {
		debug!("partner-graph: command {:?}", command);
		match command {
			Command::ExpandStructure => {
				self.controller.expand_structure(&mut self.store);
			}
			Command::ModifyData => self.controller.modify_data(&self.store),
			Command::Save(payload) => {
				self.controller.save(&mut self.store, payload);
			}
			Command::Delete => {
				self.controller.delete(&mut self.store);
			}
			Command::Cancel => self.controller.cancel(),
			Command::RenamePartner(name) => self.store.set_partner_name(&name),
		}
	}

	/// Advance one animation frame at wall-clock time `now_ms`.
	pub fn frame(&mut self, now_ms: f64) -> Frame {
		let revision = self.store.revision();
		if revision != self.seen_revision {
			self.seen_revision = revision;
			self.debouncer.schedule(now_ms);
		}
		let layout = self.store.layout_revision();
		let relayout = layout != self.seen_layout;
		if relayout {
			self.seen_layout = layout;
			self.sim.reheat();
		}

		let ticked = !self.sim.is_settled();
		if ticked {
			self.sim.step(self.store.graph_mut());
		}
		if ticked || relayout {
			let stats = self.scene.reconcile(self.store.graph());
			if stats.nodes.entered + stats.nodes.exited > 0 {
				debug!(
					"partner-graph: scene +{} -{} nodes",
					stats.nodes.entered, stats.nodes.exited
				);
			}
		}

		Frame {
			ticked,
			save_due: self.debouncer.fire(now_ms),
		}
	}

	pub fn pointer_down(&mut self, at: Vec2, dims: &Dimensions) {
		self.controller.pointer_down(at, &self.scene, dims);
	}

	pub fn pointer_move(&mut self, at: Vec2) {
		self.controller
			.pointer_move(at, &mut self.store, &mut self.sim);
	}

	pub fn pointer_up(&mut self, at: Vec2, now_ms: f64) {
		let release = self.controller.pointer_up(at, &mut self.store, &mut self.sim);
		self.released(release, now_ms);
	}

	pub fn pointer_leave(&mut self, now_ms: f64) {
		let release = self.controller.pointer_leave(&mut self.store, &mut self.sim);
		self.released(release, now_ms);
	}

	fn released(&mut self, release: Release, now_ms: f64) {
		// Dropped nodes keep their spot across reloads.
		if let Release::Dropped(_) = release {
			self.debouncer.schedule(now_ms);
		}
	}

	pub fn wheel(&mut self, at: Vec2, delta_y: f64) {
		self.controller.wheel(at, delta_y);
	}
}
