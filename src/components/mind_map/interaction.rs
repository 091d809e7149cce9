//! Pointer handling and the context menu / edit dialog state machine.
//!
//! Pointer input arrives in canvas pixels. A press on a node turns into a
//! drag once the pointer travels past [`DRAG_THRESHOLD`]; releasing before
//! that counts as a click and opens the context menu. A press on empty
//! canvas pans the view, and releasing it without moving closes the menu.

use log::debug;

use super::scene::Scene;
use super::simulation::Simulation;
use super::store::{GraphStore, NEW_NODE_LABEL};
use super::theme::Dimensions;
use super::types::{DEFAULT_COLOR, NodeId, Vec2};

/// Pointer travel, in screen pixels, that turns a press into a drag.
pub const DRAG_THRESHOLD: f64 = 3.0;

/// Allowed zoom range.
pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 4.0;

/// Pan and zoom transform applied to the entire graph view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	/// Zoom factor (1.0 = 100%, clamped to `MIN_ZOOM..=MAX_ZOOM`).
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

impl ViewTransform {
	/// Graph origin in the middle of a `width` × `height` canvas.
	pub fn centered(width: f64, height: f64) -> Self {
		Self {
			x: width / 2.0,
			y: height / 2.0,
			k: 1.0,
		}
	}

	pub fn screen_to_graph(&self, p: Vec2) -> Vec2 {
		Vec2::new((p.x - self.x) / self.k, (p.y - self.y) / self.k)
	}

	/// Scale by `factor` keeping the graph point under `anchor` in place.
	pub fn zoom_at(&mut self, anchor: Vec2, factor: f64) {
		let k = (self.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
		let ratio = k / self.k;
		self.x = anchor.x - (anchor.x - self.x) * ratio;
		self.y = anchor.y - (anchor.y - self.y) * ratio;
		self.k = k;
	}
}

/// Values the edit dialog starts from.
#[derive(Clone, Debug, PartialEq)]
pub struct EditSession {
	pub node_id: NodeId,
	pub label: String,
	pub image: Option<String>,
	pub color: String,
	/// The root cannot be deleted, so the dialog hides that action.
	pub is_root: bool,
}

/// What the edit dialog hands back on save.
#[derive(Clone, Debug, PartialEq)]
pub struct EditPayload {
	pub label: String,
	pub image: Option<String>,
	pub color: Option<String>,
}

/// What is floating above the canvas.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Overlay {
	#[default]
	Closed,
	/// Menu anchored at a screen position next to a node.
	ContextMenu { node_id: NodeId, at: Vec2 },
	Editing(EditSession),
}

/// An in-progress pointer gesture.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Gesture {
	#[default]
	Idle,
	/// Pointer went down on a node and has not travelled far yet.
	Pressed {
		node_id: NodeId,
		start: Vec2,
		grab: Vec2,
	},
	/// A node follows the pointer. `grab` is the node centre relative to the pointer.
	Dragging { node_id: NodeId, grab: Vec2 },
	/// The view follows the pointer.
	Panning {
		start: Vec2,
		origin: ViewTransform,
		moved: bool,
	},
}

/// How a pointer release ended.
#[derive(Clone, Debug, PartialEq)]
pub enum Release {
	Nothing,
	/// A press on a node that never became a drag.
	Clicked(NodeId),
	/// A dragged node was let go; the layout changed.
	Dropped(NodeId),
	/// A press on the background that never became a pan.
	ClickedCanvas,
}

/// Interaction state for one canvas.
#[derive(Clone, Debug, Default)]
pub struct Controller {
	pub transform: ViewTransform,
	overlay: Overlay,
	gesture: Gesture,
}

impl Controller {
	pub fn new(transform: ViewTransform) -> Self {
		Self {
			transform,
			..Self::default()
		}
	}

	pub fn overlay(&self) -> &Overlay {
		&self.overlay
	}

	pub fn gesture(&self) -> &Gesture {
		&self.gesture
	}

	pub fn is_dragging(&self) -> bool {
		matches!(self.gesture, Gesture::Dragging { .. })
	}

	fn close_menu(&mut self) {
		if matches!(self.overlay, Overlay::ContextMenu { .. }) {
			self.overlay = Overlay::Closed;
		}
	}

	fn menu_node(&self) -> Option<NodeId> {
		match &self.overlay {
			Overlay::ContextMenu { node_id, .. } => Some(node_id.clone()),
			_ => None,
		}
	}

	/// Open the context menu for `node_id`, replacing any menu or dialog.
	pub fn click_node(&mut self, node_id: NodeId, at: Vec2) {
		if self.is_dragging() {
			return;
		}
		self.overlay = Overlay::ContextMenu { node_id, at };
	}

	pub fn click_canvas(&mut self) {
		self.close_menu();
	}

	/// The view was panned or zoomed.
	pub fn viewport_changed(&mut self) {
		self.close_menu();
	}

	/// "Expand Structure": attach a new child to the menu's node.
	pub fn expand_structure(&mut self, store: &mut GraphStore) -> Option<NodeId> {
		let parent = self.menu_node()?;
		self.overlay = Overlay::Closed;
		store
			.add_child(&parent, NEW_NODE_LABEL, Some(DEFAULT_COLOR))
			.map(|(id, _)| id)
	}

	/// "Modify Data": open the edit dialog prefilled from the menu's node.
	pub fn modify_data(&mut self, store: &GraphStore) {
		let Some(node_id) = self.menu_node() else {
			return;
		};
		self.overlay = match store.node(&node_id) {
			Some(node) => Overlay::Editing(EditSession {
				node_id,
				label: node.label.clone(),
				image: node.image.clone(),
				color: node.color.clone().unwrap_or_else(|| DEFAULT_COLOR.to_string()),
				is_root: node.is_root(),
			}),
			None => {
				debug!("partner-graph: menu node {} vanished", node_id);
				Overlay::Closed
			}
		};
	}

	fn editing(&self) -> Option<&EditSession> {
		match &self.overlay {
			Overlay::Editing(session) => Some(session),
			_ => None,
		}
	}

	pub fn save(&mut self, store: &mut GraphStore, payload: EditPayload) -> bool {
		let Some(node_id) = self.editing().map(|s| s.node_id.clone()) else {
			return false;
		};
		self.overlay = Overlay::Closed;
		store.update_node(&node_id, &payload.label, payload.image, payload.color)
	}

	/// Delete the edited node and its subtree. Refused for the root.
	pub fn delete(&mut self, store: &mut GraphStore) -> bool {
		let Some(session) = self.editing() else {
			return false;
		};
		if session.is_root {
			return false;
		}
		let node_id = session.node_id.clone();
		self.overlay = Overlay::Closed;
		store.delete_subtree(&node_id).is_some()
	}

	pub fn cancel(&mut self) {
		if self.editing().is_some() {
			self.overlay = Overlay::Closed;
		}
	}

	pub fn pointer_down(&mut self, at: Vec2, scene: &Scene, dims: &Dimensions) {
		let point = self.transform.screen_to_graph(at);
		self.gesture = match scene.node_at(point, dims) {
			Some(id) => {
				let centre = scene.node(id).map(|v| v.position).unwrap_or(point);
				Gesture::Pressed {
					node_id: id.clone(),
					start: at,
					grab: centre - point,
				}
			}
			None => Gesture::Panning {
				start: at,
				origin: self.transform,
				moved: false,
			},
		};
	}

	pub fn pointer_move(&mut self, at: Vec2, store: &mut GraphStore, sim: &mut Simulation) {
		let point = self.transform.screen_to_graph(at);
		match &mut self.gesture {
			Gesture::Idle => {}
			Gesture::Pressed {
				node_id,
				start,
				grab,
			} => {
				if at.distance(*start) < DRAG_THRESHOLD {
					return;
				}
				let (node_id, grab) = (node_id.clone(), *grab);
				match store.node_mut(&node_id) {
					Some(node) => {
						node.pin(point + grab);
						sim.begin_drag();
						self.gesture = Gesture::Dragging { node_id, grab };
						self.close_menu();
					}
					None => self.gesture = Gesture::Idle,
				}
			}
			Gesture::Dragging { node_id, grab } => {
				let target = point + *grab;
				if let Some(node) = store.node_mut(node_id) {
					node.pin(target);
				}
			}
			Gesture::Panning {
				start,
				origin,
				moved,
			} => {
				if !*moved && at.distance(*start) < DRAG_THRESHOLD {
					return;
				}
				*moved = true;
				self.transform.x = origin.x + (at.x - start.x);
				self.transform.y = origin.y + (at.y - start.y);
				self.close_menu();
			}
		}
	}

	pub fn pointer_up(
		&mut self,
		at: Vec2,
		store: &mut GraphStore,
		sim: &mut Simulation,
	) -> Release {
		match std::mem::take(&mut self.gesture) {
			Gesture::Idle => Release::Nothing,
			Gesture::Pressed { node_id, .. } => {
				self.click_node(node_id.clone(), at);
				Release::Clicked(node_id)
			}
			Gesture::Dragging { node_id, .. } => {
				if let Some(node) = store.node_mut(&node_id) {
					node.unpin();
				}
				sim.end_drag();
				Release::Dropped(node_id)
			}
			Gesture::Panning { moved, .. } => {
				if moved {
					Release::Nothing
				} else {
					self.click_canvas();
					Release::ClickedCanvas
				}
			}
		}
	}

	/// The pointer left the canvas: end whatever gesture was running.
	pub fn pointer_leave(&mut self, store: &mut GraphStore, sim: &mut Simulation) -> Release {
		match std::mem::take(&mut self.gesture) {
			Gesture::Dragging { node_id, .. } => {
				if let Some(node) = store.node_mut(&node_id) {
					node.unpin();
				}
				sim.end_drag();
				Release::Dropped(node_id)
			}
			_ => Release::Nothing,
		}
	}

	/// Zoom about the cursor. Negative `delta_y` zooms in.
	pub fn wheel(&mut self, at: Vec2, delta_y: f64) {
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		self.transform.zoom_at(at, factor);
		self.viewport_changed();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::mind_map::theme::Theme;
	use crate::components::mind_map::types::{Graph, ROOT_ID};

	struct Fixture {
		store: GraphStore,
		sim: Simulation,
		scene: Scene,
		dims: Dimensions,
		ctl: Controller,
	}

	impl Fixture {
		/// Root at graph origin, which sits at screen (400, 300).
		fn new() -> Self {
			let store = GraphStore::new(Graph::default(), 5);
			let mut scene = Scene::new();
			scene.reconcile(store.graph());
			Self {
				store,
				sim: Simulation::default(),
				scene,
				dims: Theme::default().dimensions,
				ctl: Controller::new(ViewTransform::centered(800.0, 600.0)),
			}
		}

		fn down(&mut self, x: f64, y: f64) {
			self.ctl.pointer_down(Vec2::new(x, y), &self.scene, &self.dims);
		}

		fn drag_to(&mut self, x: f64, y: f64) {
			self.ctl
				.pointer_move(Vec2::new(x, y), &mut self.store, &mut self.sim);
		}

		fn up(&mut self, x: f64, y: f64) -> Release {
			self.ctl
				.pointer_up(Vec2::new(x, y), &mut self.store, &mut self.sim)
		}

		fn click(&mut self, x: f64, y: f64) -> Release {
			self.down(x, y);
			self.up(x, y)
		}
	}

	fn root() -> NodeId {
		NodeId::from(ROOT_ID)
	}

	#[test]
	fn click_on_node_opens_menu_there() {
		let mut f = Fixture::new();
		assert_eq!(f.click(401.0, 301.0), Release::Clicked(root()));
		assert_eq!(
			f.ctl.overlay(),
			&Overlay::ContextMenu {
				node_id: root(),
				at: Vec2::new(401.0, 301.0)
			}
		);
	}

	#[test]
	fn small_jitter_is_still_a_click() {
		let mut f = Fixture::new();
		f.down(400.0, 300.0);
		f.drag_to(401.0, 301.0);
		assert_eq!(f.up(401.0, 301.0), Release::Clicked(root()));
		assert!(f.store.node(&root()).unwrap().pin.is_none());
	}

	#[test]
	fn click_on_canvas_closes_menu() {
		let mut f = Fixture::new();
		f.click(400.0, 300.0);
		assert_eq!(f.click(50.0, 50.0), Release::ClickedCanvas);
		assert_eq!(f.ctl.overlay(), &Overlay::Closed);
	}

	#[test]
	fn panning_moves_view_and_closes_menu() {
		let mut f = Fixture::new();
		f.click(400.0, 300.0);
		f.down(50.0, 50.0);
		f.drag_to(80.0, 90.0);
		assert_eq!(f.ctl.overlay(), &Overlay::Closed);
		assert_eq!(f.up(80.0, 90.0), Release::Nothing);
		assert_eq!(f.ctl.transform.x, 430.0);
		assert_eq!(f.ctl.transform.y, 340.0);
	}

	#[test]
	fn wheel_zooms_about_cursor_within_limits() {
		let mut f = Fixture::new();
		f.click(400.0, 300.0);
		let anchor = Vec2::new(100.0, 100.0);
		let before = f.ctl.transform.screen_to_graph(anchor);
		f.ctl.wheel(anchor, -1.0);
		let after = f.ctl.transform.screen_to_graph(anchor);
		assert!(before.distance(after) < 1e-9);
		assert_eq!(f.ctl.overlay(), &Overlay::Closed);

		for _ in 0..100 {
			f.ctl.wheel(anchor, -1.0);
		}
		assert_eq!(f.ctl.transform.k, MAX_ZOOM);
		for _ in 0..100 {
			f.ctl.wheel(anchor, 1.0);
		}
		assert_eq!(f.ctl.transform.k, MIN_ZOOM);
	}

	#[test]
	fn drag_pins_then_releases_node() {
		let mut f = Fixture::new();
		f.click(400.0, 300.0);
		f.down(410.0, 300.0);
		f.drag_to(510.0, 350.0);

		assert!(f.ctl.is_dragging());
		assert_eq!(f.ctl.overlay(), &Overlay::Closed);
		assert_eq!(f.sim.alpha_target(), 0.3);
		// Grabbed 10px right of centre, so the centre trails the pointer.
		assert_eq!(f.store.node(&root()).unwrap().pin, Some(Vec2::new(100.0, 50.0)));

		f.drag_to(610.0, 400.0);
		assert_eq!(f.store.node(&root()).unwrap().pin, Some(Vec2::new(200.0, 100.0)));

		assert_eq!(f.up(610.0, 400.0), Release::Dropped(root()));
		assert!(f.store.node(&root()).unwrap().pin.is_none());
		assert_eq!(f.sim.alpha_target(), 0.0);
		assert_eq!(f.ctl.overlay(), &Overlay::Closed);
	}

	#[test]
	fn leaving_canvas_mid_drag_releases_node() {
		let mut f = Fixture::new();
		f.down(400.0, 300.0);
		f.drag_to(450.0, 300.0);
		let release = f.ctl.pointer_leave(&mut f.store, &mut f.sim);
		assert_eq!(release, Release::Dropped(root()));
		assert!(f.store.node(&root()).unwrap().pin.is_none());
		assert_eq!(f.ctl.gesture(), &Gesture::Idle);
	}

	#[test]
	fn expand_structure_adds_child_and_closes_menu() {
		let mut f = Fixture::new();
		f.click(400.0, 300.0);
		let child = f.ctl.expand_structure(&mut f.store).expect("child created");

		assert_eq!(f.ctl.overlay(), &Overlay::Closed);
		let node = f.store.node(&child).unwrap();
		assert_eq!(node.label, NEW_NODE_LABEL);
		assert_eq!(f.store.graph().links.len(), 1);
		assert_eq!(f.store.graph().links[0].source, root());
	}

	#[test]
	fn menu_actions_need_an_open_menu() {
		let mut f = Fixture::new();
		assert!(f.ctl.expand_structure(&mut f.store).is_none());
		f.ctl.modify_data(&f.store);
		assert_eq!(f.ctl.overlay(), &Overlay::Closed);
	}

	#[test]
	fn modify_data_prefills_and_save_applies() {
		let mut f = Fixture::new();
		f.click(400.0, 300.0);
		f.ctl.modify_data(&f.store);
		match f.ctl.overlay() {
			Overlay::Editing(session) => {
				assert_eq!(session.node_id, root());
				assert_eq!(session.label, "MY PARTNER");
				assert_eq!(session.color, DEFAULT_COLOR);
				assert!(session.is_root);
			}
			other => panic!("expected edit dialog, got {:?}", other),
		}

		let saved = f.ctl.save(
			&mut f.store,
			EditPayload {
				label: "X".into(),
				image: None,
				color: Some("#ff0000".into()),
			},
		);
		assert!(saved);
		assert_eq!(f.ctl.overlay(), &Overlay::Closed);
		let node = f.store.node(&root()).unwrap();
		assert_eq!(node.label, "X");
		assert_eq!(node.color.as_deref(), Some("#ff0000"));
	}

	#[test]
	fn root_delete_is_refused() {
		let mut f = Fixture::new();
		f.click(400.0, 300.0);
		f.ctl.modify_data(&f.store);
		assert!(!f.ctl.delete(&mut f.store));
		assert!(f.store.graph().root().is_some());
		assert!(matches!(f.ctl.overlay(), Overlay::Editing(_)));
		f.ctl.cancel();
		assert_eq!(f.ctl.overlay(), &Overlay::Closed);
	}

	#[test]
	fn delete_from_dialog_removes_subtree() {
		let mut f = Fixture::new();
		let (a, _) = f.store.add_child(&root(), "A", None).unwrap();
		f.store.add_child(&a, "B", None).unwrap();
		f.store.node_mut(&a).unwrap().position = Vec2::new(300.0, 0.0);
		f.scene.reconcile(f.store.graph());

		assert_eq!(f.click(700.0, 300.0), Release::Clicked(a.clone()));
		f.ctl.modify_data(&f.store);
		assert!(f.ctl.delete(&mut f.store));

		assert_eq!(f.ctl.overlay(), &Overlay::Closed);
		assert_eq!(f.store.graph().nodes.len(), 1);
		assert!(f.store.graph().links.is_empty());
	}

	#[test]
	fn clicking_another_node_replaces_the_dialog() {
		let mut f = Fixture::new();
		f.click(400.0, 300.0);
		f.ctl.modify_data(&f.store);
		f.click(400.0, 300.0);
		assert!(matches!(f.ctl.overlay(), Overlay::ContextMenu { .. }));
	}
}
