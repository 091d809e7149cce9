//! Leptos component wrapping the mind map canvas.
//!
//! The component creates a fullscreen canvas and wires mouse/wheel handlers
//! into the [`MindMapModel`]. An animation loop runs via
//! `requestAnimationFrame`: each frame drains the overlay command queue, steps
//! the model, writes the graph out when a debounced save comes due, paints,
//! and mirrors the overlay state into a signal for the DOM widgets.

use std::cell::RefCell;
use std::rc::Rc;

use leptos::html::Canvas;
use leptos::prelude::*;
use log::{info, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::interaction::{Overlay, ViewTransform};
use super::model::{Command, MindMapModel};
use super::overlay::{ContextMenu, EditModal};
use super::persistence::Persistence;
use super::render::{self, ImageCache};
use super::theme::Theme;
use super::types::Vec2;

/// Everything the frame loop and the event handlers share.
struct MapContext {
	model: MindMapModel,
	theme: Theme,
	images: ImageCache,
	persistence: Persistence,
	ctx: CanvasRenderingContext2d,
	width: f64,
	height: f64,
}

fn window_size(window: &Window) -> (f64, f64) {
	let read = |v: Result<JsValue, JsValue>| v.ok().and_then(|v| v.as_f64());
	(
		read(window.inner_width()).unwrap_or(800.0),
		read(window.inner_height()).unwrap_or(600.0),
	)
}

/// Pointer position relative to the canvas.
fn canvas_point(canvas_ref: NodeRef<Canvas>, ev: &MouseEvent) -> Option<Vec2> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?;
	let rect = canvas.get_bounding_client_rect();
	Some(Vec2::new(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

/// Renders the mind map on a fullscreen canvas, with the context menu and
/// edit dialog layered on top.
///
/// The graph is loaded from `persistence` when the canvas mounts and written
/// back to it after every quiet period. `inbox` carries [`Command`]s from
/// widgets outside the canvas (the partner name header); `partner_name`
/// mirrors the stored name once it is loaded.
#[component]
pub fn MindMapCanvas(
	persistence: Persistence,
	inbox: RwSignal<Vec<Command>>,
	partner_name: RwSignal<String>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<Canvas>::new();
	let persistence = RefCell::new(Some(persistence));
	let overlay = RwSignal::new(Overlay::Closed);
	let theme = Theme::default();
	let palette: Vec<String> = theme.palette.iter().map(|c| c.to_css()).collect();

	let context: Rc<RefCell<Option<MapContext>>> = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (context_init, animate_init, resize_cb_init) =
		(context.clone(), animate.clone(), resize_cb.clone());

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let Some(persistence) = persistence.borrow_mut().take() else {
			return;
		};
		let Some(window) = web_sys::window() else {
			warn!("partner-graph: no window, canvas left blank");
			return;
		};

		let (w, h) = window_size(&window);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx: CanvasRenderingContext2d = match canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into().ok())
		{
			Some(ctx) => ctx,
			None => {
				warn!("partner-graph: 2d canvas context unavailable");
				return;
			}
		};

		let graph = persistence.load();
		partner_name.set(graph.partner_name.clone());
		let model = MindMapModel::new(graph, js_sys::Date::now() as u64, ViewTransform::centered(w, h));

		*context_init.borrow_mut() = Some(MapContext {
			model,
			theme: theme.clone(),
			images: ImageCache::default(),
			persistence,
			ctx,
			width: w,
			height: h,
		});
		info!("partner-graph: canvas {}x{} ready", w, h);

		let (context_resize, canvas_resize) = (context_init.clone(), canvas.clone());
		*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
			let Some(win) = web_sys::window() else {
				return;
			};
			let (nw, nh) = window_size(&win);
			canvas_resize.set_width(nw as u32);
			canvas_resize.set_height(nh as u32);
			if let Some(ref mut c) = *context_resize.borrow_mut() {
				c.width = nw;
				c.height = nh;
			}
		}));
		if let Some(ref cb) = *resize_cb_init.borrow() {
			let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}

		let (context_anim, animate_inner) = (context_init.clone(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if let Some(ref mut c) = *context_anim.borrow_mut() {
				let now = js_sys::Date::now();
				for command in inbox.try_update_untracked(std::mem::take).unwrap_or_default() {
					c.model.apply(command);
				}

				let frame = c.model.frame(now);
				if frame.save_due {
					c.persistence.save(c.model.store.graph());
				}

				render::paint(
					&c.model.scene,
					&c.ctx,
					&c.model.controller.transform,
					&c.theme,
					&mut c.images,
					c.width,
					c.height,
				);

				if overlay.with_untracked(|o| o != c.model.overlay()) {
					overlay.set(c.model.overlay().clone());
				}
				if partner_name.with_untracked(|n| n != c.model.partner_name()) {
					partner_name.set(c.model.partner_name().to_string());
				}
			}
			if let (Some(cb), Some(win)) = (animate_inner.borrow().as_ref(), web_sys::window()) {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let context_md = context.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some(at) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut c) = *context_md.borrow_mut() {
			c.model.pointer_down(at, &c.theme.dimensions);
		}
	};

	let context_mm = context.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some(at) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut c) = *context_mm.borrow_mut() {
			c.model.pointer_move(at);
		}
	};

	let context_mu = context.clone();
	let on_mouseup = move |ev: MouseEvent| {
		let Some(at) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut c) = *context_mu.borrow_mut() {
			c.model.pointer_up(at, js_sys::Date::now());
		}
	};

	let context_ml = context.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut c) = *context_ml.borrow_mut() {
			c.model.pointer_leave(js_sys::Date::now());
		}
	};

	let context_wh = context.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some(at) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut c) = *context_wh.borrow_mut() {
			c.model.wheel(at, ev.delta_y());
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="mind-map-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: move;"
		/>
		{move || match overlay.get() {
			Overlay::Closed => ().into_any(),
			Overlay::ContextMenu { at, .. } => view! { <ContextMenu at=at inbox=inbox /> }.into_any(),
			Overlay::Editing(session) => {
				view! { <EditModal session=session palette=palette.clone() inbox=inbox /> }.into_any()
			}
		}}
	}
}
