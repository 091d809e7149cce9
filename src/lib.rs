//! partner-graph: an interactive mind map of the reasons you love someone.
//!
//! This crate provides a WASM app that grows a force-directed graph of
//! memories around a heart-shaped "MY PARTNER" node, with per-node colours
//! and pictures, drag/pan/zoom, and automatic saving to `localStorage`.

use leptos::prelude::*;
use leptos_meta::*;
use log::{Level, info};

pub mod components;

pub use components::mind_map::{Command, MindMapCanvas, PartnerHeader, Persistence};

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("partner-graph: logging initialized");
}

/// Main application component.
/// Restores the saved mind map and renders it fullscreen under the header.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let persistence = Persistence::browser();
	let inbox = RwSignal::new(Vec::<Command>::new());
	let partner_name = RwSignal::new(String::new());

	view! {
		<Html attr:lang="en" attr:dir="ltr" />
		<Title text="Why I Love You" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div class="fullscreen-map">
			<MindMapCanvas persistence=persistence inbox=inbox partner_name=partner_name />
			<PartnerHeader name=partner_name inbox=inbox />
		</div>
	}
}
