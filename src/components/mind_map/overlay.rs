//! DOM widgets layered over the canvas.
//!
//! Widgets never touch the graph directly. They push [`Command`]s onto the
//! shared inbox, which the canvas loop drains every frame.

use leptos::prelude::*;
use log::warn;
use wasm_bindgen::prelude::*;
use web_sys::{Event, FileReader, HtmlInputElement, KeyboardEvent, MouseEvent};

use super::interaction::{EditPayload, EditSession};
use super::model::Command;
use super::types::Vec2;

/// Screen offset of the context menu from the click that opened it.
const MENU_OFFSET: Vec2 = Vec2::new(20.0, -20.0);

fn send(inbox: RwSignal<Vec<Command>>, command: Command) {
	inbox.update(|queue| queue.push(command));
}

/// "Expand Structure" / "Modify Data" menu next to a clicked node.
#[component]
pub fn ContextMenu(at: Vec2, inbox: RwSignal<Vec<Command>>) -> impl IntoView {
	let style = format!(
		"left: {}px; top: {}px;",
		at.x + MENU_OFFSET.x,
		at.y + MENU_OFFSET.y
	);
	view! {
		<div class="context-menu" style=style>
			<button on:click=move |_| send(inbox, Command::ExpandStructure)>
				"+ Expand Structure"
			</button>
			<button on:click=move |_| send(inbox, Command::ModifyData)>"✎ Modify Data"</button>
		</div>
	}
}

/// Reads the first picked file into a data URL and stores it in `image`.
fn read_picked_file(ev: &Event, image: RwSignal<Option<String>>) {
	let Some(input) = ev.target().and_then(|t| t.dyn_into::<HtmlInputElement>().ok()) else {
		return;
	};
	let Some(file) = input.files().and_then(|files| files.get(0)) else {
		return;
	};
	let reader = match FileReader::new() {
		Ok(reader) => reader,
		Err(e) => {
			warn!("partner-graph: FileReader unavailable: {:?}", e);
			return;
		}
	};

	let done = {
		let reader = reader.clone();
		Closure::<dyn FnMut()>::new(move || match reader.result().map(|v| v.as_string()) {
			Ok(Some(url)) => image.set(Some(url)),
			_ => warn!("partner-graph: could not read picked image"),
		})
	};
	reader.set_onloadend(Some(done.as_ref().unchecked_ref()));
	// The reader holds the only JS reference to the callback.
	done.forget();

	if let Err(e) = reader.read_as_data_url(&file) {
		warn!("partner-graph: reading {} failed: {:?}", file.name(), e);
	}
}

/// Dialog editing one node's label, colour and picture.
#[component]
pub fn EditModal(
	session: EditSession,
	palette: Vec<String>,
	inbox: RwSignal<Vec<Command>>,
) -> impl IntoView {
	let label = RwSignal::new(session.label);
	let image = RwSignal::new(session.image);
	let color = RwSignal::new(session.color);
	let is_root = session.is_root;

	let save = move |_: MouseEvent| {
		send(
			inbox,
			Command::Save(EditPayload {
				label: label.get_untracked(),
				image: image.get_untracked(),
				color: Some(color.get_untracked()),
			}),
		)
	};

	let swatches = palette
		.into_iter()
		.map(|swatch| {
			let (current, pick) = (swatch.clone(), swatch.clone());
			view! {
				<button
					class="swatch"
					class:selected=move || color.with(|c| c.eq_ignore_ascii_case(&current))
					style=format!("background-color: {};", swatch)
					title=swatch.clone()
					on:click=move |_| color.set(pick.clone())
				/>
			}
		})
		.collect_view();

	view! {
		<div class="modal-backdrop" on:click=move |_| send(inbox, Command::Cancel) />
		<div class="edit-modal">
			<div class="edit-modal-header">
				<h2>{if is_root { "Blueprint Core" } else { "Memory Module" }}</h2>
				<button class="close" on:click=move |_| send(inbox, Command::Cancel)>"✕"</button>
			</div>

			<div class="edit-modal-body">
				<label>"Description / Memory"</label>
				<textarea
					prop:value=move || label.get()
					on:input=move |ev| label.set(event_target_value(&ev))
					placeholder="Enter reason..."
				/>

				<label>"Structure Color"</label>
				<div class="palette">
					{swatches}
					<input
						type="color"
						prop:value=move || color.get()
						on:input=move |ev| color.set(event_target_value(&ev))
					/>
				</div>

				<label>"Visual Data"</label>
				<div class="upload-row">
					<label class="upload">
						"UPLOAD IMAGE"
						<input
							type="file"
							accept="image/*"
							style="display: none;"
							on:change=move |ev| read_picked_file(&ev, image)
						/>
					</label>
					<Show when=move || image.with(Option::is_some)>
						<button class="clear-image" on:click=move |_| image.set(None)>
							"Clear Image"
						</button>
					</Show>
				</div>
				{move || image.get().map(|src| view! { <img class="preview" src=src alt="Preview" /> })}

				<div class="actions">
					{(!is_root)
						.then(|| {
							view! {
								<button class="dismantle" on:click=move |_| send(inbox, Command::Delete)>
									"DISMANTLE"
								</button>
							}
						})}
					<button class="save" on:click=save>"SAVE DATA"</button>
				</div>
			</div>
		</div>
	}
}

/// "Why I Love You" title with an editable partner name beside it.
#[component]
pub fn PartnerHeader(name: RwSignal<String>, inbox: RwSignal<Vec<Command>>) -> impl IntoView {
	let editing = RwSignal::new(false);
	let input_ref = NodeRef::<leptos::html::Input>::new();
	Effect::new(move |_| {
		if let Some(input) = input_ref.get() {
			let _ = input.focus();
		}
	});

	view! {
		<div class="map-header" on:click=move |_| editing.set(true)>
			<h1>"Why I Love You"</h1>
			<Show
				when=move || editing.get()
				fallback=move || {
					view! {
						<div class="partner-name" class:empty=move || name.with(String::is_empty)>
							{move || {
								let n = name.get();
								if n.is_empty() { "...".to_string() } else { n }
							}}
						</div>
					}
				}
			>
				<input
					node_ref=input_ref
					class="partner-name-input"
					type="text"
					placeholder="NAME"
					prop:value=move || name.get()
					on:input=move |ev| {
						let value = event_target_value(&ev);
						name.set(value.clone());
						send(inbox, Command::RenamePartner(value));
					}
					on:blur=move |_| editing.set(false)
					on:keydown=move |ev: KeyboardEvent| {
						if ev.key() == "Enter" {
							editing.set(false);
						}
					}
				/>
			</Show>
		</div>
	}
}
