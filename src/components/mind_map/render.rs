//! Canvas painting for the mind map.
//!
//! Reads the [`Scene`] only. Passes, back to front:
//! 1. Paper background and grid (screen space)
//! 2. Links (graph space)
//! 3. Node shadows, bodies, pictures and labels in paint order

use std::collections::{HashMap, HashSet};

use log::warn;
use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

use super::interaction::ViewTransform;
use super::scene::{LabelMode, NodeVisual, Scene, Shape};
use super::theme::{Color, Dimensions, Theme};

/// Longest label line on a card before wrapping, in characters.
const CARD_LINE_CHARS: usize = 16;
const CARD_MAX_LINES: usize = 3;
const ROOT_LINE_CHARS: usize = 10;
const ROOT_MAX_LINES: usize = 2;

/// Decoded pictures keyed by source URL.
///
/// Loading is asynchronous: a picture is drawn only once the browser has
/// decoded it, so the first frames after an upload show the bare node.
#[derive(Default)]
pub struct ImageCache {
	images: HashMap<String, HtmlImageElement>,
}

impl ImageCache {
	/// Decoded image for `src`, starting a load on first sight.
	pub fn ready(&mut self, src: &str) -> Option<&HtmlImageElement> {
		if !self.images.contains_key(src) {
			match HtmlImageElement::new() {
				Ok(img) => {
					img.set_src(src);
					self.images.insert(src.to_string(), img);
				}
				Err(e) => {
					warn!("partner-graph: cannot create image element: {:?}", e);
					return None;
				}
			}
		}
		self.images
			.get(src)
			.filter(|img| img.complete() && img.natural_width() > 0)
	}

	/// Forget pictures no node shows anymore.
	pub fn prune(&mut self, scene: &Scene) {
		let live: HashSet<&str> = scene.nodes().filter_map(|v| v.image.as_deref()).collect();
		self.images.retain(|src, _| live.contains(src.as_str()));
	}
}

/// Paints the whole scene onto a `width` × `height` canvas.
pub fn paint(
	scene: &Scene,
	ctx: &CanvasRenderingContext2d,
	transform: &ViewTransform,
	theme: &Theme,
	images: &mut ImageCache,
	width: f64,
	height: f64,
) {
	draw_background(ctx, theme, transform, width, height);

	ctx.save();
	let _ = ctx.translate(transform.x, transform.y);
	let _ = ctx.scale(transform.k, transform.k);

	draw_links(scene, ctx, theme);
	for visual in scene.nodes() {
		draw_node(ctx, visual, theme, images);
	}

	ctx.restore();
	images.prune(scene);
}

fn draw_background(
	ctx: &CanvasRenderingContext2d,
	theme: &Theme,
	transform: &ViewTransform,
	width: f64,
	height: f64,
) {
	ctx.set_fill_style_str(&theme.background.to_css());
	ctx.fill_rect(0.0, 0.0, width, height);

	// The grid slides with the pan but keeps its screen spacing.
	let spacing = theme.grid_spacing;
	ctx.set_stroke_style_str(&theme.grid.to_css());
	ctx.set_line_width(1.0);
	ctx.begin_path();
	let mut x = transform.x.rem_euclid(spacing);
	while x <= width {
		ctx.move_to(x + 0.5, 0.0);
		ctx.line_to(x + 0.5, height);
		x += spacing;
	}
	let mut y = transform.y.rem_euclid(spacing);
	while y <= height {
		ctx.move_to(0.0, y + 0.5);
		ctx.line_to(width, y + 0.5);
		y += spacing;
	}
	ctx.stroke();
}

fn draw_links(scene: &Scene, ctx: &CanvasRenderingContext2d, theme: &Theme) {
	ctx.set_stroke_style_str(&theme.foreground.to_css());
	ctx.set_line_width(theme.dimensions.stroke_width);
	ctx.begin_path();
	for link in scene.links() {
		ctx.move_to(link.from.x, link.from.y);
		ctx.line_to(link.to.x, link.to.y);
	}
	ctx.stroke();
}

fn draw_node(
	ctx: &CanvasRenderingContext2d,
	visual: &NodeVisual,
	theme: &Theme,
	images: &mut ImageCache,
) {
	let dims = &theme.dimensions;
	let ink = theme.foreground.to_css();
	let fill = Color::parse(&visual.fill).unwrap_or(theme.background);

	ctx.save();
	let _ = ctx.translate(visual.position.x, visual.position.y);

	// Hard offset shadow.
	ctx.save();
	let _ = ctx.translate(dims.shadow_offset, dims.shadow_offset);
	outline(ctx, visual.shape, dims);
	ctx.set_fill_style_str(&ink);
	ctx.fill();
	ctx.restore();

	outline(ctx, visual.shape, dims);
	ctx.set_fill_style_str(&fill.to_css());
	ctx.fill();

	if let Some(img) = visual.image.as_deref().and_then(|src| images.ready(src)) {
		let (x, y, w, h) = picture_box(visual.shape, dims);
		ctx.save();
		outline(ctx, visual.shape, dims);
		ctx.clip();
		let (sx, sy, sw, sh) = cover(img.natural_width() as f64, img.natural_height() as f64, w, h);
		let _ = ctx.draw_image_with_html_image_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
			img, sx, sy, sw, sh, x, y, w, h,
		);
		ctx.restore();
	}

	outline(ctx, visual.shape, dims);
	ctx.set_stroke_style_str(&ink);
	ctx.set_line_width(match visual.shape {
		Shape::Heart => dims.root_stroke_width,
		Shape::Card => dims.child_stroke_width,
	});
	ctx.stroke();

	draw_label(ctx, visual, theme, fill);

	ctx.restore();
}

/// Traces the node silhouette around the origin.
fn outline(ctx: &CanvasRenderingContext2d, shape: Shape, dims: &Dimensions) {
	ctx.begin_path();
	match shape {
		Shape::Heart => {
			let s = dims.root_size / 120.0;
			ctx.move_to(0.0, -30.0 * s);
			ctx.bezier_curve_to(-20.0 * s, -50.0 * s, -60.0 * s, -40.0 * s, -60.0 * s, 0.0);
			ctx.bezier_curve_to(-60.0 * s, 40.0 * s, 0.0, 70.0 * s, 0.0, 70.0 * s);
			ctx.bezier_curve_to(0.0, 70.0 * s, 60.0 * s, 40.0 * s, 60.0 * s, 0.0);
			ctx.bezier_curve_to(60.0 * s, -40.0 * s, 20.0 * s, -50.0 * s, 0.0, -30.0 * s);
			ctx.close_path();
		}
		Shape::Card => {
			ctx.rect(
				-dims.child_width / 2.0,
				-dims.child_height / 2.0,
				dims.child_width,
				dims.child_height,
			);
		}
	}
}

/// Area a picture is stretched over, relative to the node centre.
fn picture_box(shape: Shape, dims: &Dimensions) -> (f64, f64, f64, f64) {
	match shape {
		Shape::Heart => {
			let s = dims.root_size / 120.0;
			(-60.0 * s, -50.0 * s, 120.0 * s, 120.0 * s)
		}
		Shape::Card => (
			-dims.child_width / 2.0,
			-dims.child_height / 2.0,
			dims.child_width,
			dims.child_height,
		),
	}
}

/// Source rectangle that fills `dst_w` × `dst_h` without distortion,
/// cropping the overflow evenly from both sides.
fn cover(src_w: f64, src_h: f64, dst_w: f64, dst_h: f64) -> (f64, f64, f64, f64) {
	if src_w <= 0.0 || src_h <= 0.0 {
		return (0.0, 0.0, src_w, src_h);
	}
	let scale = (dst_w / src_w).max(dst_h / src_h);
	let (sw, sh) = (dst_w / scale, dst_h / scale);
	((src_w - sw) / 2.0, (src_h - sh) / 2.0, sw, sh)
}

fn draw_label(ctx: &CanvasRenderingContext2d, visual: &NodeVisual, theme: &Theme, fill: Color) {
	let dims = &theme.dimensions;
	let (line_chars, max_lines, size) = match visual.shape {
		Shape::Heart => (ROOT_LINE_CHARS, ROOT_MAX_LINES, 14.0),
		Shape::Card => (CARD_LINE_CHARS, CARD_MAX_LINES, 13.0),
	};
	let lines = wrap_label(&display_label(visual.shape, &visual.label), line_chars, max_lines);
	if lines.is_empty() {
		return;
	}
	let line_height = size * 1.25;

	ctx.set_font(&format!("bold {}px {}", size, theme.font_family));
	ctx.set_text_align("center");
	ctx.set_text_baseline("middle");

	match visual.label_mode {
		LabelMode::Hidden => {}
		LabelMode::Plain => {
			let ink = if fill.is_light() {
				theme.foreground
			} else {
				theme.background
			};
			ctx.set_fill_style_str(&ink.to_css());
			// Nudge the root label into the wide upper lobe.
			let centre = if visual.shape == Shape::Heart { 5.0 } else { 0.0 };
			let top = centre - line_height * (lines.len() as f64 - 1.0) / 2.0;
			for (i, line) in lines.iter().enumerate() {
				let _ = ctx.fill_text(line, 0.0, top + i as f64 * line_height);
			}
		}
		LabelMode::Overlay => {
			let panel_h = line_height * lines.len() as f64 + dims.label_padding;
			let (left, top) = (
				-dims.child_width / 2.0 + dims.label_padding,
				-dims.child_height / 2.0 + dims.label_padding,
			);
			let panel_w = dims.child_width - 2.0 * dims.label_padding;
			ctx.set_fill_style_str(&theme.background.with_alpha(0.9).to_css());
			ctx.fill_rect(left, top, panel_w, panel_h);
			ctx.set_stroke_style_str(&theme.foreground.to_css());
			ctx.set_line_width(dims.stroke_width);
			ctx.stroke_rect(left, top, panel_w, panel_h);

			ctx.set_fill_style_str(&theme.foreground.to_css());
			for (i, line) in lines.iter().enumerate() {
				let y = top + dims.label_padding / 2.0 + line_height * (i as f64 + 0.5);
				let _ = ctx.fill_text(line, 0.0, y);
			}
		}
	}
}

/// Text painted for a node: the root is always shown in capitals.
fn display_label(shape: Shape, label: &str) -> String {
	match shape {
		Shape::Heart => label.to_uppercase(),
		Shape::Card => label.to_string(),
	}
}

/// Greedy word wrap to at most `max_lines` lines of `line_chars` characters.
/// Words longer than a line are split; text that does not fit ends in "…".
fn wrap_label(label: &str, line_chars: usize, max_lines: usize) -> Vec<String> {
	let mut lines: Vec<String> = Vec::new();
	let mut current = String::new();

	let mut pieces = Vec::new();
	for word in label.split_whitespace() {
		let chars: Vec<char> = word.chars().collect();
		for chunk in chars.chunks(line_chars.max(1)) {
			pieces.push(chunk.iter().collect::<String>());
		}
	}

	for piece in pieces {
		let needed = if current.is_empty() {
			piece.chars().count()
		} else {
			current.chars().count() + 1 + piece.chars().count()
		};
		if needed > line_chars && !current.is_empty() {
			lines.push(std::mem::take(&mut current));
		}
		if !current.is_empty() {
			current.push(' ');
		}
		current.push_str(&piece);
	}
	if !current.is_empty() {
		lines.push(current);
	}

	if lines.len() > max_lines {
		lines.truncate(max_lines);
		if let Some(last) = lines.last_mut() {
			let mut kept: String = last.chars().take(line_chars.saturating_sub(1)).collect();
			kept.push('…');
			*last = kept;
		}
	}
	lines
}
