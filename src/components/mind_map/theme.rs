//! Visual theming for the mind map.
//!
//! Colours, node dimensions and the colour palette offered in the edit
//! dialog. Physics tunables live in [`SimulationConfig`](super::simulation::SimulationConfig).

/// RGBA color representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
	pub r: u8,
	pub g: u8,
	pub b: u8,
	pub a: f64,
}

impl Color {
	pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b, a: 1.0 }
	}

	pub const fn rgba(r: u8, g: u8, b: u8, a: f64) -> Self {
		Self { r, g, b, a }
	}

	pub fn with_alpha(self, a: f64) -> Self {
		Self { a, ..self }
	}

	/// Parses `#rrggbb`, `#rgb`, `rgb()` and `rgba()`.
	/// Anything else yields `None` so callers can pick their own fallback.
	pub fn parse(s: &str) -> Option<Self> {
		let s = s.trim();
		if let Some(hex) = s.strip_prefix('#') {
			let channel = |i: usize, len: usize| u8::from_str_radix(hex.get(i..i + len)?, 16).ok();
			return match hex.len() {
				6 => Some(Color::rgb(channel(0, 2)?, channel(2, 2)?, channel(4, 2)?)),
				3 => Some(Color::rgb(
					channel(0, 1)? * 17,
					channel(1, 1)? * 17,
					channel(2, 1)? * 17,
				)),
				_ => None,
			};
		}

		let inner = s
			.strip_prefix("rgba(")
			.or_else(|| s.strip_prefix("rgb("))?
			.strip_suffix(')')?;
		let nums: Vec<&str> = inner.split(',').map(str::trim).collect();
		let r = nums.first()?.parse().ok()?;
		let g = nums.get(1)?.parse().ok()?;
		let b = nums.get(2)?.parse().ok()?;
		let a = match nums.get(3) {
			Some(a) => a.parse().ok()?,
			None => 1.0,
		};
		Some(Color::rgba(r, g, b, a))
	}

	pub fn to_css(self) -> String {
		if (self.a - 1.0).abs() < 0.001 {
			format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
		} else {
			format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
		}
	}

	/// Whether dark text or dark marks stay readable on top of this colour.
	pub fn is_light(self) -> bool {
		let luma = 0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64;
		luma > 140.0
	}
}

/// Node geometry in graph units.
#[derive(Clone, Debug)]
pub struct Dimensions {
	/// Width and height of the heart drawn for the root.
	pub root_size: f64,
	pub child_width: f64,
	pub child_height: f64,
	pub stroke_width: f64,
	pub root_stroke_width: f64,
	pub child_stroke_width: f64,
	/// Offset of the hard drop shadow behind every node.
	pub shadow_offset: f64,
	/// Inset of the label box inside a child card.
	pub label_padding: f64,
}

/// Complete visual theme.
#[derive(Clone, Debug)]
pub struct Theme {
	pub background: Color,
	pub foreground: Color,
	/// Grid line colour of the canvas backdrop.
	pub grid: Color,
	/// Grid spacing in screen pixels.
	pub grid_spacing: f64,
	/// Swatches offered by the edit dialog.
	pub palette: Vec<Color>,
	pub dimensions: Dimensions,
	pub font_family: &'static str,
}

impl Theme {
	/// Brutalist black-on-white look.
	pub fn blueprint() -> Self {
		Self {
			background: Color::rgb(255, 255, 255),
			foreground: Color::rgb(0, 0, 0),
			grid: Color::rgba(0, 0, 0, 0.03),
			grid_spacing: 40.0,
			palette: vec![
				Color::rgb(255, 255, 255), // White
				Color::rgb(255, 0, 0),     // Neon red
				Color::rgb(0, 0, 255),     // Hyper blue
				Color::rgb(255, 255, 0),   // Warning yellow
				Color::rgb(0, 255, 0),     // Terminal green
				Color::rgb(255, 0, 255),   // Magenta
				Color::rgb(0, 255, 255),   // Cyan
				Color::rgb(245, 245, 245), // Light grey
			],
			dimensions: Dimensions {
				root_size: 120.0,
				child_width: 200.0,
				child_height: 100.0,
				stroke_width: 2.0,
				root_stroke_width: 4.0,
				child_stroke_width: 3.0,
				shadow_offset: 6.0,
				label_padding: 10.0,
			},
			font_family: "'Space Mono', monospace",
		}
	}
}

impl Default for Theme {
	fn default() -> Self {
		Self::blueprint()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_hex_forms() {
		assert_eq!(Color::parse("#ff0000"), Some(Color::rgb(255, 0, 0)));
		assert_eq!(Color::parse("#0f0"), Some(Color::rgb(0, 255, 0)));
		assert_eq!(Color::parse("#12345"), None);
		assert_eq!(Color::parse("#gg0000"), None);
	}

	#[test]
	fn parses_functional_forms() {
		assert_eq!(Color::parse("rgb(1, 2, 3)"), Some(Color::rgb(1, 2, 3)));
		assert_eq!(
			Color::parse("rgba(255,255,255,0.9)"),
			Some(Color::rgba(255, 255, 255, 0.9))
		);
		assert_eq!(Color::parse("hsl(0, 0%, 0%)"), None);
	}

	#[test]
	fn palette_round_trips_through_css() {
		for color in Theme::default().palette {
			assert_eq!(Color::parse(&color.to_css()), Some(color));
		}
	}

	#[test]
	fn lightness() {
		assert!(Color::rgb(255, 255, 0).is_light());
		assert!(!Color::rgb(0, 0, 255).is_light());
	}
}
