//! Barnes-Hut quadtree for the many-body force.
//!
//! Cells far enough from the query point (`size² / θ² < distance²`) are
//! collapsed into a single body at their centre of mass, which keeps the
//! repulsion pass at O(n log n).

use super::types::Vec2;

/// Maximum bodies held by a leaf before it splits.
const MAX_LEAF_BODIES: usize = 4;

/// Cells smaller than this never split, so coincident bodies cannot recurse forever.
const MIN_CELL_SIZE: f64 = 1.0;

/// Squared distance below which the repulsion is softened.
const DISTANCE_MIN2: f64 = 1.0;

/// Displacement used when two bodies sit exactly on top of each other.
/// The sign depends on index order so that the pair separates.
pub fn jiggle(a: usize, b: usize) -> f64 {
	if a < b { 1e-6 } else { -1e-6 }
}

pub struct QuadTree {
	origin: Vec2,
	size: f64,
	mass: f64,
	center: Vec2,
	bodies: Vec<(usize, Vec2)>,
	children: Option<Box<[QuadTree; 4]>>,
}

impl QuadTree {
	fn empty(origin: Vec2, size: f64) -> Self {
		Self {
			origin,
			size,
			mass: 0.0,
			center: Vec2::ZERO,
			bodies: Vec::new(),
			children: None,
		}
	}

	/// Build a tree enclosing every position. Body `i` is `positions[i]`.
	pub fn build(positions: &[Vec2]) -> Self {
		let Some(first) = positions.first() else {
			return Self::empty(Vec2::ZERO, 1.0);
		};

		let (mut min, mut max) = (*first, *first);
		for p in positions {
			min.x = min.x.min(p.x);
			min.y = min.y.min(p.y);
			max.x = max.x.max(p.x);
			max.y = max.y.max(p.y);
		}
		let size = (max.x - min.x).max(max.y - min.y) + 2.0;

		let mut tree = Self::empty(Vec2::new(min.x - 1.0, min.y - 1.0), size);
		for (i, p) in positions.iter().enumerate() {
			tree.insert(i, *p);
		}
		tree
	}

	fn contains(&self, p: Vec2) -> bool {
		p.x >= self.origin.x
			&& p.x < self.origin.x + self.size
			&& p.y >= self.origin.y
			&& p.y < self.origin.y + self.size
	}

	fn insert(&mut self, index: usize, p: Vec2) {
		let mass = self.mass + 1.0;
		self.center = (self.center * self.mass + p) * (1.0 / mass);
		self.mass = mass;

		if let Some(children) = self.children.as_mut() {
			let q = quadrant_of(self.origin, self.size, p);
			children[q].insert(index, p);
			return;
		}

		self.bodies.push((index, p));
		if self.bodies.len() > MAX_LEAF_BODIES && self.size > MIN_CELL_SIZE {
			self.split();
		}
	}

	fn split(&mut self) {
		let half = self.size / 2.0;
		let o = self.origin;
		let mut children = Box::new([
			QuadTree::empty(o, half),
			QuadTree::empty(Vec2::new(o.x + half, o.y), half),
			QuadTree::empty(Vec2::new(o.x, o.y + half), half),
			QuadTree::empty(Vec2::new(o.x + half, o.y + half), half),
		]);
		for (index, p) in self.bodies.drain(..) {
			let q = quadrant_of(o, self.size, p);
			children[q].insert(index, p);
		}
		self.children = Some(children);
	}

	/// Sum of `delta / distance²` over every other body, as seen from body
	/// `index` at `p`. Multiply by strength and alpha to get a velocity change.
	pub fn accumulate(&self, index: usize, p: Vec2, theta2: f64) -> Vec2 {
		let mut acc = Vec2::ZERO;
		self.visit(index, p, theta2, &mut acc);
		acc
	}

	fn visit(&self, index: usize, p: Vec2, theta2: f64, acc: &mut Vec2) {
		if self.mass == 0.0 {
			return;
		}

		if let Some(children) = self.children.as_ref() {
			let d = self.center - p;
			let l = d.x * d.x + d.y * d.y;
			if !self.contains(p) && self.size * self.size / theta2 < l {
				*acc += d * (self.mass / soften(l));
				return;
			}
			for child in children.iter() {
				child.visit(index, p, theta2, acc);
			}
			return;
		}

		for &(other, q) in &self.bodies {
			if other == index {
				continue;
			}
			let mut d = q - p;
			if d.x == 0.0 && d.y == 0.0 {
				d.x = jiggle(index, other);
			}
			let l = d.x * d.x + d.y * d.y;
			*acc += d * (1.0 / soften(l));
		}
	}

	#[cfg(test)]
	fn mass(&self) -> f64 {
		self.mass
	}
}

/// Child slot (NW, NE, SW, SE) of the cell at `origin` that holds `p`.
fn quadrant_of(origin: Vec2, size: f64, p: Vec2) -> usize {
	let half = size / 2.0;
	let east = p.x >= origin.x + half;
	let south = p.y >= origin.y + half;
	match (east, south) {
		(false, false) => 0,
		(true, false) => 1,
		(false, true) => 2,
		(true, true) => 3,
	}
}

fn soften(l: f64) -> f64 {
	if l < DISTANCE_MIN2 {
		(DISTANCE_MIN2 * l).sqrt()
	} else {
		l
	}
}
