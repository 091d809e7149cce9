//! Force-directed mind map of the reasons you love someone.
//!
//! A heart-shaped root node stands for the partner; every memory hangs off it
//! as a card that can grow children of its own. The layout is a d3-style
//! force simulation drawn on an HTML canvas with:
//! - Click-to-open context menu and edit dialog per node
//! - Node dragging, background panning and wheel zoom
//! - Per-node colour and picture
//! - Debounced persistence to `localStorage`
//!
//! # Example
//!
//! ```ignore
//! use partner_graph::components::mind_map::{Command, MindMapCanvas, PartnerHeader, Persistence};
//!
//! let inbox = RwSignal::new(Vec::<Command>::new());
//! let name = RwSignal::new(String::new());
//! view! {
//!     <PartnerHeader name=name inbox=inbox />
//!     <MindMapCanvas persistence=Persistence::browser() inbox=inbox partner_name=name />
//! }
//! ```

mod component;
pub mod interaction;
pub mod model;
mod overlay;
pub mod persistence;
pub mod quadtree;
mod render;
pub mod scene;
pub mod simulation;
pub mod store;
pub mod theme;
pub mod types;

pub use component::MindMapCanvas;
pub use model::{Command, MindMapModel};
pub use overlay::PartnerHeader;
pub use persistence::{Persistence, Snapshot};
pub use store::GraphStore;
pub use theme::Theme;
pub use types::{Graph, Link, Node, NodeId, NodeKind};
