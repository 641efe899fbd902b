//! 2D canvas view of a [`GraphModel`](crate::graph::GraphModel) over the
//! `force_graph` simulation.

mod component;
mod render;
mod state;

pub use component::{ForceGraphCanvas, Highlight};
