//! Force-directed layout for the working graph.
//!
//! The engine keeps node positions in flat buffers that a renderer can read
//! every frame, and advances them with a d3-force style simulation: springs
//! along edges, Barnes–Hut repulsion, and a centering pull, all cooled by a
//! decaying alpha.

pub mod config;
pub mod engine;
mod forces;

pub use config::LayoutConfig;
pub use engine::{LayoutEngine, Phase, SimulationState};
