//! Gridded tile layer
//!
//! Keeps a rectangular matrix of tiles covering the viewport plus a buffer
//! margin:
//! - layout of the matrix against the layer's tile lattice
//! - row and column shifting as the view pans, relayout on teleports and
//!   resolution changes
//! - center-out load scheduling and load-state notifications
//! - single-tile mode with a back-buffer across redraws

pub mod layer;
pub mod layout;
pub mod matrix;
pub mod scheduler;
pub mod trait_impl;

pub use layer::{GridLayer, GridStats};
pub use layout::{calculate_grid_layout, min_grid_size, plan_grid, GridLayout, LayoutPlan};
pub use matrix::TileGrid;
pub use scheduler::{load_edge, spiral_walk, LoadAccounting};
