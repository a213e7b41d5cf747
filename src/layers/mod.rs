pub mod base;
pub mod grid;
pub mod macros;
pub mod manager;
