pub mod config;
pub mod error;
pub mod output;
pub mod physics;
pub mod solver;
pub mod state;
