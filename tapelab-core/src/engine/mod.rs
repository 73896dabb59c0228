//! Event scheduler and dispatch loop.

pub mod controller;
pub mod queue;

pub use controller::BacktestController;
pub use queue::EventQueue;
