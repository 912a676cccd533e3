//! devorch - development orchestrator with code regeneration and hot restart.

pub mod config;
pub mod console;
pub mod dashboard;
pub mod display;
pub mod orchestrator;
pub mod process;
pub mod state;
pub mod watcher;
