//! Content studio workflow engine: scripted multi-stage content workflows,
//! a simulated agent activity ledger, a cross-module context mailbox and
//! session-scoped persistence of demo state.

pub mod agent_activity;
pub mod brain;
pub mod config;
pub mod context;
pub mod demo_store;
pub mod headless;
pub mod paths;
pub mod persistence;
pub mod runtime;
pub mod state;
pub mod state_machine;
pub mod structured_logger;
pub mod workflow;

pub use runtime::Studio;
