//! Domain services.
//!
//! Handlers stay thin: they extract, call one service method, and map
//! `Option` results to 404. Services own validation, reference resolution
//! and search mirroring.

pub mod flow;
pub mod flow_app;
pub mod search_sync;
pub mod techno;

pub use flow::FlowService;
pub use flow_app::FlowAppService;
pub use search_sync::SearchSync;
pub use techno::TechnoService;
