//! Book review service library
//!
//! Feature modules (auth, users, books, reviews) plus the application
//! wiring that mounts them on the HTTP server.

pub mod app;
pub mod extract;
pub mod modules;
pub mod state;
pub mod utils;

pub use app::Application;
pub use state::AppState;
