/// API route handlers
///
/// Each module holds the handlers and request/response DTOs for one
/// resource. The router in `crate::app` wires them together.

pub mod auth;
pub mod board_access;
pub mod boards;
pub mod health;
pub mod stages;
pub mod summary;
pub mod tags;
pub mod tasks;
pub mod users;
