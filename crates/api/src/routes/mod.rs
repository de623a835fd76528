//! HTTP route handlers.

pub mod health;
pub mod notifications;
pub mod orders;
pub mod sync;
