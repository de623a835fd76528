//! Application services: POS client, catalog sync, orders and notifications.

pub mod catalog_sync;
pub mod orders;
pub mod pos_client;
pub mod telegram;

pub use catalog_sync::{CatalogSync, SyncReport, SyncRunError, SyncScope, SyncSettings};
pub use orders::{OrderService, OrderServiceError, StatusChange};
pub use pos_client::IikoClient;
pub use telegram::TelegramNotifier;
