//! Repository implementations for database operations.

pub mod catalog;
pub mod group;
pub mod order;
pub mod organization;
pub mod product;
pub mod terminal_group;

pub use catalog::CatalogRepository;
pub use group::GroupRepository;
pub use order::OrderRepository;
pub use organization::OrganizationRepository;
pub use product::ProductRepository;
pub use terminal_group::{SectionRepository, TerminalGroupRepository};
