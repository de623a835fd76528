//! Domain models for the catalog mirror and order relay.

pub mod group;
pub mod localized;
pub mod order;
pub mod organization;
pub mod product;
pub mod terminal_group;

pub use group::{Group, GroupRecord};
pub use localized::LocalizedText;
pub use order::{
    order_total, CreateOrderItemRequest, CreateOrderRequest, ListOrdersQuery, NewOrder,
    NewOrderItem, Order, OrderItem, OrderStatus, OrderWithItems, UpdateOrderStatusRequest,
};
pub use organization::{Organization, OrganizationRecord};
pub use product::{merge_images, Product, ProductRecord};
pub use terminal_group::{Section, SectionRecord, TerminalGroup, TerminalGroupRecord};
