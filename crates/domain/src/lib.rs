//! Domain layer for the iiko bridge.
//!
//! This crate contains:
//! - Domain models (Organization, Group, Product, TerminalGroup, Section, Order)
//! - The persistent store contract and an in-memory implementation
//! - The POS gateway contract, catalog reconcilers and the order dispatcher

pub mod models;
pub mod services;
pub mod store;
