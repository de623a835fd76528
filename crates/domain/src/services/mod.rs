//! Domain services: POS contract, reconciliation and order dispatch.
//!
//! Services depend only on the store and gateway traits, so they run the same
//! against PostgreSQL and the in-memory store.

pub mod dispatch;
pub mod hierarchy;
pub mod notification;
pub mod pos;
pub mod reconcile;

pub use dispatch::{DispatchError, DispatchOutcome, OrderDispatcher, SkipReason};
pub use hierarchy::{
    HierarchyOutcome, HierarchyReconciler, HierarchyWarning, UnresolvedReason, DEFAULT_MAX_PASSES,
};
pub use notification::{
    ActivationNotice, ActivationNotifier, Language, MockActivationNotifier, NotificationResult,
};
pub use pos::{
    MockPosGateway, Nomenclature, PosError, PosGateway, PosOrderRequest, PosResult,
    RemoteGroup, RemoteOrganization, RemoteProduct, RemoteSection, TerminalGroupBucket,
};
pub use reconcile::{reconcile_flat, FlatOutcome, ReconcileCounts, RecordError};
