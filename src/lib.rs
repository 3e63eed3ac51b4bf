/// Request validation and normalization shared by every entry point.
pub mod validation;

/// Bank account state and the balance rules it enforces on itself.
pub mod account;

/// Customers and customer id generation.
pub mod customer;

/// Immutable ledger entries recorded for each balance change.
pub mod ledger;

/// Storage interfaces, plus "in memory" implementation.
///
/// Engine and registration only talk to the traits, so a persistent
/// backend can be plugged in without touching business rules.
pub mod store;

/// Credit, debit, transfer and statement operations.
/// Coordinates validation, per-account locking and atomic commits.
pub mod engine;

/// Opening accounts and registering customers.
pub mod registration;

/// Server settings.
pub mod config;

/// REST surface and service bootstrap. Lives in the library so
/// integration tests can drive the exact same router as the binary.
pub mod api;
