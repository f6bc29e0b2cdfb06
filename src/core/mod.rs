//! Core business logic - framework-agnostic procurement operations.
//!
//! Every function takes a database connection and returns `Result`, so the HTTP layer
//! only parses requests and maps errors to responses.

pub mod auth;
pub mod gap_item;
pub mod gqr;
pub mod gqr_resolver;
pub mod item;
pub mod maintenance;
pub mod numbering;
pub mod pre_gr;
pub mod purchase_order;
pub mod sieve_size;
pub mod supplier;
pub mod unit;
pub mod user;
pub mod validate;
