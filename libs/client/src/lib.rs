//! Client library for the Cirrus infrastructure-management REST API.
//!
//! The server tracks cloud resources (providers, instances, VMs) as named
//! collections and runs state-changing operations asynchronously. This crate
//! provides the pieces a caller needs to drive it:
//!
//! - [`rest::RestClient`]: authenticated transport with token caching.
//! - [`query`]: structured filter expressions executed against collections.
//! - [`tracker::Tracker`]: polls an asynchronous operation to completion.
//! - [`resolver::Provider`]: maps human resource names to server identifiers.
//! - [`payload`]: provision payload builders per cloud provider.
//!
//! All components return typed errors or structured outcomes; nothing in
//! this crate prints to a user-facing surface.

pub mod error;
pub mod payload;
pub mod query;
pub mod resolver;
pub mod resource;
pub mod rest;
pub mod settings;
pub mod tracker;

pub use error::{ClientError, Result};
pub use query::{Clause, Condition, Connective, FilterExpr, FilterOp};
pub use resource::Resource;
pub use rest::RestClient;
pub use settings::Settings;
pub use tracker::{Outcome, RequestCollection, Tracker, TrackerConfig};
