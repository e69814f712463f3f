//! bladematch-core: Core library for bladematch
//!
//! Finds a compatible wiper blade for a vehicle and the marketplace links to
//! buy it, from free text or guided navigation.
//!
//! # Architecture
//!
//! ```text
//! query → SearchEngine (synonyms, fuzzy scoring) → candidate vehicles
//!                                   ↓
//!             Resolver (mount → frame → type → kit | single/side) → links
//!                                   ↓
//!          Navigator ⇄ SessionTokenStore (short tokens ↔ selection state)
//! ```
//!
//! # Modules
//!
//! - `catalog`: Vehicle, frame, blade-type and purchase-link tables
//! - `synonyms`: Brand canonical ↔ alias table
//! - `search`: Fuzzy, synonym-aware vehicle matching
//! - `resolver`: Hierarchical fitment narrowing and link validation
//! - `selection`: Per-stage selection payloads
//! - `token_store`: Bounded LRU session-token store
//! - `finder`: `PartsFinder` facade over the above
//! - `navigator`: Token-driven step flow used by interactive front ends
//! - `favorites`: Per-user favorites seam plus an in-memory store
//! - `conversation`: Per-user awaiting-input state
//! - `config`: TOML configuration
//! - `logging`: `tracing` subscriber bootstrap
//!
//! This crate forbids unsafe code.

#![forbid(unsafe_code)]

pub mod catalog;
pub mod config;
pub mod conversation;
pub mod error;
pub mod favorites;
pub mod finder;
pub mod logging;
pub mod navigator;
pub mod resolver;
pub mod search;
pub mod selection;
pub mod synonyms;
pub mod token_store;

pub use catalog::{Catalog, PartsCatalog, Vehicle, VehicleKey};
pub use error::{Error, LookupError, Result};
pub use finder::PartsFinder;
pub use navigator::Navigator;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
