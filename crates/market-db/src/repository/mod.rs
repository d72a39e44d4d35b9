//! # Repository Module
//!
//! Read/insert access to the catalog collaborators the inventory core
//! depends on. Full CRUD for these entities lives outside this workspace.
//!
//! ## Repository Pattern
//! ```text
//! InventoryService
//!      │
//!      │  unit price lookup, sale row, branch of sale
//!      ▼
//! ProductRepository / BranchRepository / SaleRepository
//!      │
//!      │  SQL Query
//!      ▼
//! SQLite Database
//! ```
//!
//! Each repository exposes pool-level methods for callers and
//! connection-level helpers (`fetch_*`) for use inside an inventory
//! transaction.
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`] - Product insert, lookup, unit price
//! - [`BranchRepository`] - Branch insert and lookup
//! - [`SaleRepository`] - Sale creation and lookup

pub mod branch;
pub mod product;
pub mod sale;

pub use branch::BranchRepository;
pub use product::ProductRepository;
pub use sale::SaleRepository;
