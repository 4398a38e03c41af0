//! Port traits for the hexagonal architecture.

mod repository;

pub use repository::LedgerRepository;
