//! # Ledger Hex
//!
//! Application service layer and HTTP adapter for the ledger service.
//!
//! ## Architecture
//!
//! - `service/` - Application service (the transaction core orchestration)
//! - `reports/` - Weekly aggregate report generation
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! The service is generic over `R: LedgerRepository`, allowing
//! different repository implementations to be injected.

pub mod inbound;
mod reports;
pub mod service;


pub use service::LedgerService;
