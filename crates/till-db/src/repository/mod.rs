//! # Repository Module
//!
//! Database repository implementations for the register schema.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Repositories abstract database access behind a clean API.          │
//! │                                                                     │
//! │  Register Engine                                                    │
//! │       │                                                             │
//! │       │  sessions.apply_ledger_amount(&mut tx, ...)                 │
//! │       ▼                                                             │
//! │  SessionRepository / TransactionRepository / ReportRepository       │
//! │       │                                                             │
//! │       │  SQL (tenant-scoped, tombstone-filtered)                    │
//! │       ▼                                                             │
//! │  SQLite Database                                                    │
//! │                                                                     │
//! │  Write-path methods take &mut SqliteConnection so an engine can     │
//! │  compose several of them inside ONE transaction - e.g. inserting a  │
//! │  ledger row and bumping the cached balance commit together.         │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`session::SessionRepository`] - session store (open/close/tombstone)
//! - [`transaction::TransactionRepository`] - append-only ledger + aggregates
//! - [`report::ReportRepository`] - report snapshots

pub mod report;
pub mod session;
pub mod transaction;
