//! seq-server — sequential identifier issuance service
//!
//! Issues monotonically increasing, formatted identifiers (e.g.
//! `SG000001`, `INV2025-0001`) with a durable audit trail:
//!
//! - the counter engine advances per-prefix counters atomically in a
//!   fast store ([`counter`]);
//! - the formatter renders the numeric value through a per-prefix
//!   template ([`format`]);
//! - the issuer orchestrates config lookup, advance, format and audit
//!   publish ([`service`]);
//! - audit events flow through a durable queue into the audit store,
//!   inserted idempotently by a consumer pool ([`queue`], [`consumer`],
//!   [`db`]);
//! - the reconciler repairs counters from the audit store on startup
//!   ([`reconcile`]).
//!
//! The three backends sit behind traits so in-memory fakes can stand in
//! for tests; production runs Redis, PostgreSQL and RabbitMQ.
//!
//! Gap semantics: an issuance acknowledged to the caller whose audit
//! publish then fails leaves a numeric gap. Gaps are allowed and
//! surfaced through the status endpoint and reconciliation, never
//! repaired by rolling a counter back.

pub mod api;
pub mod config;
pub mod consumer;
pub mod counter;
pub mod db;
pub mod error;
pub mod format;
pub mod queue;
pub mod reconcile;
pub mod service;
pub mod state;
pub mod tasks;
