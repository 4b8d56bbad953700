//! Application layer orchestrating deposit settlement.
//!
//! `DepositService` combines the pure refund policy with the storage,
//! ledger and payment ports. It holds no state of its own beyond the
//! injected collaborators.

pub mod deposit_service;
pub mod event_replay;
