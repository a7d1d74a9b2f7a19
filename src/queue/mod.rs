//! Serialization Queue Module
//!
//! Per-collection mutual exclusion for store operations.
//!
//! ## Responsibilities
//! - Admit every operation on a collection into a strict FIFO
//! - Run at most one operation per collection at a time
//! - Keep different collections fully independent
//! - Deliver each operation's result (or failure) back to its caller
//!
//! ## Structure
//! ```text
//!   caller ──enqueue("users", op)──┐
//!   caller ──enqueue("users", op)──┤      ┌──────────────────────┐
//!                                  ├────▶ │ lane "users" (FIFO)  │ ──▶ worker thread
//!   caller ──enqueue("orders", op)─┐      └──────────────────────┘
//!                                  │      ┌──────────────────────┐
//!                                  └────▶ │ lane "orders" (FIFO) │ ──▶ worker thread
//!                                         └──────────────────────┘
//! ```
//!
//! A lane is a single worker thread draining an unbounded channel. An
//! operation that returns an error or panics only fails its own caller; the
//! worker then picks up the next entry.
//!
//! Operations must not enqueue onto, and wait for, their own lane: the
//! lane is busy running them, so the wait never completes.

mod lane;
mod serial;

pub use serial::{Pending, SerialQueue};
