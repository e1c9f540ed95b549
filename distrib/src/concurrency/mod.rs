//! Coordination primitives for a distribution run.
//!
//! A run has three stages connected by bounded channels:
//!
//! ```text
//! dispatcher ──handoff──► worker pool ──outbound──► collector
//!      ▲                       │                        │
//!      └──── counters ◄────────┴───── counters ◄────────┘
//! ```
//!
//! Control flows backwards through two primitives:
//!
//! - [`counters`] holds the dispatch cursor and the sent, received and want counts. The
//!   collector reads them to decide when to stop; the dispatcher and workers update them.
//! - [`shutdown`] is a one-shot broadcast signal. Every send and receive in every stage races
//!   against it, so once it closes nothing in the pipeline can stay blocked.

pub mod counters;
pub mod shutdown;
