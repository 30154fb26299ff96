//! Struct metadata deduplication
//!
//! Repeated record shapes are sent once as a field-name list and afterwards
//! as a small integer id. Two scopes share one id space split by parity.
//!
//! # Architecture
//!
//! ```text
//! MetaPool
//!   ├─→ SlotTable(context)    id = rank*2 + 1   kept across reset(), LRU-bounded
//!   │     └─→ RankAllocator   Free: [2, 3]
//!   ├─→ SlotTable(transient)  id = rank*2       dropped at every reset()
//!   │     └─→ RankAllocator   Free: []
//!   └─→ Clock (coarse ticks, stamps every registration)
//!
//! id 0 → empty signature, shared by both scopes
//! ```
//!
//! A decoder keeps the same pair of tables and replays the registrations and
//! resets it infers from the stream, so both sides assign identical ids.

pub mod bench;
pub mod clock;
pub mod config;
pub mod pool;
pub mod rank;
pub mod signature;
pub mod slot_table;

pub use clock::{Clock, CoarseClock, ManualClock, DEFAULT_CLOCK_INTERVAL};
pub use config::{MetaPoolConfig, DEFAULT_CONTEXT_CAPACITY};
pub use pool::{MetaPool, PoolStats};
pub use rank::RankAllocator;
pub use signature::StructSignature;
pub use slot_table::{Registration, Scope, SlotEntry, SlotTable, TableStats, EMPTY_STRUCT_ID};
