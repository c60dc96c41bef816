#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/equiweight/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chain;
pub mod config;
pub mod engine;
pub mod error;
pub mod prices;
pub mod selector;
pub mod store;
pub mod types;

pub use chain::{ChainStep, DailyReturn, IndexLevel, ReturnChain, weighted_return};
pub use config::{DEFAULT_BASE_VALUE, DEFAULT_INDEX_SIZE, IndexConfig};
pub use engine::{ChainSeed, DayOutcome, IndexEngine, RunOptions, RunOutcome, SkipReason};
pub use error::{IndexError, Result, RunFailure};
pub use prices::PriceIndex;
pub use selector::{Selection, select};
pub use store::{IndexStore, MemoryStore};
pub use types::{CompositionEntry, PerformanceEntry, PriceRecord};
