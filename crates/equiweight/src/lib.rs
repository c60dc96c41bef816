#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/equiweight/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod universe;

// Re-export main types from sub-crates
pub use equiweight_data as data;
pub use equiweight_index as index;
pub use equiweight_output as output;

// Re-export common universe types
pub use universe::{Universe, gics::GicsSector, sp500::Sp500Universe};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
