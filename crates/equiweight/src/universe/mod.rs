//! Symbol universes the index selects from.

pub mod gics;
pub mod sp500;

pub use gics::GicsSector;
pub use sp500::{Constituent, Sp500Universe, UniverseSource};

/// Trait for stock universes.
pub trait Universe {
    /// Get all symbols in the universe.
    fn symbols(&self) -> Vec<String>;

    /// Check if a symbol is in the universe.
    fn contains(&self, symbol: &str) -> bool {
        self.symbols().iter().any(|s| s == symbol)
    }

    /// Get the number of constituents.
    fn size(&self) -> usize {
        self.symbols().len()
    }
}

impl Universe for Sp500Universe {
    fn symbols(&self) -> Vec<String> {
        self.symbols()
    }
}
