//! Location and opening of the SQLite store.

use equiweight_data::{Result, SqliteStore};
use std::path::{Path, PathBuf};
use tracing::info;

/// Default data directory.
///
/// - Linux: `~/.local/share/equiweight/`
/// - macOS: `~/Library/Application Support/equiweight/`
/// - Windows: `%APPDATA%\equiweight\`
pub(crate) fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("equiweight")
}

/// Default database path.
pub(crate) fn default_database_path() -> PathBuf {
    default_data_dir().join("equiweight.db")
}

/// Open the store, creating its directory if needed.
pub(crate) fn open_store(path: &Path) -> Result<SqliteStore> {
    let store = SqliteStore::new(path)?;
    info!(path = %path.display(), "opened database");
    Ok(store)
}

/// Print database location and table sizes.
pub(crate) fn print_store_info(store: &SqliteStore, path: &Path) -> Result<()> {
    let stats = store.get_stats()?;
    println!("Database: {}", path.display());
    println!(
        "  Prices: {} rows, {} symbols",
        stats.price_rows, stats.unique_symbols
    );
    if let Some((first, last)) = store.price_date_range()? {
        println!("  Price dates: {first} to {last}");
    }
    println!(
        "  Index: {} composition rows, {} performance rows",
        stats.composition_rows, stats.performance_rows
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_path_layout() {
        let path = default_database_path();
        assert!(path.ends_with("equiweight/equiweight.db"));
        assert_eq!(path.parent(), Some(default_data_dir().as_path()));
    }
}
