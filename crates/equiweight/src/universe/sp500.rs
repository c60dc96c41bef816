//! S&P 500 universe with GICS sector classifications.

use crate::universe::gics::GicsSector;
use equiweight_data::{Listing, WikipediaListing};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Where a universe's symbols came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniverseSource {
    /// Parsed from the Wikipedia constituents table.
    Wikipedia,
    /// Built-in list of large US stocks.
    Fallback,
}

/// S&P 500 constituent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constituent {
    /// Yahoo symbol.
    pub symbol: String,
    /// Security name, when known.
    pub name: Option<String>,
    /// GICS sector, when the listing names a known one.
    pub sector: Option<GicsSector>,
}

impl Constituent {
    /// Create a constituent with a known sector.
    pub fn new(symbol: impl Into<String>, sector: GicsSector) -> Self {
        Self {
            symbol: symbol.into(),
            name: None,
            sector: Some(sector),
        }
    }
}

impl From<Listing> for Constituent {
    fn from(listing: Listing) -> Self {
        let sector = GicsSector::from_name(&listing.sector);
        Self {
            symbol: listing.symbol,
            name: (!listing.name.is_empty()).then_some(listing.name),
            sector,
        }
    }
}

/// S&P 500 universe in listing order.
#[derive(Debug, Clone)]
pub struct Sp500Universe {
    constituents: Vec<Constituent>,
    source: UniverseSource,
}

impl Sp500Universe {
    /// Universe from the built-in fallback list.
    pub fn fallback() -> Self {
        Self {
            constituents: fallback_constituents(),
            source: UniverseSource::Fallback,
        }
    }

    /// Universe from parsed listings, `None` when there are none.
    pub fn from_listings(listings: Vec<Listing>) -> Option<Self> {
        if listings.is_empty() {
            return None;
        }
        Some(Self {
            constituents: listings.into_iter().map(Constituent::from).collect(),
            source: UniverseSource::Wikipedia,
        })
    }

    /// Fetch the Wikipedia listing, falling back to the built-in list on any failure.
    pub async fn load(listing: &WikipediaListing) -> Self {
        match listing.fetch().await {
            Ok(listings) => match Self::from_listings(listings) {
                Some(universe) => {
                    info!(symbols = universe.constituents.len(), "retrieved S&P 500 symbols");
                    universe
                }
                None => {
                    warn!("S&P 500 listing was empty, using fallback symbols");
                    Self::fallback()
                }
            },
            Err(e) => {
                warn!(error = %e, "failed to fetch S&P 500 symbols, using fallback symbols");
                Self::fallback()
            }
        }
    }

    /// Keep only the first `max` constituents.
    pub fn take(mut self, max: usize) -> Self {
        self.constituents.truncate(max);
        self
    }

    /// Where the symbols came from.
    pub const fn source(&self) -> UniverseSource {
        self.source
    }

    /// Get all constituents.
    pub fn constituents(&self) -> &[Constituent] {
        &self.constituents
    }

    /// Get all symbols.
    pub fn symbols(&self) -> Vec<String> {
        self.constituents.iter().map(|c| c.symbol.clone()).collect()
    }

    /// Get the GICS sector for a symbol.
    pub fn sector(&self, symbol: &str) -> Option<GicsSector> {
        self.constituents
            .iter()
            .find(|c| c.symbol == symbol)
            .and_then(|c| c.sector)
    }

    /// Get all symbols in a specific sector.
    pub fn symbols_in_sector(&self, sector: GicsSector) -> Vec<String> {
        self.constituents
            .iter()
            .filter(|c| c.sector == Some(sector))
            .map(|c| c.symbol.clone())
            .collect()
    }

    /// Count of constituents per known sector.
    pub fn sector_counts(&self) -> BTreeMap<GicsSector, usize> {
        let mut counts = BTreeMap::new();
        for sector in self.constituents.iter().filter_map(|c| c.sector) {
            *counts.entry(sector).or_insert(0) += 1;
        }
        counts
    }
}

impl Default for Sp500Universe {
    fn default() -> Self {
        Self::fallback()
    }
}

/// Large US stocks used when the listing cannot be fetched.
fn fallback_constituents() -> Vec<Constituent> {
    use GicsSector::*;

    [
        ("AAPL", InformationTechnology),
        ("MSFT", InformationTechnology),
        ("GOOGL", CommunicationServices),
        ("AMZN", ConsumerDiscretionary),
        ("NVDA", InformationTechnology),
        ("TSLA", ConsumerDiscretionary),
        ("META", CommunicationServices),
        ("BRK-B", Financials),
        ("UNH", HealthCare),
        ("JNJ", HealthCare),
        ("JPM", Financials),
        ("V", Financials),
        ("PG", ConsumerStaples),
        ("MA", Financials),
        ("HD", ConsumerDiscretionary),
        ("CVX", Energy),
        ("LLY", HealthCare),
        ("ABBV", HealthCare),
        ("BAC", Financials),
        ("KO", ConsumerStaples),
        ("AVGO", InformationTechnology),
        ("PEP", ConsumerStaples),
        ("COST", ConsumerStaples),
        ("TMO", HealthCare),
        ("WMT", ConsumerStaples),
        ("DIS", CommunicationServices),
        ("ABT", HealthCare),
        ("ACN", InformationTechnology),
        ("VZ", CommunicationServices),
        ("ADBE", InformationTechnology),
        ("DHR", HealthCare),
        ("NFLX", CommunicationServices),
        ("TXN", InformationTechnology),
        ("NKE", ConsumerDiscretionary),
        ("RTX", Industrials),
        ("QCOM", InformationTechnology),
        ("CRM", InformationTechnology),
        ("NEE", Utilities),
        ("ORCL", InformationTechnology),
        ("INTC", InformationTechnology),
        ("AMD", InformationTechnology),
        ("IBM", InformationTechnology),
        ("GS", Financials),
        ("INTU", InformationTechnology),
        ("CAT", Industrials),
        ("HON", Industrials),
        ("SPGI", Financials),
        ("BKNG", ConsumerDiscretionary),
        ("LOW", ConsumerDiscretionary),
        ("BA", Industrials),
        ("SBUX", ConsumerDiscretionary),
        ("GILD", HealthCare),
        ("AXP", Financials),
        ("BLK", Financials),
        ("SYK", HealthCare),
        ("MDLZ", ConsumerStaples),
        ("ADP", Industrials),
        ("ISRG", HealthCare),
        ("TGT", ConsumerStaples),
        ("LRCX", InformationTechnology),
        ("ADI", InformationTechnology),
        ("VRTX", HealthCare),
        ("PLD", RealEstate),
        ("MU", InformationTechnology),
        ("ANTM", HealthCare),
        ("CI", HealthCare),
        ("SO", Utilities),
        ("ZTS", HealthCare),
        ("MMM", Industrials),
        ("FIS", Financials),
        ("DUK", Utilities),
        ("CSX", Industrials),
        ("BSX", HealthCare),
        ("EQIX", RealEstate),
        ("CL", ConsumerStaples),
        ("ITW", Industrials),
        ("NSC", Industrials),
        ("AON", Financials),
        ("CME", Financials),
        ("WM", Industrials),
        ("SHW", Materials),
        ("GD", Industrials),
        ("USB", Financials),
        ("PNC", Financials),
        ("MCO", Financials),
        ("COP", Energy),
        ("EMR", Industrials),
        ("WELL", RealEstate),
        ("ICE", Financials),
        ("KLAC", InformationTechnology),
        ("APD", Materials),
        ("RACE", ConsumerDiscretionary),
        ("NOC", Industrials),
        ("F", ConsumerDiscretionary),
        ("GM", ConsumerDiscretionary),
        ("PYPL", Financials),
        ("ATVI", CommunicationServices),
        ("UBER", Industrials),
        ("ABNB", ConsumerDiscretionary),
        ("SNOW", InformationTechnology),
        ("COIN", Financials),
    ]
    .into_iter()
    .map(|(symbol, sector)| Constituent::new(symbol, sector))
    .collect()
}
