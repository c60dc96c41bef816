//! S&P 500 constituents listing from Wikipedia.
//!
//! The page is fetched as wikitext through the MediaWiki parse API and the
//! `constituents` table is read row by row.

use crate::error::{DataError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const API_URL: &str = "https://en.wikipedia.org/w/api.php";
const PAGE: &str = "List_of_S&P_500_companies";
const USER_AGENT: &str = "equiweight/0.1 (index tracker)";

/// One row of the constituents table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Ticker symbol, with `.` replaced by `-` as Yahoo expects.
    pub symbol: String,
    /// Security name.
    pub name: String,
    /// GICS sector name.
    pub sector: String,
}

/// Client for the Wikipedia constituents listing.
#[derive(Debug, Clone)]
pub struct WikipediaListing {
    client: reqwest::Client,
    api_url: String,
}

impl WikipediaListing {
    /// Create a client for en.wikipedia.org.
    pub fn new() -> Result<Self> {
        Self::with_api_url(API_URL)
    }

    /// Create a client for another MediaWiki API endpoint.
    pub fn with_api_url(api_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            api_url: api_url.into(),
        })
    }

    /// Fetch and parse the current constituents.
    pub async fn fetch(&self) -> Result<Vec<Listing>> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "parse"),
                ("page", PAGE),
                ("prop", "wikitext"),
                ("format", "json"),
                ("formatversion", "2"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DataError::Http(format!("Wikipedia listing: HTTP {status}")));
        }

        let body: ParseResponse = response.json().await?;
        let listings = parse_constituents(&body.parse.wikitext)?;
        info!(count = listings.len(), "retrieved S&P 500 listing");
        Ok(listings)
    }
}

#[derive(Debug, Deserialize)]
struct ParseResponse {
    parse: ParsedPage,
}

#[derive(Debug, Deserialize)]
struct ParsedPage {
    wikitext: String,
}

/// Parse the `constituents` table out of the page wikitext.
///
/// Falls back to the first table on the page when none carries the
/// `constituents` id. Rows with fewer than three cells are ignored.
pub fn parse_constituents(wikitext: &str) -> Result<Vec<Listing>> {
    let table = find_table(wikitext)
        .ok_or_else(|| DataError::Parse("constituents table not found".to_string()))?;

    let mut listings = Vec::new();
    for row in table.split("\n|-") {
        let cells = row_cells(row);
        if cells.len() < 3 {
            continue;
        }
        let symbol = clean_cell(&cells[0]).replace('.', "-");
        if symbol.is_empty() {
            continue;
        }
        listings.push(Listing {
            symbol,
            name: clean_cell(&cells[1]),
            sector: clean_cell(&cells[2]),
        });
    }

    if listings.is_empty() {
        return Err(DataError::Parse(
            "constituents table has no rows".to_string(),
        ));
    }
    debug!(rows = listings.len(), "parsed constituents table");
    Ok(listings)
}

fn find_table(wikitext: &str) -> Option<&str> {
    let start = wikitext
        .find("id=\"constituents\"")
        .and_then(|pos| wikitext[..pos].rfind("{|"))
        .or_else(|| wikitext.find("{|"))?;
    let rest = &wikitext[start..];
    let end = rest.find("\n|}").unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Data cells of one table row; header (`!`) and table markup lines are skipped.
fn row_cells(row: &str) -> Vec<String> {
    let mut cells = Vec::new();
    for line in row.lines() {
        let line = line.trim();
        let Some(content) = line.strip_prefix('|') else {
            continue;
        };
        if content.starts_with('}') || content.starts_with('+') || content.starts_with('-') {
            continue;
        }
        cells.extend(split_cells(content));
    }
    cells
}

/// Split a row line on `||`, ignoring separators inside `{{ }}` and `[[ ]]`.
fn split_cells(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' | '[' => {
                depth += 1;
                current.push(c);
            }
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            '|' if depth == 0 && chars.peek() == Some(&'|') => {
                chars.next();
                cells.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    cells.push(current);
    cells
}

/// Strip wiki markup from a cell: templates keep their last argument, links
/// keep their label, references are dropped.
fn clean_cell(cell: &str) -> String {
    let mut text = cell;
    if let Some(pos) = text.find("<ref") {
        text = &text[..pos];
    }
    let text = text.trim();

    if let Some(inner) = text.strip_prefix("{{").and_then(|t| t.strip_suffix("}}")) {
        return inner.rsplit('|').next().unwrap_or(inner).trim().to_string();
    }

    let mut out = String::new();
    let mut rest = text;
    while let Some(open) = rest.find("[[") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find("]]") else {
            out.push_str(&rest[open..]);
            rest = "";
            break;
        };
        let link = &after[..close];
        out.push_str(link.rsplit('|').next().unwrap_or(link));
        rest = &after[close + 2..];
    }
    out.push_str(rest);
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIKITEXT: &str = r#"The S&P 500 tracks...

== S&P 500 component stocks ==
{| class="wikitable sortable" id="constituents"
! Symbol !! Security !! GICS Sector !! GICS Sub-Industry !! Headquarters Location !! Date added !! CIK !! Founded
|-
| {{NyseSymbol|MMM}} || [[3M]] || Industrials || Industrial Conglomerates || [[Saint Paul, Minnesota]] || 1957-03-04 || 0000066740 || 1902
|-
| {{NasdaqSymbol|AAPL}} || [[Apple Inc.]] || Information Technology || Technology Hardware, Storage & Peripherals || [[Cupertino, California]] || 1982-11-30 || 0000320193 || 1977
|-
| {{NyseSymbol|BRK.B}} || [[Berkshire Hathaway]]<ref>Class B shares</ref> || Financials || Multi-Sector Holdings || [[Omaha, Nebraska]] || 1976-06-30 || 0001067983 || 1839
|-
| {{NyseSymbol|GOOGL}}
| [[Alphabet Inc.|Alphabet Inc. (Class A)]]
| Communication Services
| Interactive Media & Services
|}

== Selected changes ==
{| class="wikitable" id="changes"
|-
| 2024-01-01 || X || Y
|}
"#;

    #[test]
    fn test_parse_constituents() {
        let listings = parse_constituents(WIKITEXT).unwrap();

        assert_eq!(listings.len(), 4);
        assert_eq!(
            listings[0],
            Listing {
                symbol: "MMM".to_string(),
                name: "3M".to_string(),
                sector: "Industrials".to_string(),
            }
        );
        assert_eq!(listings[1].symbol, "AAPL");
        assert_eq!(listings[1].sector, "Information Technology");
        assert_eq!(listings[2].symbol, "BRK-B");
        assert_eq!(listings[2].name, "Berkshire Hathaway");
        assert_eq!(listings[3].symbol, "GOOGL");
        assert_eq!(listings[3].name, "Alphabet Inc. (Class A)");
        assert_eq!(listings[3].sector, "Communication Services");
    }

    #[test]
    fn test_missing_table_is_an_error() {
        assert!(matches!(
            parse_constituents("no tables here"),
            Err(DataError::Parse(_))
        ));
        assert!(parse_constituents("{| class=\"wikitable\"\n! Symbol\n|}").is_err());
    }

    #[test]
    fn test_clean_cell() {
        assert_eq!(clean_cell(" {{NyseSymbol|BF.B}} "), "BF.B");
        assert_eq!(clean_cell("[[Link|Label]] Corp"), "Label Corp");
        assert_eq!(clean_cell("plain"), "plain");
    }
}
