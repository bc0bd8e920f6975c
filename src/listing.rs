//! Sequential listing-table scrape
//!
//! Walks the rendered listing table for a region, once per school level
//! (SD and MI), reading only the requested list columns plus the per-row
//! link used later by the detail stage. One browser session covers both
//! levels; it is closed before the detail pool starts.

use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::record::{Field, FieldSet, Record};
use crate::session::{navigate, wait_for_elements, BrowserSession, SessionManager, SessionMode};
use crate::{Config, ScrapeError};

/// (level label, portal level code); SD and MI share the same table layout.
const LEVELS: [(&str, &str); 2] = [("SD", "5"), ("MI", "9")];

const ROW_SELECTOR: &str = "table#table1 tbody tr";

/// Switches the data table to 100 rows per page, when the control exists.
const SET_PAGE_LENGTH_JS: &str = r#"
    (() => {
        const sel = document.querySelector("select[name='table1_length']");
        if (sel) {
            sel.value = "100";
            sel.dispatchEvent(new Event("change", { bubbles: true }));
        }
    })()
"#;

/// One listing row: the partial record plus the link to its reference page.
#[derive(Debug, Clone)]
pub struct ListingRow {
    pub record: Record,
    pub link: Option<String>,
}

pub struct ListingScraper {
    config: Config,
    sessions: SessionManager,
}

impl ListingScraper {
    pub fn new(config: Config, sessions: SessionManager) -> Self {
        Self { config, sessions }
    }

    /// Scrapes both school levels for a region code. The session is closed
    /// on every exit path.
    pub async fn scrape(
        &self,
        region_code: &str,
        fields: &FieldSet,
    ) -> Result<Vec<ListingRow>, ScrapeError> {
        let mut session = self.sessions.open(SessionMode::Listing).await?;
        let result = self.scrape_levels(&session, region_code, fields).await;
        session.close().await;
        result
    }

    async fn scrape_levels(
        &self,
        session: &BrowserSession,
        region_code: &str,
        fields: &FieldSet,
    ) -> Result<Vec<ListingRow>, ScrapeError> {
        let mut rows = Vec::new();

        for (label, level_code) in LEVELS {
            let url = format!(
                "{}/{}/3/all/{}/all",
                self.config.listing_base_url, region_code, level_code
            );
            debug!("Scraping {} listing: {}", label, url);

            let page = session.open_page("about:blank").await?;
            navigate(&page, &url, self.config.page_load_timeout).await?;
            wait_for_elements(&page, ROW_SELECTOR, self.config.element_wait_timeout).await?;

            // Best effort; the default page length still yields rows.
            if page.evaluate(SET_PAGE_LENGTH_JS).await.is_ok() {
                sleep(Duration::from_secs(1)).await;
            }

            let level_rows = self.read_rows(&page, fields).await?;
            info!("{}: {} rows for region {}", label, level_rows.len(), region_code);
            rows.extend(level_rows);

            let _ = page.close().await;
        }

        Ok(rows)
    }

    async fn read_rows(
        &self,
        page: &Page,
        fields: &FieldSet,
    ) -> Result<Vec<ListingRow>, ScrapeError> {
        let elements = page
            .find_elements(ROW_SELECTOR)
            .await
            .map_err(|e| ScrapeError::PageError(e.to_string()))?;

        let mut rows = Vec::with_capacity(elements.len());
        for element in &elements {
            rows.push(self.read_row(element, fields).await);
        }
        Ok(rows)
    }

    /// Reads one table row. A missing cell leaves its field unset; the
    /// aggregator's finalize pass turns that into the sentinel.
    async fn read_row(&self, row: &Element, fields: &FieldSet) -> ListingRow {
        let mut record = Record::new();

        for (field, selector) in [
            (Field::NamaSekolah, "td:nth-child(3)"),
            (Field::Npsn, "td:nth-child(2)"),
            (Field::Kelurahan, "td:nth-child(5)"),
            (Field::Status, "td:nth-child(6)"),
        ] {
            if !fields.contains(field) {
                continue;
            }
            if let Some(text) = cell_text(row, selector).await {
                record.set(field, text);
            }
        }

        let link = match row.find_element("a").await {
            Ok(anchor) => anchor.attribute("href").await.ok().flatten(),
            Err(_) => None,
        };

        ListingRow { record, link }
    }
}

async fn cell_text(row: &Element, selector: &str) -> Option<String> {
    let cell = row.find_element(selector).await.ok()?;
    let text = cell.inner_text().await.ok()??;
    Some(text.trim().to_string())
}
