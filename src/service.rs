//! Scrape orchestration: listing stage, detail pool, aggregation, reaping
//!
//! The service is the enrichment entry point consumed by both the CLI and
//! the REST layer. Given a region name and a field set it runs the listing
//! stage, fans the rows out to the detail pool when any detail field was
//! requested, finalizes and sorts the result, and reaps any browser
//! process this run spawned.

use std::sync::Arc;
use tracing::{info, warn};

use crate::listing::ListingScraper;
use crate::reaper::reap_tracked;
use crate::record::{EnrichmentTask, FieldSet, Record};
use crate::registry::RegionRegistry;
use crate::resolver::LinkResolver;
use crate::session::{SessionManager, SessionRegistry};
use crate::worker::DetailPool;
use crate::{Config, ScrapeError};

pub struct ScrapeService {
    config: Config,
    regions: RegionRegistry,
    listing: ListingScraper,
    pool: DetailPool,
    registry: Arc<SessionRegistry>,
}

impl ScrapeService {
    pub fn new(config: Config) -> Result<Self, ScrapeError> {
        let regions = RegionRegistry::load(&config.registry_path)?;
        Self::with_regions(config, regions)
    }

    pub fn with_regions(config: Config, regions: RegionRegistry) -> Result<Self, ScrapeError> {
        let registry = Arc::new(SessionRegistry::new());
        let sessions = SessionManager::new(config.clone(), registry.clone());
        let resolver = LinkResolver::new(&config)?;
        let listing = ListingScraper::new(config.clone(), sessions.clone());
        let pool = DetailPool::new(config.clone(), sessions, resolver);

        Ok(Self {
            config,
            regions,
            listing,
            pool,
            registry,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn region_names(&self) -> Vec<String> {
        self.regions.names()
    }

    /// Scrapes one region. An unknown region name yields an empty list; an
    /// empty field set never gets here (rejected when the set is built).
    /// Exactly one record per listed school, each carrying the requested
    /// fields in order, sorted by the first requested field.
    pub async fn scrape(
        &self,
        region_name: &str,
        fields: &FieldSet,
    ) -> Result<Vec<Record>, ScrapeError> {
        let Some(code) = self.regions.lookup(region_name) else {
            warn!("Unknown region: {}", region_name);
            return Ok(Vec::new());
        };
        let code = code.to_string();
        info!("Scraping region {} (code {})", region_name, code);

        let rows = match self.listing.scrape(&code, fields).await {
            Ok(rows) => rows,
            Err(e) => {
                // The listing session may have leaked a process.
                self.reap().await;
                return Err(e);
            }
        };

        let records = if fields.needs_detail() {
            let mut records = Vec::new();
            let mut tasks = Vec::new();
            for row in rows {
                match row.link {
                    Some(link) => tasks.push(EnrichmentTask::new(link, row.record)),
                    // A row without a link cannot be enriched; its list
                    // fields still survive.
                    None => records.push(row.record),
                }
            }
            records.extend(self.pool.enrich(tasks, fields).await);
            records
        } else {
            rows.into_iter().map(|row| row.record).collect()
        };

        let finalized = finalize_records(records, fields);
        self.reap().await;

        info!(
            "Region {} done: {} records",
            region_name,
            finalized.len()
        );
        Ok(finalized)
    }

    /// Tracked-set reap, off the async runtime since the process scan is
    /// blocking.
    async fn reap(&self) {
        let registry = self.registry.clone();
        let _ = tokio::task::spawn_blocking(move || reap_tracked(&registry)).await;
    }
}

/// Shapes every record to the requested field set (order preserved,
/// sentinel-filled) and applies the deterministic final sort: ascending,
/// case-insensitive, by the first requested field. The sentinel sorts by
/// its literal character value.
pub fn finalize_records(records: Vec<Record>, fields: &FieldSet) -> Vec<Record> {
    let key = fields.sort_key();
    let mut out: Vec<Record> = records
        .into_iter()
        .map(|record| record.finalized(fields))
        .collect();
    out.sort_by(|a, b| {
        let a_key = a.get(key).unwrap_or_default().to_lowercase();
        let b_key = b.get(key).unwrap_or_default().to_lowercase();
        a_key.cmp(&b_key)
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::SENTINEL;
    use crate::record::Field;

    fn record_with(name: &str, email: Option<&str>) -> Record {
        let mut record = Record::new();
        record.set(Field::NamaSekolah, name.to_string());
        if let Some(email) = email {
            record.set(Field::Email, email.to_string());
        }
        record
    }

    #[test]
    fn finalize_sorts_case_insensitively() {
        let fields = FieldSet::parse(&["Nama Sekolah", "Email"]).unwrap();
        let records = vec![
            record_with("sd melati", None),
            record_with("SD Anggrek", Some("info@anggrek.sch.id")),
            record_with("MI Bina Umat", None),
        ];

        let sorted = finalize_records(records, &fields);
        let names: Vec<&str> = sorted
            .iter()
            .map(|r| r.get(Field::NamaSekolah).unwrap())
            .collect();
        assert_eq!(names, vec!["MI Bina Umat", "SD Anggrek", "sd melati"]);
    }

    #[test]
    fn finalize_fills_sentinel_and_keeps_field_order() {
        let fields = FieldSet::parse(&["Nama Sekolah", "Email"]).unwrap();
        let sorted = finalize_records(vec![record_with("SD 1", None)], &fields);

        assert_eq!(sorted.len(), 1);
        assert_eq!(sorted[0].len(), 2);
        assert_eq!(sorted[0].get(Field::Email), Some(SENTINEL));
    }

    #[test]
    fn sentinel_sorts_by_literal_value() {
        let fields = FieldSet::parse(&["Email"]).unwrap();
        let mut a = Record::new();
        a.set(Field::Email, "a@b.co".to_string());
        let dash = Record::new(); // finalizes to sentinel

        let sorted = finalize_records(vec![a, dash], &fields);
        // '-' (0x2d) sorts before 'a'.
        assert_eq!(sorted[0].get(Field::Email), Some(SENTINEL));
        assert_eq!(sorted[1].get(Field::Email), Some("a@b.co"));
    }
}
