//! Bounded detail-enrichment pool
//!
//! Dispatches every enrichment task onto the runtime behind a fixed-size
//! semaphore, then joins all of them before returning: exactly one output
//! record per input task, in arbitrary completion order. Each worker owns
//! its browser session for the lifetime of its task; failures degrade the
//! task to its partial record instead of aborting the batch, and there is
//! no task-level retry.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::normalize::{clean_dash, normalize_email, normalize_phone, normalize_url};
use crate::record::{EnrichmentTask, Field, FieldSet, Record};
use crate::resolver::LinkResolver;
use crate::session::{navigate, wait_for_element, BrowserSession, SessionManager, SessionMode};
use crate::{Config, ScrapeError};

use chromiumoxide::element::Element;

const INFO_SELECTOR: &str = "div.grid div.flex";
const COUNT_SELECTOR: &str = "section div.grid div.flex";

/// Whether any requested field lives in the labelled info grid.
fn wants_info(fields: &FieldSet) -> bool {
    [
        Field::KepalaSekolah,
        Field::Telepon,
        Field::Email,
        Field::Website,
        Field::Yayasan,
    ]
    .iter()
    .any(|f| fields.contains(*f))
}

/// Whether any requested field lives in the statistics section.
fn wants_counts(fields: &FieldSet) -> bool {
    fields.contains(Field::SiswaLakiLaki) || fields.contains(Field::SiswaPerempuan)
}

#[derive(Clone)]
pub struct DetailPool {
    config: Config,
    sessions: SessionManager,
    resolver: LinkResolver,
}

impl DetailPool {
    pub fn new(config: Config, sessions: SessionManager, resolver: LinkResolver) -> Self {
        Self {
            config,
            sessions,
            resolver,
        }
    }

    /// Enriches every task and returns exactly one record per task.
    ///
    /// Full barrier: all tasks finish before anything is returned. A task
    /// that panics still contributes its partial record.
    pub async fn enrich(&self, tasks: Vec<EnrichmentTask>, fields: &FieldSet) -> Vec<Record> {
        if tasks.is_empty() {
            return Vec::new();
        }
        info!(
            "Enriching {} records with {} workers",
            tasks.len(),
            self.config.workers
        );

        let semaphore = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let mut handles = Vec::with_capacity(tasks.len());

        for task in tasks {
            let pool = self.clone();
            let fields = fields.clone();
            let semaphore = semaphore.clone();
            let fallback = task.partial.clone();

            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return task.partial,
                };
                pool.run_task(task, &fields).await
            });
            handles.push((handle, fallback));
        }

        let mut records = Vec::with_capacity(handles.len());
        for (handle, fallback) in handles {
            match handle.await {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Detail task aborted: {}", e);
                    records.push(fallback);
                }
            }
        }
        records
    }

    /// One worker's task: resolve, open a detail session, extract the
    /// requested fields, always close the session, merge.
    async fn run_task(&self, task: EnrichmentTask, fields: &FieldSet) -> Record {
        let EnrichmentTask { link, partial } = task;

        // NotFound short-circuits before any browser is launched.
        let Some(profile_id) = self.resolver.resolve(&link).await else {
            debug!("No profile id behind {}, keeping partial record", link);
            return partial;
        };

        let url = format!("{}/{}", self.config.profile_base_url, profile_id);

        let mut session = match self.sessions.open(SessionMode::Detail).await {
            Ok(session) => session,
            Err(e) => {
                warn!("Detail session unavailable for {}: {}", url, e);
                return partial;
            }
        };

        let extracted = self.extract_detail(&session, &url, fields).await;
        session.close().await;

        let mut record = partial;
        match extracted {
            Ok(detail) => record.merge_detail(detail),
            Err(e) => warn!("Detail extraction failed for {}: {}", url, e),
        }
        record
    }

    /// Extracts the requested detail fields from a profile page. Each field
    /// is attempted independently; a single failed lookup sets its field to
    /// the sentinel (directly or via the finalize pass) and never aborts
    /// the rest.
    async fn extract_detail(
        &self,
        session: &BrowserSession,
        url: &str,
        fields: &FieldSet,
    ) -> Result<Record, ScrapeError> {
        let page = session.open_page("about:blank").await?;
        navigate(&page, url, self.config.page_load_timeout).await?;
        sleep(Duration::from_secs(1)).await;

        let mut detail = Record::new();

        if fields.contains(Field::Alamat) {
            let address =
                match wait_for_element(&page, "h1 + p", self.config.element_wait_timeout).await {
                    Ok(element) => element_text(&element).await,
                    Err(_) => None,
                };
            detail.set(Field::Alamat, clean_dash(address.as_deref().unwrap_or("")));
        }

        if wants_info(fields) {
            // The info grid is client-rendered; reading before it exists
            // would collapse every info field to the sentinel.
            match wait_for_element(&page, INFO_SELECTOR, self.config.element_wait_timeout).await {
                Ok(_) => {
                    if let Ok(blocks) = page.find_elements(INFO_SELECTOR).await {
                        for block in &blocks {
                            self.read_info_block(block, fields, &mut detail).await;
                        }
                    }
                }
                Err(_) => debug!("Info grid never rendered on {}", url),
            }
        }

        if wants_counts(fields) {
            // The statistics section renders last; wait for it separately.
            if wait_for_element(&page, COUNT_SELECTOR, self.config.element_wait_timeout)
                .await
                .is_err()
            {
                debug!("Statistics section never rendered on {}", url);
            } else if let Ok(blocks) = page.find_elements(COUNT_SELECTOR).await {
                for block in &blocks {
                    let Some(label) = child_text(block, "div.text-slate-600").await else {
                        continue;
                    };
                    let Some(raw) = child_text(block, "div.text-2xl").await else {
                        continue;
                    };
                    let label = label.to_lowercase();
                    let value = clean_dash(&raw);

                    if label.contains("laki") && fields.contains(Field::SiswaLakiLaki) {
                        detail.set(Field::SiswaLakiLaki, value.clone());
                    }
                    if label.contains("perempuan") && fields.contains(Field::SiswaPerempuan) {
                        detail.set(Field::SiswaPerempuan, value);
                    }
                }
            }
        }

        let _ = page.close().await;
        Ok(detail)
    }

    /// One labelled block of the profile info grid: the grey label decides
    /// which field the block feeds, the emphasised child carries the value.
    async fn read_info_block(&self, block: &Element, fields: &FieldSet, detail: &mut Record) {
        let Some(label) = child_text(block, ".text-slate-500").await else {
            return;
        };
        let label = label.to_lowercase();

        if label.contains("kepala") && fields.contains(Field::KepalaSekolah) {
            if let Some(value) = child_text(block, ".font-semibold").await {
                detail.set(Field::KepalaSekolah, clean_dash(&value));
            }
        } else if label.contains("telepon") && fields.contains(Field::Telepon) {
            if let Some(value) = child_text(block, "a").await {
                detail.set(Field::Telepon, normalize_phone(&value));
            }
        } else if label.contains("email") && fields.contains(Field::Email) {
            if let Some(value) = child_text(block, "a").await {
                detail.set(Field::Email, normalize_email(&value));
            }
        } else if label.contains("website") && fields.contains(Field::Website) {
            // The href is the reliable value here; the anchor text is often
            // a shortened display string.
            let href = match block.find_element("a").await {
                Ok(anchor) => anchor.attribute("href").await.ok().flatten(),
                Err(_) => None,
            };
            detail.set(Field::Website, normalize_url(href.as_deref().unwrap_or("")));
        } else if label.contains("yayasan") && fields.contains(Field::Yayasan) {
            if let Some(value) = child_text(block, ".font-semibold").await {
                detail.set(Field::Yayasan, clean_dash(&value));
            }
        }
    }
}

async fn element_text(element: &Element) -> Option<String> {
    let text = element.inner_text().await.ok()??;
    Some(text.trim().to_string())
}

async fn child_text(block: &Element, selector: &str) -> Option<String> {
    let child = block.find_element(selector).await.ok()?;
    element_text(&child).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionRegistry;

    fn local_pool() -> DetailPool {
        let config = Config {
            http_retries: 0,
            ..Default::default()
        };
        let registry = Arc::new(SessionRegistry::new());
        let sessions = SessionManager::new(config.clone(), registry);
        let resolver = LinkResolver::new(&config).unwrap();
        DetailPool::new(config, sessions, resolver)
    }

    fn partial(name: &str) -> Record {
        let mut record = Record::new();
        record.set(Field::NamaSekolah, name.to_string());
        record
    }

    #[tokio::test]
    async fn one_record_per_task_even_when_nothing_resolves() {
        let pool = local_pool();
        let fields = FieldSet::parse(&["Nama Sekolah", "Email"]).unwrap();

        // Unroutable links: every resolution is NotFound, so no browser is
        // ever launched and each task short-circuits to its partial record.
        let tasks: Vec<EnrichmentTask> = (0..3)
            .map(|i| {
                EnrichmentTask::new(
                    format!("http://127.0.0.1:1/ref/{i}"),
                    partial(&format!("SD {i}")),
                )
            })
            .collect();

        let records = pool.enrich(tasks, &fields).await;
        assert_eq!(records.len(), 3);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.get(Field::NamaSekolah), Some(format!("SD {i}").as_str()));
            // No detail keys were added by the pool itself.
            assert_eq!(record.get(Field::Email), None);
        }
    }

    // An info-only field set (no Alamat) still takes the info-grid render
    // barrier; a counts-only set still takes the statistics barrier.
    #[test]
    fn section_barriers_gate_on_requested_fields() {
        let email_only = FieldSet::parse(&["Nama Sekolah", "Email"]).unwrap();
        assert!(wants_info(&email_only));
        assert!(!wants_counts(&email_only));

        let counts_only = FieldSet::parse(&["Jumlah Siswa Laki-laki"]).unwrap();
        assert!(!wants_info(&counts_only));
        assert!(wants_counts(&counts_only));

        let list_only = FieldSet::parse(&["Nama Sekolah", "NPSN"]).unwrap();
        assert!(!wants_info(&list_only));
        assert!(!wants_counts(&list_only));
    }

    #[tokio::test]
    async fn empty_task_list_yields_empty_output() {
        let pool = local_pool();
        let fields = FieldSet::parse(&["Nama Sekolah", "Email"]).unwrap();
        assert!(pool.enrich(Vec::new(), &fields).await.is_empty());
    }
}
