//! Harvest run over the region labels
//!
//! For every region the payload is taken from the cache when present and
//! fetched otherwise. Its country label keys are merged into the region's
//! label file, and every key listed in that file gets its site listing
//! cached. All keys use the same cache-first rule, so a second run over a
//! complete cache makes no requests at all.

use std::time::{Duration, Instant};

use crate::cache::CacheStore;
use crate::data::{extract_label_keys, is_empty_payload, Region, SiteSource};
use crate::labels::LabelFileStore;
use crate::observe::SharedObserver;

/// Where a region's payload came from, or why the region was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionStatus {
    /// Served from an existing cache entry
    CacheHit,
    /// Fetched from the API during this run
    Fetched,
    /// No usable payload; the region was skipped
    Failed(String),
}

/// Outcome of one region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionReport {
    pub region: Region,
    pub status: RegionStatus,
    /// Keys fetched and cached during this run
    pub fetched: Vec<String>,
    /// Keys skipped because a cache entry already existed
    pub cached: Vec<String>,
    /// Keys whose fetch or cache write failed
    pub failed: Vec<String>,
}

impl RegionReport {
    fn new(region: Region, status: RegionStatus) -> Self {
        Self {
            region,
            status,
            fetched: Vec::new(),
            cached: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, RegionStatus::Failed(_))
    }
}

/// Summary of a whole run
#[derive(Debug, Clone)]
pub struct HarvestReport {
    pub regions: Vec<RegionReport>,
    pub elapsed: Duration,
}

impl HarvestReport {
    /// Regions that produced no payload at all
    pub fn failed_regions(&self) -> Vec<Region> {
        self.regions
            .iter()
            .filter(|report| report.is_failed())
            .map(|report| report.region)
            .collect()
    }

    pub fn has_failed_region(&self) -> bool {
        self.regions.iter().any(RegionReport::is_failed)
    }

    /// Total country keys whose fetch or write failed
    pub fn failed_key_count(&self) -> usize {
        self.regions.iter().map(|report| report.failed.len()).sum()
    }
}

/// Drives the cache, label files and API for a list of regions
pub struct Harvester<S> {
    cache: CacheStore,
    labels: LabelFileStore,
    source: S,
    observer: SharedObserver,
}

impl<S: SiteSource> Harvester<S> {
    pub fn new(cache: CacheStore, labels: LabelFileStore, source: S, observer: SharedObserver) -> Self {
        Self {
            cache,
            labels,
            source,
            observer,
        }
    }

    /// Processes each region in order and reports what happened
    pub async fn run(&self, regions: &[Region]) -> HarvestReport {
        let start = Instant::now();
        let mut reports = Vec::with_capacity(regions.len());

        for region in regions {
            self.observer
                .info(&format!("Processing labelkey: {}", region));
            let report = self.harvest_region(*region).await;
            if let RegionStatus::Failed(reason) = &report.status {
                self.observer
                    .error(&format!("Skipping {}: {}", region, reason));
            }
            reports.push(report);
        }

        let elapsed = start.elapsed();
        self.observer
            .info(&format!("Time taken: {:.2} seconds", elapsed.as_secs_f64()));
        HarvestReport {
            regions: reports,
            elapsed,
        }
    }

    async fn harvest_region(&self, region: Region) -> RegionReport {
        let label = region.label();

        let (keys, status) = match self.region_keys(label).await {
            Ok(found) => found,
            Err(reason) => return RegionReport::new(region, RegionStatus::Failed(reason)),
        };

        // Failures are logged by the store; the read below still works from
        // whatever the file already holds.
        let _ = self.labels.create_or_merge(label, &keys);

        let label_keys = match self.labels.read(label) {
            Ok(Some(stored)) => stored,
            Ok(None) | Err(_) => {
                self.observer.info(&format!(
                    "Using {} labelKeys from the {} payload",
                    keys.len(),
                    label
                ));
                keys
            }
        };

        let mut report = RegionReport::new(region, status);
        for key in label_keys {
            self.harvest_country(&key, &mut report).await;
        }
        report
    }

    /// Resolves the region's label keys from a usable cache entry, otherwise
    /// from a fresh fetch. A fetched payload is cached only once its keys
    /// have been extracted.
    async fn region_keys(&self, label: &str) -> Result<(Vec<String>, RegionStatus), String> {
        if let Ok(Some(cached)) = self.cache.read(label) {
            if !is_empty_payload(&cached) {
                match extract_label_keys(&cached) {
                    Ok(keys) => {
                        self.observer
                            .info(&format!("Using cached data for {}", label));
                        return Ok((keys, RegionStatus::CacheHit));
                    }
                    Err(e) => self
                        .observer
                        .error(&format!("Ignoring unusable cache for {}: {}", label, e)),
                }
            }
        }

        self.observer
            .info(&format!("Fetching live data for {}", label));
        let payload = self
            .source
            .fetch_countries_by_region(label)
            .await
            .map_err(|e| format!("region fetch failed: {}", e))?;

        let keys =
            extract_label_keys(&payload).map_err(|e| format!("unusable payload: {}", e))?;

        self.observer
            .info(&format!("Caching live data for {}...", label));
        let _ = self.cache.write(label, &payload);
        Ok((keys, RegionStatus::Fetched))
    }

    async fn harvest_country(&self, key: &str, report: &mut RegionReport) {
        if self.cache.contains(key) {
            self.observer
                .info(&format!("Using cached country data for {}", key));
            report.cached.push(key.to_string());
            return;
        }

        self.observer
            .info(&format!("Fetching country data for {}...", key));
        let data = match self.source.fetch_site_data_by_country(key).await {
            Ok(data) => data,
            Err(e) => {
                self.observer
                    .error(&format!("Skipping country {}: {}", key, e));
                report.failed.push(key.to_string());
                return;
            }
        };

        match self.cache.write(key, &data) {
            Ok(()) => report.fetched.push(key.to_string()),
            Err(_) => report.failed.push(key.to_string()),
        }
    }
}
