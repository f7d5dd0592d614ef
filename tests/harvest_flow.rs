//! End-to-end tests of the harvest run against a stub site source

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use labelharvest::cache::CacheStore;
use labelharvest::data::{FetchError, Region, SiteSource};
use labelharvest::harvest::{Harvester, RegionStatus};
use labelharvest::labels::LabelFileStore;
use labelharvest::observe::{SharedObserver, SilentObserver};

/// Calls made to a stub, in order
type CallLog = Arc<Mutex<Vec<String>>>;

fn recorded(calls: &CallLog) -> Vec<String> {
    calls.lock().unwrap().clone()
}

/// Serves canned payloads and records every call in order
#[derive(Default)]
struct StubSource {
    regions: HashMap<String, Value>,
    sites: HashMap<String, Value>,
    failing_sites: HashSet<String>,
    calls: CallLog,
}

impl StubSource {
    fn with_region(mut self, label: &str, payload: Value) -> Self {
        self.regions.insert(label.to_string(), payload);
        self
    }

    fn with_site(mut self, key: &str, payload: Value) -> Self {
        self.sites.insert(key.to_string(), payload);
        self
    }

    fn with_failing_site(mut self, key: &str) -> Self {
        self.failing_sites.insert(key.to_string());
        self
    }

    fn call_log(&self) -> CallLog {
        self.calls.clone()
    }
}

fn transport_error(key: &str) -> FetchError {
    FetchError::Status {
        status: 599,
        url: format!("stub://{}", key),
    }
}

#[async_trait]
impl SiteSource for StubSource {
    async fn fetch_countries_by_region(&self, region_label: &str) -> Result<Value, FetchError> {
        self.calls.lock().unwrap().push(format!("region:{}", region_label));
        self.regions
            .get(region_label)
            .cloned()
            .ok_or_else(|| transport_error(region_label))
    }

    async fn fetch_site_data_by_country(&self, label_key: &str) -> Result<Value, FetchError> {
        self.calls.lock().unwrap().push(format!("site:{}", label_key));
        if self.failing_sites.contains(label_key) {
            return Err(transport_error(label_key));
        }
        Ok(self
            .sites
            .get(label_key)
            .cloned()
            .unwrap_or_else(|| json!({"data": [], "labelId": label_key})))
    }
}

struct Workspace {
    dir: TempDir,
    observer: SharedObserver,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
            observer: Arc::new(SilentObserver),
        }
    }

    fn caches(&self) -> std::path::PathBuf {
        self.dir.path().join("Caches")
    }

    fn labelkeys(&self) -> std::path::PathBuf {
        self.dir.path().join("Labelkeys")
    }

    fn harvester(&self, source: StubSource) -> (Harvester<StubSource>, CallLog) {
        let calls = source.call_log();
        let harvester = Harvester::new(
            CacheStore::new(self.caches(), self.observer.clone()),
            LabelFileStore::new(self.labelkeys(), self.observer.clone()),
            source,
            self.observer.clone(),
        );
        (harvester, calls)
    }
}

#[tokio::test]
async fn test_oceania_end_to_end() {
    let ws = Workspace::new();
    let region_payload = json!({"data": [{"labelKey": "AU"}, {"labelKey": "NZ"}]});
    let source = StubSource::default()
        .with_region("C-Oceania", region_payload.clone())
        .with_site("AU", json!({"data": [{"siteName": "Sydney"}]}))
        .with_site("NZ", json!({"data": [{"siteName": "Auckland"}]}));
    let (harvester, calls) = ws.harvester(source);

    let report = harvester.run(&[Region::Oceania]).await;

    assert!(!report.has_failed_region());
    assert_eq!(report.regions[0].status, RegionStatus::Fetched);
    assert_eq!(
        recorded(&calls),
        vec!["region:C-Oceania", "site:AU", "site:NZ"]
    );

    let cached: Value =
        serde_json::from_str(&fs::read_to_string(ws.caches().join("C-Oceania.json")).unwrap()).unwrap();
    assert_eq!(cached, region_payload);
    assert_eq!(
        fs::read_to_string(ws.labelkeys().join("C-Oceania.txt")).unwrap(),
        "AU\nNZ\n"
    );
    assert!(ws.caches().join("AU.json").is_file());
    assert!(ws.caches().join("NZ.json").is_file());
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let ws = Workspace::new();
    let build_source = || {
        StubSource::default()
            .with_region("C-Asia", json!({"data": [{"labelKey": "JP"}, {"labelKey": "CN"}]}))
            .with_region("C-Europe", json!({"data": [{"labelKey": "FR"}]}))
    };
    let regions = [Region::Asia, Region::Europe];

    let (first, first_calls) = ws.harvester(build_source());
    first.run(&regions).await;
    assert_eq!(recorded(&first_calls).len(), 5);
    let asia_before = fs::read(ws.labelkeys().join("C-Asia.txt")).unwrap();
    let europe_before = fs::read(ws.labelkeys().join("C-Europe.txt")).unwrap();

    let (second, second_calls) = ws.harvester(build_source());
    let report = second.run(&regions).await;

    assert!(recorded(&second_calls).is_empty(), "No remote calls expected");
    assert_eq!(report.regions[0].status, RegionStatus::CacheHit);
    assert_eq!(report.regions[0].cached, vec!["JP".to_string(), "CN".to_string()]);
    assert_eq!(fs::read(ws.labelkeys().join("C-Asia.txt")).unwrap(), asia_before);
    assert_eq!(fs::read(ws.labelkeys().join("C-Europe.txt")).unwrap(), europe_before);
}

#[tokio::test]
async fn test_cached_region_skips_region_fetch() {
    let ws = Workspace::new();
    fs::create_dir_all(ws.caches()).unwrap();
    fs::write(
        ws.caches().join("C-Asia.json"),
        r#"{"data":[{"labelKey":"KR"}]}"#,
    )
    .unwrap();
    let source = StubSource::default()
        .with_region("C-Asia", json!({"data": [{"labelKey": "SHOULD-NOT-APPEAR"}]}));
    let (harvester, calls) = ws.harvester(source);

    let report = harvester.run(&[Region::Asia]).await;

    assert_eq!(report.regions[0].status, RegionStatus::CacheHit);
    assert_eq!(recorded(&calls), vec!["site:KR"]);
    assert_eq!(
        fs::read_to_string(ws.labelkeys().join("C-Asia.txt")).unwrap(),
        "KR\n"
    );
}

#[tokio::test]
async fn test_failed_country_does_not_stop_region() {
    let ws = Workspace::new();
    let source = StubSource::default()
        .with_region(
            "C-Africa",
            json!({"data": [{"labelKey": "EG"}, {"labelKey": "KE"}, {"labelKey": "NG"}]}),
        )
        .with_failing_site("KE");
    let (harvester, calls) = ws.harvester(source);

    let report = harvester.run(&[Region::Africa]).await;

    assert_eq!(
        recorded(&calls),
        vec!["region:C-Africa", "site:EG", "site:KE", "site:NG"]
    );
    assert!(!report.has_failed_region());
    assert_eq!(report.regions[0].failed, vec!["KE".to_string()]);
    assert_eq!(report.regions[0].fetched, vec!["EG".to_string(), "NG".to_string()]);
    assert!(!ws.caches().join("KE.json").exists());
    assert!(ws.caches().join("NG.json").exists());
}

#[tokio::test]
async fn test_failed_region_fetch_skips_to_next_region() {
    let ws = Workspace::new();
    let source = StubSource::default()
        .with_region("C-America", json!({"data": [{"labelKey": "US"}]}));
    let (harvester, calls) = ws.harvester(source);

    let report = harvester.run(&[Region::Europe, Region::America]).await;

    assert_eq!(report.failed_regions(), vec![Region::Europe]);
    assert!(!ws.caches().join("C-Europe.json").exists());
    assert!(!ws.labelkeys().join("C-Europe.txt").exists());
    assert_eq!(
        recorded(&calls),
        vec!["region:C-Europe", "region:C-America", "site:US"]
    );
}

#[tokio::test]
async fn test_existing_label_file_keys_are_merged_and_harvested() {
    let ws = Workspace::new();
    fs::create_dir_all(ws.labelkeys()).unwrap();
    fs::write(ws.labelkeys().join("C-Europe.txt"), "a\nb\n").unwrap();
    let source = StubSource::default().with_region(
        "C-Europe",
        json!({"data": [{"labelKey": "b"}, {"labelKey": "c"}, {"labelKey": "a"}, {"labelKey": "d"}]}),
    );
    let (harvester, calls) = ws.harvester(source);

    harvester.run(&[Region::Europe]).await;

    assert_eq!(
        fs::read_to_string(ws.labelkeys().join("C-Europe.txt")).unwrap(),
        "a\nb\nc\nd\n"
    );
    assert_eq!(
        recorded(&calls),
        vec!["region:C-Europe", "site:a", "site:b", "site:c", "site:d"]
    );
}

#[tokio::test]
async fn test_region_payload_without_data_is_not_cached() {
    let ws = Workspace::new();
    let (blocked, blocked_calls) = ws.harvester(
        StubSource::default().with_region("C-Asia", json!({"msg": "blocked"})),
    );

    let first = blocked.run(&[Region::Asia]).await;

    assert_eq!(first.failed_regions(), vec![Region::Asia]);
    assert_eq!(recorded(&blocked_calls), vec!["region:C-Asia"]);
    assert!(!ws.caches().join("C-Asia.json").exists());

    let (healthy, healthy_calls) = ws.harvester(
        StubSource::default().with_region("C-Asia", json!({"data": [{"labelKey": "JP"}]})),
    );

    let second = healthy.run(&[Region::Asia]).await;

    assert!(!second.has_failed_region());
    assert_eq!(second.regions[0].status, RegionStatus::Fetched);
    assert_eq!(recorded(&healthy_calls), vec!["region:C-Asia", "site:JP"]);
    assert!(ws.caches().join("C-Asia.json").is_file());
}

#[tokio::test]
async fn test_unusable_cached_region_is_refetched() {
    let ws = Workspace::new();
    fs::create_dir_all(ws.caches()).unwrap();
    fs::write(ws.caches().join("C-Europe.json"), r#"{"msg":"blocked"}"#).unwrap();
    let source = StubSource::default()
        .with_region("C-Europe", json!({"data": [{"labelKey": "IT"}]}));
    let (harvester, calls) = ws.harvester(source);

    let report = harvester.run(&[Region::Europe]).await;

    assert_eq!(report.regions[0].status, RegionStatus::Fetched);
    assert_eq!(recorded(&calls), vec!["region:C-Europe", "site:IT"]);
    let cached: Value =
        serde_json::from_str(&fs::read_to_string(ws.caches().join("C-Europe.json")).unwrap()).unwrap();
    assert_eq!(cached, json!({"data": [{"labelKey": "IT"}]}));
}

#[tokio::test]
async fn test_blank_label_key_keeps_second_run_byte_identical() {
    let ws = Workspace::new();
    let build_source = || {
        StubSource::default()
            .with_region("C-Oceania", json!({"data": [{"labelKey": "AU"}, {"labelKey": ""}]}))
    };

    let (first, _first_calls) = ws.harvester(build_source());
    first.run(&[Region::Oceania]).await;
    let after_first = fs::read(ws.labelkeys().join("C-Oceania.txt")).unwrap();

    let (second, second_calls) = ws.harvester(build_source());
    second.run(&[Region::Oceania]).await;

    assert_eq!(after_first, b"AU\n");
    assert_eq!(fs::read(ws.labelkeys().join("C-Oceania.txt")).unwrap(), after_first);
    assert!(recorded(&second_calls).is_empty());
}

#[tokio::test]
async fn test_unusable_label_dir_falls_back_to_payload_keys() {
    let ws = Workspace::new();
    fs::write(ws.labelkeys(), "a plain file where the directory should be").unwrap();
    let source = StubSource::default()
        .with_region("C-America", json!({"data": [{"labelKey": "US"}, {"labelKey": "CA"}]}));
    let (harvester, calls) = ws.harvester(source);

    let report = harvester.run(&[Region::America]).await;

    assert!(!report.has_failed_region());
    assert_eq!(
        recorded(&calls),
        vec!["region:C-America", "site:US", "site:CA"]
    );
    assert_eq!(report.regions[0].fetched, vec!["US".to_string(), "CA".to_string()]);
    assert!(ws.labelkeys().is_file());
}

#[tokio::test]
async fn test_rejected_country_cache_write_is_recorded_as_failed() {
    let ws = Workspace::new();
    let source = StubSource::default()
        .with_region("C-Africa", json!({"data": [{"labelKey": "a/b"}, {"labelKey": "ZA"}]}));
    let (harvester, calls) = ws.harvester(source);

    let report = harvester.run(&[Region::Africa]).await;

    assert_eq!(
        recorded(&calls),
        vec!["region:C-Africa", "site:a/b", "site:ZA"]
    );
    assert_eq!(report.regions[0].failed, vec!["a/b".to_string()]);
    assert_eq!(report.regions[0].fetched, vec!["ZA".to_string()]);
    assert_eq!(report.failed_key_count(), 1);
    assert!(!ws.caches().join("a").exists());
    assert!(ws.caches().join("ZA.json").is_file());
}
