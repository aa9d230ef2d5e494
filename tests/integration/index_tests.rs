use crate::common::{mount_page, page_html, test_config, ScriptedAnalyzer};
use site_indexer::analyzer::HttpAnalyzer;
use site_indexer::config::AnalyzerConfig;
use site_indexer::crawler::crawl;
use site_indexer::pipeline::{frontier_worklist, index, Coordinator};
use site_indexer::search::{search, DEFAULT_THRESHOLD};
use site_indexer::storage::{RunStatus, SqliteStorage, Storage};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

async fn five_page_site() -> (MockServer, Vec<String>) {
    let site = MockServer::start().await;
    let mut urls = Vec::new();
    for i in 1..=5 {
        let p = format!("/page{}", i);
        mount_page(&site, &p, page_html(&format!("Page {}", i), "")).await;
        urls.push(format!("{}{}", site.uri(), p));
    }
    (site, urls)
}

#[tokio::test]
async fn test_analyzer_failure_degrades_only_that_record() {
    let (site, urls) = five_page_site().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("index.db");
    let config = test_config(&format!("{}/", site.uri()), &db_path, 10, 2);
    let mut storage = SqliteStorage::new(&db_path).unwrap();

    let analyzer = Arc::new(ScriptedAnalyzer {
        failing_suffixes: vec!["/page3"],
    });
    let summary = index(
        &config,
        "hash",
        analyzer,
        &mut storage,
        urls.clone(),
        false,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.indexed, 5);
    assert_eq!(summary.degraded, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.batches_flushed, 3);
    assert_eq!(storage.count_records().unwrap(), 5);

    let degraded = storage.get_record(&urls[2]).unwrap().unwrap();
    assert!(degraded.is_degraded());
    assert_eq!(degraded.title, "Page 3");
    assert_eq!(degraded.content_type, "unknown");

    let analyzed = storage.get_record(&urls[3]).unwrap().unwrap();
    assert!(!analyzed.is_degraded());
    assert_eq!(analyzed.content_type, "service");
    assert_eq!(analyzed.description, "About Page 4");
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let (site, urls) = five_page_site().await;
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("index.db");
    let config = test_config(&format!("{}/", site.uri()), &db_path, 10, 2);
    let analyzer = Arc::new(ScriptedAnalyzer {
        failing_suffixes: vec![],
    });

    {
        let mut storage = SqliteStorage::new(&db_path).unwrap();
        let coordinator = Coordinator::new(&config, analyzer.clone(), "hash").unwrap();
        let first = coordinator
            .run(&mut storage, urls.clone(), false, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(first.indexed, 5);
    }

    let mut storage = SqliteStorage::new(&db_path).unwrap();
    let before = storage.load_records().unwrap();
    let coordinator = Coordinator::new(&config, analyzer, "hash").unwrap();
    let second = coordinator
        .run(&mut storage, urls, false, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(second.skipped, 5);
    assert_eq!(second.scheduled, 0);
    assert_eq!(second.indexed, 0);
    assert_eq!(storage.load_records().unwrap(), before);
}

/// Cancels the run as soon as the request arrives, then stalls the response
struct CancelInFlight {
    cancel: CancellationToken,
}

impl Respond for CancelInFlight {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.cancel.cancel();
        ResponseTemplate::new(200)
            .set_body_raw(page_html("Page 3", ""), "text/html")
            .set_delay(Duration::from_secs(5))
    }
}

#[tokio::test]
async fn test_cancel_mid_batch_keeps_flushed_batches_and_resumes() {
    let site = MockServer::start().await;
    let urls: Vec<String> = (1..=5).map(|i| format!("{}/page{}", site.uri(), i)).collect();
    let cancel = CancellationToken::new();

    // The first batch must not be fetched again after the restart
    for i in 1..=2 {
        Mock::given(method("GET"))
            .and(path(format!("/page{}", i)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(page_html(&format!("Page {}", i), ""), "text/html"),
            )
            .expect(1)
            .mount(&site)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/page3"))
        .respond_with(CancelInFlight {
            cancel: cancel.clone(),
        })
        .up_to_n_times(1)
        .mount(&site)
        .await;
    for i in 3..=5 {
        mount_page(&site, &format!("/page{}", i), page_html(&format!("Page {}", i), "")).await;
    }

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("index.db");
    let config = test_config(&format!("{}/", site.uri()), &db_path, 10, 2);
    let analyzer = Arc::new(ScriptedAnalyzer {
        failing_suffixes: vec![],
    });

    {
        let mut storage = SqliteStorage::new(&db_path).unwrap();
        let interrupted = index(
            &config,
            "hash",
            analyzer.clone(),
            &mut storage,
            urls.clone(),
            false,
            cancel,
        )
        .await
        .unwrap();

        assert!(interrupted.cancelled);
        assert_eq!(interrupted.batches_flushed, 1);
        assert_eq!(interrupted.indexed, 2);
        assert_eq!(interrupted.remaining, 3);
        assert_eq!(storage.count_records().unwrap(), 2);
        assert!(storage.get_record(&urls[2]).unwrap().is_none());

        let run = storage.get_run(interrupted.run_id).unwrap();
        assert_eq!(run.status, RunStatus::Interrupted);
    }

    // A new process reopens the same database
    let mut storage = SqliteStorage::new(&db_path).unwrap();
    let resumed = index(
        &config,
        "hash",
        analyzer,
        &mut storage,
        urls.clone(),
        false,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(!resumed.cancelled);
    assert_eq!(resumed.skipped, 2);
    assert_eq!(resumed.indexed, 3);
    assert_eq!(storage.count_records().unwrap(), 5);
    for url in &urls {
        assert!(storage.get_record(url).unwrap().is_some(), "missing {}", url);
    }
    let run = storage.get_run(resumed.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
}

#[tokio::test]
async fn test_http_analyzer_end_to_end() {
    let (site, urls) = five_page_site().await;
    let api = MockServer::start().await;

    // Mounted first so it takes precedence for the page it names
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("/page3"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&api)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "{\"keywords\": [\"library\"], \"content_type\": \"service\", \"language\": \"en\", \"relevance_score\": 0.6}"
                }
            }]
        })))
        .mount(&api)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("index.db");
    let config = test_config(&format!("{}/", site.uri()), &db_path, 10, 2);
    let analyzer_config = AnalyzerConfig {
        endpoint: format!("{}/v1", api.uri()),
        timeout_secs: 5,
        ..AnalyzerConfig::default()
    };
    let analyzer = Arc::new(HttpAnalyzer::new(&analyzer_config, "test-key".to_string()).unwrap());
    let mut storage = SqliteStorage::new(&db_path).unwrap();

    let summary = index(
        &config,
        "hash",
        analyzer,
        &mut storage,
        urls.clone(),
        false,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.indexed, 5);
    assert_eq!(summary.degraded, 1);

    let degraded = storage.get_record(&urls[2]).unwrap().unwrap();
    assert!(degraded
        .error
        .as_deref()
        .unwrap_or_default()
        .starts_with("Analysis error"));

    let analyzed = storage.get_record(&urls[0]).unwrap().unwrap();
    assert_eq!(analyzed.keywords, vec!["library"]);
    assert_eq!(analyzed.language, "en");
    assert_eq!(analyzed.relevance_score, 0.6);
}

#[tokio::test]
async fn test_crawl_then_index_then_search() {
    let site = MockServer::start().await;
    mount_page(
        &site,
        "/",
        page_html("Home", r#"<a href="/library">Library</a><a href="/missing">Old</a>"#),
    )
    .await;
    mount_page(&site, "/library", page_html("Library hours", "")).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("site.db");
    let config = test_config(&format!("{}/", site.uri()), &db_path, 10, 10);
    let mut storage = SqliteStorage::new(&db_path).unwrap();

    let report = crawl(&config, "hash", &mut storage, false, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.discovered(), 3);
    assert_eq!(report.failed, 1);

    // The failed URL is not handed to the index phase
    let worklist = frontier_worklist(&storage.load_frontier().unwrap());
    assert_eq!(
        worklist,
        vec![format!("{}/", site.uri()), format!("{}/library", site.uri())]
    );

    let analyzer = Arc::new(ScriptedAnalyzer {
        failing_suffixes: vec![],
    });
    let summary = index(
        &config,
        "hash",
        analyzer,
        &mut storage,
        worklist,
        false,
        CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(summary.indexed, 2);

    let records = storage.load_records().unwrap();
    let hits = search(&records, "library hours", DEFAULT_THRESHOLD);
    assert_eq!(hits[0].record.url, format!("{}/library", site.uri()));

    let home = storage.get_record(&format!("{}/", site.uri())).unwrap().unwrap();
    assert!(home
        .internal_links
        .iter()
        .any(|link| link.url == format!("{}/library", site.uri())));
}
