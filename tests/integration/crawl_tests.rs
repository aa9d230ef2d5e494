use crate::common::{mount_page, page_html, test_config};
use site_indexer::crawler::{crawl, Crawler};
use site_indexer::state::UrlStatus;
use site_indexer::storage::{SqliteStorage, Storage};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_crawl_never_leaves_the_domain() {
    let site = MockServer::start().await;
    let elsewhere = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>off</p>", "text/html"))
        .expect(0)
        .mount(&elsewhere)
        .await;

    mount_page(
        &site,
        "/",
        page_html(
            "Home",
            &format!(
                r#"<a href="/about">About</a><a href="{}/partner">Partner</a>"#,
                elsewhere.uri()
            ),
        ),
    )
    .await;
    mount_page(&site, "/about", page_html("About", r#"<a href="/">Home</a>"#)).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("crawl.db");
    let config = test_config(&format!("{}/", site.uri()), &db_path, 10, 10);
    let mut storage = SqliteStorage::new(&db_path).unwrap();

    let report = crawl(&config, "hash", &mut storage, false, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.visited, 2);
    assert_eq!(report.discovered(), 2);
    assert_eq!(report.failed, 0);
    assert_eq!(
        report.discovered_urls,
        vec![format!("{}/", site.uri()), format!("{}/about", site.uri())]
    );
}

#[tokio::test]
async fn test_crawl_resumes_from_database() {
    let site = MockServer::start().await;
    mount_page(
        &site,
        "/",
        page_html("Home", r#"<a href="/a">A</a><a href="/b">B</a><a href="/c">C</a>"#),
    )
    .await;
    for p in ["/a", "/b", "/c"] {
        mount_page(&site, p, page_html("Leaf", "")).await;
    }

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("crawl.db");
    let config = test_config(&format!("{}/", site.uri()), &db_path, 2, 10);

    {
        let mut storage = SqliteStorage::new(&db_path).unwrap();
        let first = Crawler::new(&config, "hash")
            .unwrap()
            .run(&mut storage, false, CancellationToken::new())
            .await
            .unwrap();
        assert!(first.budget_reached);
        assert_eq!(first.visited, 2);
        assert_eq!(first.discovered(), 4);
    }

    // A new process reopens the same database
    let mut storage = SqliteStorage::new(&db_path).unwrap();
    let second = Crawler::new(&config, "hash")
        .unwrap()
        .run(&mut storage, false, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(second.pages_this_run, 2);
    assert_eq!(second.visited, 4);
    assert_eq!(second.queued, 0);
    assert!(!second.budget_reached);

    let frontier = storage.load_frontier().unwrap();
    assert_eq!(frontier.len(), 4);
    assert!(frontier.iter().all(|e| e.status == UrlStatus::Visited));
}

#[tokio::test]
async fn test_fresh_crawl_discards_frontier() {
    let site = MockServer::start().await;
    mount_page(&site, "/", page_html("Home", r#"<a href="/a">A</a>"#)).await;
    mount_page(&site, "/a", page_html("A", "")).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("crawl.db");
    let config = test_config(&format!("{}/", site.uri()), &db_path, 10, 10);
    let mut storage = SqliteStorage::new(&db_path).unwrap();

    let first = crawl(&config, "hash", &mut storage, false, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(first.visited, 2);

    // Resuming a finished crawl has nothing left to fetch
    let resumed = crawl(&config, "hash", &mut storage, false, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(resumed.pages_this_run, 0);
    assert_eq!(resumed.visited, 2);

    let fresh = crawl(&config, "hash", &mut storage, true, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(fresh.pages_this_run, 2);
    assert_eq!(fresh.visited, 2);
}
