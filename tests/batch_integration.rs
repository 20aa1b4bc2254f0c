//! Integration tests for the full batch pipeline over HTTP.

mod support;
use support::socket_guard::start_mock_server_or_skip;

use std::path::Path;

use batch_downloader::{BatchConfig, BatchRunner, ConcurrencyMode, Manifest, WorkItem};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(temp_dir: &TempDir, concurrency: usize, mode: ConcurrencyMode) -> BatchConfig {
    BatchConfig {
        concurrency,
        mode,
        output_dir: temp_dir.path().join("out"),
        failure_log: temp_dir.path().join("failed.json"),
        ..BatchConfig::default()
    }
}

fn read_failure_log(path: &Path) -> Vec<WorkItem> {
    let json = std::fs::read_to_string(path).expect("failure log should exist");
    serde_json::from_str(&json).expect("failure log should be manifest JSON")
}

async fn mount_file(server: &MockServer, route: &str, body: &[u8], expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mount_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_batch_mixed_outcomes_write_exact_failure_log() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    std::fs::create_dir_all(temp_dir.path().join("out")).unwrap();

    mount_file(&mock_server, "/1.png", b"one", 1).await;
    mount_file(&mock_server, "/3.png", b"three", 1).await;
    mount_status(&mock_server, "/2.png", 404).await;
    mount_status(&mock_server, "/4.png", 500).await;

    let uri = mock_server.uri();
    let manifest = Manifest::new(vec![
        WorkItem::new(format!("{uri}/1.png"), "img/1.png"),
        WorkItem::new(format!("{uri}/2.png"), "img/2.png"),
        WorkItem::new(format!("{uri}/3.png"), "img/3.png"),
        WorkItem::new(format!("{uri}/4.png"), "img/4.png"),
        WorkItem::new(format!("{uri}/5.png"), "///"),
    ]);

    let runner =
        BatchRunner::new(config_for(&temp_dir, 2, ConcurrencyMode::Batch)).unwrap();
    let (summary, out) = runner.run(manifest, Vec::new()).await.unwrap();

    assert_eq!(summary.dispatched, 5);
    assert_eq!(summary.downloaded, 2);
    assert_eq!(summary.failed, 3);
    assert!(summary.failure_log_written);

    let mut failed_paths: Vec<String> = read_failure_log(&temp_dir.path().join("failed.json"))
        .into_iter()
        .map(|item| item.path)
        .collect();
    failed_paths.sort();
    assert_eq!(failed_paths, ["///", "img/2.png", "img/4.png"]);

    let output = String::from_utf8(out).unwrap();
    assert!(output.contains("img/1.png downloaded OK"));
    assert!(output.contains("img/2.png download failed"));
    assert!(output.contains("/// download failed"));
    assert!(output.ends_with(&format!("{}\n", summary.banner())));

    assert_eq!(
        std::fs::read(temp_dir.path().join("out/img/3.png")).unwrap(),
        b"three"
    );
}

#[tokio::test]
async fn test_batch_second_run_makes_no_network_calls() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    std::fs::create_dir_all(temp_dir.path().join("out")).unwrap();

    // Each file may be requested exactly once across all three runs
    let uri = mock_server.uri();
    let mut items = Vec::new();
    for i in 0..6 {
        mount_file(&mock_server, &format!("/{i}.bin"), b"data", 1).await;
        items.push(WorkItem::new(format!("{uri}/{i}.bin"), format!("files\\{i}.bin")));
    }
    let manifest = Manifest::new(items);

    for mode in [ConcurrencyMode::Batch, ConcurrencyMode::SlidingWindow] {
        let runner = BatchRunner::new(config_for(&temp_dir, 3, mode)).unwrap();
        let (summary, _) = runner.run(manifest.clone(), Vec::new()).await.unwrap();
        assert_eq!(summary.succeeded(), 6, "{mode}");
        assert_eq!(summary.failed, 0, "{mode}");
    }

    let runner =
        BatchRunner::new(config_for(&temp_dir, 3, ConcurrencyMode::Batch)).unwrap();
    let (summary, _) = runner.run(manifest, Vec::new()).await.unwrap();
    assert_eq!(summary.already_present, 6);
    assert_eq!(summary.downloaded, 0);
    assert!(!temp_dir.path().join("failed.json").exists());

    mock_server.verify().await;
}

#[tokio::test]
async fn test_batch_two_items_concurrency_one_in_manifest_order() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    std::fs::create_dir_all(temp_dir.path().join("out")).unwrap();

    mount_file(&mock_server, "/1.png", b"1", 1).await;
    mount_file(&mock_server, "/2.png", b"2", 1).await;

    let uri = mock_server.uri();
    let manifest = Manifest::new(vec![
        WorkItem::new(format!("{uri}/1.png"), "img/1.png"),
        WorkItem::new(format!("{uri}/2.png"), "img/2.png"),
    ]);

    let runner =
        BatchRunner::new(config_for(&temp_dir, 1, ConcurrencyMode::Batch)).unwrap();
    let (summary, out) = runner.run(manifest, Vec::new()).await.unwrap();

    assert_eq!(summary.downloaded, 2);
    assert!(!summary.failure_log_written);
    assert!(!temp_dir.path().join("failed.json").exists());
    assert_eq!(
        String::from_utf8(out).unwrap(),
        format!(
            "img/1.png downloaded OK\nimg/2.png downloaded OK\n{}\n",
            summary.banner()
        )
    );

    let requests = mock_server.received_requests().await.unwrap();
    let order: Vec<&str> = requests.iter().map(|r| r.url.path()).collect();
    assert_eq!(order, ["/1.png", "/2.png"]);
}

#[tokio::test]
async fn test_failure_log_feeds_follow_up_run() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    std::fs::create_dir_all(temp_dir.path().join("out")).unwrap();

    mount_file(&mock_server, "/ok.bin", b"ok", 1).await;
    // Fails on the first request, then succeeds
    Mock::given(method("GET"))
        .and(path("/flaky.bin"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_file(&mock_server, "/flaky.bin", b"flaky", 1).await;

    let uri = mock_server.uri();
    let manifest = Manifest::new(vec![
        WorkItem::new(format!("{uri}/ok.bin"), "ok.bin"),
        WorkItem::new(format!("{uri}/flaky.bin"), "flaky.bin"),
    ]);
    let config = config_for(&temp_dir, 5, ConcurrencyMode::Batch);

    let runner = BatchRunner::new(config.clone()).unwrap();
    let (first, _) = runner.run(manifest, Vec::new()).await.unwrap();
    assert_eq!(first.failed, 1);

    let retry_manifest = Manifest::load(&config.failure_log).await.unwrap();
    assert_eq!(
        retry_manifest.items(),
        [WorkItem::new(format!("{uri}/flaky.bin"), "flaky.bin")]
    );

    let retry_config = BatchConfig {
        failure_log: temp_dir.path().join("still-failed.json"),
        ..config
    };
    let runner = BatchRunner::new(retry_config).unwrap();
    let (second, _) = runner.run(retry_manifest, Vec::new()).await.unwrap();

    assert_eq!(second.downloaded, 1);
    assert_eq!(second.failed, 0);
    assert!(!temp_dir.path().join("still-failed.json").exists());
    assert_eq!(
        std::fs::read(temp_dir.path().join("out/flaky.bin")).unwrap(),
        b"flaky"
    );
}
