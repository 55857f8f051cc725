//! Retry and dead-letter behavior against a mock bulk backend.

mod helpers;

use helpers::{run_with_static_geo, spawn_mock_backend, test_config, write_asn_csv, write_chunk};

#[tokio::test]
async fn test_document_rejected_repeatedly_still_lands_once() {
    let tmp = tempfile::tempdir().unwrap();
    let (backend, url) = spawn_mock_backend().await;
    backend.fail_times("1.0.0.0/24", 3);

    let mut config = test_config(&url, tmp.path());
    config.asn_csv = write_asn_csv(tmp.path(), &[("AS64496", "Example One")]);
    config.chunks = vec![write_chunk(
        tmp.path(),
        "chunk_00.jsonl",
        &[r#"{"CIDR":"1.0.0.0/24","ASN":64496}"#],
    )];

    let report = run_with_static_geo(config, &[("1.0.0.0/24", "AU")])
        .await
        .unwrap();

    assert_eq!(report.indexed, 1);
    assert_eq!(report.retried_batches, 3);
    assert_eq!(report.dead_lettered, 0);
    assert_eq!(backend.indexed_prefixes(), vec!["1.0.0.0/24"]);

    // Initial attempt plus three retries.
    assert_eq!(
        backend.bulk_requests.load(std::sync::atomic::Ordering::SeqCst),
        4
    );
}

#[tokio::test]
async fn test_exhausted_retries_go_to_dead_letter_file() {
    let tmp = tempfile::tempdir().unwrap();
    let (backend, url) = spawn_mock_backend().await;
    backend.fail_times("2.0.0.0/24", u32::MAX);

    let mut config = test_config(&url, tmp.path());
    config.batch_size = 2;
    config.max_retry_attempts = 2;
    config.dead_letter_path = Some(tmp.path().join("dead_letter.ndjson"));
    config.asn_csv = write_asn_csv(tmp.path(), &[("AS64496", "Example One")]);
    config.chunks = vec![write_chunk(
        tmp.path(),
        "chunk_00.jsonl",
        &[
            r#"{"CIDR":"1.0.0.0/24","ASN":64496}"#,
            r#"{"CIDR":"2.0.0.0/24","ASN":64496}"#,
        ],
    )];
    let dead_letter_path = config.dead_letter_path.clone().unwrap();

    let report = run_with_static_geo(config, &[("1.0.0.0/24", "AU"), ("2.0.0.0/24", "FR")])
        .await
        .unwrap();

    // The healthy document lands; the poisoned one is dropped after the
    // ceiling instead of retrying forever.
    assert_eq!(report.indexed, 1);
    assert_eq!(report.dead_lettered, 1);
    assert_eq!(backend.indexed_prefixes(), vec!["1.0.0.0/24"]);

    let contents = std::fs::read_to_string(&dead_letter_path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 1);
    let doc: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(doc["prefix"], "2.0.0.0/24");
}

#[tokio::test]
async fn test_dead_letter_without_path_only_counts() {
    let tmp = tempfile::tempdir().unwrap();
    let (backend, url) = spawn_mock_backend().await;
    backend.fail_times("1.0.0.0/24", u32::MAX);

    let mut config = test_config(&url, tmp.path());
    config.max_retry_attempts = 1;
    config.asn_csv = write_asn_csv(tmp.path(), &[("AS64496", "Example One")]);
    config.chunks = vec![write_chunk(
        tmp.path(),
        "chunk_00.jsonl",
        &[r#"{"CIDR":"1.0.0.0/24","ASN":64496}"#],
    )];

    let report = run_with_static_geo(config, &[("1.0.0.0/24", "AU")])
        .await
        .unwrap();

    assert_eq!(report.indexed, 0);
    assert_eq!(report.dead_lettered, 1);
    assert!(backend.indexed_prefixes().is_empty());
}
