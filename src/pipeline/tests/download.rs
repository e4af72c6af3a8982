use std::time::Duration;

use super::wait_for;
use crate::error::{Error, RegistryError};
use crate::pipeline::test_helpers::{
    MockService, create_test_pipeline, ingest, input, record_named,
};
use crate::pipeline::{DownloadPlan, Retrieved};
use crate::types::{Event, FileId, Status};

// --- download_results() tests ---

#[tokio::test]
async fn test_nothing_done_is_a_no_op() {
    let (pipeline, service) = create_test_pipeline(MockService::new().fail_upload("a.jpg"));
    ingest(&pipeline, vec![input("a.jpg", 10), input("b.jpg", 10)]).await;

    assert_eq!(pipeline.download_plan().await.unwrap(), DownloadPlan::Nothing);
    assert_eq!(pipeline.download_results().await.unwrap(), Retrieved::Nothing);
    assert_eq!(pipeline.download_link().await.unwrap(), None);
    assert!(service.download_calls().is_empty());
    assert!(service.bundle_calls().is_empty());
}

#[tokio::test]
async fn test_single_done_record_uses_single_download() {
    let (pipeline, service) = create_test_pipeline(MockService::new().fail_compress("b.jpg"));
    ingest(&pipeline, vec![input("a.jpg", 600), input("b.jpg", 600)]).await;
    pipeline.compress_all().await.unwrap();
    let a = record_named(&pipeline, "a.jpg").await;

    let retrieved = pipeline.download_results().await.unwrap();
    match retrieved {
        Retrieved::Single { id, filename, data } => {
            assert_eq!(id, a.id);
            assert_eq!(filename, "a.jpg");
            assert_eq!(data, format!("compressed:{}", a.id).into_bytes());
        }
        other => panic!("expected single download, got {other:?}"),
    }
    assert_eq!(service.download_calls(), vec![a.id.clone()]);
    assert!(service.bundle_calls().is_empty());

    let link = pipeline.download_link().await.unwrap().unwrap();
    assert!(link.as_str().ends_with(a.id.as_str()));
}

#[tokio::test]
async fn test_several_done_records_use_one_bundle_in_registry_order() {
    let (pipeline, service) = create_test_pipeline(MockService::new());
    ingest(
        &pipeline,
        vec![input("a.jpg", 600), input("b.jpg", 600), input("c.jpg", 600)],
    )
    .await;
    pipeline.compress_all().await.unwrap();
    let expected: Vec<FileId> = pipeline.snapshot().await.into_iter().map(|r| r.id).collect();

    let retrieved = pipeline.download_results().await.unwrap();
    match &retrieved {
        Retrieved::Bundle { ids, filename, .. } => {
            assert_eq!(ids, &expected);
            assert_eq!(filename, "squishfile.zip");
        }
        other => panic!("expected bundle, got {other:?}"),
    }
    assert_eq!(service.bundle_calls(), vec![expected]);
    assert!(service.download_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_download_refused_while_compressing() {
    let (pipeline, service) = create_test_pipeline(
        MockService::new().compress_delay(Duration::from_secs(2)),
    );
    ingest(&pipeline, vec![input("a.jpg", 600), input("b.jpg", 600)]).await;
    let mut rx = pipeline.subscribe();

    let run = tokio::spawn({
        let pipeline = pipeline.clone();
        async move { pipeline.compress_all().await }
    });
    wait_for(&mut rx, |e| matches!(e, Event::Compressing { .. })).await;

    let result = pipeline.download_results().await;
    assert!(matches!(result, Err(Error::NotSettled { compressing: 1 })));
    assert!(matches!(
        pipeline.download_link().await,
        Err(Error::NotSettled { .. })
    ));
    assert!(!pipeline.stats().await.all_settled);

    run.await.unwrap().unwrap();
    assert!(service.download_calls().is_empty());
    assert!(service.bundle_calls().is_empty());

    assert!(matches!(
        pipeline.download_results().await.unwrap(),
        Retrieved::Bundle { .. }
    ));
}

// --- download_one() tests ---

#[tokio::test]
async fn test_download_one_requires_done() {
    let (pipeline, service) = create_test_pipeline(MockService::new());
    ingest(&pipeline, vec![input("a.jpg", 600)]).await;
    let a = record_named(&pipeline, "a.jpg").await;

    let result = pipeline.download_one(&a.id).await;
    assert!(matches!(
        result,
        Err(Error::NotDone {
            status: Status::Queued,
            ..
        })
    ));

    let result = pipeline.download_one(&FileId::from("missing")).await;
    assert!(matches!(
        result,
        Err(Error::Registry(RegistryError::NotFound(_)))
    ));
    assert!(service.download_calls().is_empty());

    pipeline.compress_all().await.unwrap();
    let retrieved = pipeline.download_one(&a.id).await.unwrap();
    assert!(matches!(retrieved, Retrieved::Single { .. }));
}

// --- saving results ---

#[tokio::test]
async fn test_write_to_never_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let retrieved = Retrieved::Single {
        id: FileId::from("abc"),
        filename: "../photo.jpg".into(),
        data: b"bytes".to_vec(),
    };

    let first = retrieved.write_to(dir.path()).await.unwrap().unwrap();
    let second = retrieved.write_to(dir.path()).await.unwrap().unwrap();

    assert_eq!(first, dir.path().join("photo.jpg"));
    assert_eq!(second, dir.path().join("photo (1).jpg"));
    assert_eq!(std::fs::read(&first).unwrap(), b"bytes");
}

#[tokio::test]
async fn test_write_to_creates_directory_and_skips_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("results");

    assert_eq!(Retrieved::Nothing.write_to(&out).await.unwrap(), None);

    let bundle = Retrieved::Bundle {
        ids: vec![FileId::from("a"), FileId::from("b")],
        filename: "squishfile.zip".into(),
        data: b"PK".to_vec(),
    };
    let path = bundle.write_to(&out).await.unwrap().unwrap();
    assert_eq!(path, out.join("squishfile.zip"));
}
