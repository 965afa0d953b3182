//! End-to-end tests for the fetch, extract and copy pipeline.

use async_trait::async_trait;
use bytes::Bytes;
use s3_extract::pipeline::EXTRACT_DIR_PREFIX;
use s3_extract::{
    run, with_extracted_object, ActionInputs, Config, ExtractError, ObjectBody, ObjectRef,
    ObjectResponse, ObjectStore,
};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;
use zip::write::{SimpleFileOptions, ZipWriter};

/// In-memory stand-in for a bucket that serves one archive.
struct FakeStore {
    archive: Vec<u8>,
    requests: Mutex<Vec<(String, String)>>,
}

impl FakeStore {
    fn new(archive: Vec<u8>) -> Self {
        Self {
            archive,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectResponse, ExtractError> {
        self.requests
            .lock()
            .unwrap()
            .push((bucket.to_string(), key.to_string()));

        let body = Cursor::new(Bytes::from(self.archive.clone()));
        Ok(ObjectResponse {
            body: Some(ObjectBody::Stream(Box::pin(body))),
            content_length: Some(self.archive.len() as u64),
        })
    }
}

/// Helper to create the test ZIP archive
fn create_test_zip() -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    zip.add_directory("empty/", options).unwrap();
    zip.add_directory("subdir/", options).unwrap();
    zip.add_directory("subdir/subsubdir/", options).unwrap();

    zip.start_file("root.txt", options).unwrap();
    zip.write_all(b"Welcome root.txt").unwrap();
    zip.start_file("subdir/subdir.txt", options).unwrap();
    zip.write_all(b"Welcome in subdir.txt").unwrap();
    zip.start_file("subdir/subsubdir/subsubdir.txt", options)
        .unwrap();
    zip.write_all(b"Welcome in subsubdir.txt").unwrap();

    zip.finish().unwrap().into_inner()
}

/// Scratch directories for one test: the workspace parent and the target.
struct Dirs {
    workspace: TempDir,
    target: TempDir,
}

impl Dirs {
    fn new() -> Self {
        Self {
            workspace: TempDir::new().unwrap(),
            target: TempDir::new().unwrap(),
        }
    }

    fn target(&self, relative: &str) -> PathBuf {
        self.target.path().join(relative)
    }

    fn inputs(&self) -> ActionInputs {
        ActionInputs {
            bucket: Some("some-bucket".to_string()),
            key: Some("some-key".to_string()),
            fail_on_not_found: Some("false".to_string()),
            workspace_directory: Some(self.workspace.path().display().to_string()),
            ..ActionInputs::default()
        }
    }

    fn assert_workspace_empty(&self) {
        let leftovers: Vec<_> = fs::read_dir(self.workspace.path()).unwrap().collect();
        assert!(leftovers.is_empty(), "leftover scoped directories: {leftovers:?}");
    }
}

fn config(inputs: ActionInputs) -> Config {
    inputs.into_config().unwrap()
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[tokio::test]
async fn test_copy_files_in_order_skipping_missing() {
    let dirs = Dirs::new();
    let store = FakeStore::new(create_test_zip());
    let config = config(ActionInputs {
        target_base_directory: Some(dirs.target.path().display().to_string()),
        files: Some(
            [
                "subdir/not-found.txt=out1.txt",
                "subdir/subsubdir/subsubdir.txt=out2.txt",
                "subdir/subdir.txt=out3.txt",
            ]
            .join("\n"),
        ),
        ..dirs.inputs()
    });

    let outcome = run(&config, &store).await.unwrap();

    assert_eq!(
        outcome.copied_files,
        vec![dirs.target("out2.txt"), dirs.target("out3.txt")]
    );
    assert!(outcome.copied_directories.is_empty());
    assert!(!dirs.target("out1.txt").exists());
    assert_eq!(read(&dirs.target("out2.txt")), "Welcome in subsubdir.txt");
    assert_eq!(read(&dirs.target("out3.txt")), "Welcome in subdir.txt");
    assert_eq!(
        store.requests(),
        vec![("some-bucket".to_string(), "some-key".to_string())]
    );
    dirs.assert_workspace_empty();
}

#[tokio::test]
async fn test_fail_on_missing_file() {
    let dirs = Dirs::new();
    let store = FakeStore::new(create_test_zip());
    let config = config(ActionInputs {
        target_base_directory: Some(dirs.target.path().display().to_string()),
        files: Some(
            [
                "subdir/not-found.txt=out1.txt",
                "subdir/subsubdir/subsubdir.txt=out2.txt",
            ]
            .join("\n"),
        ),
        fail_on_not_found: Some("true".to_string()),
        ..dirs.inputs()
    });

    let err = run(&config, &store).await.unwrap_err();

    let message = err.to_string();
    assert!(message.contains("was not found"), "{message}");
    assert!(message.contains("subdir/not-found.txt"), "{message}");
    assert!(!dirs.target("out2.txt").exists());
    dirs.assert_workspace_empty();
}

#[tokio::test]
async fn test_source_paths_relative_to_source_base() {
    let dirs = Dirs::new();
    let store = FakeStore::new(create_test_zip());
    let destination = dirs.target("target.txt");
    let config = config(ActionInputs {
        source_base_directory: Some("subdir/subsubdir".to_string()),
        files: Some(format!("subsubdir.txt={}", destination.display())),
        ..dirs.inputs()
    });

    let outcome = run(&config, &store).await.unwrap();

    assert_eq!(outcome.copied_files, vec![destination.clone()]);
    assert_eq!(read(&destination), "Welcome in subsubdir.txt");
}

#[tokio::test]
async fn test_copy_directories() {
    let dirs = Dirs::new();
    let store = FakeStore::new(create_test_zip());
    let config = config(ActionInputs {
        target_base_directory: Some(dirs.target.path().display().to_string()),
        directories: Some("subdir=subdir\nnot-found=not-found\nempty=empty".to_string()),
        ..dirs.inputs()
    });

    let outcome = run(&config, &store).await.unwrap();

    assert_eq!(
        outcome.copied_directories,
        vec![dirs.target("subdir"), dirs.target("empty")]
    );
    assert!(outcome.copied_files.is_empty());
    assert_eq!(read(&dirs.target("subdir/subdir.txt")), "Welcome in subdir.txt");
    assert_eq!(
        read(&dirs.target("subdir/subsubdir/subsubdir.txt")),
        "Welcome in subsubdir.txt"
    );
    assert!(dirs.target("empty").is_dir());
    assert!(!dirs.target("not-found").exists());
    dirs.assert_workspace_empty();
}

#[tokio::test]
async fn test_directory_relative_to_source_base() {
    let dirs = Dirs::new();
    let store = FakeStore::new(create_test_zip());
    let config = config(ActionInputs {
        source_base_directory: Some("subdir".to_string()),
        target_base_directory: Some(dirs.target.path().display().to_string()),
        directories: Some("subsubdir=targetdir".to_string()),
        ..dirs.inputs()
    });

    let outcome = run(&config, &store).await.unwrap();

    assert_eq!(outcome.copied_directories, vec![dirs.target("targetdir")]);
    assert_eq!(
        read(&dirs.target("targetdir/subsubdir.txt")),
        "Welcome in subsubdir.txt"
    );
}

#[tokio::test]
async fn test_fail_on_missing_directory() {
    let dirs = Dirs::new();
    let store = FakeStore::new(create_test_zip());
    let config = config(ActionInputs {
        target_base_directory: Some(dirs.target.path().display().to_string()),
        directories: Some("subdir=subdir\nnot-found=not-found".to_string()),
        fail_on_not_found: Some("true".to_string()),
        ..dirs.inputs()
    });

    let err = run(&config, &store).await.unwrap_err();

    match &err {
        ExtractError::SourceNotFound { bucket, key, .. } => {
            assert_eq!(bucket, "some-bucket");
            assert_eq!(key, "some-key");
        }
        e => panic!("Expected SourceNotFound error, got: {:?}", e),
    }
    assert!(err.to_string().contains("was not found"));
    dirs.assert_workspace_empty();
}

#[tokio::test]
async fn test_directories_and_files_together() {
    let dirs = Dirs::new();
    let store = FakeStore::new(create_test_zip());
    let config = config(ActionInputs {
        target_base_directory: Some(dirs.target.path().display().to_string()),
        files: Some("root.txt=copied/root.txt".to_string()),
        directories: Some("subdir=copied".to_string()),
        ..dirs.inputs()
    });

    let outcome = run(&config, &store).await.unwrap();

    assert_eq!(outcome.copied_directories, vec![dirs.target("copied")]);
    assert_eq!(outcome.copied_files, vec![dirs.target("copied/root.txt")]);
    assert_eq!(read(&dirs.target("copied/root.txt")), "Welcome root.txt");
    assert_eq!(read(&dirs.target("copied/subdir.txt")), "Welcome in subdir.txt");
}

#[tokio::test]
async fn test_malformed_mapping_fails_before_download() {
    let dirs = Dirs::new();
    let store = FakeStore::new(create_test_zip());
    let config = config(ActionInputs {
        target_base_directory: Some(dirs.target.path().display().to_string()),
        files: Some("root.txt=out.txt\nroot.txt".to_string()),
        ..dirs.inputs()
    });

    let err = run(&config, &store).await.unwrap_err();

    assert!(matches!(err, ExtractError::InvalidMappingSyntax { .. }));
    assert!(err.to_string().contains("Invalid mapping 'root.txt'"));
    assert!(store.requests().is_empty());
    assert!(!dirs.target("out.txt").exists());
}

#[tokio::test]
async fn test_corrupted_archive_cleans_up() {
    let dirs = Dirs::new();
    let store = FakeStore::new(b"this is not a zip file".to_vec());
    let config = config(ActionInputs {
        files: Some("root.txt=out.txt".to_string()),
        ..dirs.inputs()
    });

    let err = run(&config, &store).await.unwrap_err();

    assert!(matches!(err, ExtractError::Corrupted(_)));
    dirs.assert_workspace_empty();
}

#[tokio::test]
async fn test_extracted_directory_removed_after_body() {
    let dirs = Dirs::new();
    let store = FakeStore::new(create_test_zip());
    let object = ObjectRef::new("some-bucket", "foo.zip");

    // The body hands back the extracted root so we can check it is gone
    let extracted = with_extracted_object(&store, &object, dirs.workspace.path(), |directory| {
        assert!(directory.exists());
        assert_eq!(read(&directory.join("root.txt")), "Welcome root.txt");
        assert_eq!(
            read(&directory.join("subdir/subsubdir/subsubdir.txt")),
            "Welcome in subsubdir.txt"
        );
        assert!(directory.join("empty").is_dir());
        Ok(directory.to_path_buf())
    })
    .await
    .unwrap();

    assert!(!extracted.exists());
    dirs.assert_workspace_empty();
    assert_eq!(
        store.requests(),
        vec![("some-bucket".to_string(), "foo.zip".to_string())]
    );
}

#[tokio::test]
async fn test_body_error_still_cleans_up() {
    let dirs = Dirs::new();
    let store = FakeStore::new(create_test_zip());
    let object = ObjectRef::new("some-bucket", "foo.zip");

    let result: Result<(), _> =
        with_extracted_object(&store, &object, dirs.workspace.path(), |_| {
            Err(ExtractError::Corrupted("body failed".to_string()))
        })
        .await;

    assert!(result.is_err());
    dirs.assert_workspace_empty();
}

#[tokio::test]
async fn test_unreadable_object() {
    struct NoBody;

    #[async_trait]
    impl ObjectStore for NoBody {
        async fn get_object(&self, _: &str, _: &str) -> Result<ObjectResponse, ExtractError> {
            Ok(ObjectResponse::default())
        }
    }

    let dirs = Dirs::new();
    let config = config(ActionInputs {
        files: Some("root.txt=out.txt".to_string()),
        ..dirs.inputs()
    });

    let err = run(&config, &NoBody).await.unwrap_err();

    assert_eq!(err.to_string(), "Unable to read bucket some-bucket key some-key");
    dirs.assert_workspace_empty();
}

#[tokio::test]
async fn test_parent_dir_source_stays_inside_archive() {
    let dirs = Dirs::new();
    let store = FakeStore::new(create_test_zip());
    // Sits next to the extraction scope inside the workspace
    fs::write(dirs.workspace.path().join("host-secret.txt"), "SECRET").unwrap();
    let config = config(ActionInputs {
        target_base_directory: Some(dirs.target.path().display().to_string()),
        files: Some("../host-secret.txt=leak.txt".to_string()),
        fail_on_not_found: Some("true".to_string()),
        ..dirs.inputs()
    });

    let err = run(&config, &store).await.unwrap_err();

    assert!(matches!(err, ExtractError::SourceNotFound { .. }), "{err:?}");
    assert!(!dirs.target("leak.txt").exists());
}

/// Archive large enough that unpacking it takes a while.
fn create_large_zip() -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for i in 0..3000 {
        zip.start_file(format!("dir{}/nested/file{i}.txt", i % 50), options)
            .unwrap();
        zip.write_all(b"Welcome in a generated file").unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Resolve once the extraction scope exists and has something in it.
async fn extraction_started(workspace: &Path) {
    loop {
        let started = fs::read_dir(workspace)
            .into_iter()
            .flatten()
            .flatten()
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with(EXTRACT_DIR_PREFIX)
            })
            .any(|entry| {
                fs::read_dir(entry.path())
                    .map(|mut children| children.next().is_some())
                    .unwrap_or(false)
            });
        if started {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dropping_pipeline_during_extraction_leaves_no_directories() {
    let dirs = Dirs::new();
    let store = FakeStore::new(create_large_zip());
    let object = ObjectRef::new("some-bucket", "large.zip");

    tokio::select! {
        _ = with_extracted_object(&store, &object, dirs.workspace.path(), |_| Ok(())) => {}
        _ = extraction_started(dirs.workspace.path()) => {}
    }

    // The unpacking thread may still be running; wait for it to settle
    let mut empty = false;
    for _ in 0..1000 {
        if fs::read_dir(dirs.workspace.path()).unwrap().next().is_none() {
            empty = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(empty, "scoped directories left behind");

    tokio::time::sleep(Duration::from_millis(200)).await;
    dirs.assert_workspace_empty();
}
