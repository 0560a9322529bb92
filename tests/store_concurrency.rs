//! Concurrent access to one document store from many threads

use chirpy::repository::{ChirpPolicy, Repository};
use chirpy::store::DocumentStore;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

fn repository(dir: &tempfile::TempDir) -> Repository {
    let store = Arc::new(DocumentStore::open(dir.path().join("database.json")).unwrap());
    Repository::new(store, ChirpPolicy::default())
}

#[test]
fn test_concurrent_creates_get_unique_ids() {
    let dir = tempfile::tempdir().unwrap();
    let repo = repository(&dir);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let repo = repo.clone();
            thread::spawn(move || {
                (0..10)
                    .map(|i| repo.create_chirp(&format!("t{t} c{i}"), t).unwrap().id)
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        let per_thread = handle.join().unwrap();
        // Each thread sees its own IDs strictly increasing.
        assert!(per_thread.windows(2).all(|w| w[0] < w[1]));
        ids.extend(per_thread);
    }
    assert_eq!(ids.len(), 80);
    assert_eq!(repo.list_chirps(None).unwrap().len(), 80);
}

#[test]
fn test_readers_never_observe_torn_document() {
    let dir = tempfile::tempdir().unwrap();
    let repo = repository(&dir);
    repo.create_chirp("seed", 1).unwrap();

    let writer = {
        let repo = repo.clone();
        thread::spawn(move || {
            for i in 0..50 {
                repo.create_chirp(&format!("chirp number {i}"), 1).unwrap();
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let repo = repo.clone();
            thread::spawn(move || {
                let mut last = 0;
                for _ in 0..50 {
                    let chirps = repo.list_chirps(None).unwrap();
                    assert!(chirps.windows(2).all(|w| w[0].id < w[1].id));
                    // A later read never sees fewer chirps than an earlier one.
                    assert!(chirps.len() >= last);
                    last = chirps.len();
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(repo.list_chirps(None).unwrap().len(), 51);
}

#[test]
fn test_reopened_store_continues_ids() {
    let dir = tempfile::tempdir().unwrap();
    {
        let repo = repository(&dir);
        repo.create_chirp("before restart", 1).unwrap();
        repo.create_user("pw", "a@b.com").unwrap();
    }
    let repo = repository(&dir);
    assert_eq!(repo.create_chirp("after restart", 1).unwrap().id, 2);
    assert_eq!(repo.create_user("pw", "c@d.com").unwrap().id, 2);
    assert_eq!(repo.get_chirp(1).unwrap().body, "before restart");
}
