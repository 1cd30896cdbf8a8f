use medialib_core::{Episode, MemoryStore, NoHooks, Repository, Series};
use std::sync::Arc;
use std::thread;

const THREADS: u32 = 8;
const COMMITS_PER_THREAD: u32 = 10;

#[test]
fn commits_against_one_repository_are_fully_serialized() {
    let repo: Arc<Repository<Series, MemoryStore<Series>, NoHooks>> =
        Arc::new(Repository::new(MemoryStore::new(), NoHooks));
    let original = repo.begin_add(Series::new("contended")).commit(&()).unwrap();
    let id = original.read().id.unwrap();

    let mut handles = Vec::new();
    for worker in 0..THREADS {
        let repo = repo.clone();
        let original = original.clone();
        handles.push(thread::spawn(move || {
            for round in 0..COMMITS_PER_THREAD {
                let mut update = repo.begin_update(&original);
                update.entity_mut().unwrap().episode_count = worker * 1000 + round;
                update.commit(&()).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    // Every commit flushed exactly once, in some serial order.
    repo.with_store(|store| {
        assert_eq!(store.flush_count(), u64::from(THREADS * COMMITS_PER_THREAD) + 1);
        assert_eq!(store.len(), 1);
        // The persisted row matches the original's final in-memory state:
        // the last critical section merged and flushed the same value.
        assert_eq!(
            store.row(id).unwrap().episode_count,
            original.read().episode_count
        );
    });
    assert!(Arc::ptr_eq(&repo.cached(id).unwrap(), &original));
}

#[test]
fn repositories_for_different_entity_types_commit_in_parallel() {
    let series_repo: Arc<Repository<Series, MemoryStore<Series>, NoHooks>> =
        Arc::new(Repository::new(MemoryStore::new(), NoHooks));
    let episode_repo: Arc<Repository<Episode, MemoryStore<Episode>, NoHooks>> =
        Arc::new(Repository::new(MemoryStore::new(), NoHooks));

    let series_worker = {
        let repo = series_repo.clone();
        thread::spawn(move || {
            for index in 0..COMMITS_PER_THREAD {
                repo.begin_add(Series::new(format!("series {index}")))
                    .commit(&())
                    .unwrap();
            }
        })
    };
    let episode_worker = {
        let repo = episode_repo.clone();
        thread::spawn(move || {
            for index in 0..COMMITS_PER_THREAD {
                repo.begin_add(Episode::new(index, format!("episode {index}")))
                    .commit(&())
                    .unwrap();
            }
        })
    };

    series_worker.join().unwrap();
    episode_worker.join().unwrap();

    series_repo.with_store(|store| assert_eq!(store.len(), COMMITS_PER_THREAD as usize));
    episode_repo.with_store(|store| assert_eq!(store.len(), COMMITS_PER_THREAD as usize));
    assert_eq!(series_repo.cache_len(), COMMITS_PER_THREAD as usize);
    assert_eq!(episode_repo.cache_len(), COMMITS_PER_THREAD as usize);
}

#[test]
fn working_copies_are_mutated_concurrently_without_the_lock() {
    let repo: Arc<Repository<Series, MemoryStore<Series>, NoHooks>> =
        Arc::new(Repository::new(MemoryStore::new(), NoHooks));
    let original = repo.begin_add(Series::new("shared")).commit(&()).unwrap();

    // Many units of work mutate their own working copies at once; none of it
    // is visible until each commits.
    let mut handles = Vec::new();
    for worker in 0..THREADS {
        let repo = repo.clone();
        let original = original.clone();
        handles.push(thread::spawn(move || {
            let mut update = repo.begin_update(&original);
            let working = update.entity_mut().unwrap();
            working.rating = Some(worker as u8);
            working.title = format!("candidate {worker}");
            update.commit(&()).unwrap();
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let row = original.read();
    assert!(row.title.starts_with("candidate "));
    assert!(row.rating.is_some());
}
