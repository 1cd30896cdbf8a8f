use medialib_core::{MemoryStore, NoHooks, RepoError, Repository, Series, Shared};
use std::sync::Arc;

fn series_repo() -> Repository<Series, MemoryStore<Series>, NoHooks> {
    Repository::new(MemoryStore::new(), NoHooks)
}

fn committed_series(
    repo: &Repository<Series, MemoryStore<Series>, NoHooks>,
    title: &str,
    episode_count: u32,
) -> Shared<Series> {
    let mut series = Series::new(title);
    series.episode_count = episode_count;
    repo.begin_add(series).commit(&()).unwrap()
}

#[test]
fn batch_update_flushes_once_and_merges_every_original() {
    let repo = series_repo();
    let first = committed_series(&repo, "one", 1);
    let second = committed_series(&repo, "two", 2);
    let flushes_before = repo.with_store(MemoryStore::flush_count);

    let mut batch = repo.begin_batch_update(&[first.clone(), second.clone()]);
    assert_eq!(batch.len(), 2);
    for working in batch.entities_mut() {
        working.episode_count *= 10;
    }
    let results = batch.commit(&()).unwrap();

    assert_eq!(results.len(), 2);
    assert!(Arc::ptr_eq(&results[0], &first));
    assert!(Arc::ptr_eq(&results[1], &second));
    assert_eq!(first.read().episode_count, 10);
    assert_eq!(second.read().episode_count, 20);

    let flushes_after = repo.with_store(MemoryStore::flush_count);
    assert_eq!(flushes_after - flushes_before, 1);

    let first_id = first.read().id.unwrap();
    let second_id = second.read().id.unwrap();
    repo.with_store(|store| {
        assert_eq!(store.row(first_id).unwrap().episode_count, 10);
        assert_eq!(store.row(second_id).unwrap().episode_count, 20);
    });
    assert_eq!(repo.cached(first_id).unwrap().read().episode_count, 10);
    assert_eq!(repo.cached(second_id).unwrap().read().episode_count, 20);
}

#[test]
fn batch_add_registers_every_entity_in_order() {
    let repo = series_repo();

    let mut batch =
        repo.begin_batch_add(vec![Series::new("a"), Series::new("b"), Series::new("c")]);
    let results = batch.commit(&()).unwrap();

    assert_eq!(results.len(), 3);
    let titles: Vec<String> = results
        .iter()
        .map(|cell| cell.read().title.clone())
        .collect();
    assert_eq!(titles, ["a", "b", "c"]);

    repo.with_store(|store| {
        assert_eq!(store.len(), 3);
        assert_eq!(store.flush_count(), 1);
    });
    assert_eq!(repo.cache_len(), 3);
    for cell in &results {
        let id = cell.read().id.expect("store must assign a key");
        assert!(Arc::ptr_eq(&repo.cached(id).unwrap(), cell));
    }
}

#[test]
fn original_of_maps_working_copies_back_to_their_originals() {
    let repo = series_repo();
    let first = committed_series(&repo, "one", 1);
    let second = committed_series(&repo, "two", 2);

    let batch = repo.begin_batch_update(&[first.clone(), second.clone()]);
    let workings: Vec<Series> = batch.entities().cloned().collect();

    assert!(Arc::ptr_eq(&batch.original_of(&workings[0]).unwrap(), &first));
    assert!(Arc::ptr_eq(
        &batch.original_of(&workings[1]).unwrap(),
        &second
    ));

    let outsider = committed_series(&repo, "three", 3);
    assert!(batch.original_of(&outsider.read().clone()).is_none());
    assert!(batch.original_of(&Series::new("unkeyed")).is_none());
}

#[test]
fn create_mode_batch_has_no_originals() {
    let repo = series_repo();
    let batch = repo.begin_batch_add(vec![Series::new("fresh")]);
    let working = batch.entities().next().unwrap().clone();
    assert!(batch.original_of(&working).is_none());
}

#[test]
fn batch_commit_is_one_shot() {
    let repo = series_repo();
    let original = committed_series(&repo, "solo", 1);

    let mut batch = repo.begin_batch_update(&[original]);
    batch.commit(&()).unwrap();
    assert!(matches!(batch.commit(&()), Err(RepoError::Spent)));
}

#[test]
fn released_batch_has_no_observable_effect() {
    let repo = series_repo();

    let mut batch = repo.begin_batch_add(vec![Series::new("a"), Series::new("b")]);
    batch.release();
    assert!(batch.is_empty());
    assert!(matches!(batch.commit(&()), Err(RepoError::Spent)));

    repo.with_store(|store| {
        assert!(store.is_empty());
        assert_eq!(store.flush_count(), 0);
    });
    assert_eq!(repo.cache_len(), 0);
}

#[test]
fn empty_batch_commits_to_empty_result() {
    let repo = series_repo();
    let mut batch = repo.begin_batch_add(Vec::new());
    let results = batch.commit(&()).unwrap();
    assert!(results.is_empty());
}

#[test]
fn batch_flush_failure_propagates_and_keeps_cache_size() {
    let repo = series_repo();
    let original = committed_series(&repo, "kept", 5);
    let cache_len_before = repo.cache_len();

    repo.with_store_mut(MemoryStore::fail_next_flush);
    let mut batch = repo.begin_batch_update(&[original.clone()]);
    for working in batch.entities_mut() {
        working.episode_count = 50;
    }
    assert!(matches!(batch.commit(&()), Err(RepoError::Store(_))));

    assert_eq!(repo.cache_len(), cache_len_before);
    let id = original.read().id.unwrap();
    repo.with_store(|store| assert_eq!(store.row(id).unwrap().episode_count, 5));
}
