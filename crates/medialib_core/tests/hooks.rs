use medialib_core::{CommitHooks, MemoryStore, Repository, Series, Shared};
use std::sync::{Arc, Mutex};

/// Records hook invocations and returns a token only for entities whose
/// title matches `token_for`.
struct RecordingHooks {
    token_for: &'static str,
    calls: Arc<Mutex<Vec<String>>>,
}

impl CommitHooks<Series> for RecordingHooks {
    type Params = String;
    type Token = u64;

    fn before_save(
        &self,
        working: &Series,
        original: Option<&Series>,
        params: &String,
    ) -> Option<u64> {
        let mode = if original.is_some() { "update" } else { "add" };
        self.calls
            .lock()
            .unwrap()
            .push(format!("before:{}:{mode}:{params}", working.title));
        (working.title == self.token_for).then(|| working.episode_count.into())
    }

    fn after_save(&self, result: &Series, token: u64, params: &String) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("after:{}:{token}:{params}", result.title));
    }
}

fn hooked_repo(
    token_for: &'static str,
) -> (
    Repository<Series, MemoryStore<Series>, RecordingHooks>,
    Arc<Mutex<Vec<String>>>,
) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let hooks = RecordingHooks {
        token_for,
        calls: calls.clone(),
    };
    (Repository::new(MemoryStore::new(), hooks), calls)
}

fn series(title: &str, episode_count: u32) -> Series {
    let mut series = Series::new(title);
    series.episode_count = episode_count;
    series
}

#[test]
fn hooks_fire_in_matched_pairs_around_a_single_commit() {
    let (repo, calls) = hooked_repo("tracked");

    repo.begin_add(series("tracked", 7))
        .commit(&"import".to_string())
        .unwrap();

    let calls = calls.lock().unwrap();
    assert_eq!(
        *calls,
        vec![
            "before:tracked:add:import".to_string(),
            "after:tracked:7:import".to_string(),
        ]
    );
}

#[test]
fn no_token_means_no_post_commit_hook() {
    let (repo, calls) = hooked_repo("someone-else");

    repo.begin_add(series("ignored", 1))
        .commit(&"import".to_string())
        .unwrap();

    let calls = calls.lock().unwrap();
    assert_eq!(*calls, vec!["before:ignored:add:import".to_string()]);
}

#[test]
fn update_hook_observes_the_pre_commit_original() {
    let (repo, calls) = hooked_repo("renamed");

    let original = repo
        .begin_add(series("original", 3))
        .commit(&"seed".to_string())
        .unwrap();

    let mut update = repo.begin_update(&original);
    update.entity_mut().unwrap().title = "renamed".to_string();
    update.commit(&"rename".to_string()).unwrap();

    let calls = calls.lock().unwrap();
    assert_eq!(
        *calls,
        vec![
            "before:original:add:seed".to_string(),
            "before:renamed:update:rename".to_string(),
            "after:renamed:3:rename".to_string(),
        ]
    );
}

#[test]
fn batch_post_commit_hook_fires_only_for_tokened_entities() {
    let (repo, calls) = hooked_repo("two");

    let originals: Vec<Shared<Series>> = repo
        .begin_batch_add(vec![series("one", 1), series("two", 2)])
        .commit(&"seed".to_string())
        .unwrap();

    calls.lock().unwrap().clear();

    let mut batch = repo.begin_batch_update(&originals);
    for working in batch.entities_mut() {
        working.episode_count *= 10;
    }
    batch.commit(&"bump".to_string()).unwrap();

    let calls = calls.lock().unwrap();
    assert_eq!(
        *calls,
        vec![
            "before:one:update:bump".to_string(),
            "before:two:update:bump".to_string(),
            // Exactly one post-commit call, correlated by the token taken
            // from the working copy before the critical section.
            "after:two:20:bump".to_string(),
        ]
    );
}

#[test]
fn failed_flush_skips_every_post_commit_hook() {
    let (repo, calls) = hooked_repo("tracked");
    repo.with_store_mut(MemoryStore::fail_next_flush);

    assert!(repo
        .begin_add(series("tracked", 4))
        .commit(&"import".to_string())
        .is_err());

    let calls = calls.lock().unwrap();
    assert_eq!(*calls, vec!["before:tracked:add:import".to_string()]);
}
