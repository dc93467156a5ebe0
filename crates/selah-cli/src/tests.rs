use super::*;

fn entry_with_id(text: &str, id: &str) -> Entry {
    let mut entry = Entry::new(text);
    entry.id = id.parse().unwrap();
    entry
}

#[test]
fn kind_arg_maps_to_entry_kind() {
    assert_eq!(EntryKind::from(KindArg::Journal), EntryKind::Journal);
    assert_eq!(
        EntryKind::from(KindArg::Affirmation),
        EntryKind::Affirmation
    );
}

#[test]
fn short_id_truncates_to_eight_chars() {
    assert_eq!(short_id("cccccccc-cccc-7ccc-8ccc-111111111111"), "cccccccc");
    assert_eq!(short_id("abc"), "abc");
}

#[test]
fn format_relative_time_buckets() {
    let now = chrono::Utc::now().timestamp_millis();
    assert_eq!(format_relative_time(now), "just now");
    assert_eq!(format_relative_time(now - 5 * 60 * 1000), "5m ago");
    assert_eq!(format_relative_time(now - 3 * 3600 * 1000), "3h ago");
    assert_eq!(format_relative_time(now - 2 * 86_400 * 1000), "2d ago");
}

#[test]
fn find_by_prefix_resolves_unique_match() {
    let entries = vec![
        entry_with_id("one", "aaaaaaaa-0000-7000-8000-000000000001"),
        entry_with_id("two", "bbbbbbbb-0000-7000-8000-000000000002"),
    ];

    let found = find_by_prefix(entries, "bbbb").unwrap();
    assert_eq!(found.text, "two");
}

#[test]
fn find_by_prefix_rejects_unknown_prefix() {
    let entries = vec![entry_with_id(
        "one",
        "aaaaaaaa-0000-7000-8000-000000000001",
    )];

    assert!(matches!(
        find_by_prefix(entries, "ffff"),
        Err(CliError::EntryNotFound(_))
    ));
}

#[test]
fn find_by_prefix_rejects_ambiguous_prefix() {
    let entries = vec![
        entry_with_id("one", "aaaaaaaa-0000-7000-8000-000000000001"),
        entry_with_id("two", "aaaaaaaa-0000-7000-8000-000000000002"),
    ];

    assert!(matches!(
        find_by_prefix(entries, "aaaa"),
        Err(CliError::AmbiguousEntryId(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn add_then_list_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("selah.db");

    run_add(
        KindArg::Journal,
        &["Grateful".to_string(), "today".to_string()],
        Some("Psalms".to_string()),
        None,
        true,
        &db_path,
    )
    .await
    .unwrap();

    let store = open_store(&db_path).await.unwrap();
    let repo = EntryRepository::new(store, EntryKind::Journal, SyncRequester::disconnected());

    let entries = repo.fetch().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].text, "Grateful today");
    assert_eq!(entries[0].book.as_deref(), Some("Psalms"));
    assert!(entries[0].is_favorite);

    // The other collection is untouched
    let affirmations =
        EntryRepository::affirmation(open_store(&db_path).await.unwrap(), SyncRequester::disconnected());
    assert!(affirmations.fetch().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn add_rejects_empty_text() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("selah.db");

    let result = run_add(KindArg::Journal, &["   ".to_string()], None, None, false, &db_path).await;
    assert!(matches!(result, Err(CliError::EmptyText)));
}

#[tokio::test(flavor = "multi_thread")]
async fn migrate_command_moves_declarations_and_removes_file() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("selah.db");
    let legacy_path = dir.path().join("declarations.json");

    std::fs::write(
        &legacy_path,
        r#"[
            {"text": "My own journal", "category": "my-own", "kind": "journal", "lastEdit": 1000},
            {"text": "My own affirmation", "category": "my-own", "kind": "affirmation"},
            {"text": "Curated", "category": "starter-pack", "kind": "journal"}
        ]"#,
    )
    .unwrap();

    run_migrate(&legacy_path, &db_path).await.unwrap();

    let store = open_store(&db_path).await.unwrap();
    assert_eq!(store.list(EntryKind::Journal).await.unwrap().len(), 1);
    assert_eq!(store.list(EntryKind::Affirmation).await.unwrap().len(), 1);
    assert!(!legacy_path.exists());

    let state = MigrationState::load(&store).await.unwrap();
    assert!(state.completed);
}
