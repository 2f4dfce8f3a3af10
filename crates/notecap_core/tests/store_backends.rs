use notecap_core::store::JsonFileStore;
use notecap_core::{
    CaptureRequest, CoreConfig, NoteFilter, NoteRepository, NoteService, NoteStore, SqliteStore,
    StorageBackend,
};

#[test]
fn json_store_creates_directory_and_reads_missing_file_as_none() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("nested").join(".data");

    let store = JsonFileStore::open(&nested).unwrap();
    assert!(nested.is_dir());
    assert!(store.load_all().unwrap().is_none());
}

#[test]
fn json_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let created = {
        let service = NoteService::new(NoteRepository::new(JsonFileStore::open(dir.path()).unwrap()));
        service.capture(CaptureRequest::text("remember the milk")).unwrap()
    };

    let reopened = NoteService::new(NoteRepository::new(JsonFileStore::open(dir.path()).unwrap()));
    let notes = reopened.list_notes(&NoteFilter::default());
    assert_eq!(notes, vec![created]);
}

#[test]
fn json_store_save_replaces_whole_document() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    store.save_all("[1]").unwrap();
    store.save_all("[]").unwrap();

    assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "[]");
    let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(leftovers, 1);
}

#[test]
fn corrupt_json_file_reads_as_empty_collection() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    std::fs::write(store.path(), "{\"truncated\": [").unwrap();

    let repo = NoteRepository::new(store);
    assert!(repo.export().is_empty());
    assert_eq!(repo.stats().total, 0);
}

#[test]
fn sqlite_store_round_trips_document() {
    let store = SqliteStore::open_in_memory().unwrap();
    assert!(store.load_all().unwrap().is_none());

    store.save_all("[]").unwrap();
    store.save_all("[{\"id\":\"x\"}]").unwrap();
    assert_eq!(store.load_all().unwrap().as_deref(), Some("[{\"id\":\"x\"}]"));
}

#[test]
fn sqlite_backend_persists_notes_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let note_id = {
        let service = NoteService::new(NoteRepository::new(SqliteStore::open(dir.path()).unwrap()));
        let note = service.capture(CaptureRequest::text("sqlite backed")).unwrap();
        service.tag_note(&note.id, "db").unwrap();
        note.id
    };

    let service = NoteService::new(NoteRepository::new(SqliteStore::open(dir.path()).unwrap()));
    let note = service.get_note(&note_id).unwrap();
    assert_eq!(note.user_tags, vec!["db".to_string()]);
}

#[test]
fn config_opens_selected_backend() {
    let dir = tempfile::tempdir().unwrap();
    let config = CoreConfig {
        data_dir: dir.path().join("store"),
        backend: StorageBackend::Sqlite,
        import_limit: 3,
        ..CoreConfig::default()
    };

    let service = config.open_service().unwrap();
    assert_eq!(service.import_limit(), 3);
    assert_eq!(service.repository().store().kind(), "sqlite");
    service.capture(CaptureRequest::text("via config")).unwrap();
    assert!(dir.path().join("store").join("notecap.db").is_file());
}
