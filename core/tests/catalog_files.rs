// core/tests/catalog_files.rs
//
// Integration tests for loading category blobs from disk.
//
// Tests cover:
// - bundled blobs load first, user-built blobs are the fallback
// - zero-byte and corrupt files leave the category unavailable
// - init loads whatever exists and is idempotent
// - user-built dictionaries are saved where the fallback finds them

use std::path::Path;

use suggest_core::{
    DictionaryCategory, DictionaryEntry, DictionarySource, DictionaryStatus, MemoryStore, TrieCatalog,
    TrieDictionary,
};
use suggest_core::builder::build_from_store;

fn rows() -> MemoryStore {
    MemoryStore::from_entries(vec![
        DictionaryEntry::new("北京", "bei jing", 9000, DictionaryCategory::Base),
        DictionaryEntry::new("背景", "bei jing", 500, DictionaryCategory::Base),
        DictionaryEntry::new("你好", "ni hao", 8000, DictionaryCategory::Base),
        DictionaryEntry::new("上海", "shang hai", 7000, DictionaryCategory::Place),
    ])
}

fn write_blob(dir: &Path, category: DictionaryCategory) {
    let dict = build_from_store(&rows(), category, category.default_capacity()).unwrap();
    dict.save_to(dir.join(category.blob_file_name())).unwrap();
}

#[test]
fn bundled_blob_is_preferred() {
    let bundled = tempfile::tempdir().unwrap();
    let user = tempfile::tempdir().unwrap();
    write_blob(bundled.path(), DictionaryCategory::Base);
    write_blob(user.path(), DictionaryCategory::Base);

    let catalog = TrieCatalog::new(Some(bundled.path().to_path_buf()), Some(user.path().to_path_buf()));
    assert!(catalog.load_to_memory(DictionaryCategory::Base));
    assert_eq!(
        catalog.status(DictionaryCategory::Base),
        DictionaryStatus::Loaded {
            source: DictionarySource::Bundled
        }
    );
    let words: Vec<_> = catalog
        .search_exact(DictionaryCategory::Base, "@bj", 10)
        .into_iter()
        .map(|w| w.word)
        .collect();
    assert_eq!(words, vec!["北京", "背景"]);
}

#[test]
fn empty_bundled_file_falls_back_to_user_blob() {
    let bundled = tempfile::tempdir().unwrap();
    let user = tempfile::tempdir().unwrap();
    std::fs::write(bundled.path().join(DictionaryCategory::Base.blob_file_name()), b"").unwrap();
    write_blob(user.path(), DictionaryCategory::Base);

    let catalog = TrieCatalog::new(Some(bundled.path().to_path_buf()), Some(user.path().to_path_buf()));
    assert!(catalog.load_to_memory(DictionaryCategory::Base));
    assert_eq!(
        catalog.status(DictionaryCategory::Base),
        DictionaryStatus::Loaded {
            source: DictionarySource::UserBuilt
        }
    );
}

#[test]
fn unusable_files_mark_category_unavailable() {
    let bundled = tempfile::tempdir().unwrap();
    std::fs::write(bundled.path().join(DictionaryCategory::Base.blob_file_name()), b"").unwrap();
    std::fs::write(
        bundled.path().join(DictionaryCategory::Place.blob_file_name()),
        b"PTRI garbage that is not gzip",
    )
    .unwrap();

    let catalog = TrieCatalog::new(Some(bundled.path().to_path_buf()), None);
    for category in [DictionaryCategory::Base, DictionaryCategory::Place] {
        assert!(!catalog.load_to_memory(category));
        assert!(matches!(
            catalog.status(category),
            DictionaryStatus::Unavailable { .. }
        ));
        assert!(catalog.search_by_prefix(category, "b", 10).is_empty());
    }
    assert_eq!(catalog.generation(), 0);
}

#[test]
fn init_loads_available_categories_once() {
    let bundled = tempfile::tempdir().unwrap();
    write_blob(bundled.path(), DictionaryCategory::Base);
    write_blob(bundled.path(), DictionaryCategory::Place);

    let catalog = TrieCatalog::new(Some(bundled.path().to_path_buf()), None);
    assert_eq!(
        catalog.available_categories(),
        vec![DictionaryCategory::Base, DictionaryCategory::Place]
    );
    catalog.init();
    assert_eq!(
        catalog.loaded_categories(),
        vec![DictionaryCategory::Base, DictionaryCategory::Place]
    );
    let generation = catalog.generation();

    catalog.unload(DictionaryCategory::Place);
    catalog.init();
    assert_eq!(catalog.loaded_categories(), vec![DictionaryCategory::Base]);
    assert_eq!(catalog.generation(), generation + 1);
}

#[test]
fn user_built_dictionary_round_trips_through_disk() {
    let user = tempfile::tempdir().unwrap();
    let catalog = TrieCatalog::new(None, Some(user.path().to_path_buf()));
    catalog
        .build_from_store(DictionaryCategory::Place, &rows())
        .unwrap();
    let path = catalog.save_user_built(DictionaryCategory::Place).unwrap();
    assert!(path.ends_with("place_trie.dat"));
    assert!(catalog.file_status(DictionaryCategory::Place).user_built);

    let saved = TrieDictionary::load_from(&path).unwrap();
    assert_eq!(saved.search_exact("shanghai", 5)[0].word, "上海");

    let fresh = TrieCatalog::new(None, Some(user.path().to_path_buf()));
    assert!(fresh.load_to_memory(DictionaryCategory::Place));
    assert_eq!(
        fresh.status(DictionaryCategory::Place),
        DictionaryStatus::Loaded {
            source: DictionarySource::UserBuilt
        }
    );
}

#[test]
fn saving_without_user_dir_fails() {
    let catalog = TrieCatalog::new(None, None);
    catalog
        .build_from_store(DictionaryCategory::Base, &rows())
        .unwrap();
    assert!(catalog.save_user_built(DictionaryCategory::Base).is_err());
    assert!(catalog.save_user_built(DictionaryCategory::Place).is_err());
}
