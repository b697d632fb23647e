use std::path::Path;

use page_schema_core::{CompositionError, PageComposer, SchemaRegistry};
use page_schema_db::{
    CompositionStatus, DocumentEntry, DocumentStore, EngineConfig, Manifest, OptionsFingerprint,
};
use serde_json::{Value, json};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn homepage() -> Value {
    json!({
        "pageType": "homepage",
        "lineage": [],
        "seoData": {"metaTitle": "Front page"},
        "slots": {
            "main": [
                {"inputTemplate": "embed", "contentId": "e-1", "identifier": "weather-widget"},
                {"inputTemplate": "carousel", "contentId": "c-1"},
            ],
        },
    })
}

fn article_without_main() -> Value {
    json!({
        "pageType": "article",
        "lineage": [{"name": "News", "url": "/news"}],
        "seoData": {},
        "slots": {"aside": []},
    })
}

fn write_json(dir: &Path, name: &str, value: &Value) {
    let path = dir.join(format!("{name}.json"));
    std::fs::write(path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
}

fn entry_for(
    checksum: &str,
    page_type: Option<&str>,
    result: &Result<usize, Vec<CompositionError>>,
) -> DocumentEntry {
    DocumentEntry {
        checksum: checksum.to_string(),
        page_type: page_type.map(String::from),
        status: if result.is_ok() {
            CompositionStatus::Composed
        } else {
            CompositionStatus::Failed
        },
        error_count: result.as_ref().err().map_or(0, Vec::len),
        warning_count: *result.as_ref().unwrap_or(&0),
        composed_at: chrono::Utc::now(),
        output_file: None,
    }
}

// ---------------------------------------------------------------------------
// Document loading
// ---------------------------------------------------------------------------

#[test]
fn test_directory_loading_mixed_formats() {
    let dir = TempDir::new().unwrap();
    write_json(dir.path(), "home", &homepage());
    std::fs::write(
        dir.path().join("tag.yml"),
        "pageType: tag\nlineage: []\nseoData: {}\nslots: {}\n",
    )
    .unwrap();

    let store = DocumentStore::from_dir(dir.path()).unwrap();
    assert_eq!(store.len(), 2);
    assert_eq!(store.names().collect::<Vec<_>>(), vec!["home", "tag"]);
    assert_eq!(store.get("tag").unwrap().page_type(), Some("tag"));
}

#[test]
fn test_builder_fallback_to_file() {
    let dir = TempDir::new().unwrap();
    write_json(dir.path(), "home", &homepage());

    let store = DocumentStore::builder()
        .from_dir("/nonexistent/integ_pages/")
        .from_file(dir.path().join("home.json"))
        .build()
        .unwrap();
    assert!(store.contains("home"));
}

// ---------------------------------------------------------------------------
// Config to composition
// ---------------------------------------------------------------------------

#[test]
fn test_config_drives_composition() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("page-compose.yml");
    std::fs::write(
        &path,
        "version: \"1.0\"\nmax_body_depth: 4\ncache: true\ngeneration_hints:\n  author: 3\n",
    )
    .unwrap();

    let config = EngineConfig::load(&path).unwrap();
    config.validate(SchemaRegistry::builtin()).unwrap();
    let options = config.into_options();
    assert_eq!(options.max_body_depth, 4);

    let composer = PageComposer::new(SchemaRegistry::builtin()).with_options(options);
    let composed = composer.compose(&homepage()).unwrap();
    assert_eq!(composed.page.slot("main").unwrap().len(), 1);
    assert_eq!(composed.warnings.len(), 1);
}

// ---------------------------------------------------------------------------
// Manifest workflow
// ---------------------------------------------------------------------------

#[test]
fn test_manifest_workflow() {
    let pages = TempDir::new().unwrap();
    write_json(pages.path(), "home", &homepage());
    write_json(pages.path(), "story", &article_without_main());

    let options = EngineConfig::default().into_options();
    let fingerprint = OptionsFingerprint::from(&options);
    let composer = PageComposer::new(SchemaRegistry::builtin()).with_options(options);

    let store = DocumentStore::from_dir(pages.path()).unwrap();
    let mut manifest = Manifest::new("0.1.0".into(), fingerprint.clone());
    for document in store.documents() {
        let result = composer
            .compose(&document.value)
            .map(|composed| composed.warnings.len());
        manifest.update_entry(
            document.name.clone(),
            entry_for(&document.checksum, document.page_type(), &result),
        );
    }

    assert_eq!(manifest.get("home").unwrap().status, CompositionStatus::Composed);
    assert_eq!(manifest.get("home").unwrap().warning_count, 1);
    let story = manifest.get("story").unwrap();
    assert_eq!(story.status, CompositionStatus::Failed);
    assert_eq!(story.error_count, 1);

    // Save and reload.
    let out = TempDir::new().unwrap();
    let manifest_path = out.path().join("manifest.json");
    manifest.save(&manifest_path).unwrap();
    let loaded = Manifest::load(&manifest_path).unwrap();
    assert_eq!(loaded.documents.len(), 2);
    assert!(loaded.verify("home", pages.path().join("home.json")).is_ok());

    // Edit one document: only it is reported.
    let mut edited = homepage();
    edited["seoData"]["metaTitle"] = json!("Front page, evening edition");
    write_json(pages.path(), "home", &edited);
    let reloaded = DocumentStore::from_dir(pages.path()).unwrap();

    let mut next = Manifest::new("0.1.0".into(), fingerprint);
    for document in reloaded.documents() {
        let previous = loaded.get(&document.name).unwrap();
        let mut entry = previous.clone();
        entry.checksum = document.checksum.clone();
        next.update_entry(document.name.clone(), entry);
        assert_eq!(
            loaded.needs_composition(&document.name, &document.checksum),
            document.name == "home"
        );
    }
    assert_eq!(loaded.diff(&next), vec!["home".to_string()]);
}
