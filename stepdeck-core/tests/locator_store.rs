use std::fs;
use std::path::Path;

use stepdeck_core::{
    LoadOptions, LocatorEntry, LocatorError, LocatorKind, LocatorStore, Platform,
};

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn load(dir: &Path, environment: &str) -> LocatorStore {
    LocatorStore::load(LoadOptions::environment_suffixed(
        Platform::Web,
        environment,
        dir,
    ))
}

#[test]
fn malformed_file_does_not_abort_load() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "login_dev.yaml",
        "username_input: '#username'\npassword_input:\n  type: css\n  value: '#password'\n",
    );
    write(dir.path(), "broken_dev.yaml", "items: [unclosed\n  - : :\n");

    let store = load(dir.path(), "dev");
    assert_eq!(store.groups(), vec!["login"]);
    assert_eq!(store.get("login").len(), 2);
    assert_eq!(store.issues().len(), 1);
    match &store.issues()[0] {
        LocatorError::FileLoad { path, .. } => {
            assert!(path.ends_with("broken_dev.yaml"));
        }
        other => panic!("unexpected issue {other:?}"),
    }
}

#[test]
fn validate_required_names_only_missing_keys() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "login_dev.yaml",
        "username_input: '#username'\npassword_input: '#password'\n",
    );
    let store = load(dir.path(), "dev");

    store
        .validate_required("login", &["username_input", "password_input"])
        .unwrap();
    let err = store
        .validate_required(
            "login",
            &["username_input", "password_input", "nonexistent_key"],
        )
        .unwrap_err();
    assert_eq!(
        err,
        LocatorError::MissingSelectors {
            group: "login".into(),
            missing: vec!["nonexistent_key".into()],
        }
    );
    assert_eq!(
        err.to_string(),
        "required selectors missing for 'login': nonexistent_key"
    );
}

#[test]
fn json_and_yaml_groups_share_the_namespace() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "cart_qa.json",
        r#"{"cart": {"checkout": {"type": "xpath", "value": "//button[@id='checkout']"}}}"#,
    );
    write(dir.path(), "home_qa.yml", "home:\n  banner: .banner\n");
    write(dir.path(), "home_dev.yml", "banner: '#dev-banner'\n");

    let store = load(dir.path(), "qa");
    assert_eq!(store.groups(), vec!["cart", "home"]);
    assert_eq!(
        store.namespace().entry("cart", "checkout"),
        Some(&LocatorEntry::typed(
            LocatorKind::XPath,
            "//button[@id='checkout']"
        ))
    );
    assert_eq!(
        store.namespace().entry("home", "banner"),
        Some(&LocatorEntry::plain(".banner"))
    );

    let sources = store.file_sources();
    assert_eq!(sources.strategy, "environment");
    assert_eq!(sources.json_files, vec!["cart_qa.json"]);
    assert_eq!(sources.yaml_files, vec!["home_qa.yml"]);
}

#[test]
fn unusable_entries_are_kept_but_do_not_resolve() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "login_dev.yaml",
        "submit: '#submit'\nlegacy:\n  type: shadow-dom\n  value: 'x'\n",
    );
    let store = load(dir.path(), "dev");
    assert_eq!(store.selector_counts().get("login"), Some(&2));
    store.validate_required("login", &["legacy"]).unwrap();
    let err = store.resolver().resolve("{login > legacy}").unwrap_err();
    assert!(matches!(err, LocatorError::UnsupportedLocatorFormat { .. }));
}

#[test]
fn single_key_file_named_after_its_group_loads() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "search_dev.json", r##"{"search": "#search-box"}"##);

    let store = load(dir.path(), "dev");
    assert!(store.issues().is_empty());
    assert_eq!(store.groups(), vec!["search"]);
    let resolved = store.resolver().resolve("{search > search}").unwrap();
    assert_eq!(resolved.as_pair(), ("css selector", "#search-box"));
}
