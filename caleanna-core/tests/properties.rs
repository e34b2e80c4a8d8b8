//! End-to-end behaviour of the public API: storage upserts and cascades,
//! ordering, transfer round trips and rule degradation.

use caleanna_core::{
    arrange, Attribute, AttributeKind, AttributeRegistry, CaleannaError, LinkItem, RuleEngine,
    Session, Storage, ViewState, Workspace,
};
use tempfile::NamedTempFile;

fn link(id: &str, title: &str, url: &str, order: i64) -> LinkItem {
    LinkItem::new(id.to_string(), url, title, None, order).unwrap()
}

fn ids(links: &[LinkItem]) -> Vec<String> {
    links.iter().map(|l| l.id.clone()).collect()
}

fn view(sort_by: &str, filter_by: Option<&str>, search: &str) -> ViewState {
    ViewState {
        sort_by: sort_by.to_string(),
        filter_by: filter_by.map(str::to_string),
        search_term: search.to_string(),
    }
}

#[test]
fn get_links_returns_latest_saved_set() {
    let file = NamedTempFile::new().unwrap();
    let mut storage = Storage::at(file.path());

    storage
        .save_links(&[link("1", "a", "https://a.com", 0), link("2", "b", "https://b.com", 1)], "w")
        .unwrap();
    storage
        .save_links(&[link("2", "b2", "https://b.com", 1), link("3", "c", "https://c.com", 2)], "w")
        .unwrap();
    storage.save_links(&[link("1", "a3", "https://a.com", 0)], "w").unwrap();

    let mut links = storage.get_links("w").unwrap();
    links.sort_by(|a, b| a.id.cmp(&b.id));
    let titles: Vec<&str> = links.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["a3", "b2", "c"]);
}

#[test]
fn delete_workspace_leaves_nothing_behind() {
    let mut storage = Storage::in_memory();
    let default = storage.get_or_create_default_workspace().unwrap();
    let other = Workspace::new("5", "Other");
    storage.save_workspace(&other).unwrap();

    for ws in [&default, &other] {
        storage.save_links(&[link("1", "a", "https://a.com", 0)], &ws.id).unwrap();
        storage
            .save_attributes(
                &[Attribute {
                    id: "9".into(),
                    name: "Docs".into(),
                    kind: AttributeKind::Filter,
                    is_default: false,
                    condition: Some("item.isFavorite".into()),
                }],
                &ws.id,
            )
            .unwrap();
    }

    for ws in [&default, &other] {
        storage.delete_workspace(&ws.id).unwrap();
        assert!(storage.get_links(&ws.id).unwrap().is_empty());
        assert!(storage.get_attributes(&ws.id).unwrap().is_empty());
    }
    assert!(storage.list_workspaces().unwrap().is_empty());
}

#[test]
fn manual_reorder_is_stable_and_dense() {
    let displayed = vec![
        link("A", "a", "https://a.com", 0),
        link("B", "b", "https://b.com", 1),
        link("C", "c", "https://c.com", 2),
        link("D", "d", "https://d.com", 3),
    ];
    let out = caleanna_core::core::ordering::reorder(&displayed, &[], 3, 1).unwrap();
    assert_eq!(ids(&out), vec!["A", "D", "B", "C"]);
    assert_eq!(out.iter().map(|l| l.order).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
}

#[test]
fn newest_is_the_reverse_of_oldest() {
    let links = vec![
        link("1700000000005", "e", "https://e.com", 0),
        link("1700000000001", "a", "https://a.com", 1),
        link("1700000000003", "c", "https://c.com", 2),
        link("1700000000002", "b", "https://b.com", 3),
    ];
    let registry = AttributeRegistry::default();
    let rules = RuleEngine::new();
    let newest = arrange(&links, &view("Newest", None, ""), &registry, &rules);
    let mut oldest = arrange(&links, &view("Oldest", None, ""), &registry, &rules);
    oldest.reverse();
    assert_eq!(ids(&newest), ids(&oldest));
}

#[test]
fn favorites_filter_is_exact_and_idempotent() {
    let mut links = vec![
        link("1", "a", "https://a.com", 0),
        link("2", "b", "https://b.com", 1),
        link("3", "c", "https://c.com", 2),
    ];
    links[0].is_favorite = true;
    links[2].is_favorite = true;
    let registry = AttributeRegistry::default();
    let rules = RuleEngine::new();
    let favorites = view("Custom", Some("Favorites"), "");

    let once = arrange(&links, &favorites, &registry, &rules);
    assert!(once.iter().all(|l| l.is_favorite));
    assert_eq!(ids(&once), vec!["1", "3"]);
    let twice = arrange(&once, &favorites, &registry, &rules);
    assert_eq!(once, twice);
}

#[test]
fn search_matches_title_or_url_case_insensitively() {
    let links = vec![
        link("1", "Google", "https://google.com", 0),
        link("2", "Bing", "https://bing.com", 1),
    ];
    let out = arrange(
        &links,
        &view("Custom", None, "goog"),
        &AttributeRegistry::default(),
        &RuleEngine::new(),
    );
    assert_eq!(ids(&out), vec!["1"]);
}

#[test]
fn export_then_import_into_another_store() {
    let mut source = Session::open(Storage::in_memory(), None).unwrap();
    source.add_link("https://google.com", "Google", None).unwrap();
    source.add_link("https://bing.com", "Bing", None).unwrap();
    source
        .add_attribute("Search engines", AttributeKind::Filter, Some(r#"item.url.includes("g")"#))
        .unwrap();
    let url = source.export_current("http://localhost:3000").unwrap();

    let mut target = Session::open(Storage::in_memory(), None).unwrap();
    let imported = target.import(&url).unwrap();

    assert_ne!(&imported, source.current_workspace());
    assert_ne!(imported.name, source.current_workspace().name);
    assert_eq!(target.links(), source.links());
    assert_eq!(
        target.registry().user_attributes(),
        source.registry().user_attributes()
    );
    assert_eq!(target.registry().user_attributes().len(), 1);
}

#[test]
fn malformed_import_changes_nothing() {
    let file = NamedTempFile::new().unwrap();
    let mut session = Session::open(Storage::at(file.path()), None).unwrap();
    session.add_link("https://a.com", "A", None).unwrap();
    session
        .add_attribute("Docs", AttributeKind::Filter, Some("item.isFavorite"))
        .unwrap();
    let workspaces_before = session.workspaces().to_vec();
    let links_before = session.links().to_vec();

    let err = session.import("<html>not a token</html>").unwrap_err();
    assert!(matches!(err, CaleannaError::InvalidImportPayload(_)));
    session.close().unwrap();

    let mut storage = Storage::at(file.path());
    assert_eq!(storage.list_workspaces().unwrap(), workspaces_before);
    assert_eq!(storage.get_links("default").unwrap(), links_before);
    assert_eq!(storage.get_attributes("default").unwrap().len(), 1);
}

#[test]
fn broken_rules_leave_the_sequence_untouched() {
    let links = vec![
        link("3", "c", "https://c.com", 0),
        link("1", "a", "https://a.com", 1),
        link("2", "b", "https://b.com", 2),
    ];
    let registry = AttributeRegistry::load(vec![
        Attribute {
            id: "10".into(),
            name: "Bad sort".into(),
            kind: AttributeKind::Sort,
            is_default: false,
            condition: Some("undefinedVariable - b.order".into()),
        },
        Attribute {
            id: "11".into(),
            name: "Bad filter".into(),
            kind: AttributeKind::Filter,
            is_default: false,
            condition: Some("undefinedVariable.isFavorite".into()),
        },
    ]);
    let rules = RuleEngine::new();

    let sorted = arrange(&links, &view("Bad sort", None, ""), &registry, &rules);
    assert_eq!(sorted, links);
    let filtered = arrange(&links, &view("Bad sort", Some("Bad filter"), ""), &registry, &rules);
    assert_eq!(filtered, links);
}
