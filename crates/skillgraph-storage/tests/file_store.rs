//! File-backed SQLite round trips.

use skillgraph_core::{PrereqEdge, SkillGraph, SkillId, SkillNode};
use skillgraph_storage::{GraphStore, SqliteStore};

fn sample() -> SkillGraph {
    let mut graph = SkillGraph::new();
    graph.insert_node(SkillNode::new("strings", "Strings"));
    let mut slicing = SkillNode::new("string_slicing", "String slicing");
    slicing.level = 1;
    graph.insert_node(slicing);
    graph
        .add_edge(PrereqEdge::new("strings", "string_slicing"))
        .unwrap();
    graph
        .questions_mut()
        .insert("Reverse a string".into(), vec![SkillId::from("string_slicing")]);
    graph
}

#[test]
fn graph_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("skills.db");
    let path = path.to_str().unwrap();

    let id = {
        let mut store = SqliteStore::new(path).unwrap();
        store.insert_graph("week-1", &sample()).unwrap()
    };

    let store = SqliteStore::new(path).unwrap();
    assert_eq!(store.load_graph(id).unwrap(), sample());
    assert_eq!(store.find_graph("week-1").unwrap(), Some(id));
}

#[test]
fn reopening_does_not_rerun_migrations() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("skills.db");
    let path = path.to_str().unwrap();

    for round in 0..3 {
        let mut store = SqliteStore::new(path).unwrap();
        store.insert_graph(&format!("run-{round}"), &sample()).unwrap();
    }

    let store = SqliteStore::new(path).unwrap();
    let names: Vec<String> = store
        .list_graphs()
        .unwrap()
        .into_iter()
        .map(|summary| summary.name)
        .collect();
    assert_eq!(names, vec!["run-0", "run-1", "run-2"]);
}
