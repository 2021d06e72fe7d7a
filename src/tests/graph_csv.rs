use std::sync::Arc;

use serde_json::json;

use crate::graph::{
    CsvGraph, Edge, EdgeKind, EdgeProps, GraphError, GraphStore, IngredientNode, Label,
    Properties, RecipeNode, NEW_NODE,
};
use crate::relationships::RelationshipBuilder;

fn props(value: serde_json::Value) -> Properties {
    value.as_object().cloned().unwrap()
}

#[test]
fn test_new_graph_creates_files() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("graph");

    let graph = CsvGraph::load(&dir).unwrap();
    assert_eq!(graph.count_nodes(None).unwrap(), 0);
    assert!(dir.join("nodes.csv").exists());
    assert!(dir.join("edges.csv").exists());
}

#[test]
fn test_graph_survives_reload() {
    let tmp = tempfile::tempdir().unwrap();

    let (recipe_id, tomato_id) = {
        let graph = Arc::new(CsvGraph::load(tmp.path()).unwrap());
        let recipe = RecipeNode {
            id: 0,
            name: "Shakshuka, \"easy\"".into(),
            url: "https://example.com/shakshuka".into(),
            total_time: Some(35),
            cuisine_type: vec!["middle eastern".into()],
            instructions: vec!["Fry onions,\nthen add tomatoes.".into()],
            image: None,
        };
        let recipe_id = graph
            .create_node(Label::Recipe, recipe.to_properties())
            .unwrap();
        let tomato_id = graph
            .create_node(Label::Ingredient, props(json!({"name": "tomato", "category": "Vegetables"})))
            .unwrap();

        let recipe = RecipeNode {
            id: recipe_id,
            ..recipe
        };
        let tomato = IngredientNode {
            id: tomato_id,
            name: "tomato".into(),
            category: Some("Vegetables".into()),
            image: None,
        };
        RelationshipBuilder::new(graph.clone())
            .attach(&recipe, &tomato, "4", "<unit>")
            .unwrap();

        (recipe_id, tomato_id)
    };

    let graph = CsvGraph::load(tmp.path()).unwrap();
    assert_eq!(graph.count_nodes(Some(Label::Recipe)).unwrap(), 1);
    assert_eq!(graph.count_nodes(Some(Label::Ingredient)).unwrap(), 1);
    assert_eq!(graph.count_edges().unwrap(), 2);

    let found = graph
        .find_nodes_by_exact_property(Label::Recipe, "url", "https://EXAMPLE.com/shakshuka")
        .unwrap();
    let recipe = RecipeNode::from_node(&found[0]).unwrap();
    assert_eq!(recipe.id, recipe_id);
    assert_eq!(recipe.name, "Shakshuka, \"easy\"");
    assert_eq!(recipe.instructions, vec!["Fry onions,\nthen add tomatoes."]);
    assert_eq!(recipe.total_time, Some(35));

    let edges = graph.edges_between(tomato_id, recipe_id).unwrap();
    assert_eq!(edges[0].kind, EdgeKind::PartOf);
    assert_eq!(
        EdgeProps::from_properties(&edges[0].properties),
        Some(EdgeProps::new("4", "<unit>"))
    );

    // ids keep increasing after a reload
    let next = graph
        .create_node(Label::Ingredient, props(json!({"name": "onion"})))
        .unwrap();
    assert_eq!(next, tomato_id + 1);
}

#[test]
fn test_invalid_edge_pair_leaves_files_untouched() {
    let tmp = tempfile::tempdir().unwrap();
    let graph = CsvGraph::load(tmp.path()).unwrap();
    let a = graph
        .create_node(Label::Ingredient, props(json!({"name": "tomato"})))
        .unwrap();

    let edges_before = std::fs::read_to_string(tmp.path().join("edges.csv")).unwrap();

    let result = graph.create_edge_pair(
        Edge {
            from: 99,
            kind: EdgeKind::Contains,
            to: a,
            properties: Properties::new(),
        },
        Edge {
            from: a,
            kind: EdgeKind::PartOf,
            to: 99,
            properties: Properties::new(),
        },
    );
    assert!(matches!(result, Err(GraphError::NodeNotFound(99))));
    assert_eq!(graph.count_edges().unwrap(), 0);
    assert_eq!(
        std::fs::read_to_string(tmp.path().join("edges.csv")).unwrap(),
        edges_before
    );
}

#[test]
fn test_failed_flush_rolls_back_pair() {
    let tmp = tempfile::tempdir().unwrap();
    let graph = CsvGraph::load(tmp.path()).unwrap();
    let a = graph
        .create_node(Label::Ingredient, props(json!({"name": "tomato"})))
        .unwrap();
    let b = graph
        .create_node(Label::Recipe, props(json!({"name": "Soup", "url": "u"})))
        .unwrap();

    // a directory in place of the temp file makes the write fail
    std::fs::create_dir(tmp.path().join("edges.csv-tmp")).unwrap();

    let result = graph.create_edge_pair(
        Edge {
            from: b,
            kind: EdgeKind::Contains,
            to: a,
            properties: Properties::new(),
        },
        Edge {
            from: a,
            kind: EdgeKind::PartOf,
            to: b,
            properties: Properties::new(),
        },
    );
    assert!(result.is_err());
    assert_eq!(graph.count_edges().unwrap(), 0);
    assert!(graph.edges_between(b, a).unwrap().is_empty());
}

#[test]
fn test_corrupt_file_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(
        tmp.path().join("nodes.csv"),
        "id,label,properties\n1,Spice,{}\n",
    )
    .unwrap();

    assert!(matches!(
        CsvGraph::load(tmp.path()),
        Err(GraphError::Corrupt(_))
    ));
}

#[test]
fn test_failed_flush_rolls_back_node_with_edges() {
    let tmp = tempfile::tempdir().unwrap();
    let graph = CsvGraph::load(tmp.path()).unwrap();
    let tomato = graph
        .create_node(Label::Ingredient, props(json!({"name": "tomato"})))
        .unwrap();

    std::fs::create_dir(tmp.path().join("edges.csv-tmp")).unwrap();

    let result = graph.create_node_with_edges(
        Label::Recipe,
        props(json!({"name": "Soup", "url": "u"})),
        vec![
            Edge {
                from: NEW_NODE,
                kind: EdgeKind::Contains,
                to: tomato,
                properties: Properties::new(),
            },
            Edge {
                from: tomato,
                kind: EdgeKind::PartOf,
                to: NEW_NODE,
                properties: Properties::new(),
            },
        ],
    );
    assert!(result.is_err());
    assert_eq!(graph.count_nodes(Some(Label::Recipe)).unwrap(), 0);
    assert_eq!(graph.count_edges().unwrap(), 0);

    let reloaded = CsvGraph::load(tmp.path()).unwrap();
    assert_eq!(reloaded.count_nodes(None).unwrap(), 1);
    assert_eq!(reloaded.count_edges().unwrap(), 0);
}

#[test]
fn test_edges_to_unknown_nodes_are_dropped_on_load() {
    let tmp = tempfile::tempdir().unwrap();
    // edges.csv written, nodes.csv not yet renamed
    std::fs::write(
        tmp.path().join("nodes.csv"),
        "id,label,properties\n1,Ingredient,\"{\"\"name\"\":\"\"tomato\"\"}\"\n",
    )
    .unwrap();
    std::fs::write(
        tmp.path().join("edges.csv"),
        "from,type,to,properties\n2,CONTAINS,1,{}\n1,PART_OF,2,{}\n",
    )
    .unwrap();

    let graph = CsvGraph::load(tmp.path()).unwrap();
    assert_eq!(graph.count_nodes(None).unwrap(), 1);
    assert_eq!(graph.count_edges().unwrap(), 0);

    // the next node takes id 2 without inheriting the stale edges
    let soup = graph
        .create_node(Label::Recipe, props(json!({"name": "Soup", "url": "u"})))
        .unwrap();
    assert_eq!(soup, 2);
    assert!(graph.edges_between(soup, 1).unwrap().is_empty());
}
