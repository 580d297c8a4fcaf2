use super::*;
use crate::attribute::{AttrMap, AttrValue};
use crate::catalog::{RefDescriptor, ResourceSpec};

fn instance(resource_type: &str, id: &str, attributes: AttrMap) -> ResourceInstance {
    ResourceInstance {
        resource_type: ResourceType::new(resource_type),
        id: id.to_string(),
        label: id.to_lowercase(),
        raw_label: id.to_string(),
        attributes,
    }
}

fn attrs(pairs: &[(&str, AttrValue)]) -> AttrMap {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

fn catalog() -> ReferenceCatalog {
    ReferenceCatalog::new()
        .with(
            "routing_queue",
            ResourceSpec::builder()
                .reference("division_id", RefDescriptor::to("auth_division"))
                .reference("members.user_id", RefDescriptor::to("user"))
                .build()
                .unwrap(),
        )
        .with(
            "user",
            ResourceSpec::builder()
                .reference("manager", RefDescriptor::to("user"))
                .build()
                .unwrap(),
        )
        .with("auth_division", ResourceSpec::default())
}

fn corpus() -> Vec<ResourceInstance> {
    let member = |user: &str| {
        AttrValue::Map(attrs(&[("user_id", AttrValue::string(user)), ("ring_num", AttrValue::Int(1))]))
    };
    vec![
        instance("auth_division", "D1", AttrMap::new()),
        instance(
            "routing_queue",
            "Q1",
            attrs(&[
                ("division_id", AttrValue::string("D1")),
                ("members", AttrValue::List(vec![member("U1"), member("U9")])),
            ]),
        ),
        instance("user", "U1", attrs(&[("manager", AttrValue::string("U2"))])),
        instance("user", "U2", AttrMap::new()),
    ]
}

fn instances(graph: Graph) -> InstanceGraph {
    match graph {
        Graph::Instances(g) => g,
        Graph::Types(_) => panic!("expected an instance graph"),
    }
}

#[test]
fn test_instance_edges() {
    let graph = instances(build(&corpus(), &catalog(), Granularity::Instance));
    assert_eq!(graph.nodes.len(), 4);

    let edges: Vec<_> = graph
        .edges
        .iter()
        .map(|e| (e.from.id.as_str(), e.to.id.as_str(), e.via.to_string()))
        .collect();
    assert_eq!(
        edges,
        vec![
            ("Q1", "D1", "division_id".to_string()),
            ("Q1", "U1", "members.0.user_id".to_string()),
        ]
    );
}

#[test]
fn test_same_type_edges_kept_apart() {
    let graph = instances(build(&corpus(), &catalog(), Granularity::Instance));
    assert_eq!(graph.self_edges.len(), 1);
    let edge = graph.self_edges.iter().next().unwrap();
    assert_eq!(edge.from, InstanceKey::new(ResourceType::new("user"), "U1"));
    assert_eq!(edge.to, InstanceKey::new(ResourceType::new("user"), "U2"));
}

#[test]
fn test_dangling_edges_recorded() {
    let graph = instances(build(&corpus(), &catalog(), Granularity::Instance));
    assert_eq!(graph.dangling.len(), 1);
    let edge = graph.dangling.iter().next().unwrap();
    assert_eq!(edge.to.id, "U9");
    assert_eq!(edge.via.to_string(), "members.1.user_id");
}

#[test]
fn test_build_is_idempotent() {
    let catalog = catalog();
    let corpus = corpus();
    assert_eq!(
        build(&corpus, &catalog, Granularity::Instance),
        build(&corpus, &catalog, Granularity::Instance)
    );
    assert_eq!(
        build(&corpus, &catalog, Granularity::Type),
        build(&corpus, &catalog, Granularity::Type)
    );
}

#[test]
fn test_type_projection_uses_declared_paths() {
    let Graph::Types(graph) = build(&corpus(), &catalog(), Granularity::Type) else {
        panic!("expected a type graph");
    };
    let edges: Vec<_> = graph
        .edges
        .iter()
        .map(|e| (e.from.as_str(), e.to.as_str(), e.via.to_string()))
        .collect();
    assert_eq!(
        edges,
        vec![
            ("routing_queue", "auth_division", "division_id".to_string()),
            ("routing_queue", "user", "members.user_id".to_string()),
        ]
    );
    assert_eq!(graph.self_edges.len(), 1);
    assert!(graph.adjacency()[&ResourceType::new("user")].is_empty());
}

#[test]
fn test_excluded_attribute_contributes_no_edge() {
    let mut catalog = catalog();
    if let Some(spec) = catalog.spec_mut(&ResourceType::new("routing_queue")) {
        spec.exclude(AttrPath::parse("members").unwrap());
    }
    let graph = instances(build(&corpus(), &catalog, Granularity::Instance));
    assert_eq!(graph.edges.len(), 1);
    assert!(graph.dangling.is_empty());

    let declared = TypeGraph::from_catalog(&catalog);
    assert!(!declared
        .edges
        .iter()
        .any(|e| e.to.as_str() == "user" && e.from.as_str() == "routing_queue"));
}

#[test]
fn test_encoded_references_add_type_edges() {
    let catalog = ReferenceCatalog::new().with(
        "flow_milestone",
        ResourceSpec::builder()
            .encoded_reference("settings", "queue.id", RefDescriptor::to("routing_queue"))
            .build()
            .unwrap(),
    );
    let graph = TypeGraph::from_catalog(&catalog);
    let edges: Vec<_> = graph
        .edges
        .iter()
        .map(|e| (e.from.as_str(), e.to.as_str(), e.via.to_string()))
        .collect();
    assert_eq!(
        edges,
        vec![("flow_milestone", "routing_queue", "settings.queue.id".to_string())]
    );
}
