use super::*;
use crate::catalog::{MemberGroupResolver, RefDescriptor, ResourceSpec};
use std::sync::Arc;

fn types(names: &[&str]) -> Vec<ResourceType> {
    names.iter().map(|n| ResourceType::new(*n)).collect()
}

fn reciprocal_catalog() -> ReferenceCatalog {
    ReferenceCatalog::new()
        .with(
            "routing_queue",
            ResourceSpec::builder()
                .reference("division_id", RefDescriptor::to("auth_division"))
                .reference("outbound_email_address.route_id", RefDescriptor::to("routing_email_route"))
                .build()
                .unwrap(),
        )
        .with(
            "routing_email_route",
            ResourceSpec::builder()
                .reference("queue_id", RefDescriptor::to("routing_queue"))
                .build()
                .unwrap(),
        )
        .with("auth_division", ResourceSpec::default())
}

#[test]
fn test_unlisted_cycle_is_fatal() {
    let err = CycleValidator::validate_catalog(&reciprocal_catalog()).unwrap_err();
    let CycleError::Fatal(cycles) = &err;
    assert_eq!(
        cycles,
        &vec![types(&["routing_email_route", "routing_queue", "routing_email_route"])]
    );
    assert!(err.to_string().contains("routing_email_route -> routing_queue"));
}

#[test]
fn test_allow_list_written_from_any_start() {
    let mut catalog = reciprocal_catalog();
    catalog.allow_cycle(["routing_queue", "routing_email_route", "routing_queue"]);
    let report = CycleValidator::validate_catalog(&catalog).unwrap();
    assert_eq!(report.tolerated.len(), 1);
    assert!(report.is_clean());
}

#[test]
fn test_allow_list_direction_matters() {
    let validator = CycleValidator::new(&[types(&["a", "b", "c"])]);
    assert!(validator.is_allowed(&types(&["b", "c", "a", "b"])));
    assert!(!validator.is_allowed(&types(&["a", "c", "b", "a"])));
}

#[test]
fn test_self_type_references_never_fatal() {
    let user_spec = ResourceSpec::builder()
        .reference("manager", RefDescriptor::to("user"))
        .reference("addresses.*.user_id", RefDescriptor::to("user"))
        .build()
        .unwrap();
    let catalog = ReferenceCatalog::new().with("user", user_spec);
    let graph = TypeGraph::from_catalog(&catalog);
    assert_eq!(graph.self_edges.len(), 2);
    assert!(graph.edges.is_empty());
    assert!(CycleValidator::validate_catalog(&catalog).is_ok());
}

#[test]
fn test_excluded_attribute_breaks_cycle() {
    let mut catalog = reciprocal_catalog();
    if let Some(spec) = catalog.spec_mut(&ResourceType::new("routing_queue")) {
        spec.exclude(crate::attribute::AttrPath::parse("outbound_email_address").unwrap());
    }
    assert!(CycleValidator::validate_catalog(&catalog).is_ok());
}

#[test]
fn test_custom_resolver_edges_reach_every_target() {
    let catalog = ReferenceCatalog::new()
        .with(
            "routing_queue",
            ResourceSpec::builder()
                .reference(
                    "member_group_id",
                    RefDescriptor::custom(Arc::new(MemberGroupResolver::default())),
                )
                .build()
                .unwrap(),
        )
        .with(
            "team",
            ResourceSpec::builder()
                .reference("queue_id", RefDescriptor::to("routing_queue"))
                .build()
                .unwrap(),
        );
    let report = CycleValidator::from_catalog(&catalog).classify(&TypeGraph::from_catalog(&catalog));
    assert_eq!(report.fatal, vec![types(&["routing_queue", "team", "routing_queue"])]);
}

#[test]
fn test_format_cycle() {
    assert_eq!(format_cycle(&types(&["a", "b", "a"])), "a -> b -> a");
}
