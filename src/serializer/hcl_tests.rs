use super::*;
use crate::resolver::SymbolicRef;

fn resolved(resource_type: &str, label: &str, attributes: Vec<(&str, ResolvedValue)>) -> ResolvedInstance {
    ResolvedInstance {
        resource_type: ResourceType::new(resource_type),
        id: format!("{label}-id"),
        label: label.to_string(),
        attributes: attributes
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
        warnings: Vec::new(),
    }
}

fn reference(resource_type: &str, label: &str) -> ResolvedValue {
    ResolvedValue::Reference(SymbolicRef::new(ResourceType::new(resource_type), label))
}

fn map(entries: Vec<(&str, ResolvedValue)>) -> ResolvedValue {
    ResolvedValue::Map(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

#[test]
fn test_resource_block() {
    let queue = resolved(
        "routing_queue",
        "support",
        vec![
            ("name", ResolvedValue::String("Support \"Tier 1\"".to_string())),
            ("division_id", reference("auth_division", "home")),
            (
                "skill_ids",
                ResolvedValue::List(vec![
                    reference("routing_skill", "english"),
                    ResolvedValue::String("*".to_string()),
                ]),
            ),
            (
                "members",
                ResolvedValue::List(vec![
                    map(vec![("user_id", reference("user", "ann")), ("ring_num", ResolvedValue::Int(1))]),
                    map(vec![("user_id", reference("user", "bob"))]),
                ]),
            ),
            ("media_settings", map(vec![("call", map(vec![("alerting_timeout_sec", ResolvedValue::Int(8))]))])),
        ],
    );
    let rendered = render_resources(&[queue]).unwrap();
    let expected = r#"resource "routing_queue" "support" {
  division_id = auth_division.home.id
  name        = "Support \"Tier 1\""
  skill_ids   = [routing_skill.english.id, "*"]
  media_settings {
    call {
      alerting_timeout_sec = 8
    }
  }
  members {
    ring_num = 1
    user_id  = user.ann.id
  }
  members {
    user_id = user.bob.id
  }
}
"#;
    assert_eq!(rendered, expected);
}

#[test]
fn test_provider_block() {
    let rendered = render_provider(&ProviderConfig::default());
    let expected = r#"terraform {
  required_providers {
    genesyscloud = {
      source  = "mypurecloud/genesyscloud"
      version = "1.0.0"
    }
  }
}
"#;
    assert_eq!(rendered, expected);
}

#[test]
fn test_document_separates_blocks() {
    let instances = vec![
        resolved("user", "bob", vec![]),
        resolved("auth_division", "home", vec![("name", ResolvedValue::String("Home".to_string()))]),
    ];
    let rendered = render_document(&instances, &ProviderConfig::default()).unwrap();
    let division = rendered.find("resource \"auth_division\" \"home\"").unwrap();
    let user = rendered.find("resource \"user\" \"bob\" {\n}").unwrap();
    assert!(rendered.starts_with("terraform {"));
    assert!(division < user);
    assert!(rendered.contains("}\n\nresource"));
}

#[test]
fn test_mixed_list_renders_inline() {
    let instance = resolved(
        "flow",
        "main",
        vec![(
            "steps",
            ResolvedValue::List(vec![ResolvedValue::Int(1), map(vec![("a b", ResolvedValue::Bool(true))])]),
        )],
    );
    let rendered = render_resources(&[instance]).unwrap();
    assert!(rendered.contains("steps = [1, { \"a b\" = true }]"));
}

#[test]
fn test_invalid_attribute_name_rejected() {
    let instance = resolved("flow", "main", vec![("bad name", ResolvedValue::Int(1))]);
    let err = render_resources(&[instance]).unwrap_err();
    assert!(matches!(
        err,
        SerializeError::InvalidAttributeName { ref name, .. } if name == "bad name"
    ));
}

#[test]
fn test_is_identifier() {
    assert!(is_identifier("division_id"));
    assert!(is_identifier("_x-1"));
    assert!(!is_identifier("1abc"));
    assert!(!is_identifier(""));
    assert!(!is_identifier("a.b"));
}

#[test]
fn test_map_with_free_form_keys_renders_inline() {
    let queue = resolved(
        "routing_queue",
        "support",
        vec![
            ("name", ResolvedValue::String("Support".to_string())),
            ("custom_attributes", map(vec![("cost center", ResolvedValue::String("42".to_string()))])),
            (
                "routing_rules",
                ResolvedValue::List(vec![map(vec![("wait-time (s)", ResolvedValue::Int(5))])]),
            ),
        ],
    );
    let rendered = render_resources(&[queue]).unwrap();
    let expected = r#"resource "routing_queue" "support" {
  custom_attributes = { "cost center" = "42" }
  name              = "Support"
  routing_rules     = [{ "wait-time (s)" = 5 }]
}
"#;
    assert_eq!(rendered, expected);
}

#[test]
fn test_json_document_uses_jsonencode() {
    let milestone = resolved(
        "flow_milestone",
        "escalation",
        vec![
            (
                "settings",
                ResolvedValue::JsonEncoded(Box::new(map(vec![
                    ("queue", reference("routing_queue", "support")),
                    ("note", ResolvedValue::String("$${x}".to_string())),
                    ("weights", ResolvedValue::List(vec![ResolvedValue::Int(1), ResolvedValue::Null])),
                    ("empty", map(vec![])),
                ]))),
            ),
        ],
    );
    let rendered = render_resources(&[milestone]).unwrap();
    assert!(rendered.contains(
        r#"  settings = jsonencode({ empty = {}, note = "$${x}", queue = routing_queue.support.id, weights = [1, null] })"#
    ));
}
