use super::*;

fn path(raw: &str) -> AttrPath {
    AttrPath::parse(raw).unwrap()
}

#[test]
fn test_parse_segments() {
    let p = path("bullseye_rings.0.skills_to_remove");
    assert_eq!(
        p.segments(),
        &[
            PathSegment::Key("bullseye_rings".to_string()),
            PathSegment::Index(0),
            PathSegment::Key("skills_to_remove".to_string()),
        ]
    );
    assert_eq!(p.to_string(), "bullseye_rings.0.skills_to_remove");
}

#[test]
fn test_parse_wildcard() {
    let p = path("routing_rules.*.queue_id");
    assert_eq!(p.segments().get(1), Some(&PathSegment::Wildcard));
}

#[test]
fn test_parse_rejects_empty() {
    assert_eq!(AttrPath::parse(""), Err(AttrPathError::Empty));
    assert_eq!(AttrPath::parse("   "), Err(AttrPathError::Empty));
    assert!(matches!(
        AttrPath::parse("a..b"),
        Err(AttrPathError::EmptySegment(_))
    ));
}

#[test]
fn test_exact_match() {
    assert!(path("division_id").matches(&path("division_id")));
    assert!(!path("division_id").matches(&path("division")));
}

#[test]
fn test_implicit_list_indices() {
    let declared = path("bullseye_rings.skills_to_remove");
    assert!(declared.matches(&path("bullseye_rings.0.skills_to_remove.1")));
    assert!(declared.matches(&path("bullseye_rings.2.skills_to_remove")));
    assert!(!declared.matches(&path("bullseye_rings.0.other")));
}

#[test]
fn test_explicit_index_must_match() {
    let declared = path("members.0.user_id");
    assert!(declared.matches(&path("members.0.user_id")));
    assert!(!declared.matches(&path("members.1.user_id")));
}

#[test]
fn test_wildcard_matches_key_or_index() {
    let declared = path("settings.*.queue_id");
    assert!(declared.matches(&path("settings.voice.queue_id")));
    assert!(declared.matches(&path("settings.4.queue_id")));
    assert!(!declared.matches(&path("settings.queue_id")));
}

#[test]
fn test_full_match_rejects_deeper_keys() {
    assert!(!path("members").matches(&path("members.0.user_id")));
}

#[test]
fn test_prefix_match() {
    let declared = path("media_settings");
    assert!(declared.matches_prefix(&path("media_settings")));
    assert!(declared.matches_prefix(&path("media_settings.call.alerting_timeout_sec")));
    assert!(!declared.matches_prefix(&path("media_setting")));
    assert!(!path("a.b").matches_prefix(&path("a")));
}

#[test]
fn test_child_builders() {
    let loc = AttrPath::root().child_key("members").child_index(2).child_key("user_id");
    assert_eq!(loc.to_string(), "members.2.user_id");
    assert_eq!(loc.top_level(), Some("members"));
    assert!(AttrPath::root().is_root());
}

#[test]
fn test_join_appends_segments() {
    let joined = path("flow_settings").join(&path("queues.0.id"));
    assert_eq!(joined.to_string(), "flow_settings.queues.0.id");
    assert_eq!(AttrPath::root().join(&path("a")), path("a"));
}

#[test]
fn test_serde_as_string() {
    let p = path("a.*.b");
    let json = serde_json::to_string(&p).unwrap();
    assert_eq!(json, "\"a.*.b\"");
    let back: AttrPath = serde_json::from_str(&json).unwrap();
    assert_eq!(back, p);
}
