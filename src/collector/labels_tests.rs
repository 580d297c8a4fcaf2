use super::*;

#[test]
fn test_clean_label_unchanged() {
    assert_eq!(sanitize_label("Support_Queue-1", "Q1"), "Support_Queue-1");
}

#[test]
fn test_replaced_characters_get_hash_suffix() {
    let label = sanitize_label("Support Queue", "Q1");
    assert_eq!(label, format!("Support_Queue_{}", short_hash("Support Queue")));
}

#[test]
fn test_distinct_raw_labels_stay_distinct() {
    assert_ne!(sanitize_label("a b", "1"), sanitize_label("a/b", "1"));
}

#[test]
fn test_leading_digit_prefixed() {
    assert_eq!(sanitize_label("1st_line", "Q1"), "_1st_line");
}

#[test]
fn test_blank_label_uses_id_hash() {
    assert_eq!(sanitize_label("   ", "Q1"), format!("unnamed_{}", short_hash("Q1")));
    assert_eq!(sanitize_label("", "Q1"), sanitize_label(" ", "Q1"));
}

#[test]
fn test_non_ascii_replaced() {
    let label = sanitize_label("Café", "x");
    assert!(label.starts_with("Caf__"));
    assert!(label.chars().all(is_label_char));
}

#[test]
fn test_collisions_disambiguated_in_id_order() {
    let queue = ResourceType::new("routing_queue");
    let discovered = vec![
        DiscoveredInstance::new("Q2", "Support"),
        DiscoveredInstance::new("Q1", "Support"),
        DiscoveredInstance::new("Q3", "Sales"),
    ];
    let instances = assign_labels(&queue, discovered).unwrap();
    let labels: Vec<_> = instances
        .iter()
        .map(|i| (i.id.as_str(), i.label.as_str()))
        .collect();
    let expected_q2 = format!("Support_{}", short_hash("Q2"));
    assert_eq!(
        labels,
        vec![("Q1", "Support"), ("Q2", expected_q2.as_str()), ("Q3", "Sales")]
    );
    assert_eq!(instances[1].raw_label, "Support");
}

#[test]
fn test_collision_with_already_suffixed_label() {
    let queue = ResourceType::new("routing_queue");
    let suffixed = format!("Support_{}", short_hash("Q2"));
    // Q0 takes the label Q2 would fall back to.
    let discovered = vec![
        DiscoveredInstance::new("Q0", suffixed.clone()),
        DiscoveredInstance::new("Q1", "Support"),
        DiscoveredInstance::new("Q2", "Support"),
    ];
    let instances = assign_labels(&queue, discovered).unwrap();
    let labels: BTreeSet<_> = instances.iter().map(|i| i.label.clone()).collect();
    assert_eq!(labels.len(), 3);
    assert_eq!(instances[2].label, format!("{suffixed}_2"));
}

#[test]
fn test_assignment_is_deterministic() {
    let queue = ResourceType::new("routing_queue");
    let build = || {
        vec![
            DiscoveredInstance::new("b", "x y"),
            DiscoveredInstance::new("a", "x y"),
        ]
    };
    let first = assign_labels(&queue, build()).unwrap();
    let mut reversed = build();
    reversed.reverse();
    let second = assign_labels(&queue, reversed).unwrap();
    assert_eq!(first, second);
}
