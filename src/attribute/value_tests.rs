use super::*;
use serde_json::json;

#[test]
fn test_zero_values() {
    assert!(AttrValue::string("").is_zero());
    assert!(AttrValue::Int(0).is_zero());
    assert!(AttrValue::Float(0.0).is_zero());
    assert!(AttrValue::List(vec![]).is_zero());
    assert!(AttrValue::Map(BTreeMap::new()).is_zero());

    assert!(!AttrValue::string("x").is_zero());
    assert!(!AttrValue::Int(7).is_zero());
}

#[test]
fn test_bools_and_null_are_never_zero() {
    assert!(!AttrValue::Bool(false).is_zero());
    assert!(!AttrValue::Bool(true).is_zero());
    assert!(!AttrValue::Null.is_zero());
}

#[test]
fn test_from_json() {
    let value = AttrValue::from(json!({
        "name": "Support",
        "count": 3,
        "ratio": 0.5,
        "enabled": true,
        "tags": ["a", "b"],
        "missing": null
    }));
    let map = value.as_map().unwrap();
    assert_eq!(map.get("name"), Some(&AttrValue::string("Support")));
    assert_eq!(map.get("count"), Some(&AttrValue::Int(3)));
    assert_eq!(map.get("ratio"), Some(&AttrValue::Float(0.5)));
    assert_eq!(map.get("enabled"), Some(&AttrValue::Bool(true)));
    assert_eq!(map.get("tags"), Some(&AttrValue::string_list(["a", "b"])));
    assert!(map.get("missing").unwrap().is_null());
}

#[test]
fn test_to_json_preserves_structure() {
    let original = json!({"a": [1, "x", {"b": false}], "c": 2.5});
    let value = AttrValue::from(original.clone());
    assert_eq!(serde_json::Value::from(value), original);
}

#[test]
fn test_untagged_deserialize() {
    let value: AttrValue = serde_json::from_str(r#"{"ids": ["1", "2"], "n": 4}"#).unwrap();
    assert_eq!(value.as_map().unwrap().get("n"), Some(&AttrValue::Int(4)));
}

#[test]
fn test_identifier_accepts_ints() {
    assert_eq!(AttrValue::Int(42).as_identifier(), Some("42".to_string()));
    assert_eq!(AttrValue::string("abc").as_identifier(), Some("abc".to_string()));
    assert_eq!(AttrValue::Bool(true).as_identifier(), None);
}
