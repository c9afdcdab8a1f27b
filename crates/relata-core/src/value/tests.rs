use super::*;

#[test]
fn default_detection_covers_every_kind() {
    for kind in [
        ValueKind::Bool,
        ValueKind::Int,
        ValueKind::Float,
        ValueKind::Text,
        ValueKind::Blob,
        ValueKind::Timestamp,
        ValueKind::Ulid,
    ] {
        let value = Value::default_for(kind);
        assert!(value.is_default(), "{kind} default should be detected");
        assert_eq!(value.kind(), Some(kind));
    }

    assert!(Value::Null.is_default());
    assert!(!Value::Int(7).is_default());
    assert!(!Value::Text("tom".to_string()).is_default());
    assert!(!Value::Ulid(Ulid::from_parts(1, 1)).is_default());
}

#[test]
fn display_renders_parameter_friendly_text() {
    assert_eq!(Value::Null.to_string(), "NULL");
    assert_eq!(Value::Int(18).to_string(), "18");
    assert_eq!(Value::Text("tom".to_string()).to_string(), "tom");
    assert_eq!(Value::Blob(vec![1, 2, 3]).to_string(), "<3 bytes>");
}

#[test]
fn type_label_names_null() {
    assert_eq!(Value::Null.type_label(), "null");
    assert_eq!(Value::Float(1.5).type_label(), "float");
}
