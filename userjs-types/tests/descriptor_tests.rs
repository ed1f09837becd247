use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashMap;
use userjs_types::{ExecutionPhase, ScriptDescriptor, ScriptId};

// ── Lenient decoding ──────────────────────────────────────────────

#[test]
fn minimal_descriptor_defaults_everything() {
    let script: ScriptDescriptor = serde_json::from_value(json!({ "id": 3 })).unwrap();
    assert_eq!(script.id, ScriptId::new(3));
    assert!(script.meta.grant.is_empty());
    assert!(script.meta.require.is_empty());
    assert!(script.meta.resources.is_empty());
    assert!(script.custom.path_map.is_empty());
    assert!(!script.config.should_update);
    assert_eq!(script.phase(), ExecutionPhase::End);
}

#[test]
fn null_sections_are_treated_as_missing() {
    let script: ScriptDescriptor = serde_json::from_value(json!({
        "id": 4,
        "uuid": null,
        "meta": null,
        "custom": { "pathMap": null, "name": null },
        "config": null,
    }))
    .unwrap();
    assert_eq!(script.uuid, "");
    assert_eq!(script.meta, Default::default());
    assert_eq!(script.display_name(), "#4");
}

#[test]
fn full_descriptor_decodes_camel_case_fields() {
    let script: ScriptDescriptor = serde_json::from_value(json!({
        "id": 12,
        "uuid": "0b0e6a5e-1111-4c1f-9a0a-3d5b3c8e9f00",
        "meta": {
            "name": "Example",
            "namespace": "https://example.org",
            "version": "1.2.0",
            "description": "does things",
            "grant": ["GM_getValue", "GM_setValue"],
            "require": ["https://cdn.example.org/lib.js"],
            "resources": { "logo": "https://cdn.example.org/logo.png" },
            "match": ["https://*.example.org/*"],
            "include": ["*"],
            "exclude": ["https://example.org/admin/*"],
            "runAt": "document-start",
        },
        "custom": {
            "pathMap": { "https://cdn.example.org/lib.js": "cache/lib.js" },
            "runAt": "document-idle",
        },
        "config": { "shouldUpdate": true },
    }))
    .unwrap();

    assert_eq!(script.meta.grant, vec!["GM_getValue", "GM_setValue"]);
    assert_eq!(script.meta.matches, vec!["https://*.example.org/*"]);
    assert_eq!(script.resource_url("logo"), Some("https://cdn.example.org/logo.png"));
    assert_eq!(script.resource_url("missing"), None);
    assert_eq!(script.resolve_path("https://cdn.example.org/lib.js"), "cache/lib.js");
    assert_eq!(script.phase(), ExecutionPhase::Idle);
    assert!(script.config.should_update);
}

#[test]
fn descriptor_without_id_is_rejected() {
    let result = serde_json::from_value::<ScriptDescriptor>(json!({ "meta": {} }));
    assert!(result.is_err());
}

// ── Identifiers ───────────────────────────────────────────────────

#[test]
fn script_id_parses_and_displays() {
    let id: ScriptId = "42".parse().unwrap();
    assert_eq!(id.get(), 42);
    assert_eq!(id.to_string(), "42");
    assert!("forty-two".parse::<ScriptId>().is_err());
}

#[test]
fn script_id_works_as_json_map_key() {
    let mut values: HashMap<ScriptId, u32> = HashMap::new();
    values.insert(ScriptId::new(9), 1);
    let text = serde_json::to_string(&values).unwrap();
    assert_eq!(text, r#"{"9":1}"#);
    let back: HashMap<ScriptId, u32> = serde_json::from_str(&text).unwrap();
    assert_eq!(back.get(&ScriptId::new(9)), Some(&1));
}

#[test]
fn phase_serializes_with_header_spelling() {
    assert_eq!(serde_json::to_value(ExecutionPhase::Idle).unwrap(), json!("document-idle"));
    let phase: ExecutionPhase = serde_json::from_value(json!("document-start")).unwrap();
    assert_eq!(phase, ExecutionPhase::Start);
}
