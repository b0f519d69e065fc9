//! Document model integration tests: validation, round trips, citations

use nodedoc_document::{
    citations, diff_blocks, serialize, validate, BlockContent, BlockKind, NodeDoc, SchemaError,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

const PHOTOSYNTHESIS: &str = include_str!("fixtures/photosynthesis.json");

fn fixture() -> Value {
    serde_json::from_str(PHOTOSYNTHESIS).expect("fixture is valid JSON")
}

#[test]
fn test_fixture_covers_every_block_kind() {
    let doc = validate(&fixture()).expect("Failed to validate fixture");

    let kinds: Vec<BlockKind> = doc.blocks.iter().map(|b| b.kind()).collect();
    assert_eq!(kinds, BlockKind::ALL.to_vec());
    assert_eq!(doc.title, "Photosynthesis");
    assert_eq!(doc.estimated_minutes, 14.5);
    assert!(doc.concept_keys.contains("calvin-cycle"));
}

#[test]
fn test_round_trip_is_lossless() {
    let doc = validate(&fixture()).unwrap();

    let wire = serialize(&doc);
    let reparsed = validate(&wire).expect("Serialized document should validate");

    assert_eq!(reparsed, doc);
}

#[test]
fn test_round_trip_through_text() {
    let doc = validate(&fixture()).unwrap();

    let text = doc.to_json_pretty();
    let reparsed = NodeDoc::from_json(&text).unwrap();

    assert_eq!(reparsed, doc);
}

#[test]
fn test_generated_ids_survive_round_trip() {
    let candidate = json!({
        "schemaVersion": 1,
        "title": "No ids",
        "blocks": [
            { "type": "paragraph", "text": "first" },
            { "type": "paragraph", "text": "second" }
        ]
    });

    let doc = validate(&candidate).unwrap();
    let again = validate(&candidate).unwrap();
    assert_eq!(doc, again, "ID assignment is deterministic");

    let reparsed = validate(&serialize(&doc)).unwrap();
    assert_eq!(reparsed.blocks[0].id, doc.blocks[0].id);
    assert_eq!(reparsed.blocks[1].id, doc.blocks[1].id);
}

#[test]
fn test_concept_keys_collapse_duplicates() {
    let candidate = json!({
        "schemaVersion": 1,
        "title": "Keys",
        "conceptKeys": ["b", "a", "b"],
        "blocks": []
    });

    let doc = validate(&candidate).unwrap();
    assert_eq!(serialize(&doc)["conceptKeys"], json!(["a", "b"]));
}

#[test]
fn test_fixture_citations_are_well_formed() {
    let doc = validate(&fixture()).unwrap();
    assert_eq!(citations::check_document(&doc), Ok(()));
}

#[test]
fn test_schema_violations_are_specific() {
    let mut candidate = fixture();
    candidate["blocks"][0]["level"] = json!(5);
    assert_eq!(
        validate(&candidate),
        Err(SchemaError::InvalidHeadingLevel { index: 0, level: 5 })
    );

    let mut candidate = fixture();
    candidate.as_object_mut().unwrap().remove("blocks");
    assert_eq!(validate(&candidate), Err(SchemaError::MissingField("blocks")));

    let mut candidate = fixture();
    candidate["blocks"][3] = json!({ "type": "code" });
    assert_eq!(
        validate(&candidate),
        Err(SchemaError::MissingBlockField {
            index: 3,
            kind: BlockKind::Code,
            field: "code"
        })
    );

    assert_eq!(validate(&json!([1, 2])), Err(SchemaError::NotAnObject));
}

#[test]
fn test_negative_citation_page_is_rejected() {
    let mut candidate = fixture();
    candidate["blocks"][1]["citations"][0]["loc"]["page"] = json!(-1);

    assert!(matches!(
        validate(&candidate),
        Err(SchemaError::InvalidBlockField {
            index: 1,
            kind: BlockKind::Paragraph,
            ..
        })
    ));
}

#[test]
fn test_diff_after_text_edit() {
    let old = validate(&fixture()).unwrap();
    let mut new = old.clone();
    new.blocks[1].content = BlockContent::Paragraph {
        text: "Edited".to_string(),
        citations: vec![],
    };

    let changes = diff_blocks(&old, &new);
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].id().as_str(), "p-intro");
}
