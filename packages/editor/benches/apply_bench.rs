use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nodedoc_editor::{apply, parse, CitationPolicy, EditProposal, NodeDoc, ProposalAction};
use nodedoc_document::{validate, BlockKind};
use serde_json::{json, Value};

const FIXTURE: &str = include_str!("../../document/tests/fixtures/photosynthesis.json");

fn fixture_value() -> Value {
    serde_json::from_str(FIXTURE).unwrap()
}

fn large_document(blocks: usize) -> Value {
    let blocks: Vec<Value> = (0..blocks)
        .map(|i| {
            json!({
                "type": "paragraph",
                "text": format!("Paragraph number {}", i),
                "citations": [
                    { "chunkId": format!("chunk-{}", i), "quote": "quoted", "loc": { "page": i, "start": 0, "end": 6 } }
                ]
            })
        })
        .collect();

    json!({ "schemaVersion": 1, "title": "Large", "blocks": blocks })
}

fn validate_fixture(c: &mut Criterion) {
    let value = fixture_value();
    c.bench_function("validate_fixture", |b| b.iter(|| validate(black_box(&value))));
}

fn validate_large(c: &mut Criterion) {
    let value = large_document(500);
    c.bench_function("validate_500_blocks", |b| b.iter(|| validate(black_box(&value))));
}

fn parse_proposal(c: &mut Criterion) {
    let metadata = json!({
        "proposal": {
            "doc_id": "photosynthesis",
            "block_id": "p-intro",
            "block_type": "paragraph",
            "action": "replace",
            "after_block_text": "Plants turn light into sugar."
        }
    })
    .to_string();
    let metadata = Value::String(metadata);

    c.bench_function("parse_proposal_string_metadata", |b| {
        b.iter(|| parse(black_box(&metadata)))
    });
}

fn apply_replace(c: &mut Criterion) {
    let doc: NodeDoc = validate(&large_document(500)).unwrap();
    let target = doc.blocks[250].id.to_string();
    let proposal = EditProposal::new("large", ProposalAction::Replace, BlockKind::Paragraph)
        .with_block_id(target)
        .with_policy(CitationPolicy::Preserve)
        .with_after_text("Rewritten paragraph");

    c.bench_function("apply_replace_500_blocks", |b| {
        b.iter(|| apply(black_box(&proposal), black_box(&doc)))
    });
}

criterion_group!(benches, validate_fixture, validate_large, parse_proposal, apply_replace);
criterion_main!(benches);
