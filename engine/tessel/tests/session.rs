//! The facade end to end: a recursive schema through a session.

#![expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use pretty_assertions::assert_eq;
use rayon::prelude::*;
use tessel::{init_tracing, Document, RecordBuilder, Session, ShapeId, ShapePool, Value};

fn comment(author: &str, text: &str, replies: Vec<Value>) -> Value {
    Value::record(
        "Comment",
        vec![Value::string(author), Value::string(text), Value::list(replies)],
    )
}

fn thread_session() -> (Session, ShapeId) {
    let mut pool = ShapePool::new();
    let id = pool.reserve("Comment").unwrap();
    let replies = pool.frozen_list(id);
    RecordBuilder::new("Comment")
        .field("author", ShapeId::STR)
        .field("text", ShapeId::STR)
        .field("replies", replies)
        .constructor()
        .define(&mut pool, id)
        .unwrap();
    (Session::new(pool), id)
}

#[test]
fn init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
}

#[test]
fn recursive_thread_round_trips() {
    init_tracing();
    let (mut session, id) = thread_session();
    let thread = comment(
        "ann",
        "first",
        vec![
            comment("bob", "reply", vec![comment("ann", "thanks", Vec::new())]),
            comment("cy", "+1", Vec::new()),
        ],
    );

    let doc = session.encode(id, &thread).unwrap();
    let Document::Record(members) = &doc else {
        panic!("expected a record, got {doc:?}");
    };
    assert_eq!(members.len(), 3);
    assert_eq!(session.decode(id, &doc).unwrap(), thread);
}

#[test]
fn session_artifacts_work_across_threads() {
    let (mut session, id) = thread_session();
    let generate = session.generator(id).unwrap();
    let encode = session.encoder(id).unwrap();
    let decode = session.decoder(id).unwrap();
    let random = tessel::RandomGenerator::default();

    let failures: usize = (0..16_u64)
        .into_par_iter()
        .map(|seed| {
            let value = random.sample(&generate, seed).unwrap();
            usize::from(decode(&encode(&value).unwrap()).unwrap() != value)
        })
        .sum();
    assert_eq!(failures, 0);
}
