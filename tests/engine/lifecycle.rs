//! Integration tests for the knowledge engine lifecycle
//!
//! Tests reset and initial-fact generators, declaration, retraction with
//! cascade, modify/duplicate, and nested declarations from rule actions.

use std::cell::RefCell;
use std::rc::Rc;

use seine_engine::{
    DefFacts, EngineConfig, EngineState, KnowledgeEngine, Pattern, ResetArgs, Rule,
};
use seine_foundation::{ErrorCategory, ErrorKind, Fact, FactId, FactType, Value};

fn started() -> KnowledgeEngine {
    let mut engine = KnowledgeEngine::new();
    engine.reset(&ResetArgs::new()).unwrap();
    engine
}

// =============================================================================
// Reset
// =============================================================================

#[test]
fn reset_leaves_only_the_sentinel() {
    let engine = started();
    assert_eq!(engine.fact_count(), 1);

    let sentinel = engine.fact(FactId::new(0)).unwrap();
    assert_eq!(sentinel.fact_type(), &FactType::initial_fact());
    assert_eq!(engine.state(), EngineState::Idle);
}

#[test]
fn reset_clears_facts_and_restarts_ids() {
    let mut engine = started();
    engine.declare(Fact::root().with("a", 1i64)).unwrap();
    engine.declare(Fact::root().with("a", 2i64)).unwrap();

    engine.reset(&ResetArgs::new()).unwrap();
    assert_eq!(engine.fact_count(), 1);
    let id = engine.declare(Fact::root().with("a", 3i64)).unwrap();
    assert_eq!(id, FactId::new(1));
}

#[test]
fn reset_clears_the_agenda_and_rematches() {
    let mut engine = KnowledgeEngine::new();
    engine
        .add_rule(Rule::builder("start").then(|_, _| Ok(())))
        .unwrap();
    assert!(engine.agenda().is_empty());

    engine.reset(&ResetArgs::new()).unwrap();
    assert_eq!(engine.agenda().len(), 1);
    engine.reset(&ResetArgs::new()).unwrap();
    assert_eq!(engine.agenda().len(), 1);
    assert_eq!(engine.run(None).unwrap(), 1);
}

#[test]
fn deffacts_run_in_ascending_order() {
    let mut engine = KnowledgeEngine::new();
    engine.add_deffacts(DefFacts::new("late", |_| [Fact::root().with("n", "late")]).order(5));
    engine.add_deffacts(DefFacts::new("early", |_| [Fact::root().with("n", "early")]).order(-5));
    engine.add_deffacts(DefFacts::new("plain", |_| [Fact::root().with("n", "plain")]));
    engine.reset(&ResetArgs::new()).unwrap();

    let order: Vec<_> = engine
        .facts()
        .map(|f| {
            f.get_named("n")
                .map_or_else(|| f.fact_type().name().to_string(), ToString::to_string)
        })
        .collect();
    assert_eq!(order, vec!["early", "InitialFact", "plain", "late"]);
}

#[test]
fn deffacts_receive_only_declared_arguments() {
    let mut engine = KnowledgeEngine::new();
    engine.add_deffacts(
        DefFacts::new("args", |args: &ResetArgs| {
            args.iter()
                .map(|(k, v)| Fact::root().with(&**k, v.clone()))
                .collect::<Vec<_>>()
        })
        .params(["arg0"]),
    );
    engine
        .reset(&ResetArgs::new().with("arg0", 0i64).with("arg1", 1i64))
        .unwrap();

    assert_eq!(engine.fact_count(), 2);
    let fact = engine.fact(FactId::new(1)).unwrap();
    assert_eq!(fact.get_named("arg0"), Some(&Value::Int(0)));
    assert!(fact.get_named("arg1").is_none());
}

#[test]
fn deffacts_accepting_any_argument() {
    let mut engine = KnowledgeEngine::new();
    engine.add_deffacts(
        DefFacts::new("all", |args: &ResetArgs| {
            let fact = args
                .iter()
                .fold(Fact::root(), |f, (k, v)| f.with(&**k, v.clone()));
            [fact]
        })
        .accept_any(),
    );
    engine
        .reset(&ResetArgs::new().with("a", true).with("b", false))
        .unwrap();

    let fact = engine.fact(FactId::new(1)).unwrap();
    assert_eq!(fact.get_named("a"), Some(&Value::Bool(true)));
    assert_eq!(fact.get_named("b"), Some(&Value::Bool(false)));
}

#[test]
fn invalid_generated_facts_fail_reset() {
    let mut engine = KnowledgeEngine::new();
    engine.add_deffacts(DefFacts::new("bad", |_| [Fact::root().with("a__b", 1i64)]));
    let err = engine.reset(&ResetArgs::new()).unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Declaration);
    assert_eq!(engine.fact_count(), 0);
    assert_eq!(engine.state(), EngineState::Idle);
}

// =============================================================================
// Declaration
// =============================================================================

#[test]
fn ids_increase_in_declaration_order() {
    let mut engine = started();
    let ids = engine
        .declare_all([
            Fact::root().with("a", 1i64),
            Fact::root().with("a", 2i64),
            Fact::root().with("a", 3i64),
        ])
        .unwrap();
    assert_eq!(ids, vec![FactId::new(1), FactId::new(2), FactId::new(3)]);
}

#[test]
fn duplicate_facts_return_the_existing_id() {
    let mut engine = started();
    let first = engine.declare(Fact::root().with("a", 1i64)).unwrap();
    let second = engine.declare(Fact::root().with("a", 1i64)).unwrap();

    assert_eq!(first, second);
    assert_eq!(engine.fact_count(), 2);
}

#[test]
fn duplicates_can_be_allowed() {
    let mut engine = KnowledgeEngine::with_config(EngineConfig::new().allow_duplicate_facts());
    engine.reset(&ResetArgs::new()).unwrap();
    let first = engine.declare(Fact::root().with("a", 1i64)).unwrap();
    let second = engine.declare(Fact::root().with("a", 1i64)).unwrap();

    assert_ne!(first, second);
    assert_eq!(engine.fact_count(), 3);
}

#[test]
fn redeclaring_does_not_duplicate_activations() {
    let mut engine = started();
    engine
        .add_rule(
            Rule::builder("each")
                .when(Pattern::any().var("a", "a"))
                .then(|_, _| Ok(())),
        )
        .unwrap();

    engine.declare(Fact::root().with("a", 1i64)).unwrap();
    engine.declare(Fact::root().with("a", 1i64)).unwrap();
    assert_eq!(engine.agenda().len(), 1);
}

#[test]
fn nested_accessor_keys_are_rejected_atomically() {
    let mut engine = started();
    let err = engine
        .declare_all([Fact::root().with("ok", 1i64), Fact::root().with("a__b", 1i64)])
        .unwrap_err();

    assert!(matches!(err.kind, ErrorKind::NestedAccessorKey { .. }));
    assert_eq!(engine.fact_count(), 1);
}

#[test]
fn schema_violations_are_declaration_errors() {
    let person = FactType::builder("Person")
        .field(seine_foundation::FieldSchema::mandatory(
            "name",
            seine_foundation::Type::String,
        ))
        .build();
    let mut engine = started();

    let err = engine.declare(Fact::new(&person)).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::MissingField { .. }));
    let err = engine.declare(Fact::new(&person).with("name", 3i64)).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidField { .. }));
    assert_eq!(err.category(), ErrorCategory::Declaration);
}

#[test]
fn declared_facts_are_frozen() {
    let mut engine = started();
    let id = engine.declare(Fact::root().with("a", 1i64)).unwrap();

    let mut copy = (**engine.fact(id).unwrap()).clone();
    let err = copy.set("a", 2i64).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::FrozenFact(_)));
}

// =============================================================================
// Retraction
// =============================================================================

#[test]
fn retract_while_not_running_updates_the_agenda() {
    let mut engine = started();
    engine
        .add_rule(
            Rule::builder("each")
                .when(Pattern::any().var("a", "a"))
                .then(|_, _| Ok(())),
        )
        .unwrap();

    let id = engine.declare(Fact::root().with("a", 1i64)).unwrap();
    assert_eq!(engine.agenda().len(), 1);

    let fact = engine.retract(id).unwrap();
    assert_eq!(fact.id(), Some(id));
    assert!(engine.agenda().is_empty());
    assert!(engine.fact(id).is_none());
}

#[test]
fn retracting_an_absent_fact_fails() {
    let mut engine = started();
    let err = engine.retract(FactId::new(42)).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Retraction);

    let id = engine.declare(Fact::root().with("a", 1i64)).unwrap();
    engine.retract(id).unwrap();
    assert!(matches!(
        engine.retract(id).unwrap_err().kind,
        ErrorKind::FactNotFound(_)
    ));
}

fn chain_engine() -> KnowledgeEngine {
    let stage = FactType::builder("Stage").build();
    let mut engine = started();
    for (from, to) in [(1i64, 2i64), (2, 3)] {
        let ty = stage.clone();
        engine
            .add_rule(
                Rule::builder(format!("advance{from}"))
                    .when(Pattern::new(&stage).literal("n", from))
                    .then(move |engine, _| {
                        engine.declare(Fact::new(&ty).with("n", to))?;
                        Ok(())
                    }),
            )
            .unwrap();
    }
    engine
}

#[test]
fn nested_declarations_fire_in_one_run() {
    let mut engine = chain_engine();
    let stage = FactType::builder("Stage").build();
    engine.declare(Fact::new(&stage).with("n", 1i64)).unwrap();

    assert_eq!(engine.run(None).unwrap(), 2);
    assert_eq!(engine.fact_count(), 4);
}

#[test]
fn retract_cascades_through_descendants() {
    let mut engine = chain_engine();
    let stage = FactType::builder("Stage").build();
    let root = engine.declare(Fact::new(&stage).with("n", 1i64)).unwrap();
    engine.run(None).unwrap();

    let child: Vec<_> = engine.children(root).collect();
    assert_eq!(child.len(), 1);
    let grandchild: Vec<_> = engine.children(child[0]).collect();
    assert_eq!(grandchild.len(), 1);
    assert_eq!(&*engine.source(child[0]).unwrap().rule().name, "advance1");

    engine.retract(root).unwrap();
    assert!(engine.fact(child[0]).is_none());
    assert!(engine.fact(grandchild[0]).is_none());
    assert_eq!(engine.fact_count(), 1);
}

#[test]
fn cascade_skips_children_already_gone() {
    let mut engine = chain_engine();
    let stage = FactType::builder("Stage").build();
    let root = engine.declare(Fact::new(&stage).with("n", 1i64)).unwrap();
    engine.run(None).unwrap();

    let child: Vec<_> = engine.children(root).collect();
    engine.retract(child[0]).unwrap();
    engine.retract(root).unwrap();
    assert_eq!(engine.fact_count(), 1);
}

#[test]
fn cascade_handles_long_derivation_chains() {
    const DEPTH: i64 = 50_000;

    let count = FactType::builder("Count").build();
    let mut engine = started();
    let derived = count.clone();
    engine
        .add_rule(
            Rule::builder("down")
                .when(Pattern::new(&count).var("n", "n"))
                .when(seine_engine::Condition::test("positive", |b| {
                    b.get("n").and_then(Value::as_int).is_some_and(|n| n > 0)
                }))
                .then(move |engine, act| {
                    let n = act.get("n").and_then(Value::as_int).unwrap_or_default();
                    engine.declare(Fact::new(&derived).with("n", n - 1))?;
                    Ok(())
                }),
        )
        .unwrap();

    let root = engine.declare(Fact::new(&count).with("n", DEPTH)).unwrap();
    assert_eq!(engine.run(None).unwrap(), usize::try_from(DEPTH).unwrap());
    assert_eq!(engine.fact_count(), usize::try_from(DEPTH).unwrap() + 2);

    engine.retract(root).unwrap();
    assert_eq!(engine.fact_count(), 1);
    assert!(engine.agenda().is_empty());
    assert_eq!(engine.stats().facts, 1);
}

#[test]
fn facts_declared_outside_actions_have_no_source() {
    let mut engine = started();
    let id = engine.declare(Fact::root().with("a", 1i64)).unwrap();
    assert!(engine.source(id).is_none());
    assert_eq!(engine.children(id).count(), 0);
}

// =============================================================================
// Modify and Duplicate
// =============================================================================

#[test]
fn modify_replaces_the_fact() {
    let mut engine = started();
    let old = engine
        .declare(Fact::root().with("key", "old").with("other", 1i64))
        .unwrap();
    let new = engine.modify(old, [("key", "new")]).unwrap();

    assert_ne!(old, new);
    assert!(engine.fact(old).is_none());
    let fact = engine.fact(new).unwrap();
    assert_eq!(fact.get_named("key"), Some(&Value::from("new")));
    assert_eq!(fact.get_named("other"), Some(&Value::Int(1)));
    assert_eq!(engine.fact_count(), 2);
}

#[test]
fn modify_into_an_existing_fact_returns_its_id() {
    let mut engine = started();
    let first = engine.declare(Fact::root().with("x", 1i64)).unwrap();
    let second = engine.declare(Fact::root().with("x", 2i64)).unwrap();

    let result = engine.modify(first, [("x", 2i64)]).unwrap();
    assert_eq!(result, second);
    assert!(engine.fact(first).is_none());
    assert_eq!(engine.fact_count(), 2);
}

#[test]
fn modify_into_an_existing_fact_is_fresh_when_duplicates_are_allowed() {
    let mut engine = KnowledgeEngine::with_config(EngineConfig::new().allow_duplicate_facts());
    engine.reset(&ResetArgs::new()).unwrap();
    let first = engine.declare(Fact::root().with("x", 1i64)).unwrap();
    let second = engine.declare(Fact::root().with("x", 2i64)).unwrap();

    let result = engine.modify(first, [("x", 2i64)]).unwrap();
    assert_ne!(result, second);
    assert_eq!(result, FactId::new(3));
    assert_eq!(engine.fact_count(), 3);
}

#[test]
fn modify_positional_fields() {
    let mut engine = started();
    let old = engine
        .declare(Fact::root().with_positional(["a", "b"]))
        .unwrap();
    let new = engine.modify(old, [(1usize, "z")]).unwrap();

    let fact = engine.fact(new).unwrap();
    assert_eq!(fact.get_index(0), Some(&Value::from("a")));
    assert_eq!(fact.get_index(1), Some(&Value::from("z")));
}

#[test]
fn invalid_modify_leaves_the_original() {
    let mut engine = started();
    let id = engine.declare(Fact::root().with("a", 1i64)).unwrap();
    let err = engine.modify(id, [("x__y", 1i64)]).unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Declaration);
    assert!(engine.fact(id).is_some());
}

#[test]
fn modify_of_an_absent_fact_fails() {
    let mut engine = started();
    let err = engine.modify(FactId::new(9), [("a", 1i64)]).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::FactNotFound(_)));
}

#[test]
fn duplicate_keeps_the_original() {
    let mut engine = started();
    let id = engine.declare(Fact::root().with("a", 1i64)).unwrap();
    let copy = engine.duplicate(id, [("b", 2i64)]).unwrap();

    assert_ne!(id, copy);
    assert!(engine.fact(id).is_some());
    let fact = engine.fact(copy).unwrap();
    assert_eq!(fact.get_named("a"), Some(&Value::Int(1)));
    assert_eq!(fact.get_named("b"), Some(&Value::Int(2)));
}

#[test]
fn duplicate_without_changes_is_suppressed() {
    let mut engine = started();
    let id = engine.declare(Fact::root().with("a", 1i64)).unwrap();
    let copy = engine.duplicate(id, Vec::<(&str, i64)>::new()).unwrap();
    assert_eq!(id, copy);
}

#[test]
fn modify_from_an_action_counts_up() {
    let counter = FactType::builder("Counter").build();
    let mut engine = started();
    engine
        .add_rule(
            Rule::builder("count")
                .when(Pattern::new(&counter).var("n", "n").bind("c"))
                .when(seine_engine::Condition::test("below three", |b| {
                    b.get("n").and_then(Value::as_int).is_some_and(|n| n < 3)
                }))
                .then(|engine, act| {
                    let n = act.get("n").and_then(Value::as_int).unwrap_or_default();
                    if let Some(id) = act.fact("c").and_then(|f| f.id()) {
                        engine.modify(id, [("n", n + 1)])?;
                    }
                    Ok(())
                }),
        )
        .unwrap();

    engine.declare(Fact::new(&counter).with("n", 0i64)).unwrap();
    assert_eq!(engine.run(None).unwrap(), 3);

    let values: Vec<_> = engine
        .facts()
        .filter_map(|f| f.get_named("n").cloned())
        .collect();
    assert_eq!(values, vec![Value::Int(3)]);
}

// =============================================================================
// Stepping
// =============================================================================

#[test]
fn get_activations_does_not_touch_the_agenda() {
    let mut engine = KnowledgeEngine::new();
    engine
        .add_rule(Rule::builder("start").then(|_, _| Ok(())))
        .unwrap();
    engine.reset(&ResetArgs::new()).unwrap();

    assert_eq!(engine.agenda().len(), 1);
    assert!(engine.get_activations().is_empty());
}

#[test]
fn step_fires_nothing() {
    let mut engine = started();
    let fired = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&fired);
    engine
        .add_rule(Rule::builder("start").then(move |_, _| {
            *sink.borrow_mut() += 1;
            Ok(())
        }))
        .unwrap();

    engine.step();
    assert_eq!(*fired.borrow(), 0);
    assert_eq!(engine.agenda().len(), 1);
}

#[test]
fn rules_are_listed_in_registration_order() {
    let mut engine = KnowledgeEngine::new();
    for name in ["first", "second"] {
        engine.add_rule(Rule::builder(name).then(|_, _| Ok(()))).unwrap();
    }
    let names: Vec<_> = engine.get_rules().iter().map(|r| r.name.to_string()).collect();
    assert_eq!(names, vec!["first", "second"]);
}
