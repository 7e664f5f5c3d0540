//! Integration tests for pattern matching
//!
//! Tests literals, variables, negation, disjunction, tests, and subtype-aware
//! patterns through the public engine API.

use std::cell::RefCell;
use std::rc::Rc;

use seine_engine::{Condition, FieldConstraint, KnowledgeEngine, Pattern, ResetArgs, Rule};
use seine_foundation::{ErrorCategory, ErrorKind, Fact, FactType, Value};

fn started() -> KnowledgeEngine {
    let mut engine = KnowledgeEngine::new();
    engine.reset(&ResetArgs::new()).unwrap();
    engine
}

/// Adds a rule that records the value bound to `var` on every firing.
fn recording(
    engine: &mut KnowledgeEngine,
    name: &str,
    conditions: Vec<Condition>,
    var: &'static str,
) -> Rc<RefCell<Vec<Value>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let mut builder = Rule::builder(name);
    for condition in conditions {
        builder = builder.when(condition);
    }
    engine
        .add_rule(builder.then(move |_, act| {
            sink.borrow_mut()
                .push(act.get(var).cloned().unwrap_or(Value::Nil));
            Ok(())
        }))
        .unwrap();
    seen
}

// =============================================================================
// Literals and Variables
// =============================================================================

#[test]
fn default_conditions_are_conjunctive() {
    let mut engine = started();
    engine
        .add_rule(
            Rule::builder("both")
                .when(Pattern::any().literal("a", 1i64))
                .when(Pattern::any().literal("b", 2i64))
                .then(|_, _| Ok(())),
        )
        .unwrap();

    engine.declare(Fact::root().with("a", 1i64)).unwrap();
    assert!(engine.agenda().is_empty());

    engine.declare(Fact::root().with("b", 2i64)).unwrap();
    assert_eq!(engine.agenda().len(), 1);
}

#[test]
fn variables_join_across_patterns() {
    let parent = FactType::builder("Parent").build();
    let child = FactType::builder("Child").build();
    let mut engine = started();
    let seen = recording(
        &mut engine,
        "family",
        vec![
            Pattern::new(&parent).var("name", "p").into(),
            Pattern::new(&child).var("parent", "p").var("name", "c").into(),
        ],
        "c",
    );

    engine
        .declare_all([
            Fact::new(&parent).with("name", "ada"),
            Fact::new(&parent).with("name", "bob"),
            Fact::new(&child).with("parent", "ada").with("name", "cy"),
            Fact::new(&child).with("parent", "zed").with("name", "dee"),
        ])
        .unwrap();

    assert_eq!(engine.run(None).unwrap(), 1);
    assert_eq!(*seen.borrow(), vec![Value::from("cy")]);
}

#[test]
fn repeated_variable_within_a_pattern_requires_equal_fields() {
    let mut engine = started();
    let seen = recording(
        &mut engine,
        "same",
        vec![Pattern::any().var("a", "x").var("b", "x").into()],
        "x",
    );

    engine
        .declare_all([
            Fact::root().with("a", 1i64).with("b", 1i64),
            Fact::root().with("a", 1i64).with("b", 2i64),
        ])
        .unwrap();

    assert_eq!(engine.run(None).unwrap(), 1);
    assert_eq!(*seen.borrow(), vec![Value::Int(1)]);
}

#[test]
fn positional_fields_match_by_index() {
    let mut engine = started();
    let seen = recording(
        &mut engine,
        "pos",
        vec![Pattern::any().literal(0usize, "move").var(1usize, "dir").into()],
        "dir",
    );

    engine
        .declare(Fact::root().with_positional(["move", "north"]))
        .unwrap();
    engine
        .declare(Fact::root().with_positional(["look", "south"]))
        .unwrap();

    engine.run(None).unwrap();
    assert_eq!(*seen.borrow(), vec![Value::from("north")]);
}

#[test]
fn wildcard_requires_presence() {
    let mut engine = started();
    engine
        .add_rule(
            Rule::builder("has")
                .when(Pattern::any().wildcard("tag"))
                .then(|_, _| Ok(())),
        )
        .unwrap();

    engine.declare(Fact::root().with("other", 1i64)).unwrap();
    assert!(engine.agenda().is_empty());
    engine.declare(Fact::root().with("tag", Value::Nil)).unwrap();
    assert_eq!(engine.agenda().len(), 1);
}

#[test]
fn schema_defaults_take_part_in_matching() {
    let light = FactType::builder("Light")
        .field(seine_foundation::FieldSchema::with_default(
            "color",
            seine_foundation::Type::String,
            "red",
        ))
        .build();
    let mut engine = started();
    engine
        .add_rule(
            Rule::builder("red")
                .when(Pattern::new(&light).literal("color", "red"))
                .then(|_, _| Ok(())),
        )
        .unwrap();

    engine.declare(Fact::new(&light)).unwrap();
    assert_eq!(engine.run(None).unwrap(), 1);
}

// =============================================================================
// Negated Variables
// =============================================================================

#[test]
fn negated_variable_positive() {
    let mut engine = started();
    engine
        .add_rule(
            Rule::builder("differ")
                .when(Pattern::any().var("a", "x").not_var("b", "x"))
                .then(|_, _| Ok(())),
        )
        .unwrap();

    engine
        .declare(Fact::root().with("a", 1i64).with("b", 2i64))
        .unwrap();
    assert_eq!(engine.run(None).unwrap(), 1);
}

#[test]
fn negated_variable_negative() {
    let mut engine = started();
    engine
        .add_rule(
            Rule::builder("differ")
                .when(Pattern::any().var("a", "x").not_var("b", "x"))
                .then(|_, _| Ok(())),
        )
        .unwrap();

    engine
        .declare(Fact::root().with("a", 1i64).with("b", 1i64))
        .unwrap();
    assert_eq!(engine.run(None).unwrap(), 0);
}

#[test]
fn negated_variable_across_patterns() {
    let mut engine = started();
    engine
        .add_rule(
            Rule::builder("other")
                .when(Pattern::any().var("first", "x"))
                .when(Pattern::any().not_var("second", "x"))
                .then(|_, _| Ok(())),
        )
        .unwrap();

    engine.declare(Fact::root().with("first", 1i64)).unwrap();
    engine.declare(Fact::root().with("second", 1i64)).unwrap();
    assert!(engine.agenda().is_empty());

    engine.declare(Fact::root().with("second", 2i64)).unwrap();
    assert_eq!(engine.agenda().len(), 1);
}

#[test]
fn negated_variable_without_binding_is_rejected() {
    let mut engine = KnowledgeEngine::new();
    let err = engine
        .add_rule(
            Rule::builder("bad")
                .when(Pattern::any().not_var("a", "x"))
                .then(|_, _| Ok(())),
        )
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Configuration);
    assert!(matches!(err.kind, ErrorKind::UnboundNegatedVariable { .. }));
    assert!(engine.get_rules().is_empty());
}

#[test]
fn negated_variable_bound_only_later_is_rejected() {
    let mut engine = KnowledgeEngine::new();
    let err = engine
        .add_rule(
            Rule::builder("late")
                .when(Pattern::any().not_var("b", "x"))
                .when(Pattern::any().var("a", "x"))
                .then(|_, _| Ok(())),
        )
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnboundNegatedVariable { .. }));
}

// =============================================================================
// Negation
// =============================================================================

#[test]
fn negation_suppresses_matches() {
    let person = FactType::builder("Person").build();
    let mut engine = started();
    let seen = recording(
        &mut engine,
        "no_namesake",
        vec![
            Pattern::new(&person).var("name", "n").into(),
            Condition::not(Pattern::new(&person).var("surname", "n")),
        ],
        "n",
    );

    engine
        .declare(
            Fact::new(&person)
                .with("name", "name")
                .with("surname", "NotAName"),
        )
        .unwrap();
    assert_eq!(engine.agenda().len(), 1);
    assert_eq!(engine.agenda().peek().unwrap().get("n"), Some(&Value::from("name")));

    engine
        .declare(Fact::new(&person).with("name", "name").with("surname", "name"))
        .unwrap();
    assert_eq!(engine.run(None).unwrap(), 0);
    assert!(seen.borrow().is_empty());
}

#[test]
fn retracting_the_blocker_restores_the_match() {
    let mut engine = started();
    engine
        .add_rule(
            Rule::builder("lonely")
                .when(Pattern::any().literal("kind", "cat"))
                .when(Condition::not(Pattern::any().literal("kind", "dog")))
                .then(|_, _| Ok(())),
        )
        .unwrap();

    engine.declare(Fact::root().with("kind", "cat")).unwrap();
    let dog = engine.declare(Fact::root().with("kind", "dog")).unwrap();
    assert!(engine.agenda().is_empty());

    engine.retract(dog).unwrap();
    assert_eq!(engine.agenda().len(), 1);
}

#[test]
fn leading_negation_is_anchored_on_the_sentinel() {
    let mut engine = started();
    engine
        .add_rule(
            Rule::builder("empty")
                .when(Condition::not(Pattern::any().wildcard("x")))
                .then(|_, _| Ok(())),
        )
        .unwrap();
    assert_eq!(engine.agenda().len(), 1);

    engine.declare(Fact::root().with("x", 1i64)).unwrap();
    assert!(engine.agenda().is_empty());
}

// =============================================================================
// Disjunction
// =============================================================================

fn either() -> Rule {
    Rule::builder("either")
        .when(Condition::or([
            Pattern::any().literal("something", 1i64),
            Pattern::any().literal("something", 2i64),
        ]))
        .then(|_, _| Ok(()))
}

#[test]
fn or_without_a_match() {
    let mut engine = started();
    engine.add_rule(either()).unwrap();
    engine.declare(Fact::root().with("something", 3i64)).unwrap();
    assert!(engine.agenda().is_empty());
}

#[test]
fn or_matches_each_alternative() {
    for value in [1i64, 2] {
        let mut engine = started();
        engine.add_rule(either()).unwrap();
        engine.declare(Fact::root().with("something", value)).unwrap();
        assert_eq!(engine.agenda().len(), 1);
    }
}

#[test]
fn or_alternatives_over_the_same_fact_collapse() {
    let mut engine = started();
    engine
        .add_rule(
            Rule::builder("either")
                .when(Condition::or([
                    Pattern::any().literal("a", 1i64),
                    Pattern::any().literal("b", 2i64),
                ]))
                .then(|_, _| Ok(())),
        )
        .unwrap();

    let id = engine
        .declare(Fact::root().with("a", 1i64).with("b", 2i64))
        .unwrap();
    assert_eq!(engine.agenda().len(), 1);

    engine.retract(id).unwrap();
    assert!(engine.agenda().is_empty());
}

#[test]
fn collapsed_activation_survives_while_one_alternative_holds() {
    let mut engine = started();
    engine
        .add_rule(
            Rule::builder("guarded")
                .when(Condition::or([
                    Condition::and([
                        Condition::from(Pattern::any().literal("x", 1i64)),
                        Condition::not(Pattern::any().wildcard("block")),
                    ]),
                    Pattern::any().literal("x", 1i64).into(),
                ]))
                .then(|_, _| Ok(())),
        )
        .unwrap();

    engine.declare(Fact::root().with("x", 1i64)).unwrap();
    assert_eq!(engine.agenda().len(), 1);

    let blocker = engine.declare(Fact::root().with("block", true)).unwrap();
    assert_eq!(engine.agenda().len(), 1);

    engine.retract(blocker).unwrap();
    assert_eq!(engine.agenda().len(), 1);
    assert_eq!(engine.run(None).unwrap(), 1);
}

#[test]
fn alternatives_over_different_facts_stay_separate() {
    let mut engine = started();
    engine
        .add_rule(
            Rule::builder("either")
                .when(Condition::or([
                    Pattern::any().literal("kind", "a").var("v", "v"),
                    Pattern::any().literal("kind", "b").var("v", "v"),
                ]))
                .then(|_, _| Ok(())),
        )
        .unwrap();

    engine
        .declare_all([
            Fact::root().with("kind", "a").with("v", 1i64),
            Fact::root().with("kind", "b").with("v", 1i64),
        ])
        .unwrap();

    assert_eq!(engine.agenda().len(), 2);
    assert!(engine.agenda().iter().all(|a| a.get("v") == Some(&Value::Int(1))));
    assert_eq!(engine.run(None).unwrap(), 2);
}

// =============================================================================
// Tests and Predicates
// =============================================================================

#[test]
fn field_predicates() {
    let mut engine = started();
    let seen = recording(
        &mut engine,
        "big",
        vec![
            Pattern::any()
                .field(
                    "n",
                    FieldConstraint::test("positive", |v| v.as_int().is_some_and(|n| n > 0)),
                )
                .var("n", "n")
                .into(),
        ],
        "n",
    );

    engine
        .declare_all([Fact::root().with("n", -1i64), Fact::root().with("n", 5i64)])
        .unwrap();
    engine.run(None).unwrap();
    assert_eq!(*seen.borrow(), vec![Value::Int(5)]);
}

#[test]
fn condition_tests_see_bindings() {
    let mut engine = started();
    let seen = recording(
        &mut engine,
        "ordered",
        vec![
            Pattern::any().var("lo", "lo").into(),
            Pattern::any().var("hi", "hi").into(),
            Condition::test("lo < hi", |b| {
                match (b.get("lo").and_then(Value::as_int), b.get("hi").and_then(Value::as_int)) {
                    (Some(lo), Some(hi)) => lo < hi,
                    _ => false,
                }
            }),
        ],
        "hi",
    );

    engine
        .declare_all([
            Fact::root().with("lo", 3i64),
            Fact::root().with("hi", 1i64),
            Fact::root().with("hi", 7i64),
        ])
        .unwrap();
    engine.run(None).unwrap();
    assert_eq!(*seen.borrow(), vec![Value::Int(7)]);
}

#[test]
fn negated_tests() {
    let mut engine = started();
    engine
        .add_rule(
            Rule::builder("not_small")
                .when(Pattern::any().var("n", "n"))
                .when(Condition::not(Condition::test("small", |b| {
                    b.get("n").and_then(Value::as_int).is_some_and(|n| n < 10)
                })))
                .then(|_, _| Ok(())),
        )
        .unwrap();

    engine
        .declare_all([Fact::root().with("n", 3i64), Fact::root().with("n", 30i64)])
        .unwrap();
    assert_eq!(engine.run(None).unwrap(), 1);
}

// =============================================================================
// Fact Types and Bindings
// =============================================================================

#[test]
fn patterns_match_subtypes() {
    let animal = FactType::builder("Animal").build();
    let dog = FactType::builder("Dog").extends(&animal).build();
    let rock = FactType::builder("Rock").build();

    let mut engine = started();
    let seen = recording(
        &mut engine,
        "animals",
        vec![Pattern::new(&animal).var("name", "name").into()],
        "name",
    );

    engine
        .declare_all([
            Fact::new(&dog).with("name", "rex"),
            Fact::new(&rock).with("name", "pebble"),
            Fact::new(&animal).with("name", "generic"),
        ])
        .unwrap();
    engine.run(None).unwrap();

    let mut names: Vec<_> = seen.borrow().iter().map(ToString::to_string).collect();
    names.sort();
    assert_eq!(names, vec!["generic", "rex"]);
}

#[test]
fn named_bindings_expose_the_matched_fact() {
    let mut engine = started();
    let seen = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&seen);
    engine
        .add_rule(
            Rule::builder("grab")
                .when(Pattern::any().literal("k", 1i64).bind("f"))
                .then(move |_, act| {
                    *sink.borrow_mut() = act.fact("f").and_then(|f| f.id());
                    Ok(())
                }),
        )
        .unwrap();

    let id = engine.declare(Fact::root().with("k", 1i64)).unwrap();
    engine.run(None).unwrap();
    assert_eq!(*seen.borrow(), Some(id));
}

#[test]
fn negated_patterns_cannot_bind_facts() {
    let mut engine = KnowledgeEngine::new();
    let err = engine
        .add_rule(
            Rule::builder("bad")
                .when(Condition::not(Pattern::any().literal("k", 1i64).bind("f")))
                .then(|_, _| Ok(())),
        )
        .unwrap_err();
    assert!(matches!(err.kind, ErrorKind::IllegalCondition(_)));
}

#[test]
fn literal_patterns_convert_to_facts() {
    let pattern = Pattern::any().literal("a", 1i64).literal(0usize, "x");
    let fact = Fact::try_from(&pattern).unwrap();
    assert_eq!(fact, Fact::root().with("a", 1i64).with_positional(["x"]));

    let err = Fact::try_from(&Pattern::any().var("a", "x")).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnresolvedConstraint { .. }));
    assert_eq!(err.category(), ErrorCategory::Declaration);
}

// =============================================================================
// Late Rules
// =============================================================================

#[test]
fn rules_added_late_see_existing_facts() {
    let mut engine = started();
    engine
        .declare_all([Fact::root().with("n", 1i64), Fact::root().with("n", 2i64)])
        .unwrap();

    engine
        .add_rule(
            Rule::builder("late")
                .when(Pattern::any().var("n", "n"))
                .then(|_, _| Ok(())),
        )
        .unwrap();
    assert_eq!(engine.agenda().len(), 2);
}

#[test]
fn equivalent_patterns_share_alpha_nodes() {
    let mut engine = KnowledgeEngine::new();
    for name in ["a", "b"] {
        engine
            .add_rule(
                Rule::builder(name)
                    .when(Pattern::any().literal("k", 1i64))
                    .then(|_, _| Ok(())),
            )
            .unwrap();
    }
    assert_eq!(engine.stats().alpha_nodes, 1);
    assert_eq!(engine.stats().clauses, 2);
}
