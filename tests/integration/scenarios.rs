//! End-to-end knowledge bases
//!
//! Each test wires a handful of rules together and checks the working memory
//! a full run leaves behind.

use std::collections::BTreeSet;

use seine::engine::{Condition, DefFacts, KnowledgeEngine, Pattern, ResetArgs, Rule};
use seine::foundation::{Fact, FactType, FieldSchema, Type, Value};

fn strings(engine: &KnowledgeEngine, ty: &FactType, field: &str) -> BTreeSet<String> {
    engine
        .facts()
        .filter(|f| f.fact_type() == ty)
        .filter_map(|f| f.get_named(field).map(ToString::to_string))
        .collect()
}

// =============================================================================
// Family
// =============================================================================

#[test]
fn grandparents_are_derived_transitively() {
    let parent = FactType::builder("ParentOf").build();
    let grand = FactType::builder("GrandparentOf").build();

    let mut engine = KnowledgeEngine::new();
    let family = parent.clone();
    engine.add_deffacts(DefFacts::new("family", move |_| {
        [("ada", "bea"), ("bea", "cal"), ("bea", "dan"), ("eve", "fay")]
            .map(|(p, c)| Fact::new(&family).with("parent", p).with("child", c))
    }));
    let derived = grand.clone();
    engine
        .add_rule(
            Rule::builder("grandparent")
                .when(Pattern::new(&parent).var("parent", "g").var("child", "p"))
                .when(Pattern::new(&parent).var("parent", "p").var("child", "c"))
                .then(move |engine, act| {
                    let (Some(g), Some(c)) = (act.get("g"), act.get("c")) else {
                        return Ok(());
                    };
                    engine.declare(
                        Fact::new(&derived)
                            .with("elder", g.clone())
                            .with("younger", c.clone()),
                    )?;
                    Ok(())
                }),
        )
        .unwrap();

    engine.reset(&ResetArgs::new()).unwrap();
    assert_eq!(engine.run(None).unwrap(), 2);
    assert_eq!(
        strings(&engine, &grand, "younger"),
        BTreeSet::from(["cal".to_string(), "dan".to_string()])
    );
    assert_eq!(
        strings(&engine, &grand, "elder"),
        BTreeSet::from(["ada".to_string()])
    );
}

// =============================================================================
// Monitoring
// =============================================================================

fn monitor() -> (KnowledgeEngine, FactType, FactType) {
    let reading = FactType::builder("Reading")
        .field(FieldSchema::mandatory("sensor", Type::String))
        .field(FieldSchema::mandatory("value", Type::Int))
        .build();
    let alarm = FactType::builder("Alarm")
        .field(FieldSchema::mandatory("sensor", Type::String))
        .build();

    let mut engine = KnowledgeEngine::new();
    let raised = alarm.clone();
    engine
        .add_rule(
            Rule::builder("raise")
                .when(
                    Pattern::new(&reading)
                        .var("sensor", "s")
                        .test("value", "over 100", |v| v.as_int().is_some_and(|n| n > 100)),
                )
                .when(Condition::not(Pattern::new(&alarm).var("sensor", "s")))
                .then(move |engine, act| {
                    let sensor = act.get("s").cloned().unwrap_or(Value::Nil);
                    engine.declare(Fact::new(&raised).with("sensor", sensor))?;
                    Ok(())
                }),
        )
        .unwrap();
    engine.reset(&ResetArgs::new()).unwrap();
    (engine, reading, alarm)
}

#[test]
fn one_alarm_per_sensor() {
    let (mut engine, reading, alarm) = monitor();
    engine
        .declare_all([
            Fact::new(&reading).with("sensor", "boiler").with("value", 120i64),
            Fact::new(&reading).with("sensor", "boiler").with("value", 130i64),
            Fact::new(&reading).with("sensor", "tank").with("value", 50i64),
        ])
        .unwrap();

    assert_eq!(engine.run(None).unwrap(), 1);
    assert_eq!(
        strings(&engine, &alarm, "sensor"),
        BTreeSet::from(["boiler".to_string()])
    );
}

#[test]
fn alarms_follow_their_readings() {
    let (mut engine, reading, alarm) = monitor();
    let hot = engine
        .declare(Fact::new(&reading).with("sensor", "boiler").with("value", 150i64))
        .unwrap();
    engine.run(None).unwrap();
    assert_eq!(strings(&engine, &alarm, "sensor").len(), 1);

    let cooled = engine.modify(hot, [("value", 20i64)]).unwrap();
    assert!(strings(&engine, &alarm, "sensor").is_empty());
    assert_eq!(engine.run(None).unwrap(), 0);

    engine.modify(cooled, [("value", 200i64)]).unwrap();
    assert_eq!(engine.run(None).unwrap(), 1);
    assert_eq!(strings(&engine, &alarm, "sensor").len(), 1);
}

#[test]
fn invalid_readings_are_rejected() {
    let (mut engine, reading, _) = monitor();
    let err = engine
        .declare(Fact::new(&reading).with("sensor", "boiler").with("value", "hot"))
        .unwrap_err();
    assert_eq!(err.category(), seine::foundation::ErrorCategory::Declaration);
    assert_eq!(engine.fact_count(), 1);
}

// =============================================================================
// Classification
// =============================================================================

#[test]
fn classification_with_alternatives_and_priorities() {
    let animal = FactType::builder("Animal").build();
    let label = FactType::builder("Label").build();

    let mut engine = KnowledgeEngine::new();
    let bird = label.clone();
    engine
        .add_rule(
            Rule::builder("bird")
                .salience(10)
                .when(
                    Pattern::new(&animal)
                        .var("name", "n")
                        .literal("covering", "feathers"),
                )
                .then(move |engine, act| {
                    let name = act.get("n").cloned().unwrap_or(Value::Nil);
                    engine.declare(Fact::new(&bird).with("name", name).with("kind", "bird"))?;
                    Ok(())
                }),
        )
        .unwrap();
    let pet = label.clone();
    let tagged = label.clone();
    engine
        .add_rule(
            Rule::builder("pet")
                .when(Condition::or([
                    Pattern::new(&animal).var("name", "n").literal("sound", "woof"),
                    Pattern::new(&animal).var("name", "n").literal("sound", "meow"),
                ]))
                .when(Condition::not(Pattern::new(&tagged).var("name", "n")))
                .then(move |engine, act| {
                    let name = act.get("n").cloned().unwrap_or(Value::Nil);
                    engine.declare(Fact::new(&pet).with("name", name).with("kind", "pet"))?;
                    Ok(())
                }),
        )
        .unwrap();

    engine.reset(&ResetArgs::new()).unwrap();
    engine
        .declare_all([
            Fact::new(&animal).with("name", "rex").with("sound", "woof"),
            Fact::new(&animal).with("name", "tom").with("sound", "meow"),
            Fact::new(&animal)
                .with("name", "polly")
                .with("sound", "woof")
                .with("covering", "feathers"),
            Fact::new(&animal).with("name", "moby").with("sound", "song"),
        ])
        .unwrap();
    assert_eq!(engine.run(None).unwrap(), 3);

    let kinds: BTreeSet<(String, String)> = engine
        .facts()
        .filter(|f| f.fact_type() == &label)
        .filter_map(|f| Some((f.get_named("name")?.to_string(), f.get_named("kind")?.to_string())))
        .collect();
    assert_eq!(
        kinds,
        BTreeSet::from([
            ("polly".to_string(), "bird".to_string()),
            ("rex".to_string(), "pet".to_string()),
            ("tom".to_string(), "pet".to_string()),
        ])
    );
}

// =============================================================================
// Countdown
// =============================================================================

#[test]
fn countdown_runs_in_bounded_slices() {
    let counter = FactType::builder("Counter")
        .field(FieldSchema::with_default("n", Type::Int, 5i64))
        .build();

    let mut engine = KnowledgeEngine::new();
    let start = counter.clone();
    engine.add_deffacts(DefFacts::new("counter", move |_| [Fact::new(&start)]));
    engine
        .add_rule(
            Rule::builder("tick")
                .when(Pattern::new(&counter).var("n", "n").bind("c"))
                .when(Condition::test("positive", |b| {
                    b.get("n").and_then(Value::as_int).is_some_and(|n| n > 0)
                }))
                .then(|engine, act| {
                    let n = act.get("n").and_then(Value::as_int).unwrap_or_default();
                    if let Some(id) = act.fact("c").and_then(|f| f.id()) {
                        engine.modify(id, [("n", n - 1)])?;
                    }
                    Ok(())
                }),
        )
        .unwrap();

    engine.reset(&ResetArgs::new()).unwrap();
    assert_eq!(engine.run(Some(2)).unwrap(), 2);
    assert_eq!(engine.run(Some(2)).unwrap(), 2);
    assert_eq!(engine.run(None).unwrap(), 1);
    assert_eq!(engine.run(None).unwrap(), 0);

    let remaining: Vec<_> = engine
        .facts()
        .filter_map(|f| f.get_named("n").cloned())
        .collect();
    assert_eq!(remaining, vec![Value::Int(0)]);
}
