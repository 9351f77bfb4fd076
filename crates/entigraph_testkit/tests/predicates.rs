//! Predicate language against a populated context.

use entigraph_core::{Context, CoreError, FetchRequest, Predicate, Value, Values};
use entigraph_testkit::prelude::*;

fn names(ctx: &Context, source: &str, args: &[Value]) -> Vec<String> {
    let request = FetchRequest::new("Person")
        .matching(source, args)
        .unwrap_or_else(|e| panic!("{source}: {e}"));
    ctx.find(&request)
        .unwrap()
        .iter()
        .map(|p| p.get("name").and_then(Value::as_text).unwrap().to_string())
        .collect()
}

fn populated(ctx: &Context) {
    for (name, age, email) in [
        ("Ahmed", 29, Some("ahmed@example.com")),
        ("amira", 34, None),
        ("Bea", 19, Some("bea@EXAMPLE.org")),
        ("Cem", 41, None),
    ] {
        let mut values = person(name, age);
        if let Some(email) = email {
            values = values.set("email", email);
        }
        ctx.create("Person", values).unwrap();
    }
}

#[test]
fn comparisons_and_combinators() {
    with_temp_context(people_registry(), |ctx| {
        populated(ctx);

        assert_eq!(names(ctx, "age < 30", &[]), ["Ahmed", "Bea"]);
        assert_eq!(names(ctx, "age >= 34 AND age <= 41", &[]), ["amira", "Cem"]);
        assert_eq!(names(ctx, "age == 19 || age = 41", &[]), ["Bea", "Cem"]);
        assert_eq!(names(ctx, "NOT (age < 30) and name != 'Cem'", &[]), ["amira"]);
        assert_eq!(names(ctx, "!(age <> 29)", &[]), ["Ahmed"]);
        assert_eq!(names(ctx, "TRUEPREDICATE", &[]).len(), 4);
        assert!(names(ctx, "falsepredicate", &[]).is_empty());
    });
}

#[test]
fn string_operators_and_case_folding() {
    with_temp_context(people_registry(), |ctx| {
        populated(ctx);

        assert_eq!(names(ctx, "name BEGINSWITH 'A'", &[]), ["Ahmed"]);
        assert_eq!(names(ctx, "name BEGINSWITH[c] 'a'", &[]), ["Ahmed", "amira"]);
        assert_eq!(names(ctx, "name ENDSWITH 'a'", &[]), ["amira", "Bea"]);
        assert_eq!(names(ctx, "name CONTAINS[c] 'E'", &[]), ["Ahmed", "Bea", "Cem"]);
        assert_eq!(names(ctx, "email LIKE '*@example.*'", &[]), ["Ahmed"]);
        assert_eq!(names(ctx, "email LIKE[c] '*@example.*'", &[]), ["Ahmed", "Bea"]);
        assert_eq!(names(ctx, "name LIKE '?e?'", &[]), ["Bea", "Cem"]);
        assert_eq!(names(ctx, "name ==[c] \"AHMED\"", &[]), ["Ahmed"]);
        assert!(names(ctx, "name == \"AHMED\"", &[]).is_empty());
    });
}

#[test]
fn null_literals_and_in_lists() {
    with_temp_context(people_registry(), |ctx| {
        populated(ctx);

        assert_eq!(names(ctx, "email == nil", &[]), ["amira", "Cem"]);
        assert_eq!(names(ctx, "email != NULL", &[]), ["Ahmed", "Bea"]);
        // Null emails never satisfy an ordering comparison.
        assert_eq!(names(ctx, "email < 'z'", &[]), ["Ahmed", "Bea"]);
        assert_eq!(names(ctx, "age IN {19, 41}", &[]), ["Bea", "Cem"]);
        assert_eq!(
            names(ctx, "name IN[c] {'AMIRA', %@}", &[Value::from("cem")]),
            ["amira", "Cem"]
        );
    });
}

#[test]
fn placeholders_bind_left_to_right() {
    with_temp_context(people_registry(), |ctx| {
        populated(ctx);

        let args = [Value::from("A"), Value::Integer(30)];
        assert_eq!(names(ctx, "name BEGINSWITH %@ AND age < %@", &args), ["Ahmed"]);

        let request = FetchRequest::new("Person").matching("age > %@", &[]);
        assert!(matches!(request, Err(CoreError::InvalidPredicate { .. })));
        let request = FetchRequest::new("Person")
            .matching("age > %@", &[Value::Integer(1), Value::Integer(2)]);
        assert!(matches!(request, Err(CoreError::InvalidPredicate { .. })));
    });
}

#[test]
fn malformed_predicates_report_a_position() {
    for (source, position) in [("", 0), ("age <", 5), ("age 30", 4), ("(age < 3", 8)] {
        match Predicate::parse(source, &[]) {
            Err(CoreError::InvalidPredicate { position: at, .. }) => {
                assert_eq!(at, position, "{source:?}");
            }
            other => panic!("{source:?} parsed as {other:?}"),
        }
    }
    assert!(matches!(
        Predicate::parse("age <[c] 3", &[]),
        Err(CoreError::InvalidPredicate { .. })
    ));
}

#[test]
fn parsed_predicates_are_reusable() {
    with_temp_context(people_registry(), |ctx| {
        let adults = Predicate::parse("age >= 18", &[]).unwrap();
        let request = FetchRequest::new("Person").filter(adults.clone());
        assert_eq!(ctx.count(&request).unwrap(), 0);

        ctx.create("Person", Values::new().set("name", "x").set("age", 20))
            .unwrap();
        assert_eq!(ctx.count(&request).unwrap(), 1);
        assert_eq!(
            ctx.count(&FetchRequest::new("Person").filter(adults.negate()))
                .unwrap(),
            0
        );
    });
}

#[test]
fn float_attributes_accept_integer_comparisons() {
    use entigraph_core::{EntityDescriptor, EntityRegistry, ScalarType};

    let mut registry = EntityRegistry::new();
    registry
        .register(
            EntityDescriptor::builder("Reading")
                .attribute("celsius", ScalarType::Float)
                .build(),
        )
        .unwrap();

    with_temp_context(registry, |ctx| {
        for celsius in [Value::Float(18.5), Value::Float(21.0), Value::Integer(23)] {
            ctx.create("Reading", Values::new().set("celsius", celsius))
                .unwrap();
        }
        let warm = FetchRequest::new("Reading").matching("celsius > 20", &[]).unwrap();
        assert_eq!(ctx.count(&warm).unwrap(), 2);
        let exact = FetchRequest::new("Reading").matching("celsius == 21", &[]).unwrap();
        assert_eq!(ctx.count(&exact).unwrap(), 1);
    });
}
