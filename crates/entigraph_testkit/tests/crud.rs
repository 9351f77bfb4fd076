//! Instance lifecycle, queries and transactions over one context.

use entigraph_core::{
    Aggregate, CoreError, FetchRequest, Instance, Lifecycle, Predicate, ResultType,
    SortDescriptor, UpdateResult, Value, Values,
};
use entigraph_testkit::prelude::*;
use proptest::prelude::*;

#[test]
fn create_then_find_by_id_round_trips() {
    with_temp_context(people_registry(), |ctx| {
        let ahmed = ctx.create("Person", person("Ahmed", 29)).unwrap();

        let found = ctx.find_by_id(ahmed.id()).unwrap();
        assert_eq!(found.get("name"), Some(&Value::from("Ahmed")));
        assert_eq!(found.get("age"), Some(&Value::Integer(29)));
        assert_eq!(found.get("email"), Some(&Value::Null));
        assert_eq!(found.lifecycle(), Lifecycle::Inserted);
    });
}

#[test]
fn predicate_find_counts_matches() {
    with_temp_context(people_registry(), |ctx| {
        for (name, age) in [("a", 19), ("b", 29), ("c", 32)] {
            ctx.create("Person", person(name, age)).unwrap();
        }

        let young = FetchRequest::new("Person").matching("age < 30", &[]).unwrap();
        assert_eq!(ctx.find(&young).unwrap().len(), 2);
        assert_eq!(ctx.count(&young).unwrap(), 2);

        // Pending instances are found before and after a save.
        ctx.save().unwrap();
        assert_eq!(ctx.find(&young).unwrap().len(), 2);
    });
}

#[test]
fn bulk_create_is_all_or_nothing() {
    with_temp_context(people_registry(), |ctx| {
        let good: Vec<Values> = (0..5).map(|i| person(&format!("p{i}"), i)).collect();
        assert_eq!(ctx.bulk_create("Person", good.clone()).unwrap().len(), 5);

        let mut bad = good;
        bad.insert(3, Values::new().set("name", "x").set("age", "not a number"));
        let result = ctx.bulk_create("Person", bad);
        assert!(matches!(result, Err(CoreError::TypeMismatch { .. })));
        assert_eq!(ctx.find_all("Person").unwrap().len(), 5);

        let unknown = vec![person("y", 1), Values::new().set("salary", 10)];
        assert!(matches!(
            ctx.bulk_create("Person", unknown),
            Err(CoreError::UnknownKey { .. })
        ));
        assert_eq!(ctx.pending_changes().inserted, 5);
    });
}

#[test]
fn unknown_names_fail_before_mutation() {
    with_temp_context(people_registry(), |ctx| {
        assert!(matches!(
            ctx.create("Robot", Values::new()),
            Err(CoreError::UnknownEntity { .. })
        ));

        let ahmed = ctx.create("Person", person("Ahmed", 29)).unwrap();
        ctx.save().unwrap();

        let result = ctx.set(ahmed.id(), Values::new().set("age", 30).set("height", 180));
        assert!(matches!(result, Err(CoreError::UnknownKey { .. })));
        assert!(!ctx.has_changes());
        assert_eq!(
            ctx.get(ahmed.id(), &["age"]).unwrap()["age"],
            Value::Integer(29)
        );

        assert!(matches!(
            ctx.get(ahmed.id(), &["name", "height"]),
            Err(CoreError::UnknownKey { .. })
        ));
        assert!(matches!(
            FetchRequest::new("Person")
                .matching("age >", &[])
                .map(|_| ()),
            Err(CoreError::InvalidPredicate { .. })
        ));
        let bad_key = FetchRequest::new("Person").filter(Predicate::eq("height", 1));
        assert!(matches!(ctx.find(&bad_key), Err(CoreError::UnknownKey { .. })));
    });
}

#[test]
fn values_are_type_checked() {
    with_temp_context(people_registry(), |ctx| {
        let err = ctx
            .create("Person", Values::new().set("name", 5))
            .unwrap_err();
        assert!(matches!(err, CoreError::TypeMismatch { ref key, .. } if key == "name"));

        // Null is only accepted by optional attributes.
        assert!(ctx
            .create("Person", person("a", 1).set("email", Value::Null))
            .is_ok());
        assert!(matches!(
            ctx.create("Person", Values::new().set("age", Value::Null)),
            Err(CoreError::TypeMismatch { .. })
        ));
    });
}

#[test]
fn save_reports_whether_anything_was_written() {
    with_temp_context(people_registry(), |ctx| {
        assert!(!ctx.save().unwrap());

        let ahmed = ctx.create("Person", person("Ahmed", 29)).unwrap();
        assert!(ctx.has_changes());
        assert!(ctx.save().unwrap());
        assert!(!ctx.save().unwrap());
        assert_eq!(ctx.find_by_id(ahmed.id()).unwrap().lifecycle(), Lifecycle::Clean);

        ctx.set(ahmed.id(), Values::new().set("age", 30)).unwrap();
        assert!(ctx.find_by_id(ahmed.id()).unwrap().is_updated());
        assert!(ctx.save().unwrap());
        assert!(!ctx.save().unwrap());
        assert_eq!(ctx.committed_sequence().as_u64(), 2);
    });
}

#[test]
fn destroyed_instances_stay_addressable_until_commit() {
    with_temp_context(people_registry(), |ctx| {
        let ids = scenarios::populated_people(ctx, &[("a", 1), ("b", 2)]);

        assert_eq!(ctx.destroy(ids[0]).unwrap(), 1);
        let doomed = ctx.find_by_id(ids[0]).unwrap();
        assert!(doomed.is_deleted());
        assert_eq!(ctx.get(ids[0], &["name"]).unwrap()["name"], Value::from("a"));
        assert_eq!(ctx.find_all("Person").unwrap().len(), 1);
        assert!(matches!(ctx.destroy(ids[0]), Err(CoreError::InstanceNotFound { .. })));

        assert!(ctx.save().unwrap());
        assert!(ctx.find_by_id(ids[0]).is_none());
    });
}

#[test]
fn rollback_restores_committed_state() {
    with_temp_context(people_registry(), |ctx| {
        let ids = scenarios::populated_people(ctx, &[("a", 1), ("b", 2)]);

        ctx.set(ids[0], Values::new().set("age", 99)).unwrap();
        ctx.destroy(ids[1]).unwrap();
        ctx.create("Person", person("c", 3)).unwrap();
        assert_eq!(ctx.pending_changes().total(), 3);

        ctx.rollback();
        assert!(!ctx.has_changes());
        assert_eq!(ctx.find_all("Person").unwrap().len(), 2);
        assert_eq!(ctx.get(ids[0], &["age"]).unwrap()["age"], Value::Integer(1));
    });
}

#[test]
fn transaction_saves_or_rolls_back() {
    with_temp_context(people_registry(), |ctx| {
        let id = ctx
            .transaction(|ctx| Ok(ctx.create("Person", person("a", 1))?.id()))
            .unwrap();
        assert!(!ctx.has_changes());
        assert!(ctx.snapshot().find_by_id(&id).is_some());

        let result: Result<(), _> = ctx.transaction(|ctx| {
            ctx.create("Person", person("b", 2))?;
            ctx.set(id, Values::new().set("shoe_size", 44))?;
            Ok(())
        });
        assert!(matches!(result, Err(CoreError::UnknownKey { .. })));
        assert!(!ctx.has_changes());
        assert_eq!(ctx.find_all("Person").unwrap().len(), 1);
    });
}

#[test]
fn multi_key_sort_is_stable() {
    with_temp_context(people_registry(), |ctx| {
        for (name, age) in [("d", 30), ("a", 30), ("c", 20), ("b", 20), ("a", 20)] {
            ctx.create("Person", person(name, age)).unwrap();
        }

        let request = FetchRequest::new("Person")
            .sort_by(SortDescriptor::ascending("age"))
            .sort_by(SortDescriptor::ascending("name"));
        let rows: Vec<(i64, String)> = ctx
            .find(&request)
            .unwrap()
            .iter()
            .map(|p| {
                (
                    p.get("age").and_then(Value::as_integer).unwrap(),
                    p.get("name").and_then(Value::as_text).unwrap().to_string(),
                )
            })
            .collect();
        assert_eq!(
            rows,
            vec![
                (20, "a".into()),
                (20, "b".into()),
                (20, "c".into()),
                (30, "a".into()),
                (30, "d".into()),
            ]
        );

        let descending = FetchRequest::new("Person")
            .sort_by(SortDescriptor::descending("age"))
            .limit(2);
        let top = ctx.find(&descending).unwrap();
        assert!(top.iter().all(|p| p.get("age") == Some(&Value::Integer(30))));
        // Ties keep insertion order.
        assert_eq!(top[0].get("name"), Some(&Value::from("d")));
    });
}

#[test]
fn offset_limit_and_batch_size() {
    with_temp_context(people_registry(), |ctx| {
        for i in 0..10 {
            ctx.create("Person", person(&format!("p{i}"), i)).unwrap();
        }
        let base = FetchRequest::new("Person").sort_by(SortDescriptor::ascending("age"));

        let page = ctx.find(&base.clone().offset(3).limit(4)).unwrap();
        let ages: Vec<_> = page.iter().map(|p| p.get("age").cloned().unwrap()).collect();
        assert_eq!(ages, (3..7).map(Value::Integer).collect::<Vec<_>>());

        let ids = |instances: Vec<Instance>| instances.iter().map(Instance::id).collect::<Vec<_>>();
        assert_eq!(
            ids(ctx.find(&base.clone().batch_size(3)).unwrap()),
            ids(ctx.find(&base).unwrap())
        );
        assert_eq!(ctx.count(&base.clone().offset(8)).unwrap(), 2);
        assert!(ctx.find(&base.offset(20)).unwrap().is_empty());
    });
}

#[test]
fn find_one_and_aggregates() {
    with_temp_context(people_registry(), |ctx| {
        for (name, age) in [("a", 19), ("b", 29), ("c", 32)] {
            ctx.create("Person", person(name, age)).unwrap();
        }
        let all = FetchRequest::new("Person");

        let oldest = ctx
            .find_one(&all.clone().sort_by(SortDescriptor::descending("age")))
            .unwrap()
            .unwrap();
        assert_eq!(oldest.get("name"), Some(&Value::from("c")));

        assert_eq!(ctx.aggregate(&all, Aggregate::Sum, "age").unwrap(), Value::Integer(80));
        assert_eq!(ctx.aggregate(&all, Aggregate::Min, "age").unwrap(), Value::Integer(19));
        assert_eq!(ctx.aggregate(&all, Aggregate::Max, "name").unwrap(), Value::from("c"));
        assert_eq!(ctx.aggregate(&all, Aggregate::Count, "age").unwrap(), Value::Integer(3));
        assert!(matches!(
            ctx.aggregate(&all, Aggregate::Average, "name"),
            Err(CoreError::TypeMismatch { .. })
        ));

        let none = all.matching("age > 100", &[]).unwrap();
        assert_eq!(ctx.aggregate(&none, Aggregate::Average, "age").unwrap(), Value::Null);
        assert!(ctx.find_one(&none).unwrap().is_none());
    });
}

#[test]
fn update_applies_to_every_match() {
    with_temp_context(people_registry(), |ctx| {
        for (name, age) in [("a", 19), ("b", 29), ("c", 32)] {
            ctx.create("Person", person(name, age)).unwrap();
        }

        let young = Predicate::parse("age < %@", &[Value::Integer(30)]).unwrap();
        let result = ctx
            .update(
                "Person",
                young.clone(),
                Values::new().set("email", "kid@example.com"),
                ResultType::UpdatedCount,
            )
            .unwrap();
        assert_eq!(result.count(), 2);

        let result = ctx
            .update(
                "Person",
                young,
                Values::new().set("age", 30),
                ResultType::UpdatedObjects,
            )
            .unwrap();
        let UpdateResult::Instances(updated) = result else {
            panic!("expected instances");
        };
        assert_eq!(updated.len(), 2);
        assert!(updated.iter().all(|p| p.get("age") == Some(&Value::Integer(30))));

        let nobody = ctx
            .update(
                "Person",
                Predicate::Constant(false),
                Values::new().set("age", 1),
                ResultType::UpdatedCount,
            )
            .unwrap();
        assert_eq!(nobody.count(), 0);
    });
}

#[test]
fn upsert_matches_on_unique_keys() {
    with_temp_context(people_registry(), |ctx| {
        let first = ctx
            .upsert("Person", person("Ahmed", 29).set("email", "ahmed@example.com"))
            .unwrap();
        let second = ctx
            .upsert("Person", Values::new().set("email", "ahmed@example.com").set("age", 30))
            .unwrap();
        assert_eq!(first.id(), second.id());
        assert_eq!(second.get("age"), Some(&Value::Integer(30)));
        assert_eq!(second.get("name"), Some(&Value::from("Ahmed")));

        // Without the unique key there is nothing to match on.
        ctx.upsert("Person", person("Ahmed", 29)).unwrap();
        ctx.upsert("Person", person("Bea", 41).set("email", "bea@example.com"))
            .unwrap();
        assert_eq!(ctx.find_all("Person").unwrap().len(), 3);
    });
}

#[test]
fn snapshot_only_sees_commits() {
    with_temp_context(people_registry(), |ctx| {
        scenarios::populated_people(ctx, &[("a", 1)]);
        let before = ctx.snapshot();

        let b = ctx.create("Person", person("b", 2)).unwrap();
        assert_eq!(ctx.snapshot().len(), 1);
        assert!(ctx.snapshot().find_by_id(&b.id()).is_none());

        ctx.save().unwrap();
        let after = ctx.snapshot();
        assert_eq!(after.len(), 2);
        assert_eq!(after.sequence().as_u64(), before.sequence().as_u64() + 1);
        // Old snapshots are immutable.
        assert_eq!(before.len(), 1);
        assert_eq!(
            after
                .count(&FetchRequest::new("Person").matching("age >= 2", &[]).unwrap())
                .unwrap(),
            1
        );
    });
}

proptest! {
    #[test]
    fn equality_find_ignores_insertion_order(
        rows in people_strategy(20),
        seed in any::<prop::sample::Index>(),
    ) {
        prop_assume!(!rows.is_empty());
        let target = rows[seed.index(rows.len())].clone();
        let expected = rows.iter().filter(|r| **r == target).count();

        let mut shuffled = rows.clone();
        shuffled.reverse();
        for ordering in [rows, shuffled] {
            let count = with_temp_context(people_registry(), |ctx| {
                for (name, age) in &ordering {
                    ctx.create("Person", person(name, *age)).unwrap();
                }
                let request = FetchRequest::new("Person").filter(Predicate::from_equalities([
                    ("name", Value::from(target.0.as_str())),
                    ("age", Value::Integer(target.1)),
                ]));
                ctx.find(&request).unwrap().len()
            });
            prop_assert_eq!(count, expected);
        }
    }

    #[test]
    fn generated_predicates_agree_with_working_and_snapshot(
        rows in people_strategy(15),
        predicate in person_predicate_strategy(),
    ) {
        with_temp_context(people_registry(), |ctx| {
            for (name, age) in &rows {
                ctx.create("Person", person(name, *age)).unwrap();
            }
            ctx.save().unwrap();
            let request = FetchRequest::new("Person").filter(predicate.clone());
            let working = ctx.count(&request).unwrap();
            let committed = ctx.snapshot().count(&request).unwrap();
            let manual = ctx
                .find_all("Person")
                .unwrap()
                .iter()
                .filter(|p| predicate.evaluate(p))
                .count();
            assert_eq!(working, committed);
            assert_eq!(working, manual);
        });
    }
}
