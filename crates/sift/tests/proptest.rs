//! Property-based tests for sift using proptest.

#![cfg(feature = "derive")]

use proptest::prelude::*;
use sift::{coerce, Criteria, Entity, FieldKind, NumberKind, Op, SortSpec, TaggedValue};

// ============================================================================
// Test helpers
// ============================================================================

#[derive(Debug, Clone, Entity)]
#[sift(rename_all = "PascalCase")]
struct TestItem {
    value: i64,
    name: String,
    active: bool,
    count: u32,
}

// Strategy to generate test items
fn test_item_strategy() -> impl Strategy<Value = TestItem> {
    (any::<i64>(), "[a-z]{0,10}", any::<bool>(), 0u32..5000).prop_map(
        |(value, name, active, count)| TestItem {
            value,
            name,
            active,
            count,
        },
    )
}

fn comparison_op() -> impl Strategy<Value = Op> {
    prop::sample::select(vec![
        Op::Equal,
        Op::NotEqual,
        Op::GreaterThan,
        Op::GreaterThanOrEqual,
        Op::LessThan,
        Op::LessThanOrEqual,
    ])
}

fn native(op: Op, field: i64, operand: i64) -> bool {
    match op {
        Op::Equal => field == operand,
        Op::NotEqual => field != operand,
        Op::GreaterThan => field > operand,
        Op::GreaterThanOrEqual => field >= operand,
        Op::LessThan => field < operand,
        Op::LessThanOrEqual => field <= operand,
        _ => unreachable!(),
    }
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    /// Filter should never return more items than the input.
    #[test]
    fn filter_never_grows_collection(
        items in prop::collection::vec(test_item_strategy(), 0..100),
        threshold in any::<i64>(),
    ) {
        let predicate = Criteria::<TestItem>::always()
            .and_gt("Value", threshold)
            .unwrap()
            .compile()
            .unwrap();

        let results = predicate.filter(&items);
        prop_assert!(results.len() <= items.len());
        prop_assert_eq!(results.len(), predicate.count(&items));
    }

    /// Constant roots ignore entity contents.
    #[test]
    fn constants_match_all_or_nothing(
        items in prop::collection::vec(test_item_strategy(), 0..50),
    ) {
        let always = Criteria::<TestItem>::always().compile().unwrap();
        let never = Criteria::<TestItem>::never().compile().unwrap();
        prop_assert_eq!(always.count(&items), items.len());
        prop_assert_eq!(never.count(&items), 0);
    }

    /// Numeric comparisons agree with native integer comparisons.
    #[test]
    fn comparisons_match_native(
        item in test_item_strategy(),
        op in comparison_op(),
        operand in any::<i64>(),
    ) {
        let predicate = Criteria::<TestItem>::always()
            .and("Value", op, operand)
            .unwrap()
            .compile()
            .unwrap();
        prop_assert_eq!(predicate.matches(&item), native(op, item.value, operand));
    }

    /// An AND chain accepts exactly the items every leaf accepts.
    #[test]
    fn and_chain_is_conjunction(
        items in prop::collection::vec(test_item_strategy(), 0..50),
        low in any::<i64>(),
        high in any::<i64>(),
        active in any::<bool>(),
    ) {
        let chained = Criteria::<TestItem>::always()
            .and_gte("Value", low)
            .unwrap()
            .and_lte("Value", high)
            .unwrap()
            .and_eq("Active", active)
            .unwrap()
            .compile()
            .unwrap();

        for item in &items {
            let expected = item.value >= low && item.value <= high && item.active == active;
            prop_assert_eq!(chained.matches(item), expected);
        }
    }

    /// Text operators on numbers match the decimal form.
    #[test]
    fn numeric_like_matches_decimal_text(
        item in test_item_strategy(),
        needle in 0u32..1000,
    ) {
        let predicate = Criteria::<TestItem>::always()
            .and_like("Count", needle.to_string())
            .unwrap()
            .compile()
            .unwrap();
        let expected = item.count.to_string().contains(&needle.to_string());
        prop_assert_eq!(predicate.matches(&item), expected);
    }

    /// Prefix and suffix tests agree with std on string members.
    #[test]
    fn prefix_and_suffix_match_std(
        item in test_item_strategy(),
        needle in "[a-z]{0,3}",
    ) {
        let starts = Criteria::<TestItem>::always()
            .and("Name", Op::StartsWith, needle.as_str())
            .unwrap()
            .compile()
            .unwrap();
        let ends = Criteria::<TestItem>::always()
            .and("Name", Op::NotEndsWith, needle.as_str())
            .unwrap()
            .compile()
            .unwrap();
        prop_assert_eq!(starts.matches(&item), item.name.starts_with(&needle));
        prop_assert_eq!(ends.matches(&item), !item.name.ends_with(&needle));
    }

    /// Trees survive the wire form unchanged.
    #[test]
    fn json_round_trip_preserves_tree(
        ops in prop::collection::vec((comparison_op(), any::<i64>(), any::<bool>()), 0..8),
    ) {
        let mut criteria = Criteria::<TestItem>::always();
        for (op, operand, use_or) in ops {
            criteria = if use_or {
                criteria.or("Value", op, operand).unwrap()
            } else {
                criteria.and("Value", op, operand).unwrap()
            };
        }

        let back = Criteria::<TestItem>::from_json(&criteria.to_json().unwrap()).unwrap();
        prop_assert_eq!(back.tree(), criteria.tree());
        prop_assert_eq!(back.id(), criteria.id());
    }

    /// Sorting is stable and ordered by the key.
    #[test]
    fn sort_is_stable_and_ordered(
        items in prop::collection::vec(test_item_strategy(), 0..50),
    ) {
        let comparator = SortSpec::<TestItem>::order_by("Active").compile().unwrap();
        let sorted: Vec<(bool, &str)> = comparator
            .sorted(&items)
            .into_iter()
            .map(|item| (item.active, item.name.as_str()))
            .collect();

        let mut expected: Vec<(bool, &str)> =
            items.iter().map(|item| (item.active, item.name.as_str())).collect();
        expected.sort_by_key(|(active, _)| *active);
        prop_assert_eq!(sorted, expected);
    }

    /// Grouped and localized digits coerce to the same number.
    #[test]
    fn coerced_digits_parse_back(n in 0u32..10_000_000) {
        let persian: String = n
            .to_string()
            .chars()
            .map(|c| char::from_u32(0x06F0 + c.to_digit(10).unwrap()).unwrap())
            .collect();
        let kind = FieldKind::Number(NumberKind::U32);
        let expected = coerce(TaggedValue::from(n.to_string()), &kind, false).unwrap();
        let coerced = coerce(TaggedValue::from(persian), &kind, false).unwrap();
        prop_assert_eq!(coerced, expected);
    }
}
