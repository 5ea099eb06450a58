//! Property-based tests for filters, page windows and validation.

use crate::common::{self, fields};
use proptest::prelude::*;
use scim_core::{Filter, PageWindow};
use serde_json::json;

fn attribute_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "userName",
        "title",
        "name.givenName",
        "emails.value",
        "meta.lastModified",
        "urn:ietf:params:scim:schemas:core:2.0:User:displayName",
    ])
    .prop_map(String::from)
}

fn literal_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 @.]{0,10}".prop_map(|s| format!("\"{}\"", s)),
        any::<i32>().prop_map(|n| n.to_string()),
        any::<bool>().prop_map(|b| b.to_string()),
        Just("null".to_string()),
    ]
}

fn comparison_strategy() -> impl Strategy<Value = String> {
    let operators = prop::sample::select(vec!["eq", "ne", "co", "sw", "ew", "gt", "ge", "lt", "le"]);
    prop_oneof![
        (attribute_strategy(), operators, literal_strategy())
            .prop_map(|(attribute, op, value)| format!("{} {} {}", attribute, op, value)),
        attribute_strategy().prop_map(|attribute| format!("{} pr", attribute)),
    ]
}

fn filter_strategy() -> impl Strategy<Value = String> {
    comparison_strategy().prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("{} and {}", a, b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| format!("({}) or ({})", a, b)),
            inner.prop_map(|a| format!("not ({})", a)),
        ]
    })
}

proptest! {
    #[test]
    fn prop_filter_display_reparses(text in filter_strategy()) {
        let filter = Filter::parse(&text).unwrap();
        let rendered = filter.to_string();
        let reparsed = Filter::parse(&rendered).unwrap();
        prop_assert_eq!(&reparsed, &filter);
        prop_assert_eq!(reparsed.to_string(), rendered);
    }

    #[test]
    fn prop_page_window_is_clamped(
        start in prop::option::of(any::<i64>()),
        count in prop::option::of(-10i64..500),
        total in 0usize..1000,
        default_count in 1usize..200,
        max_count in 1usize..200,
    ) {
        let window = PageWindow::compute(start, count, total, default_count, max_count);
        prop_assert!(window.start_index >= 1);
        prop_assert!(window.items_per_page <= max_count);
        prop_assert_eq!(window.offset(), window.start_index - 1);

        let range = window.range();
        prop_assert!(range.end <= total);
        prop_assert!(range.len() <= window.items_per_page);
    }

    #[test]
    fn prop_string_equality_ignores_case(title in "[a-zA-Z]{1,12}") {
        let queryable = common::user_mapping().queryable_attributes();
        let predicate = Filter::parse(&format!("title eq \"{}\"", title.to_uppercase()))
            .unwrap()
            .evaluate(&queryable)
            .unwrap();
        let record = fields(json!({"job_title": title.to_lowercase()}));
        prop_assert!(predicate.matches(&record));
    }

    #[test]
    fn prop_validation_accepts_well_typed_users(
        user_name in "[a-z][a-z0-9.]{0,15}",
        title in prop::option::of("[ -~]{0,20}"),
        active in any::<bool>(),
    ) {
        let user = common::user_type();
        let mut raw = json!({"userName": user_name, "active": active});
        if let Some(title) = title {
            raw["title"] = json!(title);
        }
        let (tree, errors) = user.build_tree(&raw);
        prop_assert!(errors.is_empty());
        prop_assert!(user.validate(&tree).is_ok());

        raw["active"] = json!(user_name);
        let (tree, _) = user.build_tree(&raw);
        prop_assert!(user.validate(&tree).is_err());
    }
}
