//! Filter parsing and evaluation.

use crate::common::{self, fields};
use scim_core::filter::{CompareOp, Expr, Literal};
use scim_core::schema::embedded::{ENTERPRISE_USER_SCHEMA, USER_SCHEMA};
use scim_core::{Filter, FilterError, QueryableAttributes, ScimError};
use serde_json::json;

fn queryable() -> QueryableAttributes {
    common::user_mapping()
        .queryable_attributes()
        .with_schema_prefix(USER_SCHEMA)
}

fn matches(filter: &str, row: serde_json::Value) -> bool {
    Filter::parse(filter)
        .unwrap()
        .evaluate(&queryable())
        .unwrap()
        .matches(&fields(row))
}

#[test]
fn test_precedence_and_grouping() {
    let filter = Filter::parse(r#"title eq "a" or title eq "b" and not active eq true"#).unwrap();
    let expected = Expr::or(
        Expr::Compare {
            path: "title".into(),
            op: CompareOp::Eq,
            value: Literal::String("a".into()),
        },
        Expr::and(
            Expr::Compare {
                path: "title".into(),
                op: CompareOp::Eq,
                value: Literal::String("b".into()),
            },
            Expr::not(Expr::Compare {
                path: "active".into(),
                op: CompareOp::Eq,
                value: Literal::Boolean(true),
            }),
        ),
    );
    assert_eq!(filter.expr(), &expected);

    let grouped = Filter::parse(r#"(title eq "a" or title eq "b") and active eq true"#).unwrap();
    assert!(matches!(grouped.expr(), Expr::And(..)));
    assert_eq!(
        grouped.to_string(),
        r#"(title eq "a" or title eq "b") and active eq true"#
    );
}

#[test]
fn test_operator_keywords_ignore_case() {
    let lower = Filter::parse(r#"userName eq "x" and title pr"#).unwrap();
    let upper = Filter::parse(r#"userName EQ "x" AND title PR"#).unwrap();
    assert_eq!(lower, upper);
}

#[test]
fn test_unsupported_filters_rejected() {
    assert!(matches!(
        Filter::parse("userName"),
        Err(FilterError::MissingOperator { .. })
    ));
    assert!(matches!(
        Filter::parse(r#"emails[type eq "work"]"#),
        Err(FilterError::NestedFilter { .. })
    ));
    assert!(matches!(
        Filter::parse(r#"userName xx "bjensen""#),
        Err(FilterError::UnknownOperator { .. })
    ));
    assert!(Filter::parse(r#"userName eq "unterminated"#).is_err());

    let err = ScimError::from(Filter::parse("title").unwrap_err());
    assert_eq!(err.scim_type(), Some("invalidFilter"));
}

#[test]
fn test_string_equality_ignores_case() {
    let row = json!({"job_title": "foo"});
    assert!(matches(r#"title eq "FOO""#, row.clone()));
    assert!(matches(r#"title co "O""#, row.clone()));
    assert!(matches(r#"title sw "F""#, row.clone()));
    assert!(matches(r#"title ew "oO""#, row.clone()));
    assert!(!matches(r#"title ne "FOO""#, row));
}

#[test]
fn test_ordering_is_case_sensitive() {
    // "foo" sorts after "FOO" byte-wise; folded they would be equal.
    let row = json!({"job_title": "foo"});
    assert!(matches(r#"title gt "FOO""#, row.clone()));
    assert!(!matches(r#"title le "FOO""#, row.clone()));
    assert!(matches(r#"title ge "foo""#, row));
}

#[test]
fn test_native_ordering_for_numbers_and_dates() {
    let queryable = QueryableAttributes::new()
        .with("meta.lastModified", "updated_at")
        .with("loginCount", "logins");
    let row = fields(json!({"updated_at": "2011-05-13T04:42:34Z", "logins": 10}));

    let recent = Filter::parse(r#"meta.lastModified gt "2011-05-13T00:00:00Z""#)
        .unwrap()
        .evaluate(&queryable)
        .unwrap();
    assert!(recent.matches(&row));

    // One instant written with two offsets.
    let shifted = fields(json!({"updated_at": "2024-05-01T10:00:00+02:00"}));
    for (filter, expected) in [
        (r#"meta.lastModified eq "2024-05-01T08:00:00Z""#, true),
        (r#"meta.lastModified ne "2024-05-01T08:00:00Z""#, false),
        (r#"meta.lastModified ge "2024-05-01T08:00:00Z""#, true),
        (r#"meta.lastModified gt "2024-05-01T08:00:00Z""#, false),
    ] {
        let predicate = Filter::parse(filter).unwrap().evaluate(&queryable).unwrap();
        assert_eq!(predicate.matches(&shifted), expected, "{}", filter);
    }

    let busy = Filter::parse("loginCount ge 9 and loginCount lt 10.5")
        .unwrap()
        .evaluate(&queryable)
        .unwrap();
    assert!(busy.matches(&row));
}

#[test]
fn test_unmapped_attribute_is_invalid_filter() {
    let err = Filter::parse(r#"userName eq "bjensen" or unknownAttr eq "x""#)
        .unwrap()
        .evaluate(&queryable())
        .unwrap_err();
    assert_eq!(
        err,
        FilterError::UnmappedAttribute {
            attribute: "unknownAttr".to_string()
        }
    );
    assert_eq!(ScimError::from(err).scim_type(), Some("invalidFilter"));
}

#[test]
fn test_mapping_paths_resolve() {
    let row = json!({
        "login": "bjensen",
        "first_name": "Barbara",
        "employee_no": "701984",
        "enabled": true
    });
    assert!(matches(r#"name.givenName sw "bar""#, row.clone()));
    assert!(matches(
        &format!(r#"{}:employeeNumber eq "701984""#, ENTERPRISE_USER_SCHEMA),
        row.clone()
    ));
    assert!(matches(
        &format!(r#"{}:userName eq "BJENSEN""#, USER_SCHEMA),
        row.clone()
    ));
    assert!(matches("USERNAME pr and active eq true", row.clone()));
    assert!(!matches("displayName pr", row));
}

#[test]
fn test_presence_and_null() {
    assert!(matches("title pr", json!({"job_title": "Guide"})));
    assert!(!matches("title pr", json!({"job_title": ""})));
    assert!(!matches("title pr", json!({"job_title": null})));
    assert!(matches("title eq null", json!({})));
    assert!(matches(r#"not (title pr)"#, json!({"login": "x"})));
}

#[test]
fn test_predicate_over_sub_entity_arrays() {
    let queryable = common::group_mapping().queryable_attributes();
    let predicate = Filter::parse(r#"members.value eq "u2""#)
        .unwrap()
        .evaluate(&queryable)
        .unwrap();

    assert_eq!(predicate.fields(), vec!["memberships.user_id"]);
    assert!(predicate.matches(&fields(json!({
        "memberships": [{"user_id": "u1"}, {"user_id": "U2"}]
    }))));
    assert!(!predicate.matches(&fields(json!({"memberships": []}))));
}

#[test]
fn test_rpn_form() {
    let filter = Filter::parse(r#"not (a pr) and b eq 1"#).unwrap();
    let rpn: Vec<String> = filter.to_rpn().iter().map(ToString::to_string).collect();
    assert_eq!(rpn, vec!["a pr", "not", "b eq 1", "and"]);
}
