//! Filter evaluation for query execution.
//!
//! This module provides the `FilterEvaluator` that evaluates predicates
//! against stored rows.

use std::cmp::Ordering;

use super::predicate::Predicate;
use crate::value::{Row, Value};

/// Evaluates predicates against row data.
pub struct FilterEvaluator;

impl FilterEvaluator {
    /// Evaluate a predicate against a row.
    ///
    /// Returns `true` if the row matches, `false` otherwise. A missing field
    /// never matches a comparison.
    pub fn evaluate(predicate: &Predicate, row: &Row) -> bool {
        match predicate {
            Predicate::Eq { field, value } => {
                Self::compare_field(row, field, value, Self::values_equal)
            }
            Predicate::Ne { field, value } => {
                Self::compare_field(row, field, value, |a, b| !Self::values_equal(a, b))
            }
            Predicate::Lt { field, value } => Self::compare_field(row, field, value, |a, b| {
                Self::compare_values(a, b).map(Ordering::is_lt).unwrap_or(false)
            }),
            Predicate::Le { field, value } => Self::compare_field(row, field, value, |a, b| {
                Self::compare_values(a, b).map(Ordering::is_le).unwrap_or(false)
            }),
            Predicate::Gt { field, value } => Self::compare_field(row, field, value, |a, b| {
                Self::compare_values(a, b).map(Ordering::is_gt).unwrap_or(false)
            }),
            Predicate::Ge { field, value } => Self::compare_field(row, field, value, |a, b| {
                Self::compare_values(a, b).map(Ordering::is_ge).unwrap_or(false)
            }),
            Predicate::In { field, values } => match row.get(field) {
                Some(fv) => values.iter().any(|v| Self::values_equal(fv, v)),
                None => false,
            },
            Predicate::NotIn { field, values } => match row.get(field) {
                Some(fv) => !values.iter().any(|v| Self::values_equal(fv, v)),
                None => true, // NULL is not in any set
            },
            Predicate::IsNull { field } => matches!(row.get(field), None | Some(Value::Null)),
            Predicate::IsNotNull { field } => {
                !matches!(row.get(field), None | Some(Value::Null))
            }
            Predicate::Like { field, pattern } => match row.get(field) {
                Some(Value::String(s)) => Self::like_match(s, pattern),
                _ => false,
            },
            Predicate::NotLike { field, pattern } => match row.get(field) {
                Some(Value::String(s)) => !Self::like_match(s, pattern),
                _ => true,
            },
            Predicate::And(items) => items.iter().all(|p| Self::evaluate(p, row)),
            Predicate::Or(items) => items.iter().any(|p| Self::evaluate(p, row)),
            Predicate::Not(inner) => !Self::evaluate(inner, row),
        }
    }

    /// Compare a field value with a comparator function.
    fn compare_field<F>(row: &Row, field: &str, value: &Value, comparator: F) -> bool
    where
        F: FnOnce(&Value, &Value) -> bool,
    {
        match row.get(field) {
            Some(fv) => comparator(fv, value),
            None => false,
        }
    }

    /// Check if two values are equal, widening numbers and dates.
    pub fn values_equal(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Int(_) | Value::Number(_), Value::Int(_) | Value::Number(_)) => {
                Self::compare_values(a, b) == Some(Ordering::Equal)
            }
            (Value::Date(_), _) | (_, Value::Date(_)) => {
                matches!((a.to_date(), b.to_date()), (Some(x), Some(y)) if x == y)
            }
            _ => a == b,
        }
    }

    /// Compare two values, returning their ordering if comparable.
    ///
    /// Dates compare against dates, RFC 3339 strings and epoch milliseconds.
    pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
        match (a, b) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(_) | Value::Number(_), Value::Int(_) | Value::Number(_)) => {
                a.as_f64()?.partial_cmp(&b.as_f64()?)
            }
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Date(_), _) | (_, Value::Date(_)) => Some(a.to_date()?.cmp(&b.to_date()?)),
            _ => None, // Incompatible types
        }
    }

    /// Total order used for sorting: nulls first, then incomparable values
    /// keep their relative order.
    pub fn sort_order(a: Option<&Value>, b: Option<&Value>) -> Ordering {
        match (a, b) {
            (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
            (None | Some(Value::Null), _) => Ordering::Less,
            (_, None | Some(Value::Null)) => Ordering::Greater,
            (Some(a), Some(b)) => Self::compare_values(a, b).unwrap_or(Ordering::Equal),
        }
    }

    /// Match a string against a SQL LIKE pattern.
    ///
    /// Supports:
    /// - `%` matches zero or more characters
    /// - `_` matches exactly one character
    /// - `\\%` matches literal `%`
    /// - `\\_` matches literal `_`
    pub fn like_match(value: &str, pattern: &str) -> bool {
        let value: Vec<char> = value.chars().collect();
        let pattern: Vec<char> = pattern.chars().collect();
        Self::like_match_from(&value, &pattern)
    }

    /// Walks both inputs in a loop; only `%` recurses, once per candidate
    /// split, so recursion depth is bounded by the number of `%` in the pattern.
    fn like_match_from(mut value: &[char], mut pattern: &[char]) -> bool {
        loop {
            match (pattern.split_first(), value.split_first()) {
                (None, None) => return true,
                (None, Some(_)) => return false,
                (Some(('%', rest)), _) => {
                    if rest.is_empty() {
                        return true;
                    }
                    loop {
                        if Self::like_match_from(value, rest) {
                            return true;
                        }
                        match value.split_first() {
                            Some((_, tail)) => value = tail,
                            None => return false,
                        }
                    }
                }
                (Some(('_', rest)), Some((_, tail))) => {
                    pattern = rest;
                    value = tail;
                }
                (Some(('_', _)), None) => return false,
                (Some(('\\', rest)), _) => match (rest.split_first(), value.split_first()) {
                    (Some((p, rest)), Some((c, tail))) if p == c => {
                        pattern = rest;
                        value = tail;
                    }
                    _ => return false,
                },
                (Some((p, rest)), Some((c, tail))) if p == c => {
                    pattern = rest;
                    value = tail;
                }
                (Some(_), _) => return false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn make_row(fields: Vec<(&str, Value)>) -> Row {
        fields.into_iter().map(|(n, v)| (n.to_string(), v)).collect()
    }

    #[test]
    fn test_eq_filter() {
        let row = make_row(vec![("name", Value::from("Alice")), ("age", Value::Int(30))]);

        assert!(FilterEvaluator::evaluate(&Predicate::eq("name", "Alice"), &row));
        assert!(!FilterEvaluator::evaluate(&Predicate::eq("name", "Bob"), &row));
        assert!(FilterEvaluator::evaluate(&Predicate::eq("age", 30), &row));
        assert!(FilterEvaluator::evaluate(&Predicate::eq("age", 30.0), &row));
    }

    #[test]
    fn test_comparison_filters() {
        let row = make_row(vec![("score", Value::Int(75))]);

        assert!(FilterEvaluator::evaluate(&Predicate::lt("score", 80), &row));
        assert!(!FilterEvaluator::evaluate(&Predicate::lt("score", 75), &row));
        assert!(FilterEvaluator::evaluate(&Predicate::le("score", 75), &row));
        assert!(FilterEvaluator::evaluate(&Predicate::gt("score", 70), &row));
        assert!(FilterEvaluator::evaluate(&Predicate::ge("score", 75), &row));
        // Missing field never matches
        assert!(!FilterEvaluator::evaluate(&Predicate::gt("missing", 0), &row));
    }

    #[test]
    fn test_date_comparisons() {
        let created = Utc.with_ymd_and_hms(2017, 2, 1, 0, 0, 0).unwrap();
        let row = make_row(vec![("created", Value::Date(created))]);

        let earlier = Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap();
        assert!(FilterEvaluator::evaluate(&Predicate::ge("created", earlier), &row));
        assert!(FilterEvaluator::evaluate(
            &Predicate::ge("created", earlier.timestamp_millis()),
            &row
        ));
        assert!(FilterEvaluator::evaluate(
            &Predicate::eq("created", "2017-02-01T00:00:00Z"),
            &row
        ));
        assert!(!FilterEvaluator::evaluate(&Predicate::lt("created", earlier), &row));
    }

    #[test]
    fn test_in_and_null_filters() {
        let row = make_row(vec![("status", Value::from("active")), ("deleted", Value::Null)]);

        let statuses = vec![Value::from("active"), Value::from("pending")];
        assert!(FilterEvaluator::evaluate(&Predicate::is_in("status", statuses.clone()), &row));
        assert!(!FilterEvaluator::evaluate(&Predicate::not_in("status", statuses), &row));
        assert!(FilterEvaluator::evaluate(&Predicate::is_null("deleted"), &row));
        assert!(FilterEvaluator::evaluate(&Predicate::is_null("missing"), &row));
        assert!(FilterEvaluator::evaluate(&Predicate::is_not_null("status"), &row));
    }

    #[test]
    fn test_compound_filters() {
        let row = make_row(vec![("age", Value::Int(30)), ("active", Value::Bool(true))]);

        let both = Predicate::ge("age", 18).and(Predicate::eq("active", true));
        assert!(FilterEvaluator::evaluate(&both, &row));

        let either = Predicate::lt("age", 18).or(Predicate::eq("active", true));
        assert!(FilterEvaluator::evaluate(&either, &row));

        assert!(!FilterEvaluator::evaluate(&either.negate(), &row));
    }

    #[test]
    fn test_like_match() {
        assert!(FilterEvaluator::like_match("hello", "hello"));
        assert!(FilterEvaluator::like_match("hello", "h%"));
        assert!(FilterEvaluator::like_match("hello", "%llo"));
        assert!(FilterEvaluator::like_match("hello", "h_llo"));
        assert!(FilterEvaluator::like_match("100%", "100\\%"));
        assert!(!FilterEvaluator::like_match("hello", "h_lo"));
        assert!(!FilterEvaluator::like_match("hello", "world%"));
        assert!(FilterEvaluator::like_match("a_b", "a\\_b"));
        assert!(!FilterEvaluator::like_match("axb", "a\\_b"));
        assert!(FilterEvaluator::like_match("abcabd", "%ab_"));
    }

    #[test]
    fn test_like_match_long_inputs() {
        let value = "x".repeat(200_000);
        let pattern = "_".repeat(200_000);
        assert!(FilterEvaluator::like_match(&value, &pattern));
        assert!(FilterEvaluator::like_match(&value, &format!("%{}", &pattern[1..])));
        assert!(!FilterEvaluator::like_match(&value, &format!("{}y", &pattern[1..])));
    }

    #[test]
    fn test_sort_order_puts_nulls_first() {
        let one = Value::Int(1);
        assert_eq!(FilterEvaluator::sort_order(None, Some(&one)), Ordering::Less);
        assert_eq!(FilterEvaluator::sort_order(Some(&one), Some(&Value::Null)), Ordering::Greater);
        assert_eq!(
            FilterEvaluator::sort_order(Some(&Value::Int(2)), Some(&one)),
            Ordering::Greater
        );
    }
}
