// SPDX-License-Identifier: Apache-2.0

use commtest_forms::{evaluate, Outcome};
use commtest_layout::RawValue;
use commtest_model::{encode_boolean_expectation, Expectation, ExpectedType, ScalarType};
use proptest::prelude::*;

fn number(expectation: Expectation, raw: &str) -> Option<(Outcome, String)> {
    evaluate(&expectation, ScalarType::Number, None, &RawValue::text(raw))
        .map(|v| (v.outcome, v.message))
}

#[test]
fn numeric_rules_follow_their_bounds() {
    assert_eq!(
        number(Expectation::range(10.0, 20.0), "15"),
        Some((Outcome::Pass, "Within range (10 – 20)".to_string()))
    );
    let (outcome, message) = number(Expectation::range(10.0, 20.0), "25").expect("verdict");
    assert_eq!(outcome, Outcome::Fail);
    assert!(message.contains("10") && message.contains("20"), "{message}");

    assert_eq!(
        number(Expectation::minimum(5.0), "4.9").map(|v| v.0),
        Some(Outcome::Fail)
    );
    assert_eq!(
        number(Expectation::maximum(5.0), "5").map(|v| v.0),
        Some(Outcome::Pass)
    );
    assert_eq!(
        number(Expectation::exact(3.0), "3"),
        Some((Outcome::Pass, "Pass".to_string()))
    );
    assert_eq!(
        number(Expectation::exact(3.0), "3.5"),
        Some((Outcome::Fail, "Expected 3".to_string()))
    );
}

#[test]
fn blank_or_unparseable_values_have_no_verdict() {
    for expectation in [
        Expectation::range(1.0, 2.0),
        Expectation::minimum(1.0),
        Expectation::maximum(1.0),
        Expectation::exact(1.0),
    ] {
        assert_eq!(number(expectation, ""), None);
        assert_eq!(number(expectation, "   "), None);
        assert_eq!(number(expectation, "abc"), None);
    }
}

#[test]
fn missing_bounds_have_no_verdict() {
    let open_range = Expectation {
        expected_type: ExpectedType::Range,
        ..Expectation::default()
    };
    assert_eq!(number(open_range, "4"), None);
    let no_min = Expectation {
        expected_type: ExpectedType::Minimum,
        ..Expectation::default()
    };
    assert_eq!(number(no_min, "4"), None);
}

#[test]
fn half_open_ranges_name_the_bound_and_unit() {
    let upper_only = Expectation {
        expected_type: ExpectedType::Range,
        expected_max: Some(50.0),
        ..Expectation::default()
    };
    let verdict = evaluate(
        &upper_only,
        ScalarType::Number,
        Some("mA"),
        &RawValue::text("75"),
    )
    .expect("verdict");
    assert_eq!(verdict.message, "Expected ≤ 50 mA");

    let verdict = evaluate(
        &Expectation::minimum(1.0),
        ScalarType::Number,
        Some("MΩ"),
        &RawValue::text("0.5"),
    )
    .expect("verdict");
    assert_eq!(verdict.message, "Expected ≥ 1 MΩ");
}

#[test]
fn booleans_only_check_exact_expectations() {
    let want_yes = Expectation::exact(encode_boolean_expectation(true));
    let yes = evaluate(&want_yes, ScalarType::Boolean, None, &RawValue::Boolean(true))
        .expect("verdict");
    assert!(yes.passed());
    let no = evaluate(&want_yes, ScalarType::Boolean, None, &RawValue::Boolean(false))
        .expect("verdict");
    assert_eq!(no.message, "Expected Yes");

    let want_no = Expectation::exact(encode_boolean_expectation(false));
    let verdict = evaluate(&want_no, ScalarType::Boolean, None, &RawValue::Boolean(true))
        .expect("verdict");
    assert_eq!(verdict.message, "Expected No");

    assert_eq!(
        evaluate(
            &Expectation::minimum(1.0),
            ScalarType::Boolean,
            None,
            &RawValue::Boolean(true)
        ),
        None
    );
}

#[test]
fn text_values_are_never_judged() {
    assert_eq!(
        evaluate(
            &Expectation::exact(1.0),
            ScalarType::Text,
            None,
            &RawValue::text("1")
        ),
        None
    );
}

proptest! {
    #[test]
    fn range_passes_exactly_inside_the_closed_interval(
        lo in -1000i32..1000,
        width in 0i32..500,
        value in -2000i32..2000,
    ) {
        let (lo, hi) = (f64::from(lo), f64::from(lo + width));
        let value = f64::from(value);
        let verdict = evaluate(
            &Expectation::range(lo, hi),
            ScalarType::Number,
            None,
            &RawValue::text(&value.to_string()),
        );
        let inside = value >= lo && value <= hi;
        prop_assert_eq!(verdict.map(|v| v.passed()), Some(inside));
    }
}
