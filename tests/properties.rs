//! Universally-quantified properties of the renderer, driven by
//! `proptest` over random templates and values: binding safety, dialect
//! correctness, `inclause` round-trip, and identifier quoting.

use minijinja::context;
use proptest::prelude::*;

use sqlkit_core::{quote_identifier, ParamStyle};
use sqlkit_render::render_template;

fn bindable_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,24}"
}

proptest! {
    /// Property 1: binding safety. Whatever value a placeholder binds to
    /// never appears verbatim in the rendered SQL text; it only shows up
    /// inside the bound-params collection.
    #[test]
    fn binding_safety_for_random_text_values(value in bindable_text()) {
        let rendered = render_template(
            "prop1",
            "select * from t where name = {{ v }}",
            context! { v => value.clone() },
            ParamStyle::Qmark,
            '\'',
        )
        .unwrap();

        prop_assert_eq!(rendered.sql, "select * from t where name = ?");
        prop_assert_eq!(rendered.bound.len(), 1);
        let params = rendered.bound.finish(ParamStyle::Qmark);
        let values = params.as_positional().unwrap();
        match &values[0] {
            sqlkit_core::ParamValue::Text(s) => prop_assert_eq!(s.as_str(), value.as_str()),
            other => prop_assert!(false, "expected a bound text value, got {other:?}"),
        }
    }

    /// Same property, but for random i64 values rendered into a numeric
    /// dialect, where the value and the placeholder index could plausibly
    /// collide (e.g. value happens to equal the 1-based position).
    #[test]
    fn binding_safety_for_random_int_values(value in any::<i32>()) {
        let rendered = render_template(
            "prop1b",
            "select * from t where n = {{ v }}",
            context! { v => value as i64 },
            ParamStyle::Dollar,
            '\'',
        )
        .unwrap();

        prop_assert_eq!(rendered.sql, "select * from t where n = $1");
        let params = rendered.bound.finish(ParamStyle::Dollar);
        let values = params.as_positional().unwrap();
        prop_assert!(matches!(values[0], sqlkit_core::ParamValue::Int(n) if n == value as i64));
    }

    /// Property 3: `inclause` round-trip. A sequence of N values produces
    /// exactly N placeholders, comma-joined with no inner spaces, and the
    /// bound-params collection grows by exactly N entries in order.
    #[test]
    fn inclause_round_trip(values in prop::collection::vec(any::<i16>(), 0..12)) {
        let n = values.len();
        let rendered = render_template(
            "prop3",
            "select * from t where id in {{ ids | inclause }}",
            context! { ids => values.iter().map(|v| *v as i64).collect::<Vec<_>>() },
            ParamStyle::Qmark,
            '\'',
        )
        .unwrap();

        let expected_clause = format!("({})", vec!["?"; n].join(","));
        prop_assert_eq!(rendered.sql, format!("select * from t where id in {expected_clause}"));
        prop_assert_eq!(rendered.bound.len(), n);

        let params = rendered.bound.finish(ParamStyle::Qmark);
        let bound_values = params.as_positional().unwrap();
        prop_assert_eq!(bound_values.len(), n);
        for (bound, original) in bound_values.iter().zip(values.iter()) {
            prop_assert!(matches!(bound, sqlkit_core::ParamValue::Int(i) if *i == *original as i64));
        }
    }

    /// Property 4: identifier quoting. Any string containing the
    /// configured quote char gets that char doubled inside the quotes,
    /// yielding one quoted token with no unescaped quote surviving.
    #[test]
    fn identifier_quoting_doubles_embedded_quote_char(
        prefix in "[a-zA-Z0-9_]{0,8}",
        suffix in "[a-zA-Z0-9_]{0,8}",
    ) {
        let raw = format!("{prefix}'{suffix}");
        let safe = quote_identifier('\'', [raw.as_str()]);
        let expected = format!("'{prefix}''{suffix}'");
        prop_assert_eq!(safe.as_str(), expected.as_str());

        // exactly one opening and one closing quote bound the token; every
        // other quote occurrence inside is part of a doubled pair.
        let inner = &safe.as_str()[1..safe.as_str().len() - 1];
        prop_assert_eq!(inner.matches('\'').count() % 2, 0);
    }
}

/// Property 2: dialect correctness. Exercised as a table test rather than
/// a `proptest!` block since the six dialects are an exhaustive, small,
/// fixed set rather than something worth generating randomly.
#[test]
fn dialect_correctness_for_identity_template() {
    let cases: &[(ParamStyle, &str, bool)] = &[
        (ParamStyle::Qmark, "select ?, ?", true),
        (ParamStyle::Numeric, "select :1, :2", true),
        (ParamStyle::Format, "select %s, %s", true),
        (ParamStyle::Dollar, "select $1, $2", true),
        (ParamStyle::Named, "select :x, :y", false),
        (ParamStyle::PyFormat, "select %(x)s, %(y)s", false),
    ];

    for (dialect, expected_sql, positional) in cases {
        let rendered = render_template(
            "prop2",
            "select {{x}}, {{y}}",
            context! { x => 1, y => 2 },
            *dialect,
            '\'',
        )
        .unwrap();
        assert_eq!(&rendered.sql, expected_sql, "dialect {dialect:?}");

        let params = rendered.bound.finish(*dialect);
        assert_eq!(params.len(), 2);
        if *positional {
            assert!(params.as_positional().is_some(), "dialect {dialect:?} expected positional shape");
        } else {
            let map = params.as_named().unwrap();
            assert!(map.contains_key("x") && map.contains_key("y"), "dialect {dialect:?} expected named keys x,y");
        }
    }
}
