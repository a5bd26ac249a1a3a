//! Property tests for the matching protocol: exhausting an enumeration puts
//! the cursor back where it started, every reported end lies inside the
//! input, and enumerations are repeatable.

use proptest::prelude::*;
use spard::build::*;
use spard::build::any;
use spard::{Config, Context, Expr, Grammar, Input, Matcher, Param, RuleDef, Runtime, Source};

fn grammar() -> Grammar {
    Grammar::new()
        .rule(RuleDef::new("E", [], seq([call("E", []), lit("b"), call("E", [])])).left_recursive())
        .rule(RuleDef::new("E", [], lit("a")).left_recursive())
        .rule(RuleDef::new("ab", [], or([lit("ab"), seq([lit("a"), call("ab", [])])])))
}

fn patterns() -> Vec<Expr> {
    vec![
        lit("ab"),
        star(lit("a")),
        lazy(plus(any())),
        seq([star(any()), lit("b")]),
        or([lit("a"), lit("ab"), empty()]),
        bind("x", plus(or([lit("a"), lit("b")]))),
        and([plus(any()), not(lit("b"))]),
        not(lit("b")),
        seq([bind("x", plus(lit("a"))), var("x")]),
        call("E", []),
        call("ab", []),
        param(Param::Collect, star(seq([bind("c", any()), opt(lit("b"))]))),
        repeat(opt(lit("a")), spard::Count::Star),
    ]
}

/// Enumerate every end of `pattern` from `start`, then report where the
/// cursor was left.
fn exhaust(grammar: &Grammar, pattern: &Expr, source: &mut Source, start: usize) -> (Vec<usize>, usize) {
    let mut runtime = Runtime::new(Config::default());
    source.set_position(start);
    let sid = runtime.fresh_session();
    let mut m = Matcher::new(source, &mut runtime, grammar);
    let mut ends = Vec::new();
    let mut next = false;
    while let Some(_ctx) = pattern.matches(&mut m, sid, &Context::default(), next).unwrap() {
        ends.push(m.position());
        next = true;
    }
    (ends, m.position())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn exhaustion_restores_the_cursor(text in "[ab]{0,8}", which in 0usize..13, offset in 0usize..9) {
        let grammar = grammar();
        let pattern = &patterns()[which];
        let mut source = Source::from_text(&text);
        let start = offset.min(text.len());

        let (ends, cursor) = exhaust(&grammar, pattern, &mut source, start);
        prop_assert_eq!(cursor, start);
        for end in &ends {
            prop_assert!(*end >= start && *end <= text.len(), "end {} outside {}..={}", end, start, text.len());
        }

        let (again, _) = exhaust(&grammar, pattern, &mut source, start);
        prop_assert_eq!(ends, again);
    }
}
