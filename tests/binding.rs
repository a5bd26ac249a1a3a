use pretty_assertions::assert_eq;
use spard::build::*;
use spard::{Error, Grammar, Param, RuleDef, Source, TransformRule, Transformer, Value};

fn matches(t: &Transformer, pattern: &spard::Expr, text: &str) -> bool {
    !t.alternatives(pattern, &mut Source::from_text(text))
        .unwrap()
        .is_empty()
}

#[test]
fn test_repeated_variable_must_agree() {
    let t = Transformer::new(Grammar::new());
    let word = || plus(range('a', 'z'));
    let pattern = seq([bind("w", word()), lit("="), bind("w", word()), end()]);
    assert!(matches(&t, &pattern, "ab=ab"));
    assert!(!matches(&t, &pattern, "ab=ac"));
    assert!(!matches(&t, &pattern, "ab=abc"));
}

#[test]
fn test_bound_variable_matches_its_spelling() {
    let t = Transformer::new(Grammar::new()).rule(TransformRule::new(
        seq([bind("q", or([lit("'"), lit("\"")])), bind("s", lazy(star(any()))), var("q")]),
        seq([lit("«"), var("s"), lit("»")]),
    ));
    assert_eq!(t.transform(r#"'a"b' "c""#).unwrap(), r#"«a"b» «c»"#);
}

#[test]
fn test_rules_with_formula_parameters() {
    // <sum ("+", $a, $b)> := $a:digit "+" $b:digit
    let grammar = Grammar::new()
        .rule(RuleDef::new("digit", [], range('0', '9')))
        .rule(RuleDef::new(
            "sum",
            [tuple([lit("+"), var("a"), var("b")])],
            seq([bind("a", call("digit", [])), lit("+"), bind("b", call("digit", []))]),
        ));
    let found = Transformer::new(grammar)
        .alternatives(&call("sum", [var("t")]), &mut Source::from_text("3+4"))
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(
        found[0].context.get("t"),
        Some(&Value::Tuple(vec![Value::str("+"), Value::str("3"), Value::str("4")]))
    );
}

#[test]
fn test_typed_call_variable() {
    let grammar = Grammar::new()
        .rule(RuleDef::new("digit", [], plus(range('0', '9'))))
        .rule(RuleDef::new("word", [], plus(range('a', 'z'))))
        .with_type("token", &["digit", "word"]);
    let t = Transformer::new(grammar).rule(TransformRule::new(
        typed("r", "token", bind("v", call_var("r", []))),
        seq([var("r"), lit("("), var("v"), lit(")")])
    ));
    assert_eq!(t.transform("ab 12").unwrap(), "word(ab) digit(12)");
}

#[test]
fn test_call_errors() {
    let grammar = Grammar::new().rule(RuleDef::new("one", [var("x")], var("x")));
    let t = Transformer::new(grammar)
        .rule(TransformRule::new(call("one", []), empty()));
    match t.transform("a") {
        Err(Error::Transform { source, .. }) => match *source {
            Error::Arity { expected, found, .. } => {
                assert_eq!(expected, vec![1]);
                assert_eq!(found, 0);
            }
            other => panic!("expected an arity error, got {other}"),
        },
        other => panic!("expected an arity error, got {other:?}"),
    }

    let t = Transformer::new(Grammar::new()).rule(TransformRule::new(call("nope", []), empty()));
    let err = t.transform("a").unwrap_err();
    assert!(err.to_string().contains("unknown rule `main::nope`"), "{err}");

    let t = Transformer::new(Grammar::new()).rule(TransformRule::new(call_var("r", []), empty()));
    assert!(matches!(
        t.transform("a"),
        Err(Error::Transform { source, .. }) if matches!(*source, Error::UntypedCall(_))
    ));
}

#[test]
fn test_capture_match_binds_rule_spans() {
    let grammar = Grammar::new().rule(RuleDef::new("num", [], plus(range('0', '9'))));
    let t = Transformer::new(grammar).rule(
        TransformRule::new(call("num", []), seq([lit("#"), var("num")])).with_param(Param::CaptureMatch),
    );
    assert_eq!(t.transform("a12b3").unwrap(), "a#12b#3");
}

#[test]
fn test_case_insensitive_and_whitespace_params() {
    let t = Transformer::new(Grammar::new());
    let kw = param(Param::CaseInsensitive, lit("select"));
    assert!(matches(&t, &kw, "SeLeCt"));
    assert!(!matches(&t, &lit("select"), "SELECT"));

    let spaced = param(Param::IgnoreWhitespace, seq([lit("a"), lit("b")]));
    assert!(matches(&t, &spaced, "a   b"));
    assert!(!matches(&t, &seq([lit("a"), lit("b")]), "a b"));
}
