use pretty_assertions::assert_eq;
use spard::build::*;
use spard::{
    CancelToken, Config, Direction, Error, Expr, Function, Grammar, Param, Program, RuleDef, TransformRule, Transformer,
    Unmatched, Value,
};

const PROGRAM: &str = r#"{
    "grammar": {
        "modules": {
            "main": {
                "rules": [
                    {
                        "name": "word",
                        "body": { "repeat": { "operand": { "range": ["a", "z"] }, "count": "plus" } }
                    }
                ]
            }
        }
    },
    "rules": [
        {
            "pattern": { "bind": { "name": "w", "pattern": { "call": { "target": { "rule": "word" } } } } },
            "result": { "function": { "name": "upper", "args": [{ "var": "w" }] } }
        }
    ],
    "config": { "unmatched": "skip" }
}"#;

#[test]
fn test_program_from_json() {
    let program = Program::from_json(PROGRAM).unwrap();
    assert_eq!(program.config.unmatched, Unmatched::Skip);
    assert_eq!(spard::transform(PROGRAM, "hi, you").unwrap(), "HIYOU");
}

#[test]
fn test_invalid_program_is_a_load_error() {
    let err = Program::from_json(r#"{ "rules": [{ "pattern": 3 }] }"#).unwrap_err();
    assert!(matches!(err, Error::Load(_)), "{err}");
}

#[test]
fn test_left_direction_inverts_functions() {
    let rule = |p: Expr| TransformRule::new(bind("w", plus(range('A', 'Z'))), p);
    let right = Transformer::new(Grammar::new()).rule(rule(func("upper", [var("w")])));
    assert_eq!(right.transform("AB cd").unwrap(), "AB cd");

    let left = Transformer::new(Grammar::new())
        .rule(rule(func("upper", [var("w")])))
        .with_config(Config::default().with_param(Param::LeftDirection));
    assert_eq!(left.transform("AB cd").unwrap(), "ab cd");
}

struct Wrap;

impl Function for Wrap {
    fn name(&self) -> &'static str {
        "wrap"
    }
    fn arity(&self) -> std::ops::RangeInclusive<usize> {
        1..=1
    }
    fn supports(&self, direction: Direction) -> bool {
        direction == Direction::Right
    }
    fn call(&self, _direction: Direction, args: &[Value]) -> spard::Result<Value> {
        Ok(Value::str(format!("<{}>", args[0])))
    }
}

#[test]
fn test_registered_functions() {
    let mut grammar = Grammar::new();
    grammar.register_function("main", Wrap);
    let t = Transformer::new(grammar).rule(TransformRule::new(
        bind("d", plus(range('0', '9'))),
        func("wrap", [var("d")]),
    ));
    assert_eq!(t.transform("a1b22").unwrap(), "a<1>b<22>");

    let t = Transformer::new(Grammar::new()).rule(TransformRule::new(any(), func("wrap", [lit("x")])));
    match t.transform("a") {
        Err(Error::Transform { source, .. }) => {
            assert!(matches!(*source, Error::UnknownFunction { .. }), "{source}")
        }
        other => panic!("expected an unknown function, got {other:?}"),
    }
}

#[test]
fn test_cancelled_before_start() {
    let token = CancelToken::new();
    token.cancel();
    let t = Transformer::new(Grammar::new())
        .with_cancel(token)
        .rule(TransformRule::new(lit("a"), lit("b")));
    assert!(matches!(t.transform("aaa"), Err(Error::Cancelled)));
}

#[test]
fn test_cancel_token_is_shared() {
    let t = Transformer::new(Grammar::new()).rule(TransformRule::new(lit("a"), lit("b")));
    assert_eq!(t.transform("aa").unwrap(), "bb");
    t.cancel_token().cancel();
    assert!(t.transform("aa").unwrap_err().is_cancelled());
}

#[test]
fn test_unmatched_error_reports_position() {
    let t = Transformer::new(Grammar::new())
        .rule(TransformRule::new(lit("ab"), lit("x")))
        .with_config(Config::default().with_unmatched(Unmatched::Error));
    match t.transform("abac") {
        Err(Error::Unmatched { pos, best }) => {
            assert_eq!(pos, 2);
            assert_eq!(best.pos, 3, "furthest failure is inside the literal");
        }
        other => panic!("expected unmatched input, got {other:?}"),
    }
}

#[test]
fn test_deep_recursion_is_bounded() {
    // right recursion one level per character
    let grammar = Grammar::new()
        .rule(RuleDef::new("chain", [], seq([lit("a"), call("chain", [])])))
        .rule(RuleDef::new("chain", [], empty()));
    let t = Transformer::new(grammar).rule(TransformRule::new(call("chain", []), lit("!")));
    assert_eq!(t.transform(&"a".repeat(200)).unwrap(), "!");

    let shallow = t.clone().with_config(Config::default().with_max_depth(100));
    let err = shallow.transform(&"a".repeat(200)).unwrap_err();
    assert!(err.to_string().contains("call stack depth"), "{err}");
}

#[test]
fn test_first_matching_rule_wins() {
    let t = Transformer::new(Grammar::new())
        .rule(TransformRule::new(lit("ab"), lit("1")))
        .rule(TransformRule::new(lit("a"), lit("2")))
        .rule(TransformRule::new(any(), lit(".")));
    assert_eq!(t.transform("abac").unwrap(), "122.");
}

#[test]
fn test_render_round_trip() {
    // rendering a pattern with its own bindings reproduces the matched text
    let pattern = seq([
        bind("k", plus(range('a', 'z'))),
        lit("="),
        bind("v", plus(range('0', '9'))),
    ]);
    let t = Transformer::new(Grammar::new()).rule(TransformRule::new(pattern.clone(), pattern));
    assert_eq!(t.transform("ab=12; c=3").unwrap(), "ab=12; c=3");
}
