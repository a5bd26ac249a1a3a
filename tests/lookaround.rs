use pretty_assertions::assert_eq;
use spard::build::*;
use spard::{Expr, Grammar, Source, TransformRule, Transformer, Value};

fn ends(pattern: &Expr, text: &str) -> Vec<usize> {
    ends_in(pattern, Source::from_text(text))
}

fn ends_in(pattern: &Expr, mut source: Source) -> Vec<usize> {
    let t = Transformer::new(Grammar::new());
    let found = t.alternatives(pattern, &mut source).unwrap();
    found.iter().map(|o| o.end).collect()
}

#[test]
fn test_negation_grows_until_the_operand_matches() {
    assert_eq!(ends(&not(lit("c")), "abc"), vec![0, 1, 2]);
    assert_eq!(ends(&not(lit("a")), "abc"), Vec::<usize>::new());
}

#[test]
fn test_negation_is_bounded_by_the_input() {
    assert_eq!(ends(&not(lit("z")), "ab"), vec![0, 1, 2]);
}

#[test]
fn test_negation_followed_by_more_pattern() {
    assert_eq!(ends(&seq([not(lit("c")), lit("c")]), "abc"), vec![3]);
    assert_eq!(ends(&seq([not(lit("c")), any(), any()]), "abc"), vec![2, 3]);
}

#[test]
fn test_conjunction_requires_a_common_end() {
    let word = bind("w", plus(range('a', 'z')));
    assert_eq!(ends(&and([word, not(lit("x"))]), "abx"), vec![2, 1]);
    assert_eq!(ends(&and([lit("ab"), not(lit("z"))]), "abz"), vec![2]);
    assert_eq!(ends(&and([lit("ab"), lit("a")]), "ab"), Vec::<usize>::new());
}

#[test]
fn test_exclusion_in_a_transform() {
    // identifiers that are not the keyword "if"
    let ident = and([bind("w", plus(range('a', 'z'))), not(seq([lit("if"), end()]))]);
    let t = Transformer::new(Grammar::new())
        .rule(TransformRule::new(seq([lit("if"), not(range('a', 'z'))]), lit("IF")))
        .rule(TransformRule::new(ident, seq([lit("["), var("w"), lit("]")])));
    assert_eq!(t.transform("if iffy").unwrap(), "IF [iffy]");
}

#[test]
fn test_conjunction_length_stays_outside_nested_input() {
    let abc = Value::Tuple("abc".chars().map(Value::Char).collect());
    let inner = tuple([not(lit("z")), any()]);
    assert_eq!(ends_in(&inner, Source::from_items(vec![abc.clone()])), vec![1]);
    assert_eq!(ends_in(&and([any(), inner]), Source::from_items(vec![abc])), vec![1]);
}

#[test]
fn test_conjunction_length_does_not_bound_a_negated_operand() {
    // the operand matches "abc" through an unbounded inner negation
    let neg = not(seq([not(lit("q")), lit("c")]));
    assert_eq!(ends(&neg, "abc"), Vec::<usize>::new());
    assert_eq!(ends(&and([any(), neg]), "abc"), Vec::<usize>::new());
}
