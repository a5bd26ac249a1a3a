use std::cmp::Ordering;

use crate::value::Value;

/// Compare two input items or bound values, optionally folding case on
/// characters and strings.
pub fn values_equal(a: &Value, b: &Value, fold_case: bool) -> bool {
    if !fold_case {
        return a == b;
    }
    match (a, b) {
        (Value::Char(x), Value::Char(y)) => fold(*x) == fold(*y),
        (Value::Str(x), Value::Str(y)) => x.chars().map(fold).eq(y.chars().map(fold)),
        (Value::List(xs), Value::List(ys)) | (Value::Tuple(xs), Value::Tuple(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y, true))
        }
        (
            Value::Named { name: na, value: va },
            Value::Named { name: nb, value: vb },
        ) => na == nb && values_equal(va, vb, true),
        _ => a == b,
    }
}

/// Whether `c` lies in `lo..=hi`, optionally folding case.
pub fn char_in_range(c: char, lo: char, hi: char, fold_case: bool) -> bool {
    if (lo..=hi).contains(&c) {
        return true;
    }
    fold_case && {
        let lower = fold(c);
        let upper = c.to_uppercase().next().unwrap_or(c);
        (lo..=hi).contains(&lower) || (lo..=hi).contains(&upper)
    }
}

/// Orders the values two equally deep best-try records had matched.
///
/// Ranking by matched value is not defined yet, so every pair compares
/// equal and the earlier record is kept.
pub fn best_try_order(_a: &Value, _b: &Value) -> Ordering {
    Ordering::Equal
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folded_comparison() {
        assert!(values_equal(&Value::str("ABC"), &Value::str("abc"), true));
        assert!(!values_equal(&Value::str("ABC"), &Value::str("abc"), false));
        assert!(!values_equal(&Value::str("ABC"), &Value::str("abd"), true));
        assert!(values_equal(&Value::Char('Q'), &Value::Char('q'), true));
    }

    #[test]
    fn ranges_fold_case_on_request() {
        assert!(char_in_range('m', 'a', 'z', false));
        assert!(!char_in_range('M', 'a', 'z', false));
        assert!(char_in_range('M', 'a', 'z', true));
    }
}
