use spard::{Direction, Registry, Value};

fn right(name: &str, args: &[Value]) -> Value {
    Registry::with_builtins().call("main", name, Direction::Right, args).unwrap()
}

fn left(name: &str, args: &[Value]) -> Value {
    Registry::with_builtins().call("main", name, Direction::Left, args).unwrap()
}

#[test]
fn test_builtin_upper_lower() {
    assert_eq!(right("upper", &[Value::str("abc")]), Value::str("ABC"));
    assert_eq!(right("lower", &[Value::str("ABC")]), Value::str("abc"));
    assert_eq!(left("lower", &[Value::str("abc")]), Value::str("ABC"));
}

#[test]
fn test_builtin_reverse() {
    assert_eq!(right("reverse", &[Value::str("abc")]), Value::str("cba"));
    let list = Value::List(vec![Value::Int(1), Value::Int(2)]);
    assert_eq!(left("reverse", &[list]), Value::List(vec![Value::Int(2), Value::Int(1)]));
}

#[test]
fn test_builtin_length() {
    assert_eq!(right("length", &[Value::str("héllo")]), Value::Int(5));
    assert_eq!(right("length", &[Value::List(vec![])]), Value::Int(0));
    assert!(Registry::with_builtins()
        .call("main", "length", Direction::Left, &[Value::Int(3)])
        .is_err());
}

#[test]
fn test_builtin_join_split() {
    let list = Value::List(vec![Value::str("a"), Value::str("b")]);
    assert_eq!(right("join", &[list.clone(), Value::str(",")]), Value::str("a,b"));
    assert_eq!(left("join", &[Value::str("a,b"), Value::str(",")]), list);
}

#[test]
fn test_builtin_int() {
    assert_eq!(right("int", &[Value::str(" 42 ")]), Value::Int(42));
    assert_eq!(left("int", &[Value::Int(7)]), Value::str("7"));
    assert!(Registry::with_builtins()
        .call("main", "int", Direction::Right, &[Value::str("4x")])
        .is_err());
}

// reverse is its own inverse
#[test]
fn reverse_round_trip_smoke() {
    let once = right("reverse", &[Value::str("spard")]);
    assert_eq!(left("reverse", &[once]), Value::str("spard"));
}
