//! # Built-in Routines
//!
//! Generators that ship with the engine. Each reads its argument from the
//! first input value.

use serde_json::{json, Value};

use crate::schema::{json_type_name, Row};

use super::errors::{RoutineError, RoutineResult};
use super::routine::{EvalRoutine, Routine, RowStream, TerminalRoutine};

/// A built-in routine and the return type it is usually declared with
#[derive(Debug, Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub default_return_type: &'static str,
    pub description: &'static str,
    pub build: fn() -> Routine,
}

/// All built-in routines, by name
pub static BUILTINS: [Builtin; 4] = [
    Builtin {
        name: "explode",
        default_return_type: "col: string",
        description: "One row per element of an array argument",
        build: explode,
    },
    Builtin {
        name: "posexplode",
        default_return_type: "pos: int, col: string",
        description: "One (position, element) row per element of an array argument",
        build: posexplode,
    },
    Builtin {
        name: "inline",
        default_return_type: "a: string, b: string",
        description: "One row per inner array (or object) of an array argument",
        build: inline,
    },
    Builtin {
        name: "row_count",
        default_return_type: "count: bigint",
        description: "No per-row output; one trailing row with the input row count",
        build: row_count,
    },
];

/// Looks up a built-in routine by name
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}

fn array_argument(function: &str, mut input: Row) -> RoutineResult<Vec<Value>> {
    if input.is_empty() {
        return Err(RoutineError::new(format!("{} expects one argument", function)));
    }
    match input.swap_remove(0) {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => Err(RoutineError::new(format!(
            "{} expects an array argument, got {}",
            function,
            json_type_name(&other)
        ))),
    }
}

fn failed(err: RoutineError) -> RowStream<'static> {
    Box::new(std::iter::once(Err(err)))
}

struct Explode;

impl EvalRoutine for Explode {
    fn eval(&mut self, input: Row) -> RowStream<'_> {
        match array_argument("explode", input) {
            Ok(items) => Box::new(items.into_iter().map(|v| Ok(vec![v]))),
            Err(err) => failed(err),
        }
    }
}

/// `explode(array)`: one row per element
pub fn explode() -> Routine {
    Routine::eval_only(Explode)
}

struct PosExplode;

impl EvalRoutine for PosExplode {
    fn eval(&mut self, input: Row) -> RowStream<'_> {
        match array_argument("posexplode", input) {
            Ok(items) => Box::new(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(pos, v)| Ok(vec![json!(pos), v])),
            ),
            Err(err) => failed(err),
        }
    }
}

/// `posexplode(array)`: one `(pos, element)` row per element
pub fn posexplode() -> Routine {
    Routine::eval_only(PosExplode)
}

struct Inline;

impl EvalRoutine for Inline {
    fn eval(&mut self, input: Row) -> RowStream<'_> {
        match array_argument("inline", input) {
            Ok(items) => Box::new(items.into_iter().map(|item| match item {
                Value::Array(values) => Ok(values),
                Value::Object(map) => Ok(map.into_iter().map(|(_, v)| v).collect()),
                other => Err(RoutineError::new(format!(
                    "inline expects arrays or objects, got {}",
                    json_type_name(&other)
                ))),
            })),
            Err(err) => failed(err),
        }
    }
}

/// `inline(array<array>)`: each inner array becomes a row as-is
pub fn inline() -> Routine {
    Routine::eval_only(Inline)
}

#[derive(Default)]
struct RowCount {
    seen: u64,
}

impl EvalRoutine for RowCount {
    fn eval(&mut self, _input: Row) -> RowStream<'_> {
        self.seen += 1;
        Box::new(std::iter::empty())
    }
}

impl TerminalRoutine for RowCount {
    fn terminate(&mut self) -> RowStream<'_> {
        Box::new(std::iter::once(Ok(vec![json!(self.seen)])))
    }
}

/// `row_count()`: emits the number of input rows at end of input
pub fn row_count() -> Routine {
    Routine::with_terminate(RowCount::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(stream: RowStream<'_>) -> Vec<RoutineResult<Row>> {
        stream.collect()
    }

    #[test]
    fn test_explode() {
        let mut r = explode();
        let rows = collect(r.eval(vec![json!([1, 2, 3])]));
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], Ok(vec![json!(3)]));
    }

    #[test]
    fn test_explode_null_is_empty() {
        let mut r = explode();
        assert!(collect(r.eval(vec![Value::Null])).is_empty());
    }

    #[test]
    fn test_explode_rejects_scalar() {
        let mut r = explode();
        let rows = collect(r.eval(vec![json!(5)]));
        assert_eq!(rows.len(), 1);
        assert!(rows[0].as_ref().unwrap_err().message().contains("array argument"));
    }

    #[test]
    fn test_posexplode() {
        let mut r = posexplode();
        let rows = collect(r.eval(vec![json!(["a", "b"])]));
        assert_eq!(rows[1], Ok(vec![json!(1), json!("b")]));
    }

    #[test]
    fn test_inline_objects_keep_values() {
        let mut r = inline();
        let rows = collect(r.eval(vec![json!([[1, "x"], {"a": 2, "b": "y"}])]));
        assert_eq!(rows[0], Ok(vec![json!(1), json!("x")]));
        assert_eq!(rows[1], Ok(vec![json!(2), json!("y")]));
    }

    #[test]
    fn test_row_count_terminal_output() {
        let mut r = row_count();
        assert_eq!(r.eval(vec![json!(1)]).count(), 0);
        assert_eq!(r.eval(vec![json!(2)]).count(), 0);
        let tail = collect(r.terminate().unwrap());
        assert_eq!(tail, vec![Ok(vec![json!(2)])]);
    }

    #[test]
    fn test_lookup() {
        assert!(lookup("explode").is_some());
        assert!(lookup("stack").is_none());
        assert!((lookup("row_count").unwrap().build)().has_terminate());
    }
}
