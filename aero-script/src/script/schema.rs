//! Declarative argument schemas and the validator that checks a native
//! call frame against them.
//!
//! A function declares its parameters as a list of [`FunctionParameterType`]s.
//! Validation walks that list left to right:
//!
//! - a fixed parameter consumes exactly one argument and fails when none is
//!   left;
//! - a variadic parameter consumes arguments while they match.  When it is
//!   the last declared parameter a mismatch is an error; otherwise it stops
//!   and leaves the rest for the parameters after it;
//! - arguments left over once every parameter is processed are an arity
//!   error.
//!
//! Table schemas check fields through [`Table::field_type`], so validating a
//! table of scalars registers nothing beyond the table itself.

use std::fmt;

use super::args::ScriptArguments;
use crate::lua::{Table, Value, ValueKind};

// ── Schema types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionParameterType {
    /// Exactly one argument.
    Fixed(Parameter),
    /// Zero or more arguments.
    Variadic(Parameter),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    Specific(ParameterType),
    OneOf(Vec<ParameterType>),
    Any,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterType {
    Kind(ValueKind),
    Schema(TableSchema),
}

/// Expected fields of a table argument, checked in declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableSchema {
    fields: Vec<(String, Parameter)>,
}

impl TableSchema {
    pub fn new<'a>(fields: impl IntoIterator<Item = (&'a str, Parameter)>) -> Self {
        TableSchema {
            fields: fields.into_iter().map(|(name, p)| (name.to_owned(), p)).collect(),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Parameter)> {
        self.fields.iter().map(|(name, p)| (name.as_str(), p))
    }
}

// ── Constructors ──────────────────────────────────────────────────────────────

impl ParameterType {
    pub const NUMBER: Self = ParameterType::Kind(ValueKind::Number);
    pub const STRING: Self = ParameterType::Kind(ValueKind::String);
    pub const BOOLEAN: Self = ParameterType::Kind(ValueKind::Boolean);
    pub const NIL: Self = ParameterType::Kind(ValueKind::Nil);
    pub const FUNCTION: Self = ParameterType::Kind(ValueKind::Function);
    pub const TABLE: Self = ParameterType::Kind(ValueKind::Table);
}

impl Parameter {
    pub const NUMBER: Self = Parameter::Specific(ParameterType::NUMBER);
    pub const STRING: Self = Parameter::Specific(ParameterType::STRING);
    pub const BOOLEAN: Self = Parameter::Specific(ParameterType::BOOLEAN);
    pub const NIL: Self = Parameter::Specific(ParameterType::NIL);
    pub const FUNCTION: Self = Parameter::Specific(ParameterType::FUNCTION);
    pub const TABLE: Self = Parameter::Specific(ParameterType::TABLE);
    pub const ANY: Self = Parameter::Any;

    pub fn one_of(types: impl Into<Vec<ParameterType>>) -> Self {
        Parameter::OneOf(types.into())
    }

    /// `nil` or `t`.
    pub fn optional(t: ParameterType) -> Self {
        Parameter::OneOf(vec![ParameterType::NIL, t])
    }

    pub fn schema<'a>(fields: impl IntoIterator<Item = (&'a str, Parameter)>) -> Self {
        Parameter::Specific(ParameterType::Schema(TableSchema::new(fields)))
    }
}

impl FunctionParameterType {
    pub const NUMBER: Self = FunctionParameterType::Fixed(Parameter::NUMBER);
    pub const STRING: Self = FunctionParameterType::Fixed(Parameter::STRING);
    pub const BOOLEAN: Self = FunctionParameterType::Fixed(Parameter::BOOLEAN);
    pub const NIL: Self = FunctionParameterType::Fixed(Parameter::NIL);
    pub const FUNCTION: Self = FunctionParameterType::Fixed(Parameter::FUNCTION);
    pub const TABLE: Self = FunctionParameterType::Fixed(Parameter::TABLE);

    pub fn variadic(p: Parameter) -> Self {
        FunctionParameterType::Variadic(p)
    }

    pub fn one_of(types: impl Into<Vec<ParameterType>>) -> Self {
        FunctionParameterType::Fixed(Parameter::one_of(types))
    }

    pub fn schema<'a>(fields: impl IntoIterator<Item = (&'a str, Parameter)>) -> Self {
        FunctionParameterType::Fixed(Parameter::schema(fields))
    }
}

// ── Descriptions ──────────────────────────────────────────────────────────────

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterType::Kind(kind) => write!(f, "{kind}"),
            ParameterType::Schema(schema) => write!(f, "{schema}"),
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Specific(t) => write!(f, "{t}"),
            Parameter::OneOf(types) => {
                for (i, t) in types.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", or ")?;
                    }
                    write!(f, "{t}")?;
                }
                Ok(())
            }
            Parameter::Any => f.write_str("any"),
        }
    }
}

impl fmt::Display for TableSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{ ")?;
        for (i, (name, p)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {p}")?;
        }
        f.write_str(" }")
    }
}

impl fmt::Display for FunctionParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionParameterType::Fixed(p) => write!(f, "{p}"),
            FunctionParameterType::Variadic(p) => write!(f, "variadic({p})"),
        }
    }
}

// ── Validator ─────────────────────────────────────────────────────────────────

type Check = std::result::Result<(), String>;

impl ScriptArguments {
    /// Check the whole frame against `expected`.  The error is a message fit
    /// for raising back into the script.
    pub fn check_arguments(&self, expected: &[FunctionParameterType]) -> Check {
        let count = self.count();
        let mut index = 1;

        for (declared, param) in expected.iter().enumerate() {
            let last = declared + 1 == expected.len();
            match param {
                FunctionParameterType::Fixed(p) => {
                    if index > count {
                        return Err(format!(
                            "expected {param} at argument {index}, but only {count} arguments were provided"
                        ));
                    }
                    self.check_argument(index, p)
                        .map_err(|e| format!("at argument {index}: {e}"))?;
                    index += 1;
                }
                FunctionParameterType::Variadic(p) => {
                    while index <= count {
                        match self.check_argument(index, p) {
                            Ok(()) => index += 1,
                            Err(e) if last => return Err(format!("at argument {index}: {e}")),
                            Err(_) => break,
                        }
                    }
                }
            }
        }

        if index <= count {
            return Err(format!(
                "expected no more arguments, but received extra arguments starting at argument {index}"
            ));
        }
        Ok(())
    }

    fn check_argument(&self, index: usize, expected: &Parameter) -> Check {
        match expected {
            Parameter::Specific(t) => self.check_argument_type(index, t),
            Parameter::OneOf(types) => {
                if types.iter().any(|t| self.check_argument_type(index, t).is_ok()) {
                    return Ok(());
                }
                Err(format!("expected {expected}, but got {}", self.observed(index)?))
            }
            Parameter::Any => Ok(()),
        }
    }

    fn check_argument_type(&self, index: usize, expected: &ParameterType) -> Check {
        match expected {
            ParameterType::Kind(kind) => {
                let actual = self.observed(index)?;
                if actual != *kind {
                    return Err(format!("expected {kind}, but got {actual}"));
                }
                Ok(())
            }
            ParameterType::Schema(schema) => {
                match self.at(index as i32).map_err(|e| e.to_string())? {
                    Value::Table(table) => check_table(&table, schema, ""),
                    other => Err(format!("expected a table, but got {}", other.describe())),
                }
            }
        }
    }

    fn observed(&self, index: usize) -> std::result::Result<ValueKind, String> {
        self.kind(index as i32).map_err(|e| e.to_string())
    }
}

/// `path` is the dotted path of `table` below the argument, empty at the
/// top level.  Only top-level failures repeat the full schema.
fn check_table(table: &Table, schema: &TableSchema, path: &str) -> Check {
    for (name, expected) in schema.fields() {
        let field = if path.is_empty() { name.to_owned() } else { format!("{path}.{name}") };
        if let Err(e) = check_field(table, name, &field, expected) {
            if path.is_empty() {
                return Err(format!("{e}. Required schema for the table: {schema}"));
            }
            return Err(e);
        }
    }
    Ok(())
}

fn check_field(table: &Table, name: &str, field: &str, expected: &Parameter) -> Check {
    match expected {
        Parameter::Specific(t) => check_field_type(table, name, field, t),
        Parameter::OneOf(types) => {
            if types.iter().any(|t| check_field_type(table, name, field, t).is_ok()) {
                return Ok(());
            }
            let actual = table.field_type(name).map_err(|e| e.to_string())?;
            Err(format!("expected {expected} for field '{field}', but got {actual}"))
        }
        Parameter::Any => Ok(()),
    }
}

fn check_field_type(table: &Table, name: &str, field: &str, expected: &ParameterType) -> Check {
    match expected {
        ParameterType::Kind(kind) => {
            let actual = table.field_type(name).map_err(|e| e.to_string())?;
            if actual != *kind {
                return Err(format!("expected {kind} for field '{field}', but got {actual}"));
            }
            Ok(())
        }
        ParameterType::Schema(schema) => match table.get_field(name).map_err(|e| e.to_string())? {
            Value::Table(inner) => check_table(&inner, schema, field),
            other => Err(format!("expected a table for field '{field}', but got {}", other.describe())),
        },
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lua::Context;
    use mlua::MultiValue;

    use FunctionParameterType as F;
    use ParameterType as T;

    fn check(ctx: &Context, expected: &[F], values: &[Value]) -> Check {
        let raw = values.iter().map(|v| ctx.to_raw(v).unwrap()).collect();
        ScriptArguments::new(ctx.clone(), MultiValue::from_vec(raw)).check_arguments(expected)
    }

    fn table(ctx: &Context, code: &str) -> Value {
        ctx.load_source(&format!("return {code}")).unwrap().call(&[]).unwrap().first().cloned().unwrap()
    }

    fn command_signature() -> Vec<F> {
        vec![F::STRING, F::variadic(Parameter::one_of([T::STRING, T::FUNCTION]))]
    }

    #[test]
    fn trailing_variadic_may_be_empty() {
        let ctx = Context::new();
        assert_eq!(check(&ctx, &command_signature(), &[Value::from("main")]), Ok(()));
    }

    #[test]
    fn missing_fixed_argument_names_position_and_type() {
        let ctx = Context::new();
        let err = check(&ctx, &command_signature(), &[]).unwrap_err();
        assert_eq!(err, "expected string at argument 1, but only 0 arguments were provided");
    }

    #[test]
    fn trailing_variadic_rejects_mismatch() {
        let ctx = Context::new();
        let err = check(
            &ctx,
            &command_signature(),
            &[Value::from("main"), Value::from("focus left"), Value::Number(3.0)],
        )
        .unwrap_err();
        assert_eq!(err, "at argument 3: expected string, or function, but got number");
    }

    #[test]
    fn inner_variadic_stops_at_mismatch() {
        let ctx = Context::new();
        let expected = vec![F::variadic(Parameter::STRING), F::NUMBER];
        assert_eq!(check(&ctx, &expected, &[Value::from("a"), Value::from("b"), Value::Number(1.0)]), Ok(()));
        assert_eq!(check(&ctx, &expected, &[Value::Number(1.0)]), Ok(()));
    }

    #[test]
    fn fixed_after_exhausted_variadic_is_still_required() {
        let ctx = Context::new();
        let expected = vec![F::variadic(Parameter::STRING), F::NUMBER];
        let err = check(&ctx, &expected, &[Value::from("a")]).unwrap_err();
        assert_eq!(err, "expected number at argument 2, but only 1 arguments were provided");
    }

    #[test]
    fn extra_arguments_report_first_extra_position() {
        let ctx = Context::new();
        let err = check(&ctx, &[F::BOOLEAN], &[Value::Boolean(true), Value::Nil, Value::Nil]).unwrap_err();
        assert_eq!(err, "expected no more arguments, but received extra arguments starting at argument 2");
    }

    #[test]
    fn no_parameters_accepts_no_arguments() {
        let ctx = Context::new();
        assert_eq!(check(&ctx, &[], &[]), Ok(()));
        assert!(check(&ctx, &[], &[Value::Nil]).is_err());
    }

    #[test]
    fn any_accepts_every_kind() {
        let ctx = Context::new();
        let expected = [F::Fixed(Parameter::ANY)];
        for v in [Value::Nil, Value::Number(0.0), Value::from("s"), table(&ctx, "{}")] {
            assert_eq!(check(&ctx, &expected, &[v]), Ok(()));
        }
    }

    fn matcher_schema() -> Vec<F> {
        vec![F::schema([
            ("appId", Parameter::optional(T::STRING)),
            ("workspace", Parameter::optional(T::STRING)),
        ])]
    }

    #[test]
    fn table_schema_accepts_optional_fields() {
        let ctx = Context::new();
        assert_eq!(check(&ctx, &matcher_schema(), &[table(&ctx, "{ appId = 'x' }")]), Ok(()));
        assert_eq!(check(&ctx, &matcher_schema(), &[table(&ctx, "{}")]), Ok(()));
    }

    #[test]
    fn table_schema_names_the_field() {
        let ctx = Context::new();
        let err = check(&ctx, &matcher_schema(), &[table(&ctx, "{ appId = 5 }")]).unwrap_err();
        assert_eq!(
            err,
            "at argument 1: expected nil, or string for field 'appId', but got number. \
             Required schema for the table: { appId: nil, or string, workspace: nil, or string }"
        );
    }

    #[test]
    fn schema_requires_a_table() {
        let ctx = Context::new();
        let err = check(&ctx, &matcher_schema(), &[Value::from("x")]).unwrap_err();
        assert_eq!(err, "at argument 1: expected a table, but got string");
    }

    #[test]
    fn nested_failures_use_a_dotted_path_without_schema() {
        let ctx = Context::new();
        let expected = [F::schema([(
            "size",
            Parameter::schema([("width", Parameter::NUMBER), ("height", Parameter::NUMBER)]),
        )])];
        assert_eq!(check(&ctx, &expected, &[table(&ctx, "{ size = { width = 1, height = 2 } }")]), Ok(()));

        let err = check(&ctx, &expected, &[table(&ctx, "{ size = { width = 1 } }")]).unwrap_err();
        assert_eq!(
            err,
            "at argument 1: expected number for field 'size.height', but got nil. \
             Required schema for the table: { size: { width: number, height: number } }"
        );

        let err = check(&ctx, &expected, &[table(&ctx, "{ size = 3 }")]).unwrap_err();
        assert!(err.starts_with("at argument 1: expected a table for field 'size', but got number"));
    }

    #[test]
    fn validation_leaves_the_stack_alone() {
        let ctx = Context::new();
        let t = table(&ctx, "{ appId = 5 }");
        let _ = check(&ctx, &matcher_schema(), &[t]);
        assert_eq!(ctx.stack_size(), 0);
    }

    #[test]
    fn descriptions() {
        assert_eq!(F::variadic(Parameter::one_of([T::STRING, T::FUNCTION])).to_string(), "variadic(string, or function)");
        assert_eq!(Parameter::ANY.to_string(), "any");
        assert_eq!(Parameter::optional(T::NUMBER).to_string(), "nil, or number");
        assert_eq!(TableSchema::default().to_string(), "{  }");
    }
}
