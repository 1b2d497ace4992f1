use crate::runtime::{constructor::Constructor, error::RuntimeResult, record::Record};
use std::fmt;
use std::rc::Rc;

#[derive(Clone, Debug)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Record(Record),
    Function(Function),
    Constructor(Rc<Constructor>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Record(_) => "record",
            Value::Function(_) => "function",
            Value::Constructor(_) => "constructor",
        }
    }

    /// Rendering used for a value nested inside a record dump: strings are
    /// quoted and records collapse to their label.
    pub fn inspect(&self) -> String {
        match self {
            Value::String(text) => quote(text),
            Value::Record(record) => record.collapsed(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Number(v) => write!(f, "{}", format_number(*v)),
            Value::String(v) => write!(f, "{v}"),
            Value::Record(record) => write!(f, "{record}"),
            Value::Function(function) => write!(f, "{function}"),
            Value::Constructor(constructor) => write!(f, "[Function: {}]", constructor.name()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Record(value)
    }
}

impl From<Function> for Value {
    fn from(value: Function) -> Self {
        Value::Function(value)
    }
}

/// Numbers print the way JavaScript's `String(n)` prints them.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        let sign = if value < 0.0 { "-" } else { "" };
        return format!("{sign}Infinity");
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return value.to_string();
    }
    let text = format!("{value:e}");
    match text.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => text,
    }
}

/// Quotes a string for a record dump. Single quotes are preferred; a string
/// containing them falls back to double quotes, then backticks.
pub fn quote(text: &str) -> String {
    let delimiter = if !text.contains('\'') {
        '\''
    } else if !text.contains('"') {
        '"'
    } else if !text.contains('`') && !text.contains("${") {
        '`'
    } else {
        '\''
    };

    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push(delimiter);
    for ch in text.chars() {
        match ch {
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            '\u{8}' => quoted.push_str("\\b"),
            '\u{c}' => quoted.push_str("\\f"),
            ch if ch == delimiter => {
                quoted.push('\\');
                quoted.push(ch);
            }
            ch if ch.is_ascii_control() => quoted.push_str(&format!("\\x{:02X}", ch as u32)),
            ch => quoted.push(ch),
        }
    }
    quoted.push(delimiter);
    quoted
}

/// Anything that can run as a method body. The receiver is always the record
/// the lookup started from, never the delegate the function was found on.
pub trait Callable {
    fn call(&self, this: &Record, args: &[Value]) -> RuntimeResult<Value>;
}

impl<F> Callable for F
where
    F: Fn(&Record, &[Value]) -> RuntimeResult<Value>,
{
    fn call(&self, this: &Record, args: &[Value]) -> RuntimeResult<Value> {
        self(this, args)
    }
}

#[derive(Clone)]
pub struct Function {
    name: Option<String>,
    body: Rc<dyn Callable>,
}

impl Function {
    pub fn new(name: Option<String>, body: Rc<dyn Callable>) -> Self {
        Self { name, body }
    }

    pub fn native<F>(name: Option<&str>, body: F) -> Self
    where
        F: Fn(&Record, &[Value]) -> RuntimeResult<Value> + 'static,
    {
        Self {
            name: name.map(str::to_string),
            body: Rc::new(body),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn call(&self, this: &Record, args: &[Value]) -> RuntimeResult<Value> {
        self.body.call(this, args)
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.body, &other.body)
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "[Function: {name}]"),
            None => write!(f, "[Function (anonymous)]"),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_numbers_print_without_fraction() {
        assert_eq!(format_number(23.0), "23");
        assert_eq!(format_number(-4.0), "-4");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn large_and_tiny_numbers_switch_to_exponent_form() {
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(-2.5e22), "-2.5e+22");
        assert_eq!(format_number(1e20), "100000000000000000000");
        assert_eq!(format_number(0.000001), "0.000001");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
    }

    #[test]
    fn strings_are_raw_at_top_level_and_quoted_when_inspected() {
        let value = Value::from("Yoshi");
        assert_eq!(value.to_string(), "Yoshi");
        assert_eq!(value.inspect(), "'Yoshi'");
        assert_eq!(Value::from("it's").inspect(), "\"it's\"");
        assert_eq!(Value::from("it's \"quoted\"").inspect(), "`it's \"quoted\"`");
        assert_eq!(Value::from("'`\"").inspect(), "'\\'`\"'");
        assert_eq!(Value::from("a\nb\\c").inspect(), "'a\\nb\\\\c'");
    }

    #[test]
    fn functions_render_with_their_name() {
        let named = Function::native(Some("log"), |_, _| Ok(Value::Undefined));
        let anonymous = Function::native(None, |_, _| Ok(Value::Undefined));
        assert_eq!(named.name(), Some("log"));
        assert_eq!(named.to_string(), "[Function: log]");
        assert_eq!(Value::from(anonymous).inspect(), "[Function (anonymous)]");
    }

    #[test]
    fn cloned_functions_share_their_body() {
        let function = Function::native(None, |_, _| Ok(Value::Null));
        let other = Function::native(None, |_, _| Ok(Value::Null));
        assert!(function.ptr_eq(&function.clone()));
        assert!(!function.ptr_eq(&other));
    }
}
