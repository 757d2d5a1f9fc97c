use jcsgen_ir::Language;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::CodegenError;

/// Placeholder recorded for results that raised instead of returning.
pub const EMPTY_RESULT: &str = "EMPTY";

/// Convert a name to PascalCase (e.g., "my_queue" -> "MyQueue", "ConcurrentHashMap" unchanged).
pub fn to_pascal_case(s: &str) -> String {
    s.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(c) => {
                    let mut result = c.to_uppercase().to_string();
                    result.extend(chars);
                    result
                }
                None => String::new(),
            }
        })
        .collect()
}

/// Last segment of a dotted or `::`-qualified class name.
pub fn short_class_name(class: &str) -> &str {
    class.rsplit(['.', ':']).next().unwrap_or(class)
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Render a JSON argument as a C or C++ expression.
///
/// Arrays become brace initializer lists; objects have no native literal.
pub fn render_argument(value: &Value, language: Language) -> Result<String, CodegenError> {
    match value {
        Value::Null => Ok(match language {
            Language::C => "NULL".into(),
            Language::Cpp => "nullptr".into(),
        }),
        Value::Bool(b) => Ok(match language {
            Language::C => String::from(if *b { "1" } else { "0" }),
            Language::Cpp => b.to_string(),
        }),
        Value::Number(n) => Ok(n.to_string()),
        // JSON string escapes are valid C string escapes for the printable range.
        Value::String(_) => Ok(value.to_string()),
        Value::Array(items) => {
            let rendered = items
                .iter()
                .map(|item| render_argument(item, language))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(format!("{{{}}}", rendered.join(", ")))
        }
        Value::Object(_) => Err(CodegenError::Unsupported(format!(
            "object argument {value} has no {} literal",
            language.as_str()
        ))),
    }
}

/// Render an expected result value for the final assertion.
///
/// Strings are emitted verbatim (they are C expressions such as `0` or
/// `EMPTY`); anything mentioning an exception collapses to [`EMPTY_RESULT`].
pub fn render_outcome_value(value: &Value) -> String {
    match value {
        Value::Null => EMPTY_RESULT.into(),
        Value::String(s) if s.contains("Exception") => EMPTY_RESULT.into(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => String::from(if *b { "1" } else { "0" }),
        other => other.to_string(),
    }
}
