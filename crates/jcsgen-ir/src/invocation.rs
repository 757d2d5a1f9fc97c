//! Method-call descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single method call inside a scenario.
///
/// Deserialized from `{"method": "put", "arguments": [0, 1], "void": false}`.
/// The owning thread is not part of the wire format; it is filled in when a
/// scenario is decoded (see [`crate::schema::Schema::from_object`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub method: String,
    #[serde(default)]
    pub arguments: Vec<Value>,
    /// A void call produces no observable result.
    #[serde(default, rename = "void", skip_serializing_if = "is_false")]
    pub is_void: bool,
    #[serde(skip)]
    pub thread: Option<usize>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Invocation {
    pub fn new(method: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            arguments,
            is_void: false,
            thread: None,
        }
    }

    /// Mark this call as producing no result.
    pub fn void(mut self) -> Self {
        self.is_void = true;
        self
    }

    /// Attach the index of the sequence (thread) issuing this call.
    pub fn on_thread(mut self, thread: usize) -> Self {
        self.thread = Some(thread);
        self
    }

    pub fn has_result(&self) -> bool {
        !self.is_void
    }
}

impl fmt::Display for Invocation {
    /// Renders as `method(arg, arg)`, each argument in compact JSON.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.method)?;
        for (i, arg) in self.arguments.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_method_and_arguments() {
        let inv = Invocation::new("put", vec![json!(0), json!(1)]);
        assert_eq!(inv.to_string(), "put(0, 1)");
    }

    #[test]
    fn renders_nullary_call() {
        assert_eq!(Invocation::new("clear", vec![]).to_string(), "clear()");
    }

    #[test]
    fn renders_structured_arguments_compactly() {
        let inv = Invocation::new("putAll", vec![json!([1, 2]), json!("k")]);
        assert_eq!(inv.to_string(), "putAll([1,2], \"k\")");
    }

    #[test]
    fn decodes_with_defaults() {
        let inv: Invocation = serde_json::from_value(json!({"method": "size"})).unwrap();
        assert_eq!(inv.method, "size");
        assert!(inv.arguments.is_empty());
        assert!(inv.has_result());
        assert_eq!(inv.thread, None);
    }

    #[test]
    fn decodes_void_flag_and_ignores_unknown_keys() {
        let inv: Invocation = serde_json::from_value(
            json!({"method": "clear", "arguments": [], "void": true, "note": "x"}),
        )
        .unwrap();
        assert!(inv.is_void);
        assert!(!inv.has_result());
    }

    #[test]
    fn missing_method_is_rejected() {
        let err = serde_json::from_value::<Invocation>(json!({"arguments": [1]}));
        assert!(err.is_err());
    }

    #[test]
    fn serialization_omits_thread_and_false_void() {
        let inv = Invocation::new("get", vec![json!(0)]).on_thread(3);
        assert_eq!(
            serde_json::to_value(&inv).unwrap(),
            json!({"method": "get", "arguments": [0]})
        );
        let void = Invocation::new("clear", vec![]).void();
        assert_eq!(
            serde_json::to_value(&void).unwrap(),
            json!({"method": "clear", "arguments": [], "void": true})
        );
    }
}
