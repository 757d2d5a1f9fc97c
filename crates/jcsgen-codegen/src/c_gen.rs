use jcsgen_ir::{Invocation, Language, Schema, SequenceSchema};
use serde_json::Value;

use crate::common::*;
use crate::CodegenError;

/// Role a sequence plays in the generated program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    /// Runs on the main thread before any other thread starts.
    Initial,
    /// Runs on its own pthread.
    Concurrent,
    /// Runs on the main thread after every other thread has joined.
    Final,
}

struct Layout<'a> {
    schema: &'a Schema,
    language: Language,
    placements: Vec<Placement>,
    /// Flattened invocation position of each recorded result.
    result_slots: Vec<usize>,
}

/// Generate a complete C or C++ translation unit for a scenario.
pub fn generate_native(
    schema: &Schema,
    include_source: Option<&str>,
) -> Result<String, CodegenError> {
    let layout = Layout::new(schema)?;
    let mut out = String::new();

    write_header(&mut out, include_source);
    write_globals(&mut out, &layout);
    write_threads(&mut out, &layout)?;
    write_main(&mut out, &layout)?;

    Ok(out)
}

impl<'a> Layout<'a> {
    fn new(schema: &'a Schema) -> Result<Self, CodegenError> {
        let language = schema.language.unwrap_or_default();
        if language == Language::Cpp && schema.object_name.is_none() {
            return Err(CodegenError::MissingObject {
                language: language.as_str(),
            });
        }
        if schema.object_name.is_some() && schema.class.is_none() {
            return Err(CodegenError::MissingClass);
        }

        let initial = schema.initial_sequence();
        let last = schema.final_sequence();
        check_legal(schema, initial, last)?;

        let placements: Vec<Placement> = schema
            .sequences
            .iter()
            .map(|s| {
                if Some(s.index) == initial {
                    Placement::Initial
                } else if Some(s.index) == last {
                    Placement::Final
                } else {
                    Placement::Concurrent
                }
            })
            .collect();

        let mut result_slots = Vec::new();
        let mut slot = 0;
        for (sequence, placement) in schema.sequences.iter().zip(&placements) {
            for invocation in &sequence.invocations {
                if records_result(*placement, invocation) {
                    result_slots.push(slot);
                }
                slot += 1;
            }
        }

        let expected = schema.invocation_count();
        for (outcome, values) in schema.outcomes.iter().enumerate() {
            if values.len() != expected {
                return Err(CodegenError::OutcomeArity {
                    outcome,
                    expected,
                    got: values.len(),
                });
            }
        }

        Ok(Self {
            schema,
            language,
            placements,
            result_slots,
        })
    }

    fn call(&self, method: &str, arguments: &[String]) -> String {
        let args = arguments.join(", ");
        match (self.language, self.schema.object_name.as_deref()) {
            (Language::Cpp, Some(object)) => format!("{object}.{method}({args})"),
            (_, Some(object)) if args.is_empty() => format!("{method}({object})"),
            (_, Some(object)) => format!("{method}({object}, {args})"),
            (_, None) => format!("{method}({args})"),
        }
    }

    fn invocation(&self, invocation: &Invocation) -> Result<String, CodegenError> {
        let args = invocation
            .arguments
            .iter()
            .map(|a| render_argument(a, self.language))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.call(&invocation.method, &args))
    }

    fn init_expression(&self) -> Result<Option<String>, CodegenError> {
        let Some(init) = &self.schema.init else {
            return Ok(None);
        };
        let params = self
            .schema
            .init_parameters
            .iter()
            .map(|p| match p {
                Value::String(expr) => Ok(expr.clone()),
                other => render_argument(other, self.language),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(self.call(init, &params)))
    }
}

fn records_result(placement: Placement, invocation: &Invocation) -> bool {
    placement != Placement::Initial && invocation.has_result()
}

/// Only the initial and final sequences may take part in the order relation
/// with other sequences; everything else runs unordered.
fn check_legal(
    schema: &Schema,
    initial: Option<usize>,
    last: Option<usize>,
) -> Result<(), CodegenError> {
    for sequence in &schema.sequences {
        let i = sequence.index;
        if Some(i) == initial || Some(i) == last {
            continue;
        }
        let preds_ok = schema
            .order
            .iter()
            .filter(|&&(_, after)| after == i)
            .all(|&(before, _)| Some(before) == initial);
        let succs_ok = schema
            .order
            .iter()
            .filter(|&&(before, _)| before == i)
            .all(|&(_, after)| Some(after) == last);
        if !(preds_ok && succs_ok) {
            return Err(CodegenError::IllegalOrder { index: i });
        }
    }
    Ok(())
}

fn write_header(out: &mut String, include_source: Option<&str>) {
    out.push_str("#include <stdio.h>\n");
    out.push_str("#include <stdlib.h>\n");
    out.push_str("#include <assert.h>\n");
    out.push_str("#include <pthread.h>\n\n");
    if let Some(source) = include_source {
        out.push_str("/* Library under test */\n");
        out.push_str(source);
        if !source.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
    }
}

fn write_globals(out: &mut String, layout: &Layout<'_>) {
    out.push_str("/* Shared object and recorded results */\n");
    if let (Some(class), Some(object)) = (&layout.schema.class, &layout.schema.object_name) {
        out.push_str(&format!("{class} {object};\n"));
    }
    for slot in &layout.result_slots {
        out.push_str(&format!("int RESULT_{slot};\n"));
    }
    out.push('\n');
}

fn write_threads(out: &mut String, layout: &Layout<'_>) -> Result<(), CodegenError> {
    out.push_str("/* Threads */\n");
    let mut slot = 0;
    for (pos, (sequence, placement)) in layout
        .schema
        .sequences
        .iter()
        .zip(&layout.placements)
        .enumerate()
    {
        write_thread(out, layout, pos, sequence, *placement, &mut slot)?;
    }
    Ok(())
}

fn write_thread(
    out: &mut String,
    layout: &Layout<'_>,
    pos: usize,
    sequence: &SequenceSchema,
    placement: Placement,
    slot: &mut usize,
) -> Result<(), CodegenError> {
    out.push_str(&format!("void *thread{pos}(void *args) {{\n"));
    for invocation in &sequence.invocations {
        let call = layout.invocation(invocation)?;
        if records_result(placement, invocation) {
            out.push_str(&format!("    RESULT_{slot} = {call};\n"));
        } else {
            out.push_str(&format!("    {call};\n"));
        }
        *slot += 1;
    }
    out.push_str("    return 0;\n");
    out.push_str("}\n\n");
    Ok(())
}

fn write_main(out: &mut String, layout: &Layout<'_>) -> Result<(), CodegenError> {
    let positions = |wanted: Placement| {
        layout
            .placements
            .iter()
            .enumerate()
            .filter(move |(_, p)| **p == wanted)
            .map(|(pos, _)| pos)
    };

    out.push_str("int main(int argc, char *argv[]) {\n");
    if let Some(init) = layout.init_expression()? {
        out.push_str("    /* Initialize shared object */\n");
        out.push_str(&format!("    {init};\n\n"));
    }

    for pos in positions(Placement::Concurrent) {
        out.push_str(&format!("    pthread_t t{pos};\n"));
    }

    for pos in positions(Placement::Initial) {
        out.push_str("\n    /* Initial sequence */\n");
        out.push_str(&format!("    thread{pos}(0);\n"));
    }

    out.push_str("\n    /* Start threads */\n");
    for pos in positions(Placement::Concurrent) {
        out.push_str(&format!("    pthread_create(&t{pos}, 0, thread{pos}, 0);\n"));
    }
    out.push_str("\n    /* Wait for threads */\n");
    for pos in positions(Placement::Concurrent) {
        out.push_str(&format!("    pthread_join(t{pos}, 0);\n"));
    }

    for pos in positions(Placement::Final) {
        out.push_str("\n    /* Final sequence */\n");
        out.push_str(&format!("    thread{pos}(0);\n"));
    }

    out.push_str("\n    /* Check results */\n");
    out.push_str(&format!("    assert({});\n", assertion(layout)));
    out.push_str("    return 0;\n");
    out.push_str("}\n");
    Ok(())
}

/// Disjunction over accepted outcomes of the recorded results.
fn assertion(layout: &Layout<'_>) -> String {
    if layout.schema.outcomes.is_empty() {
        return "1".into();
    }
    layout
        .schema
        .outcomes
        .iter()
        .map(|outcome| {
            let terms: Vec<String> = layout
                .result_slots
                .iter()
                .map(|&slot| format!("RESULT_{slot} == {}", render_outcome_value(&outcome[slot])))
                .collect();
            if terms.is_empty() {
                "(1)".to_string()
            } else {
                format!("({})", terms.join(" && "))
            }
        })
        .collect::<Vec<_>>()
        .join(" || ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn decode(value: Value) -> Schema {
        let Value::Object(map) = value else {
            panic!("expected object")
        };
        Schema::from_object(&map).expect("valid scenario")
    }

    fn queue(order: Value, outcomes: Value) -> Schema {
        decode(json!({
            "class": "queue_t",
            "object_name": "q",
            "init": "queue_init",
            "init_parameters": ["16"],
            "sequences": [
                {"index": 0, "invocations": [{"method": "enqueue", "arguments": [1], "void": true}]},
                {"index": 1, "invocations": [{"method": "dequeue", "arguments": []}]},
                {"index": 2, "invocations": [{"method": "size", "arguments": []}]}
            ],
            "order": order,
            "outcomes": outcomes
        }))
    }

    #[test]
    fn unordered_sequences_all_get_threads() {
        let code = generate_native(&queue(json!([]), json!([])), None).unwrap();
        assert!(code.contains("queue_t q;"));
        assert!(code.contains("queue_init(q, 16);"));
        for pos in 0..3 {
            assert!(code.contains(&format!("pthread_create(&t{pos}, 0, thread{pos}, 0);")));
            assert!(code.contains(&format!("pthread_join(t{pos}, 0);")));
        }
        assert!(code.contains("    enqueue(q, 1);\n"));
        assert!(code.contains("RESULT_1 = dequeue(q);"));
        assert!(code.contains("RESULT_2 = size(q);"));
        assert!(!code.contains("int RESULT_0;"));
        assert!(code.contains("assert(1);"));
    }

    #[test]
    fn initial_sequence_runs_on_main_without_results() {
        let schema = decode(json!({
            "sequences": [
                {"index": 0, "invocations": [{"method": "push", "arguments": [0]}]},
                {"index": 1, "invocations": [{"method": "pop"}]},
                {"index": 2, "invocations": [{"method": "pop"}]}
            ],
            "order": [[0, 1], [0, 2]]
        }));
        let code = generate_native(&schema, None).unwrap();
        assert!(code.contains("/* Initial sequence */\n    thread0(0);"));
        assert!(!code.contains("pthread_t t0;"));
        assert!(code.contains("    push(0);\n"));
        assert!(!code.contains("RESULT_0"));
        assert!(code.contains("RESULT_1 = pop();"));
        assert!(code.contains("RESULT_2 = pop();"));
    }

    #[test]
    fn chain_has_initial_and_final_sequence() {
        let code = generate_native(&queue(json!([[0, 1], [1, 2]]), json!([])), None).unwrap();
        let initial = code.find("thread0(0);").unwrap();
        let create = code.find("pthread_create(&t1").unwrap();
        let join = code.find("pthread_join(t1").unwrap();
        let last = code.find("thread2(0);").unwrap();
        assert!(initial < create && create < join && join < last);
    }

    #[test]
    fn outcomes_become_a_disjunction() {
        let schema = queue(
            json!([]),
            json!([["_", "1", "0"], ["_", "java.util.NoSuchElementException", "1"]]),
        );
        let code = generate_native(&schema, None).unwrap();
        assert!(code.contains(
            "assert((RESULT_1 == 1 && RESULT_2 == 0) || (RESULT_1 == EMPTY && RESULT_2 == 1));"
        ));
    }

    #[test]
    fn outcome_arity_is_checked() {
        let schema = queue(json!([]), json!([["1"]]));
        assert!(matches!(
            generate_native(&schema, None),
            Err(CodegenError::OutcomeArity {
                outcome: 0,
                expected: 3,
                got: 1
            })
        ));
    }

    #[test]
    fn unsupported_order_shape_is_rejected() {
        let schema = queue(json!([[0, 1]]), json!([]));
        assert!(matches!(
            generate_native(&schema, None),
            Err(CodegenError::IllegalOrder { .. })
        ));
    }

    #[test]
    fn cpp_uses_member_calls() {
        let schema = decode(json!({
            "class": "Stack",
            "language": "cpp",
            "object_name": "s",
            "sequences": [{"index": 0, "invocations": [{"method": "push", "arguments": [true]}]}]
        }));
        let code = generate_native(&schema, None).unwrap();
        assert!(code.contains("Stack s;"));
        assert!(code.contains("RESULT_0 = s.push(true);"));
    }

    #[test]
    fn cpp_without_object_is_rejected() {
        let schema = decode(json!({"language": "cpp"}));
        assert!(matches!(
            generate_native(&schema, None),
            Err(CodegenError::MissingObject { language: "cpp" })
        ));
    }

    #[test]
    fn object_without_class_is_rejected() {
        let schema = decode(json!({"object_name": "q"}));
        assert!(matches!(
            generate_native(&schema, None),
            Err(CodegenError::MissingClass)
        ));
    }

    #[test]
    fn library_source_is_inlined_after_includes() {
        let code = generate_native(&Schema::default(), Some("int lib(void) { return 1; }")).unwrap();
        let include = code.find("#include <pthread.h>").unwrap();
        let lib = code.find("int lib(void)").unwrap();
        let main = code.find("int main(").unwrap();
        assert!(include < lib && lib < main);
    }

    #[test]
    fn empty_scenario_still_produces_a_program() {
        let code = generate_native(&Schema::from_object(&Map::new()).unwrap(), None).unwrap();
        assert!(code.contains("int main(int argc, char *argv[]) {"));
        assert!(code.contains("assert(1);"));
    }
}
