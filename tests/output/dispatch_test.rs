/*!
 * Value Emission Tests
 */

use pretty_assertions::assert_eq;
use script_sandbox::core::limits::MAX_JSON_DEPTH;
use script_sandbox::engine::{Key, NativeObject, TableRef, Value};
use script_sandbox::output::{
    emit, encode_table, format_number, EncoderRegistry, OutputBuffer, OutputError, OutputResult,
};
use std::any::Any;
use std::sync::Arc;
use std::thread;

/// Host-sized thread stack for encoding deep documents
const HOST_STACK: usize = 8 * 1024 * 1024;

fn emit_to_string(args: &[Value]) -> String {
    let mut output = OutputBuffer::new(64, 0).unwrap();
    emit(&mut output, &EncoderRegistry::new(), args).unwrap();
    String::from_utf8(output.as_bytes().to_vec()).unwrap()
}

#[test]
fn test_scalars_in_argument_order() {
    let text = emit_to_string(&[
        Value::Nil,
        Value::Boolean(true),
        Value::Number(42.0),
        Value::from("x"),
    ]);
    assert_eq!(text, format!("niltrue{}x", format_number(42.0)));
    assert_eq!(text, "niltrue42x");
}

#[test]
fn test_strings_are_raw() {
    let mut output = OutputBuffer::new(8, 0).unwrap();
    let raw = Value::String(bytes::Bytes::from_static(b"\x00\xff\"\n"));
    emit(&mut output, &EncoderRegistry::new(), &[raw]).unwrap();
    assert_eq!(output.as_bytes(), b"\x00\xff\"\n");
}

#[test]
fn test_nested_table_document() {
    let tags = TableRef::new();
    tags.push(Value::from("a"));
    tags.push(Value::from("b"));

    let root = TableRef::new();
    root.set_field("count", Value::Number(3.0));
    root.set_field("ratio", Value::Number(0.25));
    root.set_field("tags", Value::Table(tags));

    assert_eq!(
        emit_to_string(&[Value::Table(root)]),
        "{\"count\":3,\"ratio\":0.25,\"tags\":[\"a\",\"b\"]}\n"
    );
}

#[test]
fn test_cyclic_table_terminates() {
    let a = TableRef::new();
    let b = TableRef::new();
    a.set_field("b", Value::Table(b.clone()));
    b.set_field("a", Value::Table(a.clone()));
    b.set_field("v", Value::Boolean(true));

    assert_eq!(emit_to_string(&[Value::Table(a.clone())]), "{\"b\":{\"v\":true}}\n");
    a.clear();
    b.clear();
}

#[test]
fn test_number_keys_are_quoted() {
    let t = TableRef::new();
    t.set(Key::Integer(2), Value::from("two"));
    t.set_field("name", Value::from("n"));
    let mut output = OutputBuffer::new(8, 0).unwrap();
    encode_table(&mut output, &t).unwrap();
    assert_eq!(output.as_bytes(), b"{\"2\":\"two\",\"name\":\"n\"}");
}

#[test]
fn test_first_failure_stops_emission() {
    let mut output = OutputBuffer::new(4, 8).unwrap();
    let err = emit(
        &mut output,
        &EncoderRegistry::new(),
        &[Value::from("abc"), Value::from("defghijk"), Value::from("z")],
    )
    .unwrap_err();
    assert!(matches!(err, OutputError::LimitExceeded { .. }));
    assert_eq!(output.as_bytes(), b"abc");
}

#[derive(Debug)]
struct Ring {
    cells: Vec<f64>,
}

impl NativeObject for Ring {
    fn type_name(&self) -> &str {
        "circular_buffer"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn encode_ring(object: &dyn NativeObject, output: &mut OutputBuffer) -> OutputResult<()> {
    let Some(ring) = object.as_any().downcast_ref::<Ring>() else {
        return Ok(());
    };
    for (i, cell) in ring.cells.iter().enumerate() {
        if i > 0 {
            output.append_char(b'\t')?;
        }
        output.append_str(&format_number(*cell))?;
    }
    output.append_char(b'\n')
}

#[test]
fn test_registered_native_encoder() {
    let mut registry = EncoderRegistry::new();
    registry.register("circular_buffer", encode_ring);
    let ring: Arc<dyn NativeObject> = Arc::new(Ring {
        cells: vec![1.0, 2.5, 3.0],
    });

    let mut output = OutputBuffer::new(8, 0).unwrap();
    emit(&mut output, &registry, &[Value::UserData(ring)]).unwrap();
    assert_eq!(output.as_bytes(), b"1\t2.5\t3\n");
}

#[test]
fn test_unregistered_native_object_skipped() {
    let ring: Arc<dyn NativeObject> = Arc::new(Ring { cells: vec![1.0] });
    assert_eq!(emit_to_string(&[Value::from("a"), Value::UserData(ring), Value::from("b")]), "ab");
}

/// `depth` tables, each holding the next under `c`
fn nested_chain(depth: usize) -> TableRef {
    let root = TableRef::new();
    let mut cursor = root.clone();
    for _ in 1..depth {
        let next = TableRef::new();
        cursor.set_field("c", Value::Table(next.clone()));
        cursor = next;
    }
    root
}

/// Unlink the chain level by level so dropping it does not recurse
fn dismantle(root: TableRef) {
    let mut cursor = root;
    while let Value::Table(next) = cursor.remove_field("c") {
        cursor = next;
    }
}

fn emit_on_host_stack(depth: usize) -> (OutputResult<()>, Vec<u8>) {
    thread::Builder::new()
        .stack_size(HOST_STACK)
        .spawn(move || {
            let root = nested_chain(depth);
            let mut output = OutputBuffer::new(64, 0).unwrap();
            let result = emit(&mut output, &EncoderRegistry::new(), &[Value::Table(root.clone())]);
            dismantle(root);
            (result, output.as_bytes().to_vec())
        })
        .unwrap()
        .join()
        .unwrap()
}

#[test]
fn test_deep_nesting_fails_instead_of_overflowing() {
    let (result, _) = emit_on_host_stack(100_000);
    assert_eq!(
        result,
        Err(OutputError::DepthExceeded {
            max_depth: MAX_JSON_DEPTH
        })
    );
    assert_eq!(
        OutputError::DepthExceeded { max_depth: MAX_JSON_DEPTH }.to_string(),
        "json table serialization depth exceeded"
    );
}

#[test]
fn test_nesting_at_depth_limit_is_encoded() {
    let (result, bytes) = emit_on_host_stack(MAX_JSON_DEPTH);
    assert_eq!(result, Ok(()));
    let text = String::from_utf8(bytes).unwrap();
    assert_eq!(text.matches('{').count(), MAX_JSON_DEPTH);
    assert!(text.starts_with("{\"c\":{\"c\":"));
    assert!(text.ends_with("{}}}\n"));

    let (result, _) = emit_on_host_stack(MAX_JSON_DEPTH + 1);
    assert!(matches!(result, Err(OutputError::DepthExceeded { .. })));
}
