//! Encoding Equivalence Tests
//!
//! Row-wise and columnar output of the same query must decode to the same
//! logical rows, and must fail the same way:
//! - Identical rows for every supported field type, nulls included
//! - Block size never exceeds the configured batch size
//! - Failures end both encodings with the same error

use std::sync::Arc;

use serde_json::json;
use tvfexec::config::ExecutionConfig;
use tvfexec::encoder::{EncodingMode, Frame, FrameDecoder, VecSink};
use tvfexec::errors::StructuredError;
use tvfexec::executor::TableFunctionExecutor;
use tvfexec::functions::{builtin, from_fn, TableFunction};
use tvfexec::schema::Row;

// =============================================================================
// Helper Functions
// =============================================================================

const ALL_TYPES: &str = "b: boolean, i: int, l: bigint, f: float, d: double, s: string";

fn mixed_rows() -> Vec<Row> {
    vec![
        vec![json!(true), json!(1), json!(1i64 << 40), json!(0.1), json!(0.1), json!("x")],
        vec![json!(null), json!(null), json!(null), json!(null), json!(null), json!(null)],
        vec![json!(false), json!(-5), json!(-1), json!(3), json!(1e300), json!("")],
        vec![json!(true), json!(i32::MAX), json!(i64::MIN), json!(-2.5), json!(7), json!("日本")],
    ]
}

fn identity(return_type: &str) -> TableFunction {
    TableFunction::new("identity", return_type, || from_fn(|row: Row| vec![row])).unwrap()
}

fn config(mode: EncodingMode, batch_size: usize) -> ExecutionConfig {
    ExecutionConfig {
        arrow_enabled: mode == EncodingMode::Arrow,
        arrow_batch_size: batch_size,
        ..Default::default()
    }
}

fn run(
    function: &TableFunction,
    config: &ExecutionConfig,
    inputs: Vec<Row>,
) -> (Vec<Frame>, Option<StructuredError>) {
    let mut exec = TableFunctionExecutor::new(function, config, VecSink::new());
    let err = exec.run(inputs).err();
    (exec.into_sink().into_frames(), err)
}

// =============================================================================
// Equivalence
// =============================================================================

#[test]
fn test_modes_decode_to_identical_rows() {
    let function = identity(ALL_TYPES);
    let decoder = FrameDecoder::new(Arc::clone(function.schema()));

    let (row_frames, row_err) = run(&function, &config(EncodingMode::Row, 10), mixed_rows());
    let (arrow_frames, arrow_err) =
        run(&function, &config(EncodingMode::Arrow, 3), mixed_rows());
    assert!(row_err.is_none());
    assert!(arrow_err.is_none());

    let by_row = decoder.collect(&row_frames).unwrap();
    let by_batch = decoder.collect(&arrow_frames).unwrap();
    assert_eq!(by_row.len(), 4);
    assert_eq!(by_row, by_batch);

    assert_eq!(by_row[0][3], json!(f64::from(0.1f32)));
    assert_eq!(by_row[0][4], json!(0.1));
    assert_eq!(by_row[2][3], json!(3.0));
}

#[test]
fn test_equivalence_with_builtin_posexplode() {
    let function = TableFunction::new("posexplode", "pos: int, col: string", builtin::posexplode)
        .unwrap();
    let decoder = FrameDecoder::new(Arc::clone(function.schema()));
    let inputs = vec![
        vec![json!(["a", "b", "c"])],
        vec![json!(null)],
        vec![json!([])],
        vec![json!(["d"])],
    ];

    let (row_frames, _) = run(&function, &config(EncodingMode::Row, 2), inputs.clone());
    let (arrow_frames, _) = run(&function, &config(EncodingMode::Arrow, 2), inputs);
    assert_eq!(
        decoder.collect(&row_frames).unwrap(),
        decoder.collect(&arrow_frames).unwrap()
    );
    assert_eq!(row_frames.len(), 4);
}

// =============================================================================
// Batching
// =============================================================================

#[test]
fn test_block_size_bounded_by_batch_size() {
    let function = identity("a: int");
    let inputs: Vec<Row> = (0..23).map(|i| vec![json!(i)]).collect();
    let (frames, err) = run(&function, &config(EncodingMode::Arrow, 5), inputs);
    assert!(err.is_none());

    let sizes: Vec<usize> = frames.iter().map(Frame::row_count).collect();
    assert_eq!(sizes, vec![5, 5, 5, 5, 3]);
}

#[test]
fn test_empty_input_emits_nothing() {
    let function = identity("a: int");
    for mode in [EncodingMode::Row, EncodingMode::Arrow] {
        let (frames, err) = run(&function, &config(mode, 5), Vec::new());
        assert!(err.is_none());
        assert!(frames.is_empty());
    }
}

// =============================================================================
// Failure equivalence
// =============================================================================

#[test]
fn test_modes_fail_identically() {
    let function = identity("a: int, b: int");
    let inputs = vec![
        vec![json!(1), json!(2)],
        vec![json!(3), json!(4)],
        vec![json!(5)],
        vec![json!(6), json!(7)],
    ];
    let decoder = FrameDecoder::new(Arc::clone(function.schema()));

    let (row_frames, row_err) = run(&function, &config(EncodingMode::Row, 10), inputs.clone());
    let (arrow_frames, arrow_err) = run(&function, &config(EncodingMode::Arrow, 10), inputs);
    assert_eq!(row_err, arrow_err);

    let by_row = decoder.collect_partial(&row_frames).unwrap();
    let by_batch = decoder.collect_partial(&arrow_frames).unwrap();
    assert_eq!(by_row.rows, by_batch.rows);
    assert_eq!(by_row.rows.len(), 2);
    assert_eq!(by_row.error, by_batch.error);
}
