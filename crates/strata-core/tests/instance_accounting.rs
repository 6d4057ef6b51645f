//! Slice storage accounting across every layout and exit path.
//!
//! Kept as the sole test in this binary so no concurrent test can disturb
//! the process-wide counter.

use strata_core::{
    instances, read_slice, write_slice, ColumnMajor, Data, GenericSlice, MatrixSlice, RowMajor,
    Type,
};

fn layout() -> Type {
    Type::record([("a", Type::integer()), ("b", Type::count())]).with_name("event")
}

fn rows() -> Vec<Vec<Data>> {
    vec![
        vec![Data::Integer(1), Data::Count(2)],
        vec![Data::Integer(3), Data::Count(4)],
    ]
}

#[test]
fn counter_returns_to_baseline() {
    let baseline = instances();
    {
        let generic = GenericSlice::make(layout(), &rows()).unwrap();
        let row_major = MatrixSlice::<RowMajor>::make_from_rows(layout(), &rows()).unwrap();
        let column_major = MatrixSlice::<ColumnMajor>::make_from_rows(layout(), &rows()).unwrap();
        assert_eq!(instances(), baseline + 3);

        // Sharing a handle does not create storage; copying does.
        let shared = generic.clone();
        assert_eq!(instances(), baseline + 3);
        let copied = generic.copy();
        assert_eq!(instances(), baseline + 4);
        drop(copied);
        drop(shared);
        assert_eq!(instances(), baseline + 3);

        // A copy-on-write offset stamp on a shared handle allocates once.
        let mut writer = row_major.clone();
        writer.set_offset(7);
        assert_eq!(instances(), baseline + 4);
        drop(writer);

        // Deserialization accounts for the restored storage and releases
        // it on the failure path too.
        let mut bytes = Vec::new();
        write_slice(&column_major, &mut bytes).unwrap();
        let mut input = bytes.as_slice();
        let restored = read_slice(&mut input).unwrap();
        assert_eq!(instances(), baseline + 4);
        drop(restored);

        let mut truncated = bytes.clone();
        truncated.truncate(bytes.len() - 3);
        let mut input = truncated.as_slice();
        assert!(read_slice(&mut input).is_err());
        assert_eq!(instances(), baseline + 3);
    }
    assert_eq!(instances(), baseline);
}
