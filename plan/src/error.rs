use snafu::Snafu;

use tessara_dtype::DType;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Terminal planning failures.
///
/// Every variant aborts the operator's lowering; there is no retry and no
/// partially emitted plan. The variants group into the kinds the operator
/// compiler distinguishes: shape mismatches, unsupported attributes,
/// capacity overflow, encoding overflow, and invalid platform data.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("destination tensor list is empty"))]
    EmptyDestinationList,

    #[snafu(display("destination tensor {index} diverges from the shared list shape"))]
    DestinationShapeDiverges { index: usize },

    #[snafu(display("{operand} must not contain a zero-sized dimension"))]
    EmptyOperand { operand: &'static str },

    #[snafu(display("{operand} rank {rank} unsupported: expected {expected}"))]
    RankUnsupported { operand: &'static str, rank: usize, expected: &'static str },

    #[snafu(display("{operand} extent mismatch: expected {expected}, got {actual}"))]
    ExtentMismatch { operand: &'static str, expected: i64, actual: i64 },

    #[snafu(display("scatter extent {actual} exceeds destination extent {limit}"))]
    ScatterExtentExceedsDestination { actual: i64, limit: i64 },

    #[snafu(display("destination dtype {actual:?} differs from source dtype {expected:?}"))]
    DTypeMismatch { expected: DType, actual: DType },

    #[snafu(display("reduction mode {mode:?} unsupported, only \"update\" is implemented"))]
    UnsupportedReduction { mode: String },

    #[snafu(display("axis {axis} out of range for rank {rank}"))]
    AxisOutOfRange { axis: i64, rank: usize },

    #[snafu(display("no buffering mode fits: {required_bytes} bytes needed, {budget_bytes} available"))]
    CapacityOverflow { required_bytes: i64, budget_bytes: i64 },

    #[snafu(display("tiling record needs {required} bytes, destination holds {capacity}"))]
    RecordOverflow { required: usize, capacity: usize },

    #[snafu(display("invalid resource profile: {source}"))]
    Platform { source: tessara_platform::Error },
}
