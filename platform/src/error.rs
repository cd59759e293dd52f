use snafu::Snafu;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Platform queries that produced unusable values.
///
/// These surface misconfigured or unsupported targets before any planning
/// arithmetic runs; a profile that validates never fails later for resource
/// reasons other than capacity.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("core count must be positive, got {count}"))]
    CoreCount { count: i64 },

    #[snafu(display("fast-memory budget must be positive, got {bytes} bytes"))]
    FastMemory { bytes: i64 },

    #[snafu(display("DMA block size must be positive, got {bytes} bytes"))]
    BlockSize { bytes: i64 },

    #[snafu(display("transpose repeat unit must be positive, got {unit}"))]
    RepeatUnit { unit: i64 },

    #[snafu(display("DMA repeat ceiling must be positive, got {count}"))]
    RepeatCeiling { count: i64 },
}
