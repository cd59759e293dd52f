//! Static description of the target processor consumed by the planners.
//!
//! A [`ResourceProfile`] is built once per target from the runtime's platform
//! query and is read-only for every planning invocation. Hardware constants
//! that vary across device generations (block granularity, transpose repeat
//! unit, DMA repeat ceiling, reserved scratch) live here rather than in the
//! planners, so the same planning logic retargets by swapping the profile.

use bon::bon;

use crate::error::{self, Result};

/// Feature flags of the target's data-movement engine, per sub-family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// The DMA engine pads and strides unaligned bursts in hardware.
    pub pad_dma: bool,
    /// The staging transpose unit accepts 4-byte lanes.
    pub f32_transpose: bool,
}

impl Capabilities {
    /// Current training parts: padded DMA and full transpose lanes.
    pub const PAD_DMA: Self = Self { pad_dma: true, f32_transpose: true };

    /// First-generation training parts: aligned DMA only, 16-bit transpose lanes.
    pub const LEGACY: Self = Self { pad_dma: false, f32_transpose: false };

    /// Inference parts without padded DMA but with full transpose lanes.
    pub const ALIGNED_DMA: Self = Self { pad_dma: false, f32_transpose: true };
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::PAD_DMA
    }
}

/// Immutable capacity and granularity limits of one target.
///
/// `core_count` and `fast_mem_bytes` come from the platform query; the
/// remaining fields are sub-family constants with defaults matching the
/// current vector-core generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceProfile {
    /// Number of parallel vector cores available to one operator.
    pub core_count: i64,
    /// Per-core fast-memory (on-chip scratch) budget in bytes.
    pub fast_mem_bytes: i64,
    /// Minimum contiguous DMA transfer unit in bytes.
    pub block_bytes: i64,
    /// Row granularity of the staging transpose instruction.
    pub repeat_unit: i64,
    /// Largest repeat count a single DMA descriptor encodes.
    pub max_dma_repeat: i64,
    /// Fast-memory bytes kept free for control structures.
    pub reserved_bytes: i64,
    /// Global scratch reserved for cross-core synchronization.
    pub sync_workspace_bytes: i64,
    /// Sub-family feature flags.
    pub caps: Capabilities,
}

#[bon]
impl ResourceProfile {
    #[builder]
    pub fn new(
        core_count: i64,
        fast_mem_bytes: i64,
        #[builder(default = 32)] block_bytes: i64,
        #[builder(default = 16)] repeat_unit: i64,
        #[builder(default = 4095)] max_dma_repeat: i64,
        #[builder(default = 4 * 32)] reserved_bytes: i64,
        #[builder(default = 32)] sync_workspace_bytes: i64,
        #[builder(default)] caps: Capabilities,
    ) -> Self {
        Self {
            core_count,
            fast_mem_bytes,
            block_bytes,
            repeat_unit,
            max_dma_repeat,
            reserved_bytes,
            sync_workspace_bytes,
            caps,
        }
    }

    /// Check that the platform query produced usable values.
    pub fn validate(&self) -> Result<()> {
        snafu::ensure!(self.core_count > 0, error::CoreCountSnafu { count: self.core_count });
        snafu::ensure!(self.fast_mem_bytes > 0, error::FastMemorySnafu { bytes: self.fast_mem_bytes });
        snafu::ensure!(self.block_bytes > 0, error::BlockSizeSnafu { bytes: self.block_bytes });
        snafu::ensure!(self.repeat_unit > 0, error::RepeatUnitSnafu { unit: self.repeat_unit });
        snafu::ensure!(self.max_dma_repeat > 0, error::RepeatCeilingSnafu { count: self.max_dma_repeat });
        Ok(())
    }

    /// Apply environment overrides for bring-up and debugging.
    ///
    /// # Environment Variables
    ///
    /// * `TESSARA_CORES` - Cap the active core count below the hardware value.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(cores) = std::env::var("TESSARA_CORES")
            && let Ok(cores) = cores.parse::<i64>()
            && cores > 0
        {
            self.core_count = self.core_count.min(cores);
        }
        self
    }

    /// Elements of `elem_bytes` width that fit one DMA block.
    pub const fn elems_per_block(&self, elem_bytes: i64) -> i64 {
        self.block_bytes / elem_bytes
    }
}
