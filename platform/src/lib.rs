//! Target resource descriptions for the tessara tiling planners.
//!
//! The planners never query hardware themselves; they consume a
//! [`ResourceProfile`] assembled from the runtime's platform query. Profiles
//! are immutable, cheaply cloneable, and carry every generation-dependent
//! constant the planning arithmetic needs.

pub mod error;
pub mod profile;

pub use error::{Error, Result};
pub use profile::{Capabilities, ResourceProfile};
