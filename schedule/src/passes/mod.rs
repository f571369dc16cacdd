//! Fusion passes built on the rule API.
//!
//! # Passes
//!
//! - [`layer_norm`] - LayerNorm arithmetic → single `MVN` node
//!
//! Passes are gated on [`RunParams`](crate::RunParams) and registered with a
//! [`Scheduler`](crate::Scheduler) by [`register_standard_passes`].

pub mod layer_norm;

pub use layer_norm::{LayerNormFusion, layer_norm_pattern};

use crate::error::{GraphSnafu, Result};
use crate::scheduler::Scheduler;
use snafu::ResultExt;

/// Register every built-in pass.
pub fn register_standard_passes(scheduler: &mut Scheduler) -> Result<()> {
    scheduler.register(LayerNormFusion::new().context(GraphSnafu)?)
}
