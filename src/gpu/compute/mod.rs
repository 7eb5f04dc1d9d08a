//! GPU compute: pipeline states, dispatch and the element-wise addition kernel.

mod add;
mod dispatch;
mod params;
mod pipelines;

pub use add::{AddResult, ElementwiseAdd, ADD_KERNEL};
pub use dispatch::{
    check_array_bytes, dispatch, encode_dispatch, grid_size_for, DispatchError, DispatchPlan,
};
pub use params::DispatchParams;
pub use pipelines::ComputePipelineState;
