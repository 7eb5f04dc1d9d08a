//! Uniform parameter structs for compute kernels.
//!
//! These structs must match the WGSL shader definitions exactly,
//! including alignment requirements.

/// Dispatch shape passed to kernels at `@group(1) @binding(0)`.
///
/// WGSL: `struct DispatchParams { grid_size: u32, threads_per_group: u32 }`.
/// Padded to 16 bytes for uniform buffer alignment.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DispatchParams {
    pub grid_size: u32,
    pub threads_per_group: u32,
    pub _padding: [u32; 2],
}

impl DispatchParams {
    pub fn new(grid_size: u32, threads_per_group: u32) -> Self {
        Self {
            grid_size,
            threads_per_group,
            _padding: [0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_params_layout() {
        assert_eq!(std::mem::size_of::<DispatchParams>(), 16);
        let params = DispatchParams::new(1025, 256);
        let words: &[u32] = bytemuck::cast_slice(bytemuck::bytes_of(&params));
        assert_eq!(words, &[1025, 256, 0, 0]);
    }
}
