//! Program compilation and entry-point lookup.
//!
//! WGSL source is parsed and validated on the host before it reaches the
//! device, so syntax and semantic errors come back as [`ProgramError::Compile`]
//! with a rendered diagnostic instead of surfacing as a device error. The
//! parsed module is kept for reflection: kernels report their argument slots
//! and thread-group declaration from it.

use naga::valid::{Capabilities, ValidationFlags, Validator};
use wgpu::ShaderModule;

use super::context::AcceleratorContext;

/// Name of the pipeline-overridable constant that sizes a kernel's thread group.
pub const WORKGROUP_SIZE_OVERRIDE: &str = "WORKGROUP_SIZE";

/// Bind group holding a kernel's array arguments.
pub const ARGUMENT_GROUP: u32 = 0;

/// Bind group holding the dispatch parameter uniform.
pub const DISPATCH_PARAMS_GROUP: u32 = 1;

/// Errors from compiling programs and building pipelines from them.
#[derive(Debug, thiserror::Error)]
pub enum ProgramError {
    #[error("Program compilation failed:\n{0}")]
    Compile(String),
    #[error("No {stage} entry point named `{name}`")]
    SymbolNotFound { name: String, stage: &'static str },
    #[error("Pipeline build failed for `{entry_point}`: {reason}")]
    PipelineBuild { entry_point: String, reason: String },
}

/// Shader stage of an entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Compute,
    Vertex,
    Fragment,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Compute => "compute",
            Stage::Vertex => "vertex",
            Stage::Fragment => "fragment",
        }
    }

    fn matches(&self, stage: naga::ShaderStage) -> bool {
        matches!(
            (self, stage),
            (Stage::Compute, naga::ShaderStage::Compute)
                | (Stage::Vertex, naga::ShaderStage::Vertex)
                | (Stage::Fragment, naga::ShaderStage::Fragment)
        )
    }
}

/// A compiled program: device shader module plus its validated IR.
pub struct Program {
    label: String,
    shader: ShaderModule,
    module: naga::Module,
    info: naga::valid::ModuleInfo,
}

impl Program {
    /// Compile WGSL program text.
    pub fn compile(
        ctx: &AcceleratorContext,
        label: &str,
        source: &str,
    ) -> Result<Self, ProgramError> {
        let (module, info) = validate(source)?;

        let shader = ctx
            .validated(|device| {
                device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(label),
                    source: wgpu::ShaderSource::Wgsl(source.into()),
                })
            })
            .map_err(|err| ProgramError::Compile(err.to_string()))?;

        log::debug!(
            "compiled program `{}` ({} entry points)",
            label,
            module.entry_points.len()
        );

        Ok(Self {
            label: label.to_string(),
            shader,
            module,
            info,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn shader(&self) -> &ShaderModule {
        &self.shader
    }

    /// Names of all entry points of the given stage.
    pub fn entry_points(&self, stage: Stage) -> Vec<&str> {
        self.module
            .entry_points
            .iter()
            .filter(|ep| stage.matches(ep.stage))
            .map(|ep| ep.name.as_str())
            .collect()
    }

    /// Look up a compute entry point and reflect its signature.
    pub fn kernel(&self, name: &str) -> Result<Kernel<'_>, ProgramError> {
        let index = self.find(name, Stage::Compute)?;
        let signature = KernelSignature::reflect(&self.module, &self.info, index)?;
        Ok(Kernel {
            program: self,
            name: self.module.entry_points[index].name.clone(),
            signature,
        })
    }

    /// Look up a vertex entry point.
    pub fn vertex(&self, name: &str) -> Result<EntryPoint<'_>, ProgramError> {
        self.entry_point(name, Stage::Vertex)
    }

    /// Look up a fragment entry point.
    pub fn fragment(&self, name: &str) -> Result<EntryPoint<'_>, ProgramError> {
        self.entry_point(name, Stage::Fragment)
    }

    fn entry_point(&self, name: &str, stage: Stage) -> Result<EntryPoint<'_>, ProgramError> {
        let index = self.find(name, stage)?;
        Ok(EntryPoint {
            program: self,
            name: self.module.entry_points[index].name.clone(),
            stage,
        })
    }

    fn find(&self, name: &str, stage: Stage) -> Result<usize, ProgramError> {
        self.module
            .entry_points
            .iter()
            .position(|ep| ep.name == name && stage.matches(ep.stage))
            .ok_or_else(|| ProgramError::SymbolNotFound {
                name: name.to_string(),
                stage: stage.name(),
            })
    }
}

/// Parse and validate WGSL, rendering any error against the source text.
fn validate(source: &str) -> Result<(naga::Module, naga::valid::ModuleInfo), ProgramError> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| ProgramError::Compile(e.emit_to_string(source)))?;

    let info = Validator::new(ValidationFlags::all(), Capabilities::default())
        .validate(&module)
        .map_err(|e| ProgramError::Compile(e.emit_to_string(source)))?;

    Ok((module, info))
}

/// A vertex or fragment entry point within a [`Program`].
pub struct EntryPoint<'p> {
    program: &'p Program,
    name: String,
    stage: Stage,
}

impl<'p> EntryPoint<'p> {
    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }
}

/// A compute entry point within a [`Program`].
pub struct Kernel<'p> {
    program: &'p Program,
    name: String,
    signature: KernelSignature,
}

impl<'p> Kernel<'p> {
    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &KernelSignature {
        &self.signature
    }
}

/// One array argument of a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgumentSlot {
    pub binding: u32,
    pub read_only: bool,
}

/// How a kernel declares its thread-group width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkgroupDecl {
    /// `@workgroup_size(WORKGROUP_SIZE)`, specialised at pipeline build.
    Override,
    /// A literal size; the value is the total threads per group.
    Fixed(u32),
}

/// Reflected interface of a kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelSignature {
    /// Storage arrays in [`ARGUMENT_GROUP`], ordered by binding `0..N-1`.
    pub arguments: Vec<ArgumentSlot>,
    /// Whether the kernel reads the dispatch parameter uniform.
    pub uses_dispatch_params: bool,
    pub workgroup: WorkgroupDecl,
}

impl KernelSignature {
    fn reflect(
        module: &naga::Module,
        info: &naga::valid::ModuleInfo,
        index: usize,
    ) -> Result<Self, ProgramError> {
        let ep = &module.entry_points[index];
        let uses = info.get_entry_point(index);
        let build_error = |reason: String| ProgramError::PipelineBuild {
            entry_point: ep.name.clone(),
            reason,
        };

        let mut arguments = Vec::new();
        let mut uses_dispatch_params = false;

        for (handle, var) in module.global_variables.iter() {
            if uses[handle].is_empty() {
                continue;
            }
            let Some(binding) = &var.binding else {
                continue;
            };

            match (binding.group, var.space) {
                (ARGUMENT_GROUP, naga::AddressSpace::Storage { access }) => {
                    arguments.push(ArgumentSlot {
                        binding: binding.binding,
                        read_only: !access.contains(naga::StorageAccess::STORE),
                    });
                }
                (DISPATCH_PARAMS_GROUP, naga::AddressSpace::Uniform) if binding.binding == 0 => {
                    uses_dispatch_params = true;
                }
                (group, space) => {
                    return Err(build_error(format!(
                        "unsupported resource at @group({}) @binding({}): {:?}",
                        group, binding.binding, space
                    )));
                }
            }
        }

        arguments.sort_by_key(|slot| slot.binding);
        for (expected, slot) in arguments.iter().enumerate() {
            if slot.binding != expected as u32 {
                return Err(build_error(format!(
                    "array arguments must occupy bindings 0..{} without gaps, found binding {}",
                    arguments.len(),
                    slot.binding
                )));
            }
        }

        let overridable = ep
            .workgroup_size_overrides
            .is_some_and(|sizes| sizes.iter().any(Option::is_some));
        let workgroup = if overridable {
            let declared = module
                .overrides
                .iter()
                .any(|(_, o)| o.name.as_deref() == Some(WORKGROUP_SIZE_OVERRIDE));
            if !declared {
                return Err(build_error(format!(
                    "overridable thread groups must be sized by `{}`",
                    WORKGROUP_SIZE_OVERRIDE
                )));
            }
            WorkgroupDecl::Override
        } else {
            WorkgroupDecl::Fixed(ep.workgroup_size.iter().product())
        };

        Ok(Self {
            arguments,
            uses_dispatch_params,
            workgroup,
        })
    }

    /// Number of array arguments a dispatch must bind.
    pub fn argument_count(&self) -> usize {
        self.arguments.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KERNELS: &str = r#"
struct DispatchParams { grid_size: u32, threads_per_group: u32 }
override WORKGROUP_SIZE: u32 = 64u;

@group(0) @binding(0) var<storage, read> input: array<f32>;
@group(0) @binding(1) var<storage, read_write> output: array<f32>;
@group(1) @binding(0) var<uniform> dispatch: DispatchParams;

@compute @workgroup_size(WORKGROUP_SIZE)
fn double(@builtin(global_invocation_id) id: vec3<u32>) {
    if (id.x >= dispatch.grid_size) { return; }
    output[id.x] = input[id.x] * 2.0;
}

@compute @workgroup_size(8, 4)
fn fill(@builtin(global_invocation_id) id: vec3<u32>) {
    output[id.x] = input[0];
}
"#;

    fn reflect(source: &str, name: &str) -> Result<KernelSignature, ProgramError> {
        let (module, info) = validate(source)?;
        let index = module
            .entry_points
            .iter()
            .position(|ep| ep.name == name)
            .expect("entry point exists");
        KernelSignature::reflect(&module, &info, index)
    }

    #[test]
    fn test_compile_error_is_reported() {
        let err = validate("fn broken( {").unwrap_err();
        assert!(matches!(err, ProgramError::Compile(ref msg) if !msg.is_empty()));
    }

    #[test]
    fn test_semantic_error_is_reported() {
        let source = "@compute @workgroup_size(1) fn main() { let x: f32 = 1u; }";
        assert!(matches!(validate(source), Err(ProgramError::Compile(_))));
    }

    #[test]
    fn test_reflect_override_kernel() {
        let sig = reflect(KERNELS, "double").unwrap();
        assert_eq!(
            sig.arguments,
            vec![
                ArgumentSlot { binding: 0, read_only: true },
                ArgumentSlot { binding: 1, read_only: false },
            ]
        );
        assert!(sig.uses_dispatch_params);
        assert_eq!(sig.workgroup, WorkgroupDecl::Override);
    }

    #[test]
    fn test_reflect_fixed_workgroup_without_params() {
        let sig = reflect(KERNELS, "fill").unwrap();
        assert_eq!(sig.argument_count(), 2);
        assert!(!sig.uses_dispatch_params);
        assert_eq!(sig.workgroup, WorkgroupDecl::Fixed(32));
    }

    #[test]
    fn test_reflect_rejects_binding_gap() {
        let source = r#"
@group(0) @binding(0) var<storage, read> a: array<f32>;
@group(0) @binding(2) var<storage, read_write> out: array<f32>;
@compute @workgroup_size(64)
fn gap(@builtin(global_invocation_id) id: vec3<u32>) { out[id.x] = a[id.x]; }
"#;
        assert!(matches!(
            reflect(source, "gap"),
            Err(ProgramError::PipelineBuild { .. })
        ));
    }

    #[test]
    fn test_default_program_entry_points() {
        let source = include_str!("shaders/pipeline.wgsl");
        let (module, _) = validate(source).expect("default program validates");
        let names: Vec<_> = module.entry_points.iter().map(|ep| ep.name.as_str()).collect();
        assert!(names.contains(&"add_arrays"));
        assert!(names.contains(&"quad_vertex"));
        assert!(names.contains(&"quad_fragment"));

        let sig = reflect(source, "add_arrays").unwrap();
        assert_eq!(sig.argument_count(), 3);
        assert!(sig.arguments[0].read_only && sig.arguments[1].read_only);
        assert!(!sig.arguments[2].read_only);
        assert!(sig.uses_dispatch_params);
    }

    #[tokio::test]
    async fn test_symbol_lookup() {
        let ctx = match AcceleratorContext::new().await {
            Ok(ctx) => ctx,
            Err(_) => return,
        };
        let program = Program::compile(&ctx, "kernels", KERNELS).unwrap();

        assert!(program.kernel("double").is_ok());
        assert_eq!(program.entry_points(Stage::Compute), vec!["double", "fill"]);
        assert!(matches!(
            program.kernel("missing"),
            Err(ProgramError::SymbolNotFound { stage: "compute", .. })
        ));
        // Right name, wrong stage
        assert!(matches!(
            program.vertex("double"),
            Err(ProgramError::SymbolNotFound { stage: "vertex", .. })
        ));
    }
}
