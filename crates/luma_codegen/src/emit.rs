use std::path::{Path, PathBuf};

use inkwell::targets::{CodeModel, FileType, InitializationConfig, RelocMode, Target, TargetMachine};
use inkwell::OptimizationLevel;
use rayon::prelude::*;

use crate::CodegenError;

/// One module unit rendered to on-disk output, or the error that kept it
/// from emitting. A failure here never cancels its siblings — every unit
/// gets a chance to emit, and the caller decides whether any failure is
/// fatal.
pub struct EmitResult {
    pub module_name: String,
    pub object_path: Option<PathBuf>,
    pub ir_path: Option<PathBuf>,
    pub asm_path: Option<PathBuf>,
    pub error: Option<String>,
}

/// Creates a target machine for the host triple, tuned for fast codegen
/// rather than optimized output — `luma` relies on the linker, not LLVM, for
/// the final binary shape.
fn host_target_machine() -> Result<TargetMachine, CodegenError> {
    Target::initialize_native(&InitializationConfig::default())
        .map_err(|e| CodegenError::UnknownSymbol(format!("failed to initialize native target: {e}"), String::new()))?;
    let triple = TargetMachine::get_default_triple();
    let target = Target::from_triple(&triple)
        .map_err(|e| CodegenError::UnknownSymbol(format!("no target for triple {triple}: {e}"), String::new()))?;
    let cpu = TargetMachine::get_host_cpu_name().to_string();
    let features = TargetMachine::get_host_cpu_features().to_string();
    target
        .create_target_machine(
            &triple,
            &cpu,
            &features,
            OptimizationLevel::None,
            RelocMode::PIC,
            CodeModel::Small,
        )
        .ok_or_else(|| CodegenError::UnknownSymbol("failed to create target machine".to_string(), String::new()))
}

/// `LUMA_COMPILE_THREADS` env override, bounded to 64; falls back to the
/// detected CPU count, then 4.
fn worker_count() -> usize {
    std::env::var("LUMA_COMPILE_THREADS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .map(|n| n.min(64))
        .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4))
}

/// Writes every unit's module to `<output_dir>/<module_name>.o` (plus `.ll`
/// and `.s` when `save` is set) in a batched, bounded thread pool. `units`
/// pairs a module name with the raw LLVM bitcode bytes — memory buffers
/// rather than `Module` references, since `Module`/`Context` aren't `Send`
/// and each worker needs its own target machine regardless.
pub fn emit_objects_parallel(
    units: &[(String, Vec<u8>)],
    output_dir: &Path,
    save: bool,
) -> Result<Vec<EmitResult>, CodegenError> {
    std::fs::create_dir_all(output_dir)
        .map_err(|e| CodegenError::UnknownSymbol(format!("cannot create {}: {e}", output_dir.display()), String::new()))?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(worker_count())
        .build()
        .map_err(|e| CodegenError::UnknownSymbol(format!("failed to build emission pool: {e}"), String::new()))?;

    let results = pool.install(|| {
        units
            .par_iter()
            .map(|(name, bitcode)| emit_one(name, bitcode, output_dir, save))
            .collect::<Vec<_>>()
    });
    Ok(results)
}

fn emit_one(module_name: &str, bitcode: &[u8], output_dir: &Path, save: bool) -> EmitResult {
    let fail = |error: String| EmitResult {
        module_name: module_name.to_string(),
        object_path: None,
        ir_path: None,
        asm_path: None,
        error: Some(error),
    };

    let context = inkwell::context::Context::create();
    let buffer = inkwell::memory_buffer::MemoryBuffer::create_from_memory_range(bitcode, module_name);
    let module = match inkwell::module::Module::parse_bitcode_from_buffer(&buffer, &context) {
        Ok(m) => m,
        Err(e) => return fail(e.to_string()),
    };

    let machine = match host_target_machine() {
        Ok(m) => m,
        Err(e) => return fail(e.to_string()),
    };
    module.set_triple(&machine.get_triple());
    module.set_data_layout(&machine.get_target_data().get_data_layout());

    let object_path = output_dir.join(format!("{module_name}.o"));
    if let Err(e) = machine.write_to_file(&module, FileType::Object, &object_path) {
        return fail(e.to_string());
    }

    let mut ir_path = None;
    let mut asm_path = None;
    if save {
        let ll_path = output_dir.join(format!("{module_name}.ll"));
        if let Err(e) = module.print_to_file(&ll_path) {
            return fail(e.to_string());
        }
        ir_path = Some(ll_path);

        let s_path = output_dir.join(format!("{module_name}.s"));
        if let Err(e) = machine.write_to_file(&module, FileType::Assembly, &s_path) {
            return fail(e.to_string());
        }
        asm_path = Some(s_path);
    }

    EmitResult {
        module_name: module_name.to_string(),
        object_path: Some(object_path),
        ir_path,
        asm_path,
        error: None,
    }
}
