use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Instant;

use inkwell::context::Context;

use luma_check::Typechecker;
use luma_codegen::emit::emit_objects_parallel;
use luma_codegen::CodegenContext;
use luma_frontend::ast::{Module, Program};
use luma_frontend::{ImportResolver, Lexer, Parser};

use crate::error::{ErrorReporter, LumaError, LumaResult};
use crate::linker;

/// Everything the driver needs to run one build, mirroring the CLI surface
/// one-to-one: an entry file, an explicit extra file list, the output name,
/// and the handful of flags that change *how* the build runs rather than
/// *what* it builds.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub filepath: PathBuf,
    pub name: String,
    pub files: Vec<PathBuf>,
    pub save: bool,
    pub opt_level: u8,
    pub is_document: bool,
}

impl BuildConfig {
    pub fn new(filepath: PathBuf) -> Self {
        let name = filepath
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "a.out".to_string());
        Self { filepath, name, files: Vec::new(), save: false, opt_level: 0, is_document: false }
    }
}

/// Result of a successful build: where the executable landed and, when
/// `--save` was set, the per-module `.ll`/`.s` siblings left next to it.
pub struct BuildOutput {
    pub executable: PathBuf,
    pub object_files: Vec<PathBuf>,
}

fn tick(stage: &str, start: Instant) {
    eprintln!("[{stage}] {} ms", start.elapsed().as_millis());
}

/// Runs the full lex -> parse -> import -> typecheck -> codegen -> link
/// pipeline for one [`BuildConfig`].
pub fn run(config: &BuildConfig) -> LumaResult<BuildOutput> {
    let overall = Instant::now();
    let mut reporter = ErrorReporter::new();

    let program = load_program(config, &mut reporter)?;
    if reporter.has_errors() {
        return Err(LumaError::FatalRuntime(format_diagnostics(&reporter)));
    }

    if config.is_document {
        // Documentation generation is intentionally out of scope; the flag
        // still short-circuits the pipeline rather than silently building.
        eprintln!("--document requested but no doc generator is wired up; nothing written.");
        return Err(LumaError::FatalRuntime("--document is not implemented".to_string()));
    }

    let mut typed_program = program;
    let stage_start = Instant::now();
    let scopes = Typechecker::new()
        .check(&mut typed_program)
        .map_err(LumaError::Typecheck)?;
    tick("typecheck", stage_start);

    let stage_start = Instant::now();
    let context = Context::create();
    let mut codegen = CodegenContext::new(&context);
    codegen.compile(&typed_program, scopes)?;
    tick("codegen", stage_start);

    let stage_start = Instant::now();
    let bitcode_units: Vec<(String, Vec<u8>)> = codegen
        .units
        .iter()
        .map(|u| (u.module_name.clone(), u.to_bitcode()))
        .collect();
    let output_dir = std::env::temp_dir().join(format!("luma-build-{}", config.name));
    let emit_results = emit_objects_parallel(&bitcode_units, &output_dir, config.save)?;

    let mut object_files = Vec::with_capacity(emit_results.len());
    for result in &emit_results {
        if let Some(err) = &result.error {
            return Err(LumaError::Backend(format!("{}: {err}", result.module_name)));
        }
        if let Some(path) = &result.object_path {
            object_files.push(path.clone());
        }
    }
    tick("emit", stage_start);

    let stage_start = Instant::now();
    let executable = PathBuf::from(&config.name);
    linker::link(&object_files, &executable, config.opt_level)?;
    tick("link", stage_start);

    eprintln!("Build succeeded! Written to '{}' ({} ms)", config.name, overall.elapsed().as_millis());
    Ok(BuildOutput { executable, object_files })
}

/// Stages 1-4: lex and parse the entry file plus every explicitly listed
/// file, recursively pulling in `@use` imports (deduped by resolved module
/// name so a diamond-shaped import graph only compiles each module once),
/// then combines every parsed [`Module`] into one [`Program`].
fn load_program(config: &BuildConfig, reporter: &mut ErrorReporter) -> LumaResult<Program> {
    let stage_start = Instant::now();
    let resolver = ImportResolver::new(default_std_roots());
    let mut modules = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let mut queue: VecDeque<PathBuf> = VecDeque::new();

    queue.push_back(config.filepath.clone());
    for extra in &config.files {
        queue.push_back(extra.clone());
    }

    while let Some(path) = queue.pop_front() {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
        if !seen.insert(canonical.clone()) {
            continue;
        }
        let module = parse_one(&path, modules.len())?;
        for use_decl in &module.uses {
            match resolver.resolve(&use_decl.module_name) {
                Ok(resolved) => queue.push_back(resolved),
                Err(e) => reporter.push(crate::error::Diagnostic::new(e.to_string())),
            }
        }
        modules.push(module);
    }

    tick("parse", stage_start);
    Ok(Program { modules })
}

fn parse_one(path: &std::path::Path, position: usize) -> LumaResult<Module> {
    let source = std::fs::read_to_string(path)?;
    let tokens = Lexer::new(&source).tokenize()?;
    let module = Parser::new(&tokens, path.to_path_buf(), position).parse_module()?;
    Ok(module)
}

fn default_std_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            roots.push(dir.join("std"));
        }
    }
    roots.push(PathBuf::from("std"));
    roots
}

fn format_diagnostics(reporter: &ErrorReporter) -> String {
    reporter
        .diagnostics()
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_config_derives_name_from_entry_file_stem() {
        let config = BuildConfig::new(PathBuf::from("examples/hello.luma"));
        assert_eq!(config.name, "hello");
        assert!(!config.save);
        assert_eq!(config.opt_level, 0);
    }

    #[test]
    fn explicit_output_name_overrides_stem() {
        let mut config = BuildConfig::new(PathBuf::from("main.luma"));
        config.name = "app".to_string();
        assert_eq!(config.name, "app");
    }

    #[test]
    fn std_roots_always_include_a_relative_fallback() {
        let roots = default_std_roots();
        assert!(roots.contains(&PathBuf::from("std")));
    }
}
