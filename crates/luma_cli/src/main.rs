use std::path::PathBuf;
use std::process;

use clap::Parser;
use luma_driver::{run, BuildConfig, LumaError};

#[derive(Parser, Debug)]
#[command(name = "luma", about = "Luma — a small systems language compiling to native code")]
struct Cli {
    /// Entry source file.
    input: PathBuf,

    /// Additional source files to compile alongside the entry file.
    #[arg(value_name = "FILE")]
    extra_files: Vec<PathBuf>,

    /// Output executable name.
    #[arg(short, long)]
    output: Option<String>,

    /// Optimization level passed through to the linker (0-3).
    #[arg(short = 'O', long = "opt-level", default_value = "0")]
    opt_level: u8,

    /// Keep the per-module .ll and .s files alongside the object files.
    #[arg(long)]
    save: bool,

    /// Generate documentation instead of a binary.
    #[arg(long)]
    document: bool,
}

fn main() {
    let cli = Cli::parse();

    if !cli.input.exists() {
        eprintln!("error: file not found: {}", cli.input.display());
        process::exit(1);
    }

    let mut config = BuildConfig::new(cli.input);
    if let Some(name) = cli.output {
        config.name = name;
    }
    config.files = cli.extra_files;
    config.save = cli.save;
    config.opt_level = cli.opt_level;
    config.is_document = cli.document;

    match run(&config) {
        Ok(_) => {}
        Err(LumaError::Typecheck(errors)) => {
            for e in &errors {
                eprintln!("{e}");
            }
            process::exit(1);
        }
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    }
}
