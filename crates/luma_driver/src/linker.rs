use std::path::Path;
use std::process::Command;

use crate::error::LumaError;

/// Links every object file produced by codegen into one native executable.
///
/// macOS links with dead-stripping and strips the symbol table afterward;
/// every other platform links `-pie`. Both platforms retry once with `gcc`
/// if the primary `cc` invocation fails to spawn (a machine with `cc`
/// aliased away or missing entirely) before giving up.
pub fn link(objects: &[impl AsRef<Path>], output_path: &Path, opt_level: u8) -> Result<(), LumaError> {
    if cfg!(target_os = "macos") {
        run_with_fallback("cc", "gcc", objects, output_path, &["-Wl,-dead_strip"], opt_level)?;
        let status = Command::new("strip").arg("-x").arg(output_path).status();
        if let Ok(status) = status {
            if !status.success() {
                return Err(LumaError::Link(format!("strip exited with status: {status}")));
            }
        }
        Ok(())
    } else {
        run_with_fallback("cc", "gcc", objects, output_path, &["-pie"], opt_level)
            .or_else(|_| run_with_fallback("gcc", "gcc", objects, output_path, &["-no-pie"], opt_level))
    }
}

fn run_with_fallback(
    primary: &str,
    fallback: &str,
    objects: &[impl AsRef<Path>],
    output_path: &Path,
    extra_flags: &[&str],
    opt_level: u8,
) -> Result<(), LumaError> {
    match invoke(primary, objects, output_path, extra_flags, opt_level) {
        Ok(()) => Ok(()),
        Err(_) if primary != fallback => invoke(fallback, objects, output_path, extra_flags, opt_level),
        Err(e) => Err(e),
    }
}

fn invoke(
    cc: &str,
    objects: &[impl AsRef<Path>],
    output_path: &Path,
    extra_flags: &[&str],
    opt_level: u8,
) -> Result<(), LumaError> {
    let mut cmd = Command::new(cc);
    cmd.arg(format!("-O{opt_level}"));
    for flag in extra_flags {
        cmd.arg(flag);
    }
    cmd.arg("-o").arg(output_path);
    for obj in objects {
        cmd.arg(obj.as_ref());
    }

    let status = cmd
        .status()
        .map_err(|e| LumaError::Link(format!("failed to invoke {cc}: {e}")))?;
    if !status.success() {
        return Err(LumaError::Link(format!("{cc} exited with status: {status}")));
    }
    Ok(())
}
