pub mod error;
pub mod linker;
pub mod pipeline;

pub use error::{Diagnostic, ErrorReporter, LumaError, LumaResult};
pub use pipeline::{run, BuildConfig, BuildOutput};
