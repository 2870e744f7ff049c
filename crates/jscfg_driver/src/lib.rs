pub mod pipeline;

pub use pipeline::{
    BuildError, BuildOptions, BuildOutput, MODULE_UNIT, OutputFormat, Unit, UnhandledNode,
    build_file, build_source,
};
