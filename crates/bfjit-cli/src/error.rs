//! Configuration-layer errors: everything that can go wrong before the core
//! crates ever see a validated [`crate::config::Config`]. Corresponds to
//! spec §7's class 2 ("configuration errors").

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("could not parse size \"{0}\"")]
    BadSize(String),

    #[error("unknown size suffix \"{suffix}\" in \"{input}\"")]
    UnknownSizeSuffix { input: String, suffix: String },

    #[error("size cannot be negative: \"{0}\"")]
    NegativeSize(String),

    #[error("invalid cell width {0}, expected 8, 16, 32 or 64")]
    BadCellWidth(u32),

    #[error("failed to read source from {path}: {source}")]
    ReadSource {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Codegen(#[from] bfjit_codegen::CodegenError),
}
