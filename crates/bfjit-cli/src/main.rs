//! Brainfuck JIT compiler CLI.
//!
//! Parses a source file, runs it through the lowering/resolve/fold/CSE
//! pipeline, validates the result, JIT-compiles it with inkwell, and calls
//! the resulting entry point against a heap-allocated tape, wiring `,`/`.`
//! straight to stdin/stdout.

use std::os::raw::c_void;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use bfjit_cli::config::ConfigArgs;
use bfjit_cli::error::CliError;
use bfjit_cli::runtime::{bf_getchar, bf_putchar, RunState};
use bfjit_cli::tape::Tape;

/// Brainfuck JIT compiler and runner.
#[derive(Parser, Debug)]
#[command(name = "bfjit", about = "Optimizing JIT compiler for Brainfuck")]
struct Cli {
    /// Path to a Brainfuck source file.
    source: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let (config, bounds) = cli.config.resolve()?;

    let source = std::fs::read_to_string(&cli.source).map_err(|source| CliError::ReadSource {
        path: cli.source.display().to_string(),
        source,
    })?;

    // Owned here, not inside the span closure below: the JIT handle borrows
    // from the pipeline's LLVM context for as long as the entry point might
    // still be called.
    let pipeline = bfjit_codegen::JitPipeline::new();

    let handle = tracing::debug_span!("compile").in_scope(|| -> Result<_, CliError> {
        tracing::debug!(bytes = source.len(), "parsing source");
        let program = bfjit_parser::parse(&source);

        tracing::debug!("lowering, resolving and folding");
        let graph = bfjit_opt::build_graph(&program, config);

        tracing::debug!("validating graph");
        bfjit_ir::validate(&graph);

        tracing::debug!("compiling to native code");
        let handle = pipeline.compile(&graph, "main")?;
        handle.bind_symbol("bf_putchar", bf_putchar as usize)?;
        handle.bind_symbol("bf_getchar", bf_getchar as usize)?;
        Ok(handle)
    })?;

    let mut state = RunState {
        eof_value: config.eof_value,
    };
    let mut tape = Tape::new(bounds);

    tracing::debug_span!("run").in_scope(|| -> Result<(), CliError> {
        unsafe {
            let entry = handle.entry()?;
            entry(&mut state as *mut RunState as *mut c_void, tape.start_ptr());
        }
        Ok(())
    })?;

    Ok(())
}
