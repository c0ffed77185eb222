//! Codegen error types covering LLVM module construction and JIT linking.

#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    /// An instruction kind reached codegen that a prior pass should have
    /// removed (`Reg`/`SetReg` outside an entry read, or a type still
    /// `Invalid`). Always a bug upstream, never user input.
    #[error("instruction not resolved for codegen: {0}")]
    Unresolved(String),

    /// LLVM builder/module API failure.
    #[error("LLVM error: {0}")]
    Llvm(String),

    /// Module verification failed after translation.
    #[error("module verification failed: {0}")]
    Verification(String),

    /// Failed to spin up the JIT execution engine for a module.
    #[error("failed to create JIT execution engine: {0}")]
    EngineCreation(String),

    /// A symbol the generated code calls was never bound via
    /// [`crate::JitHandle::bind_symbol`] before the entry point was invoked.
    #[error("unbound external symbol: {0}")]
    UnboundSymbol(String),

    /// The compiled module has no callable entry function under the
    /// requested name.
    #[error("entry function '{0}' not found in compiled module")]
    MissingEntry(String),
}
