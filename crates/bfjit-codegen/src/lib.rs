//! LLVM/inkwell backend: turns a validated, register-resolved, typed IR
//! graph into a callable native function, and runs it as a JIT.

pub mod codegen;
pub mod compiler;
pub mod error;
pub mod runtime;
pub mod types;

pub use compiler::{EntryFn, JitHandle, JitPipeline};
pub use error::CodegenError;
