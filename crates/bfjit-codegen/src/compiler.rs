//! Top-level JIT pipeline, grounded on `original_source`'s `JIT::Pipeline`/
//! `JIT::Handle`/`JIT::Linker` trio (`jit.h`/`jit.cc`), reimplemented with
//! inkwell's `ExecutionEngine` in place of a hand-rolled ORC session.
//!
//! [`JitPipeline`] owns one persistent LLVM `Context`, mirroring the
//! source's single `llvm::LLVMContext` member reused across every graph
//! compiled through it. Each call to [`JitPipeline::compile`] produces a
//! fresh module and its own execution engine, returned as a [`JitHandle`]
//! that keeps both alive for as long as its entry point might be called.

use std::ffi::c_void;

use inkwell::context::Context;
use inkwell::execution_engine::ExecutionEngine;
use inkwell::module::Module;
use inkwell::OptimizationLevel;

use bfjit_ir::Graph;

use crate::error::CodegenError;
use crate::{codegen, runtime};

/// The ABI every compiled program exposes: a context pointer (opaque to the
/// core, owned by whoever registers `bf_putchar`/`bf_getchar`) and a tape
/// pointer in, the same tape pointer (as left by the program's `Ret`) out.
pub type EntryFn = unsafe extern "C" fn(*mut c_void, *mut c_void) -> *mut c_void;

/// A reusable compilation environment holding one LLVM `Context`.
///
/// Compiling a second program through the same pipeline does not reuse the
/// first program's module; it only reuses the `Context`, the same
/// scoping `original_source`'s `Pipeline` gives its `LLVMContext` member.
pub struct JitPipeline {
    context: Context,
}

impl JitPipeline {
    pub fn new() -> Self {
        JitPipeline {
            context: Context::create(),
        }
    }

    /// Translates `graph` to LLVM IR, verifies the module, and stands up a
    /// JIT execution engine for it. `graph` must already be validated,
    /// register-resolved and fully typed; this is re-checked via `validate`
    /// since a validator abort is always a bug, never user error.
    pub fn compile(&self, graph: &Graph, name: &str) -> Result<JitHandle<'_>, CodegenError> {
        bfjit_ir::validate(graph);

        let module = self.context.create_module(name);
        runtime::declare_runtime_functions(&self.context, &module);
        codegen::compile_function(&self.context, &module, graph, name)?;

        module
            .verify()
            .map_err(|e| CodegenError::Verification(e.to_string()))?;

        let engine = module
            .create_jit_execution_engine(OptimizationLevel::Default)
            .map_err(|e| CodegenError::EngineCreation(e.to_string()))?;

        Ok(JitHandle {
            engine,
            module,
            function_name: name.to_string(),
        })
    }
}

impl Default for JitPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// One compiled program, still backed by its engine and module. Dropping
/// this releases the JIT-compiled code; callers must not keep the raw
/// [`EntryFn`] around past the handle's lifetime.
pub struct JitHandle<'ctx> {
    engine: ExecutionEngine<'ctx>,
    module: Module<'ctx>,
    function_name: String,
}

impl<'ctx> JitHandle<'ctx> {
    /// Binds an external symbol the compiled module calls (`bf_putchar`,
    /// `bf_getchar`) to a concrete address, the Rust equivalent of
    /// `Pipeline::addSymbol`.
    pub fn bind_symbol(&self, name: &str, address: usize) -> Result<(), CodegenError> {
        let function = self
            .module
            .get_function(name)
            .ok_or_else(|| CodegenError::MissingEntry(name.to_string()))?;
        self.engine.add_global_mapping(&function, address);
        Ok(())
    }

    /// Resolves the compiled entry point. Both runtime symbols must already
    /// be bound via [`bind_symbol`](Self::bind_symbol); calling the returned
    /// function before that is undefined behavior, the same precondition
    /// `original_source` places on its `EntryFn`.
    ///
    /// # Safety
    /// The returned function pointer must be called with a `tape` argument
    /// that points to memory large enough for every cell offset the
    /// compiled program can reach, and `context` must be whatever the bound
    /// `bf_putchar`/`bf_getchar` implementations expect.
    pub unsafe fn entry(&self) -> Result<EntryFn, CodegenError> {
        let address = self
            .engine
            .get_function_address(&self.function_name)
            .map_err(|e| CodegenError::MissingEntry(format!("{}: {}", self.function_name, e)))?;
        Ok(std::mem::transmute::<usize, EntryFn>(address))
    }

    /// The module's textual LLVM IR, useful for golden-file tests of the
    /// backend without invoking the JIT at all.
    pub fn print_to_string(&self) -> String {
        self.module.print_to_string().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::raw::c_int;

    use bfjit_ir::Config;

    struct Harness {
        output: Vec<u8>,
        input: Vec<u8>,
        input_pos: usize,
    }

    unsafe extern "C" fn harness_putchar(ctx: *mut c_void, byte: c_int) {
        let harness = &mut *(ctx as *mut Harness);
        harness.output.push(byte as u8);
    }

    unsafe extern "C" fn harness_getchar(ctx: *mut c_void) -> c_int {
        let harness = &mut *(ctx as *mut Harness);
        match harness.input.get(harness.input_pos) {
            Some(&b) => {
                harness.input_pos += 1;
                b as c_int
            }
            None => -1,
        }
    }

    fn run(source: &str, input: &[u8], tape_len: usize) -> Vec<u8> {
        let program = bfjit_parser::parse(source);
        let graph = bfjit_opt::build_graph(&program, Config::default());

        let pipeline = JitPipeline::new();
        let handle = pipeline.compile(&graph, "entry").expect("compile");
        handle
            .bind_symbol("bf_putchar", harness_putchar as usize)
            .expect("bind putchar");
        handle
            .bind_symbol("bf_getchar", harness_getchar as usize)
            .expect("bind getchar");

        let mut harness = Harness {
            output: Vec::new(),
            input: input.to_vec(),
            input_pos: 0,
        };
        let mut tape = vec![0u8; tape_len];

        unsafe {
            let entry = handle.entry().expect("entry");
            entry(
                &mut harness as *mut Harness as *mut c_void,
                tape.as_mut_ptr() as *mut c_void,
            );
        }

        harness.output
    }

    #[test]
    fn prints_the_literal_byte_value_nine() {
        let output = run("+++++++++.", &[], 64);
        assert_eq!(output, vec![9]);
    }

    #[test]
    fn echoes_one_input_byte() {
        let output = run(",.", &[65], 64);
        assert_eq!(output, vec![65]);
    }

    #[test]
    fn clears_a_cell_with_a_loop() {
        let output = run("+++++[-]+.", &[], 64);
        assert_eq!(output, vec![1]);
    }

    #[test]
    fn moves_a_value_across_cells_with_a_balanced_loop() {
        let output = run("+++>+++++[<+>-]<.", &[], 64);
        assert_eq!(output, vec![8]);
    }

    #[test]
    fn empty_program_compiles_and_returns_the_tape() {
        let output = run("", &[], 8);
        assert!(output.is_empty());
    }
}
