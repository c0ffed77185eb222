//! Declares the two external symbols every compiled program calls out to:
//! `bf_putchar`/`bf_getchar`. Mirrors `original_source`'s
//! `ModuleCompiler` constructor, which declares these with external linkage
//! and leaves their addresses to be resolved by the JIT linker.

use inkwell::context::Context;
use inkwell::module::{Linkage, Module};
use inkwell::values::FunctionValue;
use inkwell::AddressSpace;

pub const PUTCHAR_NAME: &str = "bf_putchar";
pub const GETCHAR_NAME: &str = "bf_getchar";

/// Declares (but does not define) `bf_putchar(ctx: *mut (), byte: i32)` and
/// `bf_getchar(ctx: *mut ()) -> i32` in `module`. The caller supplies the
/// real addresses later via `JitHandle::bind_symbol`.
pub fn declare_runtime_functions<'ctx>(
    context: &'ctx Context,
    module: &Module<'ctx>,
) -> (FunctionValue<'ctx>, FunctionValue<'ctx>) {
    let ptr_type = context.ptr_type(AddressSpace::default());
    let i32_type = context.i32_type();
    let void_type = context.void_type();

    let putchar_type = void_type.fn_type(&[ptr_type.into(), i32_type.into()], false);
    let putchar = module.add_function(PUTCHAR_NAME, putchar_type, Some(Linkage::External));

    let getchar_type = i32_type.fn_type(&[ptr_type.into()], false);
    let getchar = module.add_function(GETCHAR_NAME, getchar_type, Some(Linkage::External));

    (putchar, getchar)
}
