//! Mapping from IR [`TypeId`]s to LLVM types via inkwell, grounded on
//! `original_source`'s `ModuleCompiler::convertType`.

use inkwell::context::Context;
use inkwell::types::{BasicTypeEnum, PointerType};
use inkwell::AddressSpace;

use bfjit_ir::{CellWidth, TypeId};

use crate::error::CodegenError;

/// The tape's element type for the configured cell width: `i8`/`i16`/`i32`/`i64`.
pub fn cell_type<'ctx>(context: &'ctx Context, width: CellWidth) -> inkwell::types::IntType<'ctx> {
    match width {
        CellWidth::W8 => context.i8_type(),
        CellWidth::W16 => context.i16_type(),
        CellWidth::W32 => context.i32_type(),
        CellWidth::W64 => context.i64_type(),
    }
}

/// Opaque pointer type used for both the tape pointer and the context
/// pointer passed into every compiled entry point.
pub fn ptr_type(context: &Context) -> PointerType<'_> {
    context.ptr_type(AddressSpace::default())
}

/// Converts an IR value type into the LLVM type codegen should use to hold
/// it. `TypeId::None` has no LLVM counterpart and must never reach here --
/// only value-producing instructions call this.
pub fn llvm_type<'ctx>(
    context: &'ctx Context,
    _width: CellWidth,
    ty: TypeId,
) -> Result<BasicTypeEnum<'ctx>, CodegenError> {
    match ty {
        TypeId::None => Err(CodegenError::Unresolved(
            "attempted to materialize a value-less type".to_string(),
        )),
        TypeId::Invalid => Err(CodegenError::Unresolved(
            "instruction reached codegen with an unresolved type".to_string(),
        )),
        TypeId::Ptr => Ok(ptr_type(context).into()),
        TypeId::Size => Ok(context.i64_type().into()),
        TypeId::I8 => Ok(context.i8_type().into()),
        TypeId::I16 => Ok(context.i16_type().into()),
        TypeId::I32 => Ok(context.i32_type().into()),
        TypeId::I64 => Ok(context.i64_type().into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_type_widths_match_bit_width() {
        let context = Context::create();
        assert_eq!(cell_type(&context, CellWidth::W8).get_bit_width(), 8);
        assert_eq!(cell_type(&context, CellWidth::W16).get_bit_width(), 16);
        assert_eq!(cell_type(&context, CellWidth::W32).get_bit_width(), 32);
        assert_eq!(cell_type(&context, CellWidth::W64).get_bit_width(), 64);
    }

    #[test]
    fn invalid_and_none_types_are_rejected() {
        let context = Context::create();
        assert!(llvm_type(&context, CellWidth::W8, TypeId::Invalid).is_err());
        assert!(llvm_type(&context, CellWidth::W8, TypeId::None).is_err());
        assert!(llvm_type(&context, CellWidth::W8, TypeId::Ptr).is_ok());
    }
}
