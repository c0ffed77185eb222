//! Translates one validated, register-resolved, typed `Graph` into an LLVM
//! function, grounded on `original_source`'s `ModuleCompiler::compileGraph`/
//! `compileBlock`/`compileInst` (`backend_llvm.cc`).
//!
//! Unlike the source, this backend assumes `resolve_regs` has already run:
//! the only `Reg` instructions that can still reach codegen are unresolved
//! entry reads of the pointer register, read straight from the tape
//! parameter, and no `SetReg` survives at all. A value-producing
//! instruction that is neither maps to a real bug upstream and is reported
//! rather than miscompiled.

use std::collections::HashMap;

use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::values::{BasicValueEnum, FunctionValue, IntValue, PhiValue};
use inkwell::IntPredicate;

use bfjit_ir::{BlockId, CellWidth, Graph, Immediate, InstId, InstKind, RegKind, TypeId};

use crate::error::CodegenError;
use crate::runtime;
use crate::types::{cell_type, llvm_type, ptr_type};

/// Compiles `graph` into a function named `name` with signature
/// `fn(context: *mut (), tape: *mut Cell) -> *mut Cell`, per the backend's
/// ABI contract.
pub fn compile_function<'ctx>(
    context: &'ctx Context,
    module: &Module<'ctx>,
    graph: &Graph,
    name: &str,
) -> Result<FunctionValue<'ctx>, CodegenError> {
    let width = graph.config.cell_width;
    let ptr_ty = ptr_type(context);
    let fn_type = ptr_ty.fn_type(&[ptr_ty.into(), ptr_ty.into()], false);
    let function = module.add_function(name, fn_type, None);

    let builder = context.create_builder();
    let blocks: HashMap<BlockId, BasicBlock<'ctx>> = graph
        .live_blocks()
        .map(|b| (b, context.append_basic_block(function, &format!("bb{}", b.0))))
        .collect();

    let mut values: HashMap<InstId, BasicValueEnum<'ctx>> = HashMap::new();
    let mut phis: HashMap<InstId, PhiValue<'ctx>> = HashMap::new();

    for block_id in graph.live_blocks() {
        builder.position_at_end(blocks[&block_id]);
        for inst_id in graph.block_insts(block_id) {
            if let Some(value) = compile_inst(
                context, module, &builder, graph, function, &blocks, &values, &mut phis,
                width, inst_id,
            )? {
                values.insert(inst_id, value);
            }
        }
    }

    wire_phis(&builder, graph, &blocks, &values, &phis)?;

    Ok(function)
}

#[allow(clippy::too_many_arguments)]
fn compile_inst<'ctx>(
    context: &'ctx Context,
    module: &Module<'ctx>,
    builder: &Builder<'ctx>,
    graph: &Graph,
    function: FunctionValue<'ctx>,
    blocks: &HashMap<BlockId, BasicBlock<'ctx>>,
    values: &HashMap<InstId, BasicValueEnum<'ctx>>,
    phis: &mut HashMap<InstId, PhiValue<'ctx>>,
    width: CellWidth,
    id: InstId,
) -> Result<Option<BasicValueEnum<'ctx>>, CodegenError> {
    let data = graph.inst(id);
    let cell_ty = cell_type(context, width);

    let input = |i: usize| -> Result<BasicValueEnum<'ctx>, CodegenError> {
        let operand = data.inputs[i];
        values
            .get(&operand)
            .copied()
            .ok_or_else(|| CodegenError::Unresolved(format!("%{} used before it was compiled", operand.0)))
    };

    match data.kind {
        InstKind::Nop => Ok(None),

        InstKind::Imm => {
            let v = match data.imm {
                Immediate::Int(v) | Immediate::Size(v) => v,
                _ => return Err(CodegenError::Unresolved("Imm without an integer payload".into())),
            };
            let llvm_ty = llvm_type(context, width, data.ty)?.into_int_type();
            let signed = data.ty != TypeId::Size;
            Ok(Some(llvm_ty.const_int(v as u64, signed).into()))
        }

        InstKind::Add => {
            let ty = llvm_type(context, width, data.ty)?.into_int_type();
            let lhs = cast_int(builder, input(0)?.into_int_value(), ty)?;
            let rhs = cast_int(builder, input(1)?.into_int_value(), ty)?;
            let v = builder
                .build_int_add(lhs, rhs, "add")
                .map_err(|e| CodegenError::Llvm(e.to_string()))?;
            Ok(Some(v.into()))
        }

        InstKind::Sub => {
            let ty = llvm_type(context, width, data.ty)?.into_int_type();
            let lhs = cast_int(builder, input(0)?.into_int_value(), ty)?;
            let rhs = cast_int(builder, input(1)?.into_int_value(), ty)?;
            let v = builder
                .build_int_sub(lhs, rhs, "sub")
                .map_err(|e| CodegenError::Llvm(e.to_string()))?;
            Ok(Some(v.into()))
        }

        InstKind::Gep => {
            let base = input(0)?.into_pointer_value();
            let offset = input(1)?.into_int_value();
            let v = unsafe {
                builder
                    .build_gep(cell_ty, base, &[offset], "gep")
                    .map_err(|e| CodegenError::Llvm(e.to_string()))?
            };
            Ok(Some(v.into()))
        }

        InstKind::Ld => {
            let ptr = input(0)?.into_pointer_value();
            let v = builder
                .build_load(cell_ty, ptr, "ld")
                .map_err(|e| CodegenError::Llvm(e.to_string()))?;
            Ok(Some(v))
        }

        InstKind::Str => {
            let ptr = input(0)?.into_pointer_value();
            let value = input(1)?;
            builder
                .build_store(ptr, value)
                .map_err(|e| CodegenError::Llvm(e.to_string()))?;
            Ok(None)
        }

        InstKind::Reg => {
            let reg = match data.imm {
                Immediate::Reg(r) => r,
                _ => return Err(CodegenError::Unresolved("Reg without a RegKind immediate".into())),
            };
            match reg {
                RegKind::Ptr => {
                    let tape = function
                        .get_nth_param(1)
                        .ok_or_else(|| CodegenError::Llvm("missing tape parameter".into()))?;
                    Ok(Some(tape))
                }
                RegKind::Def => Err(CodegenError::Unresolved(
                    "the def register has no entry value; it must never reach codegen".into(),
                )),
            }
        }

        InstKind::SetReg => Err(CodegenError::Unresolved(
            "SetReg survived register resolution".into(),
        )),

        InstKind::GetChar => {
            let context_arg = function
                .get_nth_param(0)
                .ok_or_else(|| CodegenError::Llvm("missing context parameter".into()))?;
            let getchar = module
                .get_function(runtime::GETCHAR_NAME)
                .ok_or_else(|| CodegenError::MissingEntry(runtime::GETCHAR_NAME.to_string()))?;
            let call = builder
                .build_call(getchar, &[context_arg.into()], "getchar")
                .map_err(|e| CodegenError::Llvm(e.to_string()))?;
            let raw = call
                .try_as_basic_value()
                .left()
                .ok_or_else(|| CodegenError::Llvm("bf_getchar returned void".into()))?
                .into_int_value();
            let v = builder
                .build_int_cast_sign_flag(raw, cell_ty, false, "getchar_cell")
                .map_err(|e| CodegenError::Llvm(e.to_string()))?;
            Ok(Some(v.into()))
        }

        InstKind::PutChar => {
            let context_arg = function
                .get_nth_param(0)
                .ok_or_else(|| CodegenError::Llvm("missing context parameter".into()))?;
            let putchar = module
                .get_function(runtime::PUTCHAR_NAME)
                .ok_or_else(|| CodegenError::MissingEntry(runtime::PUTCHAR_NAME.to_string()))?;
            let value = cast_int(builder, input(0)?.into_int_value(), context.i32_type())?;
            builder
                .build_call(putchar, &[context_arg.into(), value.into()], "putchar")
                .map_err(|e| CodegenError::Llvm(e.to_string()))?;
            Ok(None)
        }

        InstKind::Phi => {
            let ty = llvm_type(context, width, data.ty)?;
            let phi = builder
                .build_phi(ty, "phi")
                .map_err(|e| CodegenError::Llvm(e.to_string()))?;
            phis.insert(id, phi);
            Ok(Some(phi.as_basic_value()))
        }

        InstKind::If => {
            let cond = cast_int(builder, input(0)?.into_int_value(), cell_ty)?;
            let zero = cell_ty.const_zero();
            let test = builder
                .build_int_compare(IntPredicate::NE, cond, zero, "ifcond")
                .map_err(|e| CodegenError::Llvm(e.to_string()))?;
            let block = graph.block(data.block);
            let then_bb = blocks[&block.successors[0]];
            let else_bb = blocks[&block.successors[1]];
            builder
                .build_conditional_branch(test, then_bb, else_bb)
                .map_err(|e| CodegenError::Llvm(e.to_string()))?;
            Ok(None)
        }

        InstKind::Goto => {
            let block = graph.block(data.block);
            let target = blocks[&block.successors[0]];
            builder
                .build_unconditional_branch(target)
                .map_err(|e| CodegenError::Llvm(e.to_string()))?;
            Ok(None)
        }

        InstKind::Ret => {
            let value = input(0)?;
            builder
                .build_return(Some(&value))
                .map_err(|e| CodegenError::Llvm(e.to_string()))?;
            Ok(None)
        }
    }
}

/// Zero-extends or truncates an int value to `target`, matching
/// `original_source`'s `getValue(inst, type)` coercion (`CreateIntCast(...,
/// false)`). A no-op when the widths already match.
fn cast_int<'ctx>(
    builder: &Builder<'ctx>,
    value: IntValue<'ctx>,
    target: inkwell::types::IntType<'ctx>,
) -> Result<IntValue<'ctx>, CodegenError> {
    if value.get_type() == target {
        return Ok(value);
    }
    builder
        .build_int_cast_sign_flag(value, target, false, "widen")
        .map_err(|e| CodegenError::Llvm(e.to_string()))
}

/// Wires every phi's incoming edges once all blocks (and therefore every
/// possible input value) have been compiled. Mirrors the deferred
/// `pendingPhis` loop in `backend_llvm.cc`: a loop header's phi is built
/// before its body block exists, so incoming values can only be resolved
/// in a second pass. A predecessor whose contribution has a narrower int
/// width than the phi gets an extending cast inserted just before that
/// predecessor's terminator, exactly where the source inserts its
/// `CreateIntCast`.
fn wire_phis<'ctx>(
    builder: &Builder<'ctx>,
    graph: &Graph,
    blocks: &HashMap<BlockId, BasicBlock<'ctx>>,
    values: &HashMap<InstId, BasicValueEnum<'ctx>>,
    phis: &HashMap<InstId, PhiValue<'ctx>>,
) -> Result<(), CodegenError> {
    for (&id, &phi) in phis {
        let data = graph.inst(id);
        let predecessors = &graph.block(data.block).predecessors;
        let phi_ty = phi.as_basic_value().get_type();
        for (i, &input_id) in data.inputs.iter().enumerate() {
            let predecessor = predecessors[i];
            let mut value = *values
                .get(&input_id)
                .ok_or_else(|| CodegenError::Unresolved(format!("phi input %{} never compiled", input_id.0)))?;
            if value.is_int_value() && value.get_type() != phi_ty {
                let target = phi_ty.into_int_type();
                let pred_bb = blocks[&predecessor];
                let terminator = pred_bb
                    .get_terminator()
                    .ok_or_else(|| CodegenError::Unresolved(format!("block b{} has no terminator", predecessor.0)))?;
                builder.position_before(&terminator);
                value = cast_int(builder, value.into_int_value(), target)?.into();
            }
            phi.add_incoming(&[(&value, blocks[&predecessor])]);
        }
    }
    Ok(())
}
