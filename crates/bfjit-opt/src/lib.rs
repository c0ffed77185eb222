//! Everything that turns a parsed program into a validated, typed graph
//! ready for code generation: lowering, register resolution, folding and
//! common-subexpression elimination.

pub mod cse;
pub mod fold;
pub mod lowering;
pub mod resolve_regs;

pub use cse::cse;
pub use fold::fold;
pub use lowering::lower;
pub use resolve_regs::resolve_regs;

use bfjit_ir::{Config, Graph};
use bfjit_parser::Program;

/// Runs the whole pipeline in the order a driver normally wants it:
/// lower, resolve registers into SSA, fold constant pointer arithmetic,
/// deduplicate within blocks, compute dominance, then resolve every
/// instruction's type. The caller still owns validation and codegen.
pub fn build_graph(program: &Program, config: Config) -> Graph {
    let mut graph = lower(program, config);
    resolve_regs(&mut graph);
    fold(&mut graph);
    cse::cse(&mut graph);
    graph.build_dominators();
    bfjit_ir::resolve_types(&mut graph);
    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_pipeline_produces_a_valid_graph_for_a_scenario() {
        let program = bfjit_parser::parse("-[>-<---]>-.");
        let graph = build_graph(&program, Config::default());
        bfjit_ir::validate(&graph);
    }

    #[test]
    fn full_pipeline_handles_an_empty_program() {
        let program = bfjit_parser::parse("");
        let graph = build_graph(&program, Config::default());
        bfjit_ir::validate(&graph);
    }

    #[test]
    fn full_pipeline_handles_a_trailing_unclosed_loop() {
        let program = bfjit_parser::parse("+[-");
        let graph = build_graph(&program, Config::default());
        bfjit_ir::validate(&graph);
    }
}
