//! The compute graph for one compiled Brainfuck function: blocks,
//! instructions, a construction cursor, dominance, type resolution,
//! validation and a textual printer.

pub mod block;
pub mod builder;
pub mod error;
pub mod graph;
pub mod ids;
pub mod inst;
pub mod print;
pub mod typeresolve;
pub mod types;
pub mod validate;

pub use block::BlockData;
pub use builder::Builder;
pub use error::GraphError;
pub use graph::Graph;
pub use ids::{BlockId, InstId};
pub use inst::{Immediate, InstData, InstKind};
pub use print::print_graph;
pub use typeresolve::resolve_types;
pub use types::{max_type, min_type, CellWidth, Config, RegKind, TypeId, NUM_REGS};
pub use validate::validate;
