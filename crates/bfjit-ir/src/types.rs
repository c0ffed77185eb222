use serde::{Deserialize, Serialize};

/// The tape cell width a compiled program was configured for.
///
/// Mirrors `original_source`'s `typeForWidth`, which maps the runtime cell
/// size onto one of the builtin integer types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeId {
    /// Sentinel used while a phi's type is still being resolved; must never
    /// survive to a validated graph.
    Invalid,
    /// No value is produced (e.g. `Goto`, `Ret`, `SetReg`).
    None,
    /// An opaque tape address.
    Ptr,
    /// The machine's pointer-sized integer, used for byte offsets.
    Size,
    I8,
    I16,
    I32,
    I64,
}

impl TypeId {
    /// Rank within the `I8 < I16 < I32 < I64` integer-width lattice, or
    /// `None` if this type does not participate in it.
    fn rank(self) -> Option<u8> {
        match self {
            TypeId::I8 => Some(0),
            TypeId::I16 => Some(1),
            TypeId::I32 => Some(2),
            TypeId::I64 => Some(3),
            _ => None,
        }
    }

    pub fn for_cell_width(width: CellWidth) -> TypeId {
        match width {
            CellWidth::W8 => TypeId::I8,
            CellWidth::W16 => TypeId::I16,
            CellWidth::W32 => TypeId::I32,
            CellWidth::W64 => TypeId::I64,
        }
    }
}

/// Widest-of-two within the integer lattice. Panics if either type is
/// outside `I8..=I64`, matching `original_source`'s `maxType` assertion.
pub fn max_type(a: TypeId, b: TypeId) -> TypeId {
    let (ra, rb) = (
        a.rank().expect("max_type operand must be an integer width"),
        b.rank().expect("max_type operand must be an integer width"),
    );
    if ra >= rb {
        a
    } else {
        b
    }
}

/// Narrowest-of-two within the integer lattice.
pub fn min_type(a: TypeId, b: TypeId) -> TypeId {
    let (ra, rb) = (
        a.rank().expect("min_type operand must be an integer width"),
        b.rank().expect("min_type operand must be an integer width"),
    );
    if ra <= rb {
        a
    } else {
        b
    }
}

/// The two pinned registers the lowering pass threads through a function:
/// the tape pointer and the `def`/accumulator value at the current cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegKind {
    Ptr,
    Def,
}

pub const NUM_REGS: usize = 2;

impl RegKind {
    pub fn index(self) -> usize {
        match self {
            RegKind::Ptr => 0,
            RegKind::Def => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RegKind::Ptr => "ptr",
            RegKind::Def => "def",
        }
    }
}

/// Cell width accepted from the command line / configuration layer; resolved
/// into a [`TypeId`] once a [`Graph`](crate::graph::Graph) is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellWidth {
    W8,
    W16,
    W32,
    W64,
}

/// Global knobs that affect lowering and codegen but not parsing.
///
/// Corresponds to spec's "global configuration" carried by the graph:
/// the tape's cell width and the value `,` produces at end of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub cell_width: CellWidth,
    pub eof_value: i64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cell_width: CellWidth::W8,
            eof_value: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lattice_orders_widths() {
        assert_eq!(max_type(TypeId::I8, TypeId::I32), TypeId::I32);
        assert_eq!(min_type(TypeId::I8, TypeId::I32), TypeId::I8);
        assert_eq!(max_type(TypeId::I64, TypeId::I64), TypeId::I64);
    }

    #[test]
    #[should_panic]
    fn lattice_rejects_non_integer_types() {
        max_type(TypeId::Ptr, TypeId::I8);
    }

    #[test]
    fn cell_width_maps_to_type() {
        assert_eq!(TypeId::for_cell_width(CellWidth::W16), TypeId::I16);
    }
}
