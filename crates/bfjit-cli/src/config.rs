//! Owns the three options from spec §6's "Configuration options" table and
//! turns validated command-line text into a [`bfjit_ir::Config`] plus a pair
//! of tape extents, the CLI's half of spec §7 class 2 ("configuration
//! errors") -- the core crates never see an unvalidated value.

use clap::Args;

use bfjit_ir::{CellWidth, Config as CoreConfig};

use crate::error::CliError;
use crate::sizestr::parse_size;

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Cell width in bits: 8, 16, 32 or 64.
    #[arg(long, default_value_t = 8)]
    pub cell_width: u32,

    /// Value `,` produces once input reaches EOF.
    #[arg(long, default_value_t = 0)]
    pub eof_value: i64,

    /// Bytes of tape reserved to the left of the starting cell (accepts
    /// size suffixes: b, kb, mb, gb, kib, mib, gib).
    #[arg(long, default_value = "64kib")]
    pub tape_left: String,

    /// Bytes of tape reserved to the right of the starting cell.
    #[arg(long, default_value = "64kib")]
    pub tape_right: String,
}

/// Resolved tape extents, in bytes, on either side of the starting cell.
#[derive(Debug, Clone, Copy)]
pub struct TapeBounds {
    pub left: u64,
    pub right: u64,
}

impl ConfigArgs {
    /// Validates every field, producing the core's [`CoreConfig`] and the
    /// tape bounds the CLI itself is responsible for (spec §6: "memory.sizeLeft
    /// / sizeRight" are "external to core").
    pub fn resolve(&self) -> Result<(CoreConfig, TapeBounds), CliError> {
        let cell_width = match self.cell_width {
            8 => CellWidth::W8,
            16 => CellWidth::W16,
            32 => CellWidth::W32,
            64 => CellWidth::W64,
            other => return Err(CliError::BadCellWidth(other)),
        };

        let left = parse_size(&self.tape_left)?;
        let right = parse_size(&self.tape_right)?;

        Ok((
            CoreConfig {
                cell_width,
                eof_value: self.eof_value,
            },
            TapeBounds { left, right },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cell_width: u32) -> ConfigArgs {
        ConfigArgs {
            cell_width,
            eof_value: 0,
            tape_left: "4kib".to_string(),
            tape_right: "4kib".to_string(),
        }
    }

    #[test]
    fn resolves_a_valid_configuration() {
        let (config, bounds) = args(16).resolve().unwrap();
        assert_eq!(config.cell_width, CellWidth::W16);
        assert_eq!(bounds.left, 4 * 1024);
        assert_eq!(bounds.right, 4 * 1024);
    }

    #[test]
    fn rejects_an_unsupported_cell_width() {
        assert!(matches!(
            args(24).resolve(),
            Err(CliError::BadCellWidth(24))
        ));
    }
}
