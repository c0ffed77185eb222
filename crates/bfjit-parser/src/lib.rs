//! Textual parser for the eight-symbol Brainfuck language.
//!
//! Turns a source string into a [`Program`]: an ordered opcode stream plus a
//! side table of [`Seek`] trees for pure pointer-movement subprograms. The
//! parser accepts every input string -- non-command bytes are silently
//! discarded and a trailing unclosed loop is implicitly closed at end of
//! input. There is no "parse error" here; see the crate-level invariants in
//! the workspace `SPEC_FULL.md`, component A.

use serde::{Deserialize, Serialize};

/// One opcode in a parsed program, in source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Opcode {
    /// Run-length additive run (one opcode per maximal run of `+`).
    Add,
    /// Run-length subtractive run (one opcode per maximal run of `-`).
    Sub,
    /// A pure pointer-movement subprogram; indexes into `Program::seeks` in
    /// occurrence order.
    Seek,
    /// An impure (side-effecting) loop open.
    Loop,
    /// Closes the innermost open `Loop`.
    End,
    PutChar,
    GetChar,
}

/// One arm of a [`Seek`] tree: a nested pure loop, followed by the pointer
/// offset accumulated after the loop exits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeekLoop {
    pub seek: Seek,
    pub offset: i64,
}

/// A balanced, pure pointer-movement subprogram: `<`, `>`, and nested
/// balanced pure loops only (no `+ - . ,` anywhere inside, recursively).
/// See the Glossary entry "Seek" in `spec.md`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seek {
    /// Net pointer displacement before the first nested loop (or all of it,
    /// if there are no nested loops).
    pub offset: i64,
    pub loops: Vec<SeekLoop>,
}

/// A parsed program: the opcode stream plus seek trees in occurrence order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub ops: Vec<Opcode>,
    pub seeks: Vec<Seek>,
}

/// Purity information for one bracket-balanced loop, computed by the scan
/// pass and consumed by the emit pass. A loop is pure iff it contains none
/// of `+ - . ,` and every loop nested inside it is pure.
#[derive(Debug, Clone, Copy)]
struct LoopInfo {
    pure: bool,
}

/// Parses Brainfuck source text into a structural [`Program`].
///
/// Two passes over the same byte string, exactly as the original
/// implementation requires (see `SPEC_FULL.md` §11 and `spec.md` §9,
/// "possibly-buggy source behavior"): `scan` builds a purity side table in
/// the same recursive order the `[` brackets appear in the source, then
/// `emit` walks the source again from position zero, re-using that table
/// by index. The two passes must stay in lockstep; re-scanning after
/// resetting `pos` would desynchronize the indices.
pub fn parse(src: &str) -> Program {
    let bytes = src.as_bytes();
    let mut loop_cache = Vec::new();
    let mut scan_pos = 0usize;
    scan(bytes, &mut scan_pos, &mut loop_cache);

    let mut parser = Emitter {
        program: Program::default(),
        bytes,
        pos: 0,
        loop_index: 1,
        loop_cache,
    };
    parser.emit();
    parser.program
}

/// Scans the bracketed structure top-down, recording purity for each loop
/// in the order loops are entered. Unclosed loops are tolerated: reaching
/// end of input while inside a loop simply returns that loop's info as-is.
fn scan(bytes: &[u8], pos: &mut usize, cache: &mut Vec<LoopInfo>) -> usize {
    let me = cache.len();
    cache.push(LoopInfo { pure: true });
    loop {
        match bytes.get(*pos).copied() {
            Some(b',') | Some(b'.') | Some(b'+') | Some(b'-') => {
                cache[me].pure = false;
            }
            Some(b'[') => {
                *pos += 1;
                let child = scan(bytes, pos, cache);
                cache[me].pure = cache[me].pure && cache[child].pure;
                match bytes.get(*pos) {
                    Some(b']') => {}
                    Some(_) => unreachable!("scan: expected ']' to close balanced loop"),
                    None => return me,
                }
            }
            Some(b']') | None => return me,
            _ => {}
        }
        *pos += 1;
    }
}

struct Emitter<'a> {
    program: Program,
    bytes: &'a [u8],
    pos: usize,
    loop_index: usize,
    loop_cache: Vec<LoopInfo>,
}

impl<'a> Emitter<'a> {
    /// Emits the opcode stream, recursing into `parse_seek` for `<`/`>`/pure
    /// `[` and emitting `Loop`/`End` for impure loops.
    fn emit(&mut self) {
        loop {
            match self.bytes.get(self.pos).copied() {
                Some(b'+') => self.program.ops.push(Opcode::Add),
                Some(b'-') => self.program.ops.push(Opcode::Sub),
                Some(b'[') if !self.loop_cache[self.loop_index].pure => {
                    self.loop_index += 1;
                    self.program.ops.push(Opcode::Loop);
                }
                Some(b'[') | Some(b'<') | Some(b'>') => {
                    let start = self.pos;
                    let mut seek = Seek::default();
                    self.parse_seek(&mut seek);
                    self.program.seeks.push(seek);
                    self.program.ops.push(Opcode::Seek);
                    debug_assert_ne!(self.pos, start, "a seek must consume at least one byte");
                    continue;
                }
                Some(b']') => self.program.ops.push(Opcode::End),
                Some(b'.') => self.program.ops.push(Opcode::PutChar),
                Some(b',') => self.program.ops.push(Opcode::GetChar),
                None => return,
                _ => {}
            }
            self.pos += 1;
        }
    }

    /// Walks a pure pointer-movement subprogram into `seek`, stopping at the
    /// first byte that isn't `<`, `>`, or a nested pure `[`.
    ///
    /// A nested pure loop that is never closed (end of input reached inside
    /// it) is implicitly closed here and simply contributes whatever offset
    /// it accumulated before input ran out -- unlike the literal source
    /// translation, nothing is pushed into the enclosing opcode stream for
    /// this case, since a `Seek` is specified to have no side effects at
    /// all (see DESIGN.md for the full rationale).
    fn parse_seek(&mut self, seek: &mut Seek) {
        loop {
            match self.bytes.get(self.pos).copied() {
                Some(b'<') => Self::bump_offset(seek, -1),
                Some(b'>') => Self::bump_offset(seek, 1),
                Some(b'[') if self.loop_cache[self.loop_index].pure => {
                    self.pos += 1;
                    self.loop_index += 1;
                    let mut child = Seek::default();
                    self.parse_seek(&mut child);
                    if let Some(b']') = self.bytes.get(self.pos) {
                        self.pos += 1;
                    }
                    seek.loops.push(SeekLoop { seek: child, offset: 0 });
                    continue;
                }
                // An impure `[`, or any of `] + - . ,` or end of input, ends
                // this seek; the caller resumes from `self.pos`.
                _ => return,
            }
            self.pos += 1;
        }
    }

    fn bump_offset(seek: &mut Seek, delta: i64) {
        match seek.loops.last_mut() {
            Some(last) => last.offset += delta,
            None => seek.offset += delta,
        }
    }
}

/// Renders a [`Program`] back to Brainfuck source text.
///
/// `parse` followed by `print` is a normalizing round trip: re-parsing the
/// result yields a structurally equal `Program` (spec §8, "Round-trip").
pub fn print(program: &Program) -> String {
    let mut out = String::new();
    let mut seek_index = 0;
    for &op in &program.ops {
        match op {
            Opcode::Add => out.push('+'),
            Opcode::Sub => out.push('-'),
            Opcode::Seek => {
                print_seek_into(&mut out, &program.seeks[seek_index]);
                seek_index += 1;
            }
            Opcode::Loop => out.push('['),
            Opcode::End => out.push(']'),
            Opcode::PutChar => out.push('.'),
            Opcode::GetChar => out.push(','),
        }
    }
    out
}

/// Renders a single [`Seek`] tree back to `<`/`>`/`[`/`]` text.
pub fn print_seek(seek: &Seek) -> String {
    let mut out = String::new();
    print_seek_into(&mut out, seek);
    out
}

fn print_seek_offset(out: &mut String, offset: i64) {
    if offset >= 0 {
        for _ in 0..offset {
            out.push('>');
        }
    } else {
        for _ in 0..(-offset) {
            out.push('<');
        }
    }
}

fn print_seek_into(out: &mut String, seek: &Seek) {
    print_seek_offset(out, seek.offset);
    for seek_loop in &seek.loops {
        out.push('[');
        print_seek_into(out, &seek_loop.seek);
        out.push(']');
        print_seek_offset(out, seek_loop.offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_program() {
        let p = parse("");
        assert!(p.ops.is_empty());
        assert!(p.seeks.is_empty());
    }

    #[test]
    fn non_command_bytes_are_discarded() {
        let p = parse("hello + world");
        assert_eq!(p.ops, vec![Opcode::Add]);
    }

    #[test]
    fn additive_runs_are_not_collapsed_by_the_parser() {
        // Collapsing is lowering's job (spec §4.C); the parser emits one
        // opcode per `+`/`-` character.
        let p = parse("+++");
        assert_eq!(p.ops, vec![Opcode::Add, Opcode::Add, Opcode::Add]);
    }

    #[test]
    fn pointer_movement_becomes_a_seek() {
        let p = parse(">>><<");
        assert_eq!(p.ops, vec![Opcode::Seek]);
        assert_eq!(p.seeks, vec![Seek { offset: 1, loops: vec![] }]);
    }

    #[test]
    fn impure_loop_emits_loop_and_end() {
        let p = parse("+[-]");
        assert_eq!(
            p.ops,
            vec![Opcode::Add, Opcode::Loop, Opcode::Sub, Opcode::End]
        );
    }

    #[test]
    fn pure_loop_becomes_a_seek_loop() {
        // `[>+<-]`-shaped but with only pointer movement inside: a fully
        // pure loop, folded entirely into the seek tree.
        let p = parse("[>>]<");
        assert_eq!(p.ops, vec![Opcode::Seek]);
        assert_eq!(p.seeks.len(), 1);
        let seek = &p.seeks[0];
        assert_eq!(seek.offset, 0);
        assert_eq!(seek.loops.len(), 1);
        assert_eq!(seek.loops[0].seek.offset, 2);
        assert_eq!(seek.loops[0].offset, -1);
    }

    #[test]
    fn mixed_pure_and_impure_loop_nesting() {
        // The outer loop contains `+`, so it is impure even though its
        // nested `[>]` is pure on its own.
        let p = parse("+[[>]-]");
        assert_eq!(
            p.ops,
            vec![Opcode::Add, Opcode::Loop, Opcode::Seek, Opcode::Sub, Opcode::End]
        );
    }

    #[test]
    fn unclosed_trailing_loop_is_tolerated() {
        let p = parse("+[-");
        assert_eq!(p.ops, vec![Opcode::Add, Opcode::Loop, Opcode::Sub, Opcode::End]);
    }

    #[test]
    fn unclosed_trailing_seek_loop_is_tolerated() {
        let p = parse("[>");
        assert_eq!(p.ops, vec![Opcode::Seek]);
        assert_eq!(p.seeks[0].loops.len(), 1);
        assert_eq!(p.seeks[0].loops[0].seek.offset, 1);
    }

    #[test]
    fn print_round_trips_scenario_six() {
        let src = "-[>-<---]>-.";
        let program = parse(src);
        let printed = print(&program);
        let reparsed = parse(&printed);
        assert_eq!(program, reparsed);
    }

    #[test]
    fn seek_printer_matches_offsets() {
        let seek = Seek {
            offset: 2,
            loops: vec![SeekLoop {
                seek: Seek { offset: -1, loops: vec![] },
                offset: 3,
            }],
        };
        assert_eq!(print_seek(&seek), ">>[<]>>>");
    }

    proptest::proptest! {
        #[test]
        fn parse_print_parse_is_idempotent(src in "[-+<>\\[\\].,a-z]{0,64}") {
            let program = parse(&src);
            let printed = print(&program);
            let reparsed = parse(&printed);
            proptest::prop_assert_eq!(program, reparsed);
        }
    }
}
