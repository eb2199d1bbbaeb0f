//! Bytecode disassembler for debugging.

use std::fmt::Write;

use crate::bytecode::instruction::{read_operands, Definition, Op};

/// Disassemble an instruction stream into human-readable output, one line
/// per instruction:
///
/// ```text
/// 0000 OpAdd
/// 0001 OpConstant 2
/// 0004 OpConstant 65535
/// ```
pub fn disassemble(instructions: &[u8]) -> String {
    let mut output = String::new();
    let mut offset = 0;

    while offset < instructions.len() {
        let byte = instructions[offset];
        let Some(op) = Op::from_u8(byte) else {
            writeln!(output, "{:04} ERROR: opcode {} undefined", offset, byte).unwrap();
            offset += 1;
            continue;
        };

        let def = op.definition();
        let (operands, read) = read_operands(&def, &instructions[offset + 1..]);
        writeln!(output, "{:04} {}", offset, fmt_instruction(&def, &operands)).unwrap();

        offset += 1 + read;
    }

    output
}

fn fmt_instruction(def: &Definition, operands: &[usize]) -> String {
    match def.operand_widths.len() {
        0 => def.name.to_string(),
        1 => format!("{} {}", def.name, operands[0]),
        n => format!("ERROR: unhandled operand count {} for {}", n, def.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::instruction::make;

    #[test]
    fn test_disassemble_format() {
        let instructions = [
            make(Op::Add, &[]),
            make(Op::Constant, &[2]),
            make(Op::Constant, &[65535]),
        ]
        .concat();

        let expected = "\
0000 OpAdd
0001 OpConstant 2
0004 OpConstant 65535
";
        assert_eq!(disassemble(&instructions), expected);
    }

    #[test]
    fn test_one_line_per_instruction() {
        let encoded = [
            make(Op::True, &[]),
            make(Op::JumpNotTruthy, &[10]),
            make(Op::Constant, &[0]),
            make(Op::Jump, &[11]),
            make(Op::Null, &[]),
            make(Op::Pop, &[]),
        ];
        let stream: Vec<u8> = encoded.concat();

        let listing = disassemble(&stream);
        assert_eq!(listing.lines().count(), encoded.len());
    }

    #[test]
    fn test_unknown_opcode_is_reported_inline() {
        let listing = disassemble(&[255, Op::Pop as u8]);
        assert_eq!(
            listing,
            "0000 ERROR: opcode 255 undefined\n0001 OpPop\n"
        );
    }
}
