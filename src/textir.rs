//! Parser for the on-disk textual IR interchange format. Grounded on
//! `vasm/src/instructions.rs`'s parsing *approach* — `Result`-returning,
//! `Rule`-keyed processing functions walking `pest::iterators::Pair`s — the
//! actual grammar here is new since this IR is flat three-address code, far
//! smaller than vasm's R/I/J-type dialect.

use crate::error::ParseError;
use crate::ir::{is_known_direct_symbol, CallTarget, CondCode, Function, Instruction, Operand};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use util::ParseEnumError;

#[derive(Parser)]
#[grammar = "textir.pest"]
struct TextIrParser;

/// Parses a whole source dump into one [`Function`] per blank-line-
/// separated chunk. The first line of each chunk must be a label; it
/// names the function (decided in `DESIGN.md`, not encoded in the
/// grammar, since ordinary block labels and function-start labels are
/// syntactically identical).
pub fn parse_functions(source: &str) -> Result<Vec<Function>, ParseError> {
    source
        .split("\n\n")
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(parse_function)
        .collect()
}

fn parse_function(chunk: &str) -> Result<Function, ParseError> {
    let mut parsed = TextIrParser::parse(Rule::program, chunk)?;
    let program = parsed.next().expect("program rule always produces a pair");

    let mut instructions = Vec::new();
    for line in program.into_inner() {
        match line.as_rule() {
            Rule::line => instructions.push(parse_line(line)?),
            Rule::EOI | Rule::NEWLINE => {}
            other => unreachable!("unexpected top-level rule {:?}", other),
        }
    }

    let name = match instructions.first() {
        Some(Instruction::Label(name)) => name.clone(),
        _ => return Err(ParseError::MissingFunctionLabel),
    };

    Ok(Function::new(name, instructions))
}

fn parse_line(pair: Pair<Rule>) -> Result<Instruction, ParseError> {
    let inner = pair.into_inner().next().expect("line always has one child");
    match inner.as_rule() {
        Rule::label_def => {
            let name = inner
                .into_inner()
                .next()
                .expect("label_def always has an identifier")
                .as_str()
                .to_string();
            Ok(Instruction::Label(name))
        }
        Rule::instruction_line => parse_instruction_line(inner),
        other => unreachable!("unexpected line child {:?}", other),
    }
}

fn parse_instruction_line(pair: Pair<Rule>) -> Result<Instruction, ParseError> {
    let mut parts = pair.into_inner();
    let opcode = parts
        .next()
        .expect("instruction_line always starts with an opcode")
        .as_str()
        .to_lowercase();
    let operands: Vec<Pair<Rule>> = parts.collect();

    match opcode.as_str() {
        "movl" => binary(&opcode, operands, Instruction::Movl),
        "addl" => binary(&opcode, operands, Instruction::Addl),
        "andl" => binary(&opcode, operands, Instruction::Andl),
        "orl" => binary(&opcode, operands, Instruction::Orl),
        "shl" => binary(&opcode, operands, Instruction::Shl),
        "shr" => binary(&opcode, operands, Instruction::Shr),
        "cmpl" => binary(&opcode, operands, Instruction::Cmpl),
        "negl" => unary(&opcode, operands, Instruction::Negl),
        "notl" => unary(&opcode, operands, Instruction::Notl),
        "pushl" => unary(&opcode, operands, Instruction::Pushl),
        "popl" => unary(&opcode, operands, Instruction::Popl),
        "call" => {
            let op = single_operand(&opcode, operands)?;
            Ok(Instruction::Call(to_call_target(op)?))
        }
        "jmp" => Ok(Instruction::Jmp(label_name(single_operand(&opcode, operands)?))),
        other if other.starts_with('j') => {
            let cc = other[1..].parse::<CondCode>().map_err(|_| {
                ParseError::InvalidMnemonic(ParseEnumError {
                    value: opcode.clone(),
                    enum_name: "opcode",
                })
            })?;
            Ok(Instruction::JmpCc(
                cc,
                label_name(single_operand(&opcode, operands)?),
            ))
        }
        _ => Err(ParseError::InvalidMnemonic(ParseEnumError {
            value: opcode,
            enum_name: "opcode",
        })),
    }
}

fn binary(
    opcode: &str,
    operands: Vec<Pair<Rule>>,
    build: impl FnOnce(Operand, Operand) -> Instruction,
) -> Result<Instruction, ParseError> {
    let mut it = operands.into_iter();
    let a = parse_operand(it.next().ok_or_else(|| ParseError::MissingOperand {
        opcode: opcode.to_string(),
    })?)?;
    let b = parse_operand(it.next().ok_or_else(|| ParseError::MissingOperand {
        opcode: opcode.to_string(),
    })?)?;
    Ok(build(a, b))
}

fn unary(
    opcode: &str,
    operands: Vec<Pair<Rule>>,
    build: impl FnOnce(Operand) -> Instruction,
) -> Result<Instruction, ParseError> {
    let op = single_operand(opcode, operands)?;
    Ok(build(parse_operand(op)?))
}

fn single_operand(opcode: &str, operands: Vec<Pair<Rule>>) -> Result<Pair<Rule>, ParseError> {
    operands.into_iter().next().ok_or_else(|| ParseError::MissingOperand {
        opcode: opcode.to_string(),
    })
}

/// The textual form of a jump target is always a bare label identifier.
fn label_name(pair: Pair<Rule>) -> String {
    pair.as_str().to_string()
}

fn to_call_target(pair: Pair<Rule>) -> Result<CallTarget, ParseError> {
    let op = parse_operand(pair)?;
    Ok(match &op {
        Operand::Var(name) if is_known_direct_symbol(name) => CallTarget::Symbol(name.clone()),
        _ => CallTarget::Operand(op),
    })
}

fn parse_operand(pair: Pair<Rule>) -> Result<Operand, ParseError> {
    let text = pair.as_str();
    let inner = pair
        .into_inner()
        .next()
        .expect("operand always wraps exactly one alternative");
    match inner.as_rule() {
        Rule::immediate => {
            let digits = &inner.as_str()[1..];
            let n = digits
                .parse::<i32>()
                .map_err(|source| ParseError::InvalidInt {
                    literal: text.to_string(),
                    source,
                })?;
            Ok(Operand::Imm(n))
        }
        Rule::frame_slot => {
            let digits = inner.as_str().trim_end_matches("(%ebp)");
            let n = digits
                .parse::<i32>()
                .map_err(|source| ParseError::InvalidInt {
                    literal: text.to_string(),
                    source,
                })?;
            Ok(Operand::FrameSlot(n))
        }
        Rule::register => {
            let name = &inner.as_str()[1..];
            let reg = name.parse().map_err(ParseError::InvalidMnemonic)?;
            Ok(Operand::Reg(reg))
        }
        Rule::identifier => Ok(Operand::Var(inner.as_str().to_string())),
        other => unreachable!("unexpected operand child {:?}", other),
    }
}
