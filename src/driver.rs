//! Pipeline orchestration for the command-line tool.
//!
//! Runs every stage in order and prints each stage's output distinctly:
//! parsed instructions, abstract instructions, x86 instructions, the
//! hex-encoded thunk, and the final register values. A stage failure
//! becomes a diagnostic naming the stage.

use std::path::Path;

use crate::asm::{Reg, parse_program};
use crate::jit::regmap::Mapping;
use crate::jit::{encode_program, execute, map_registers, optimize, realize, translate};
use crate::labels::LabelArena;

/// Compile and execute one source file, printing every stage.
pub fn run_file(path: &Path) -> Result<(), String> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| format!("failed reading {}: {}", path.display(), e))?;

    let mut labels = LabelArena::new();

    let instrs =
        parse_program(&source, &mut labels).map_err(|e| format!("parse error: {}", e))?;
    println!("parsed instructions:");
    for instr in &instrs {
        println!("  {}", instr.describe(&labels));
    }

    let mut ir = translate(&instrs).map_err(|e| format!("translate error: {}", e))?;
    optimize(&mut ir);
    println!("\nabstract instructions:");
    for instr in &ir {
        println!("  {}", instr.describe(&labels));
    }

    let map = map_registers(&ir);

    let x86 = realize(&ir, &map, &mut labels).map_err(|e| format!("realize error: {}", e))?;
    println!("\nx86 instructions:");
    for instr in &x86 {
        println!("  {}", instr.describe(&labels));
    }

    let thunk = encode_program(&x86, &labels).map_err(|e| format!("encode error: {}", e))?;
    println!("\nencoded x86 instructions:");
    println!("{}", thunk.to_hex());

    let file = execute(&thunk, map.num_stack_slots)
        .map_err(|e| format!("execution error: {}", e))?;

    println!("\nfinal register values:");
    for reg in Reg::ALL {
        let Some(mapping) = map.get(reg) else {
            continue;
        };
        let value = file
            .value_of(reg, &map)
            .expect("mapped register must have a value");
        match mapping {
            Mapping::Host(host) => println!("{} = {} = {}", reg, host, value),
            Mapping::Stack(slot) => println!("{} = [stack + {}] = {}", reg, slot, value),
        }
    }

    Ok(())
}

/// Parse one source file and print the instruction stream, nothing more.
pub fn parse_file(path: &Path) -> Result<(), String> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| format!("failed reading {}: {}", path.display(), e))?;

    let mut labels = LabelArena::new();
    let instrs =
        parse_program(&source, &mut labels).map_err(|e| format!("parse error: {}", e))?;
    for instr in &instrs {
        println!("{}", instr.describe(&labels));
    }

    Ok(())
}
