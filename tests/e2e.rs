use std::process::Command;

fn run_mjit(source: &str) -> (String, String, bool) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prog.s");
    std::fs::write(&path, source).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_mjit"))
        .args(["run", path.to_str().unwrap()])
        .output()
        .expect("failed to execute mjit");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();

    (stdout, stderr, success)
}

fn assert_success(source: &str) -> String {
    let (stdout, stderr, success) = run_mjit(source);
    assert!(success, "program should succeed, stderr:\n{}", stderr);
    stdout
}

fn assert_failure(source: &str) -> String {
    let (_, stderr, success) = run_mjit(source);
    assert!(!success, "program should fail");
    stderr
}

/// Final-value line for a register, e.g. `$t0 = edx = 5`.
fn final_value(stdout: &str, reg: &str) -> Option<u32> {
    let values = stdout.split("final register values:").nth(1)?;
    for line in values.lines() {
        let mut parts = line.split(" = ");
        if parts.next()?.trim() == reg {
            let _storage = parts.next()?;
            return parts.next()?.trim().parse().ok();
        }
    }
    None
}

#[test]
fn test_straight_line_program() {
    // Scenario A: t0 holds 5, t1 holds t0 + t0.
    let stdout = assert_success("addi $t0 $zero 5\nadd $t1 $t0 $t0\nnop\n");

    assert_eq!(final_value(&stdout, "$t0"), Some(5));
    assert_eq!(final_value(&stdout, "$t1"), Some(10));

    // Every stage is printed distinctly.
    assert!(stdout.contains("parsed instructions:"));
    assert!(stdout.contains("abstract instructions:"));
    assert!(stdout.contains("x86 instructions:"));
    assert!(stdout.contains("encoded x86 instructions:"));
    assert!(stdout.contains("final register values:"));
}

#[test]
fn test_backward_branch_loop() {
    // Scenario B: increment t0 until it reaches s0 == 3.
    let stdout = assert_success(
        "addi $s0 $zero 3\n\
         addi $t0 $zero 0\n\
         loop: addi $t0 $t0 1\n\
         bne $t0 $s0 loop\n",
    );
    assert_eq!(final_value(&stdout, "$t0"), Some(3));
}

#[test]
fn test_forward_branch() {
    let stdout = assert_success(
        "addi $t0 $zero 1\n\
         beq $t0 $t0 end\n\
         addi $t0 $t0 100\n\
         end: addi $t1 $t0 1\n",
    );
    assert_eq!(final_value(&stdout, "$t0"), Some(1));
    assert_eq!(final_value(&stdout, "$t1"), Some(2));
}

#[test]
fn test_stack_spill_program() {
    // Scenario C: more live registers than the 12-register host pool;
    // the overflow registers live in stack slots and still read back.
    let regs = [
        "$v0", "$v1", "$a0", "$a1", "$a2", "$a3", "$t0", "$t1", "$t2", "$t3", "$t4", "$t5",
        "$t6", "$t7", "$s0", "$s1",
    ];
    let mut source = String::new();
    for (i, reg) in regs.iter().enumerate() {
        for _ in 0..(regs.len() - i) {
            source.push_str(&format!("addi {} {} 0\n", reg, reg));
        }
        source.push_str(&format!("addi {} $zero {}\n", reg, 100 + i));
    }
    let stdout = assert_success(&source);

    for (i, reg) in regs.iter().enumerate() {
        assert_eq!(final_value(&stdout, reg), Some(100 + i as u32), "{}", reg);
    }
    // The four least-used registers spilled.
    assert!(stdout.contains("$t6 = [stack + 0]"));
    assert!(stdout.contains("$t7 = [stack + 1]"));
    assert!(stdout.contains("$s0 = [stack + 2]"));
    assert!(stdout.contains("$s1 = [stack + 3]"));
}

#[test]
fn test_and_and_shift_program() {
    let stdout = assert_success(
        "addi $t0 $zero 12\n\
         andi $t1 $t0 10\n\
         srl $t2 $t0 2\n\
         sll $t3 $t0 3\n",
    );
    assert_eq!(final_value(&stdout, "$t1"), Some(8));
    assert_eq!(final_value(&stdout, "$t2"), Some(3));
    assert_eq!(final_value(&stdout, "$t3"), Some(96));
}

#[test]
fn test_zero_register_in_shift_fails() {
    // Scenario D, first half.
    let stderr = assert_failure("srl $t0 $zero 2\n");
    assert!(
        stderr.contains("zero register not allowed in srl"),
        "stderr:\n{}",
        stderr
    );
}

#[test]
fn test_nop_with_label_fails() {
    // Scenario D, second half.
    let stderr = assert_failure("here: nop\n");
    assert!(
        stderr.contains("nop instruction carries a label"),
        "stderr:\n{}",
        stderr
    );
}

#[test]
fn test_unknown_instruction_fails() {
    let stderr = assert_failure("mul $t0 $t1 $t2\n");
    assert!(stderr.contains("parse error"), "stderr:\n{}", stderr);
    assert!(stderr.contains("mul"), "stderr:\n{}", stderr);
}

#[test]
fn test_branch_to_undefined_label_fails() {
    let stderr = assert_failure("addi $t0 $zero 1\nbne $t0 $t0 nowhere\n");
    assert!(
        stderr.contains("unresolved label `nowhere`"),
        "stderr:\n{}",
        stderr
    );
}

#[test]
fn test_duplicate_label_fails() {
    let stderr = assert_failure("a: addi $t0 $t0 1\na: addi $t0 $t0 2\n");
    assert!(
        stderr.contains("defined more than once"),
        "stderr:\n{}",
        stderr
    );
}

#[test]
fn test_parse_subcommand() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prog.s");
    std::fs::write(&path, "loop: addi $t0 $t0 1\nbne $t0 $s0 loop\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_mjit"))
        .args(["parse", path.to_str().unwrap()])
        .output()
        .expect("failed to execute mjit");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout, "loop: addi $t0 $t0 1\nbne $t0 $s0 loop\n");
}

#[test]
fn test_missing_file_fails() {
    let output = Command::new(env!("CARGO_BIN_EXE_mjit"))
        .args(["run", "/nonexistent/prog.s"])
        .output()
        .expect("failed to execute mjit");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed reading"));
}
