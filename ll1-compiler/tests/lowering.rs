use ll1_compiler::compile_to_tac;
use ll1_compiler::ir::{Operand, TacOp, TacProgram};
use rstest::rstest;
use std::collections::HashMap;

fn tac(source: &str) -> Vec<String> {
    compile_to_tac(source)
        .expect("source should compile")
        .to_lines()
}

/// Lines of `main` without its bracketing labels.
fn main_body(source: &str) -> Vec<String> {
    let lines = tac(source);
    let start = lines
        .iter()
        .position(|l| l == "label main")
        .expect("main label");
    let end = lines
        .iter()
        .position(|l| l == "label end_main")
        .expect("end_main label");
    lines[start + 1..end].to_vec()
}

/// Execute `main` over integer variables. Calls are not supported.
fn run_main(program: &TacProgram, vars: &[(&str, i64)]) -> HashMap<String, i64> {
    let main = program
        .functions()
        .into_iter()
        .find(|f| f.name == "main")
        .expect("main function");
    let code = main.instrs;
    let labels: HashMap<&str, usize> = code
        .iter()
        .enumerate()
        .filter_map(|(i, ins)| ins.label_name().map(|l| (l, i)))
        .collect();

    let mut env: HashMap<String, i64> = vars.iter().map(|(k, v)| (k.to_string(), *v)).collect();
    let value = |env: &HashMap<String, i64>, o: &Option<Operand>| -> i64 {
        match o.as_ref().expect("operand") {
            Operand::Imm(v) => *v,
            Operand::Num(text) => text.parse().expect("numeral fits in i64"),
            Operand::Char(c) => *c as i64,
            other => env.get(&other.to_string()).copied().unwrap_or(0),
        }
    };
    let jump = |o: &Option<Operand>| -> usize {
        match o {
            Some(Operand::Label(l)) => labels[l.as_str()],
            other => panic!("bad jump target {other:?}"),
        }
    };

    let mut pc = 0;
    let mut steps = 0;
    while pc < code.len() {
        steps += 1;
        assert!(steps < 10_000, "program does not terminate");
        let ins = &code[pc];
        pc += 1;
        let dst = ins.result.as_ref().map(|r| r.to_string());
        match ins.op {
            TacOp::Label => {}
            TacOp::Assign => {
                let v = value(&env, &ins.arg1);
                env.insert(dst.expect("target"), v);
            }
            TacOp::Not => {
                let v = value(&env, &ins.arg1);
                env.insert(dst.expect("target"), (v == 0) as i64);
            }
            TacOp::IfFalse => {
                if value(&env, &ins.arg1) == 0 {
                    pc = jump(&ins.result);
                }
            }
            TacOp::Goto => pc = jump(&ins.result),
            TacOp::Return => break,
            TacOp::Param | TacOp::Call => panic!("calls are not interpreted"),
            op => {
                let (a, b) = (value(&env, &ins.arg1), value(&env, &ins.arg2));
                let v = match op {
                    TacOp::Add => a + b,
                    TacOp::Sub => a - b,
                    TacOp::Mul => a * b,
                    TacOp::Div => a / b,
                    TacOp::Mod => a % b,
                    TacOp::Lt => (a < b) as i64,
                    TacOp::Le => (a <= b) as i64,
                    TacOp::Gt => (a > b) as i64,
                    TacOp::Ge => (a >= b) as i64,
                    TacOp::Eq => (a == b) as i64,
                    TacOp::Ne => (a != b) as i64,
                    TacOp::And => (a != 0 && b != 0) as i64,
                    TacOp::Or => (a != 0 || b != 0) as i64,
                    other => panic!("unexpected op {other}"),
                };
                env.insert(dst.expect("target"), v);
            }
        }
    }
    env
}

// ── Reference scenarios ──────────────────────────────────────────────────

#[test]
fn while_loop_with_increment() {
    let source = "def main():\n    while (a < b) : a++\n";
    assert_eq!(
        tac(source),
        vec![
            "label main",
            "label L0",
            "t0 = a < b",
            "ifFalse t0 -> L1",
            "t1 = a + 1",
            "a = t1",
            "goto L0",
            "label L1",
            "label end_main",
        ]
    );
}

#[test]
fn missing_return_returns_last_named_assignment() {
    let source = r#"
def f():
    x = 5

def main():
    f()
"#;
    assert_eq!(
        tac(source),
        vec![
            "label f",
            "x = 5",
            "return x",
            "label end_f",
            "label main",
            "call f, 0",
            "label end_main",
        ]
    );
}

#[test]
fn comparisons_are_computed_before_conjunction() {
    let source = "def main():\n    int r = a < b && c < d\n";
    assert_eq!(
        main_body(source),
        vec!["t0 = a < b", "t1 = c < d", "t2 = t0 && t1", "r = t2"]
    );
}

// ── Expressions ──────────────────────────────────────────────────────────

#[rstest]
#[case("a + b * c - d", &["t0 = b * c", "t1 = a + t0", "t2 = t1 - d", "y = t2"])]
#[case("a - b - c", &["t0 = a - b", "t1 = t0 - c", "y = t1"])]
#[case("a / b % c", &["t0 = a / b", "t1 = t0 % c", "y = t1"])]
#[case("(a + b) * c", &["t0 = a + b", "t1 = t0 * c", "y = t1"])]
#[case("a + 1 < b", &["t0 = a + 1", "t1 = t0 < b", "y = t1"])]
#[case("a || b == c", &["t0 = b == c", "t1 = a || t0", "y = t1"])]
#[case(
    "a < b && c < d || e",
    &["t0 = a < b", "t1 = c < d", "t2 = t0 && t1", "t3 = t2 || e", "y = t3"]
)]
#[case("42", &["y = 42"])]
fn expression_lowering(#[case] expr: &str, #[case] expected: &[&str]) {
    let source = format!("def main():\n    int y = {expr}\n");
    assert_eq!(main_body(&source), expected);
}

#[rstest]
#[case::leading_zeros("007", "x = 007")]
#[case::wider_than_i64("99999999999999999999", "x = 99999999999999999999")]
fn numerals_pass_through_as_written(#[case] numeral: &str, #[case] expected: &str) {
    let source = format!("def main():\n    int x = {numeral}\n");
    assert_eq!(main_body(&source), vec![expected]);

    let program = compile_to_tac(&source).unwrap();
    assert_eq!(program.instrs[1].arg1, Some(Operand::Num(numeral.to_string())));
    assert_eq!(
        program.dump[1],
        format!("Result: x Arg1: {numeral} Arg2: _ Op: =")
    );
}

#[test]
fn negation_and_character_literals() {
    let source = r#"
def main():
    char c = 'z'
    int f = !(c == 'a')
    int g = not f
"#;
    assert_eq!(
        main_body(source),
        vec![
            "c = 'z'",
            "t0 = c == 'a'",
            "t1 = ! t0",
            "f = t1",
            "t2 = ! f",
            "g = t2",
        ]
    );
}

#[test]
fn declaration_without_initializer_emits_nothing() {
    let source = "def main():\n    int x\n    x = 3\n";
    assert_eq!(main_body(source), vec!["x = 3"]);
}

#[test]
fn decrement_uses_one_temporary() {
    assert_eq!(
        main_body("def main():\n    n--\n"),
        vec!["t0 = n - 1", "n = t0"]
    );
}

// ── Functions and calls ──────────────────────────────────────────────────

#[test]
fn call_arguments_are_evaluated_before_params() {
    let source = r#"
def add(int a, int b):
    return a + b

def main():
    int r = add(1, x * 2)
    add(r, 'c')
"#;
    assert_eq!(
        tac(source),
        vec![
            "label add",
            "a = param1",
            "b = param2",
            "t0 = a + b",
            "return t0",
            "label end_add",
            "label main",
            "t1 = x * 2",
            "param 1",
            "param t1",
            "t2 = call add, 2",
            "r = t2",
            "param r",
            "param 'c'",
            "call add, 2",
            "label end_main",
        ]
    );
}

#[test]
fn nested_calls_inside_expressions() {
    let source = "def main():\n    int y = f(g(x)) + 1\n";
    assert_eq!(
        main_body(source),
        vec![
            "param x",
            "t0 = call g, 1",
            "param t0",
            "t1 = call f, 1",
            "t2 = t1 + 1",
            "y = t2",
        ]
    );
}

#[rstest]
#[case::no_assignment("def g():\n    h()\n", &["label g", "call h, 0", "return 0", "label end_g"])]
#[case::parameter_only(
    "def p(char v):\n    v++\n",
    &["label p", "v = param1", "t0 = v + 1", "v = t0", "return v", "label end_p"]
)]
#[case::explicit_return("def one(): return 1\n", &["label one", "return 1", "label end_one"])]
#[case::bare_return("def z(): return\n", &["label z", "return", "label end_z"])]
#[case::return_inside_branch(
    "def k(int a):\n    if (a): return a\n",
    &["label k", "a = param1", "ifFalse a -> L0", "return a", "goto L0", "label L0", "label end_k"]
)]
fn default_return_rule(#[case] source: &str, #[case] expected: &[&str]) {
    assert_eq!(tac(source), expected);
}

#[test]
fn entry_function_gets_no_default_return() {
    let lines = tac("def main():\n    int x = 1\n");
    assert_eq!(lines, vec!["label main", "x = 1", "label end_main"]);
}

#[test]
fn functions_are_grouped_by_label_brackets() {
    let source = r#"
def a():
    return 1
def b(int x):
    return x
def main():
    a()
"#;
    let program = compile_to_tac(source).unwrap();
    let names: Vec<&str> = program.functions().iter().map(|f| f.name).collect();
    assert_eq!(names, vec!["a", "b", "main"]);
    for f in program.functions() {
        assert_eq!(f.instrs.first().and_then(|i| i.label_name()), Some(f.name));
        let end = format!("end_{}", f.name);
        assert_eq!(f.instrs.last().and_then(|i| i.label_name()), Some(end.as_str()));
    }
}

// ── Conditionals ─────────────────────────────────────────────────────────

#[rstest]
#[case::if_only(
    "    if (a): x = 1\n",
    &["ifFalse a -> L0", "x = 1", "goto L0", "label L0"]
)]
#[case::if_else(
    "    if (a): x = 1\n    else: x = 2\n",
    &["ifFalse a -> L1", "x = 1", "goto L0", "label L1", "x = 2", "label L0"]
)]
#[case::if_elif(
    "    if (a): x = 1\n    elif (b): x = 2\n",
    &["ifFalse a -> L1", "x = 1", "goto L0", "label L1", "ifFalse b -> L0", "x = 2", "goto L0", "label L0"]
)]
#[case::if_elif_elif_else(
    "    if (a): x = 1\n    elif (b): x = 2\n    elif (c): x = 3\n    else: x = 4\n",
    &[
        "ifFalse a -> L1", "x = 1", "goto L0", "label L1",
        "ifFalse b -> L2", "x = 2", "goto L0", "label L2",
        "ifFalse c -> L3", "x = 3", "goto L0", "label L3",
        "x = 4", "label L0",
    ]
)]
fn conditional_chains(#[case] body: &str, #[case] expected: &[&str]) {
    let source = format!("def main():\n{body}");
    assert_eq!(main_body(&source), expected);
}

const CHAIN_WITH_ELSE: &str = r#"
def main():
    if (a):
        n++
        x = 1
    elif (b):
        n++
        x = 2
    elif (c):
        n++
        x = 3
    else:
        n++
        x = 4
"#;

const CHAIN_WITHOUT_ELSE: &str = r#"
def main():
    if (a):
        n++
        x = 1
    elif (b):
        n++
        x = 2
"#;

#[test]
fn exactly_one_arm_runs_with_else() {
    let program = compile_to_tac(CHAIN_WITH_ELSE).unwrap();
    for bits in 0..8 {
        let (a, b, c) = (bits & 1, (bits >> 1) & 1, (bits >> 2) & 1);
        let env = run_main(&program, &[("a", a), ("b", b), ("c", c)]);
        let expected = if a == 1 {
            1
        } else if b == 1 {
            2
        } else if c == 1 {
            3
        } else {
            4
        };
        assert_eq!(env["n"], 1, "a={a} b={b} c={c}");
        assert_eq!(env["x"], expected, "a={a} b={b} c={c}");
    }
}

#[test]
fn at_most_one_arm_runs_without_else() {
    let program = compile_to_tac(CHAIN_WITHOUT_ELSE).unwrap();
    for (a, b, runs, x) in [(0, 0, 0, 0), (1, 0, 1, 1), (0, 1, 1, 2), (1, 1, 1, 1)] {
        let env = run_main(&program, &[("a", a), ("b", b)]);
        assert_eq!(env.get("n").copied().unwrap_or(0), runs, "a={a} b={b}");
        assert_eq!(env.get("x").copied().unwrap_or(0), x, "a={a} b={b}");
    }
}

// ── Loops ────────────────────────────────────────────────────────────────

#[test]
fn for_loop_layout() {
    let source = r#"
def main():
    int s = 0
    for (int i = 0; i < 5; i++):
        s = s + i
"#;
    assert_eq!(
        main_body(source),
        vec![
            "s = 0",
            "i = 0",
            "label L0",
            "t0 = i < 5",
            "ifFalse t0 -> L1",
            "t1 = s + i",
            "s = t1",
            "t2 = i + 1",
            "i = t2",
            "goto L0",
            "label L1",
        ]
    );
    let env = run_main(&compile_to_tac(source).unwrap(), &[]);
    assert_eq!(env["s"], 10);
    assert_eq!(env["i"], 5);
}

#[test]
fn for_step_accepts_plain_assignment() {
    let source = r#"
def main():
    int s = 0
    for (int i = 1; i <= 8; i = i * 2): s = s + i
"#;
    let env = run_main(&compile_to_tac(source).unwrap(), &[]);
    assert_eq!(env["s"], 15);
}

#[test]
fn do_until_layout_and_runs_body_once() {
    let source = r#"
def main():
    int x = 3
    do:
        x--
    until (x <= 0)
"#;
    assert_eq!(
        main_body(source),
        vec![
            "x = 3",
            "label L0",
            "t0 = x - 1",
            "x = t0",
            "t1 = x <= 0",
            "ifFalse t1 -> L0",
        ]
    );
    let env = run_main(&compile_to_tac(source).unwrap(), &[]);
    assert_eq!(env["x"], 0);

    let once = "def main():\n    do:\n        n++\n    until (1)\n";
    let env = run_main(&compile_to_tac(once).unwrap(), &[]);
    assert_eq!(env["n"], 1);
}

#[test]
fn nested_loops_compute() {
    let source = r#"
def main():
    int total = 0
    int i = 0
    while (i < 4):
        for (int j = 0; j < i; j++):
            total = total + j
        i++
"#;
    let env = run_main(&compile_to_tac(source).unwrap(), &[]);
    // i = 1: 0; i = 2: 0+1; i = 3: 0+1+2
    assert_eq!(env["total"], 4);
}

#[test]
fn empty_program_lowers_to_nothing() {
    assert!(tac("").is_empty());
    assert!(tac("# only a comment\n\n").is_empty());
}
