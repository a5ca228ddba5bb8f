//! Three-address code: one operator, up to two operands and a result slot.

use std::fmt;

use super::source_map::SourceMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TacOp {
    Label,
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
    Not,
    IfFalse,
    Goto,
    Param,
    Call,
    Return,
}

impl TacOp {
    /// Binding strength inside a relational/boolean chain. Comparisons bind
    /// tighter than `&&`/`||`; other operators do not take part.
    pub fn precedence(self) -> Option<u8> {
        match self {
            TacOp::Lt | TacOp::Le | TacOp::Gt | TacOp::Ge | TacOp::Eq | TacOp::Ne => Some(2),
            TacOp::And | TacOp::Or => Some(1),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TacOp::Label => "label",
            TacOp::Assign => "=",
            TacOp::Add => "+",
            TacOp::Sub => "-",
            TacOp::Mul => "*",
            TacOp::Div => "/",
            TacOp::Mod => "%",
            TacOp::Lt => "<",
            TacOp::Le => "<=",
            TacOp::Gt => ">",
            TacOp::Ge => ">=",
            TacOp::Eq => "==",
            TacOp::Ne => "!=",
            TacOp::And => "&&",
            TacOp::Or => "||",
            TacOp::Not => "!",
            TacOp::IfFalse => "ifFalse",
            TacOp::Goto => "goto",
            TacOp::Param => "param",
            TacOp::Call => "call",
            TacOp::Return => "return",
        }
    }
}

impl fmt::Display for TacOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    /// A source-level variable or function name.
    Name(String),
    Temp(usize),
    /// Incoming positional parameter, 1-based.
    Param(usize),
    /// A numeric literal exactly as written in the source.
    Num(String),
    /// A constant introduced by lowering (step of `++`, argument count, default return).
    Imm(i64),
    Char(char),
    Label(String),
}

impl Operand {
    pub fn name(s: impl Into<String>) -> Self {
        Operand::Name(s.into())
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Name(n) | Operand::Label(n) | Operand::Num(n) => f.write_str(n),
            Operand::Temp(i) => write!(f, "t{i}"),
            Operand::Param(i) => write!(f, "param{i}"),
            Operand::Imm(v) => write!(f, "{v}"),
            Operand::Char(c) => write!(f, "'{c}'"),
        }
    }
}

/// One instruction. The operator decides which slots are meaningful:
///
/// | op          | arg1      | arg2        | result          |
/// |-------------|-----------|-------------|-----------------|
/// | `label`     |           |             | label           |
/// | `=`         | source    |             | target          |
/// | binary op   | lhs       | rhs         | temp            |
/// | `!`         | operand   |             | temp            |
/// | `ifFalse`   | condition |             | label           |
/// | `goto`      |           |             | label           |
/// | `param`     | argument  |             |                 |
/// | `call`      | callee    | arg count   | temp (optional) |
/// | `return`    | value (optional) |      |                 |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TacInstr {
    pub op: TacOp,
    pub arg1: Option<Operand>,
    pub arg2: Option<Operand>,
    pub result: Option<Operand>,
}

impl TacInstr {
    fn new(op: TacOp, arg1: Option<Operand>, arg2: Option<Operand>, result: Option<Operand>) -> Self {
        Self {
            op,
            arg1,
            arg2,
            result,
        }
    }

    pub fn label(name: impl Into<String>) -> Self {
        Self::new(TacOp::Label, None, None, Some(Operand::Label(name.into())))
    }

    pub fn assign(target: Operand, source: Operand) -> Self {
        Self::new(TacOp::Assign, Some(source), None, Some(target))
    }

    pub fn binary(op: TacOp, lhs: Operand, rhs: Operand, result: Operand) -> Self {
        Self::new(op, Some(lhs), Some(rhs), Some(result))
    }

    pub fn not(operand: Operand, result: Operand) -> Self {
        Self::new(TacOp::Not, Some(operand), None, Some(result))
    }

    pub fn if_false(cond: Operand, target: impl Into<String>) -> Self {
        Self::new(TacOp::IfFalse, Some(cond), None, Some(Operand::Label(target.into())))
    }

    pub fn goto(target: impl Into<String>) -> Self {
        Self::new(TacOp::Goto, None, None, Some(Operand::Label(target.into())))
    }

    pub fn param(arg: Operand) -> Self {
        Self::new(TacOp::Param, Some(arg), None, None)
    }

    pub fn call(callee: impl Into<String>, argc: usize, result: Option<Operand>) -> Self {
        Self::new(
            TacOp::Call,
            Some(Operand::Name(callee.into())),
            Some(Operand::Imm(argc as i64)),
            result,
        )
    }

    pub fn ret(value: Option<Operand>) -> Self {
        Self::new(TacOp::Return, value, None, None)
    }

    /// The label name, for `label` instructions.
    pub fn label_name(&self) -> Option<&str> {
        match (self.op, &self.result) {
            (TacOp::Label, Some(Operand::Label(name))) => Some(name),
            _ => None,
        }
    }

    /// Diagnostic form: `Result: r Arg1: a1 Arg2: a2 Op: op`, `_` for empty slots.
    pub fn dump_line(&self) -> String {
        fn slot(o: &Option<Operand>) -> String {
            o.as_ref().map_or_else(|| "_".to_string(), Operand::to_string)
        }
        format!(
            "Result: {} Arg1: {} Arg2: {} Op: {}",
            slot(&self.result),
            slot(&self.arg1),
            slot(&self.arg2),
            self.op
        )
    }
}

impl fmt::Display for TacInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arg1 = Slot(&self.arg1);
        let arg2 = Slot(&self.arg2);
        let result = Slot(&self.result);
        match self.op {
            TacOp::Label => write!(f, "label {result}"),
            TacOp::Assign => write!(f, "{result} = {arg1}"),
            TacOp::Not => write!(f, "{result} = ! {arg1}"),
            TacOp::IfFalse => write!(f, "ifFalse {arg1} -> {result}"),
            TacOp::Goto => write!(f, "goto {result}"),
            TacOp::Param => write!(f, "param {arg1}"),
            TacOp::Call => match &self.result {
                Some(r) => write!(f, "{r} = call {arg1}, {arg2}"),
                None => write!(f, "call {arg1}, {arg2}"),
            },
            TacOp::Return => match &self.arg1 {
                Some(v) => write!(f, "return {v}"),
                None => f.write_str("return"),
            },
            op => write!(f, "{result} = {arg1} {op} {arg2}"),
        }
    }
}

struct Slot<'a>(&'a Option<Operand>);

impl fmt::Display for Slot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(o) => write!(f, "{o}"),
            None => Ok(()),
        }
    }
}

/// Instructions of one function, from its `label f` to its `label end_f`.
#[derive(Debug, Clone, Copy)]
pub struct TacFunction<'a> {
    pub name: &'a str,
    /// Index of the opening label in the whole program.
    pub start: usize,
    pub instrs: &'a [TacInstr],
}

/// The generator's output: the append-only instruction list, its textual
/// dump and per-instruction provenance.
#[derive(Debug, Clone, Default)]
pub struct TacProgram {
    pub instrs: Vec<TacInstr>,
    pub dump: Vec<String>,
    pub source_map: SourceMap,
}

impl TacProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    pub fn to_lines(&self) -> Vec<String> {
        self.instrs.iter().map(TacInstr::to_string).collect()
    }

    /// Listing with the originating source line appended to each instruction.
    pub fn to_annotated_lines(&self) -> Vec<String> {
        self.instrs
            .iter()
            .enumerate()
            .map(|(i, ins)| match self.source_map.line_of(i) {
                Some(line) => format!("{:<28} ; line {line}", ins.to_string()),
                None => ins.to_string(),
            })
            .collect()
    }

    pub fn dump_text(&self) -> String {
        let mut out = self.dump.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }

    /// Group instructions by the `label f` ... `label end_f` bracketing.
    /// Instructions outside any bracket are not part of a function.
    pub fn functions(&self) -> Vec<TacFunction<'_>> {
        let mut out = Vec::new();
        let mut open: Option<(usize, &str)> = None;
        for (i, ins) in self.instrs.iter().enumerate() {
            let Some(label) = ins.label_name() else {
                continue;
            };
            match open {
                Some((start, name)) if label.strip_prefix("end_") == Some(name) => {
                    out.push(TacFunction {
                        name,
                        start,
                        instrs: &self.instrs[start..=i],
                    });
                    open = None;
                }
                None => {
                    open = Some((i, label));
                }
                _ => {}
            }
        }
        out
    }
}
