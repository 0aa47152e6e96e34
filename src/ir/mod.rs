//! Register/stack IR consumed by code emitters.
//!
//! Expressions leave their result in the accumulator register `r0`. Binary
//! operations save the left operand with `PUSH`, evaluate the right one, `POP`
//! the left back into the scratch register `r1` and combine `r1 op r0` into `r0`.
//!
//! Instruction shapes:
//!
//! | opcode        | dest            | src1              | src2        |
//! |---------------|-----------------|-------------------|-------------|
//! | `CONST`       | `r0`            | int, float or string constant | |
//! | `LOAD`        | `r0`            | slot or global    |             |
//! | `STORE`       | slot or global  | `r0`              |             |
//! | `PUSH`        |                 | `r0`              |             |
//! | `POP`         | `r1`            |                   |             |
//! | binary ops    | `r0`            | `r1`              | `r0`        |
//! | `NOT`, `NEG`  | `r0`            | `r0`              |             |
//! | `PARAM`       | slot            | parameter index   |             |
//! | `LABEL`       | label           |                   |             |
//! | `JUMP`        | label           |                   |             |
//! | `JUMP_IF_NOT` | label           | `r0`              |             |
//! | `CALL`        | function label  | argument count    |             |
//! | `DROP`        |                 | argument count    |             |
//! | `RETURN`      |                 | `r0`              |             |
//! | `PRINT`       |                 | `r0`              |             |
//! | `INLINE`      |                 | language text     | code text   |
//!
//! Calls push their arguments last-to-first, so argument 0 is on top of the stack
//! when `CALL` runs. The caller releases them with `DROP argc` right after the call.

mod display;


use crate::analyzer::DataType;

/// Register holding the value of the last evaluated expression.
pub const ACCUMULATOR: u32 = 0;
/// Register receiving the left operand of a binary operation.
pub const SCRATCH: u32 = 1;
/// Width of one stack slot in bytes.
pub const SLOT_SIZE: i32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,

    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Logical
    And,
    Or,
    Not,

    // Data and memory
    Const,
    Load,
    Store,
    Push,
    Pop,
    Param,

    // Control flow
    Label,
    Jump,
    JumpIfNot,
    Call,
    Drop,
    Return,

    // Special
    Print(PrintFormat),
    Inline,
}

impl Opcode {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Mod => "MOD",
            Opcode::Neg => "NEG",
            Opcode::Eq => "EQ",
            Opcode::Ne => "NE",
            Opcode::Lt => "LT",
            Opcode::Le => "LE",
            Opcode::Gt => "GT",
            Opcode::Ge => "GE",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Not => "NOT",
            Opcode::Const => "CONST",
            Opcode::Load => "LOAD",
            Opcode::Store => "STORE",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Param => "PARAM",
            Opcode::Label => "LABEL",
            Opcode::Jump => "JUMP",
            Opcode::JumpIfNot => "JUMP_IF_NOT",
            Opcode::Call => "CALL",
            Opcode::Drop => "DROP",
            Opcode::Return => "RETURN",
            Opcode::Print(_) => "PRINT",
            Opcode::Inline => "INLINE",
        }
    }

    pub fn is_binary(self) -> bool {
        matches!(
            self,
            Opcode::Add
                | Opcode::Sub
                | Opcode::Mul
                | Opcode::Div
                | Opcode::Mod
                | Opcode::Eq
                | Opcode::Ne
                | Opcode::Lt
                | Opcode::Le
                | Opcode::Gt
                | Opcode::Ge
                | Opcode::And
                | Opcode::Or
        )
    }

    pub fn is_jump(self) -> bool {
        matches!(self, Opcode::Jump | Opcode::JumpIfNot)
    }
}

/// How `PRINT` should format the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrintFormat {
    Int,
    Float,
    Str,
    Bool,
    /// The type is only known at run time.
    Dynamic,
}

impl PrintFormat {
    pub fn for_type(ty: DataType) -> Self {
        match ty {
            DataType::Int => PrintFormat::Int,
            DataType::Float => PrintFormat::Float,
            DataType::String => PrintFormat::Str,
            DataType::Bool => PrintFormat::Bool,
            _ => PrintFormat::Dynamic,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PrintFormat::Int => "int",
            PrintFormat::Float => "float",
            PrintFormat::Str => "string",
            PrintFormat::Bool => "bool",
            PrintFormat::Dynamic => "dynamic",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    /// A string constant, by its pool label.
    Str(String),
    Register(u32),
    /// Frame offset from the base pointer; always negative.
    Slot(i32),
    Global(String),
    Label(String),
    /// Raw text carried through untouched, such as embedded code.
    Text(String),
}

impl Value {
    pub fn acc() -> Self {
        Value::Register(ACCUMULATOR)
    }

    pub fn scratch() -> Self {
        Value::Register(SCRATCH)
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            Value::Label(label) => Some(label),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub dest: Option<Value>,
    pub src1: Option<Value>,
    pub src2: Option<Value>,
    pub comment: Option<String>,
}

impl Instruction {
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            dest: None,
            src1: None,
            src2: None,
            comment: None,
        }
    }

    pub fn with_dest(mut self, dest: Value) -> Self {
        self.dest = Some(dest);
        self
    }

    pub fn with_src1(mut self, src: Value) -> Self {
        self.src1 = Some(src);
        self
    }

    pub fn with_src2(mut self, src: Value) -> Self {
        self.src2 = Some(src);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// The label this instruction defines or jumps to.
    pub fn label(&self) -> Option<&str> {
        match self.opcode {
            Opcode::Label | Opcode::Jump | Opcode::JumpIfNot | Opcode::Call => {
                self.dest.as_ref().and_then(Value::as_label)
            }
            _ => None,
        }
    }
}

/// A named stack slot in a function frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Local {
    pub name: String,
    pub offset: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IrFunction {
    pub name: String,
    pub return_type: DataType,
    pub params: Vec<String>,
    /// Every slot the function uses, parameters first, in allocation order.
    pub locals: Vec<Local>,
    pub instructions: Vec<Instruction>,
}

impl IrFunction {
    pub fn new(name: impl Into<String>, return_type: DataType, params: Vec<String>) -> Self {
        Self {
            name: name.into(),
            return_type,
            params,
            locals: Vec::new(),
            instructions: Vec::new(),
        }
    }

    pub fn emit(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Bytes of stack the frame needs below the base pointer.
    pub fn frame_size(&self) -> i32 {
        self.locals.iter().map(|local| -local.offset).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub name: String,
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringConstant {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IrModule {
    pub entry_point: String,
    pub functions: Vec<IrFunction>,
    pub globals: Vec<Global>,
    pub strings: Vec<StringConstant>,
}

impl IrModule {
    pub fn function(&self, name: &str) -> Option<&IrFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn entry(&self) -> Option<&IrFunction> {
        self.function(&self.entry_point)
    }

    pub fn string(&self, label: &str) -> Option<&str> {
        self.strings
            .iter()
            .find(|s| s.label == label)
            .map(|s| s.value.as_str())
    }
}
