use std::fmt;

use super::{Instruction, IrFunction, IrModule, Opcode, Value};

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value:?}"),
            Value::Str(label) => f.write_str(label),
            Value::Register(index) => write!(f, "r{index}"),
            Value::Slot(offset) => write!(f, "[rbp{offset:+}]"),
            Value::Global(name) => write!(f, "@{name}"),
            Value::Label(label) => f.write_str(label),
            Value::Text(text) => write!(f, "{text:?}"),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.opcode == Opcode::Label {
            if let Some(label) = &self.dest {
                write!(f, "{label}:")?;
            }
            return Ok(());
        }

        match self.opcode {
            Opcode::Print(format) => write!(f, "    PRINT.{}", format.name())?,
            opcode => write!(f, "    {}", opcode.mnemonic())?,
        }
        let operands = [&self.dest, &self.src1, &self.src2];
        let mut first = true;
        for operand in operands.into_iter().flatten() {
            f.write_str(if first { " " } else { ", " })?;
            write!(f, "{operand}")?;
            first = false;
        }
        if let Some(comment) = &self.comment {
            write!(f, "  ; {comment}")?;
        }
        Ok(())
    }
}

impl fmt::Display for IrFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "function {}({}) -> {}  ; frame {}",
            self.name,
            self.params.join(", "),
            self.return_type,
            self.frame_size()
        )?;
        for instruction in &self.instructions {
            writeln!(f, "{instruction}")?;
        }
        Ok(())
    }
}

impl fmt::Display for IrModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; entry: {}", self.entry_point)?;
        for constant in &self.strings {
            writeln!(f, "{}: {:?}", constant.label, constant.value)?;
        }
        for global in &self.globals {
            writeln!(f, "global @{}: {}", global.name, global.data_type)?;
        }
        for function in &self.functions {
            writeln!(f)?;
            write!(f, "{function}")?;
        }
        Ok(())
    }
}
