// src/analyzer/types.rs

use std::fmt;

/// The type of a value as far as the analyzer can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataType {
    /// Not inferred yet, or unresolvable after an error.
    #[default]
    Unknown,
    Int,
    Float,
    String,
    Bool,
    Array,
    Object,
    Function,
    Null,
    /// Declared without a type; settles on the first assigned value.
    Auto,
    Void,
    /// Any value; used for functions returning values of no static type.
    Generic,
}

impl DataType {
    /// Resolves a written type name. `None` for names that are not types.
    pub fn from_name(name: &str) -> Option<Self> {
        let ty = match name {
            "int" => DataType::Int,
            "float" => DataType::Float,
            "string" => DataType::String,
            "bool" => DataType::Bool,
            "array" => DataType::Array,
            "object" => DataType::Object,
            "function" => DataType::Function,
            "null" | "nil" => DataType::Null,
            "auto" => DataType::Auto,
            "void" => DataType::Void,
            "generic" => DataType::Generic,
            _ => return None,
        };
        Some(ty)
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::Unknown => "unknown",
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::String => "string",
            DataType::Bool => "bool",
            DataType::Array => "array",
            DataType::Object => "object",
            DataType::Function => "function",
            DataType::Null => "null",
            DataType::Auto => "auto",
            DataType::Void => "void",
            DataType::Generic => "generic",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Int | DataType::Float)
    }

    /// `Auto`, `Unknown` and `Generic` carry no static information and never fail a check.
    pub fn is_dynamic(self) -> bool {
        matches!(self, DataType::Auto | DataType::Unknown | DataType::Generic)
    }

    /// Whether a value of one type may flow where the other is expected.
    pub fn compatible(self, other: DataType) -> bool {
        self == other
            || self.is_dynamic()
            || other.is_dynamic()
            || (self.is_numeric() && other.is_numeric())
    }

    /// Numeric promotion: `Float` wins over `Int`.
    pub fn promote(self, other: DataType) -> DataType {
        if self == DataType::Float || other == DataType::Float {
            DataType::Float
        } else {
            DataType::Int
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
