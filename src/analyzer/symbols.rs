// src/analyzer/symbols.rs

use super::types::DataType;
use crate::utils::Span;

/// Stable handle to a symbol. Entries of enclosing scopes keep their id
/// while inner scopes come and go, since exits only drop the newest entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(usize);

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub data_type: DataType,
    pub scope_level: u32,
    pub is_constant: bool,
    pub is_initialized: bool,
    pub is_function: bool,
    pub return_type: DataType,
    pub param_types: Vec<DataType>,
    /// Where the symbol was declared. Built-ins use an empty span.
    pub span: Span,
}

impl Symbol {
    pub fn variable(name: &str, data_type: DataType, span: Span) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            scope_level: 0,
            is_constant: false,
            is_initialized: false,
            is_function: false,
            return_type: DataType::Unknown,
            param_types: Vec::new(),
            span,
        }
    }

    pub fn function(name: &str, param_types: Vec<DataType>, return_type: DataType, span: Span) -> Self {
        Self {
            name: name.to_string(),
            data_type: DataType::Function,
            scope_level: 0,
            is_constant: false,
            is_initialized: true,
            is_function: true,
            return_type,
            param_types,
            span,
        }
    }
}

/// One flat table shared by every scope.
///
/// Entering a scope bumps the level; leaving it drops every entry created at
/// that level. Lookups scan newest-first, so inner declarations shadow outer ones.
#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: Vec<Symbol>,
    level: u32,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn enter_scope(&mut self) {
        self.level += 1;
        tracing::trace!(level = self.level, "enter scope");
    }

    pub fn exit_scope(&mut self) {
        if self.level == 0 {
            return;
        }
        let level = self.level;
        self.entries.retain(|entry| entry.scope_level != level);
        self.level -= 1;
        tracing::trace!(level = self.level, "exit scope");
    }

    /// Adds a symbol to the current scope.
    /// Fails with the id of the existing entry when the name is taken at this level.
    pub fn declare(&mut self, mut symbol: Symbol) -> Result<SymbolId, SymbolId> {
        if let Some(existing) = self.declared_in_current_scope(&symbol.name) {
            return Err(existing);
        }
        symbol.scope_level = self.level;
        self.entries.push(symbol);
        Ok(SymbolId(self.entries.len() - 1))
    }

    pub fn declared_in_current_scope(&self, name: &str) -> Option<SymbolId> {
        self.entries
            .iter()
            .rposition(|entry| entry.scope_level == self.level && entry.name == name)
            .map(SymbolId)
    }

    /// Finds the innermost visible symbol with this name.
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.entries
            .iter()
            .rposition(|entry| entry.name == name)
            .map(SymbolId)
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.entries[id.0]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.entries[id.0]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
