// src/lowering/frame.rs

use crate::ir::{Local, SLOT_SIZE};

/// Stack layout of the function being lowered.
///
/// Every declaration gets a fresh slot below the base pointer; slots are never
/// reused, so offsets only ever decrease. Scopes only decide which names are visible.
#[derive(Debug)]
pub struct Frame {
    scopes: Vec<Vec<(String, i32)>>,
    current_offset: i32,
    locals: Vec<Local>,
    hidden: u32,
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    pub fn new() -> Self {
        Self {
            scopes: vec![Vec::new()],
            current_offset: 0,
            locals: Vec::new(),
            hidden: 0,
        }
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    pub fn exit_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Allocates a slot for `name` in the innermost scope and returns its offset.
    pub fn allocate(&mut self, name: &str) -> i32 {
        let offset = self.reserve(name);
        self.bind(name, offset);
        offset
    }

    /// Allocates a slot that stays invisible until [`Frame::bind`] is called.
    pub fn reserve(&mut self, name: &str) -> i32 {
        self.current_offset -= SLOT_SIZE;
        self.locals.push(Local {
            name: name.to_string(),
            offset: self.current_offset,
        });
        self.current_offset
    }

    /// Makes `name` refer to `offset` in the innermost scope.
    pub fn bind(&mut self, name: &str, offset: i32) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.push((name.to_string(), offset));
        }
    }

    /// Allocates a slot no source name can reach, e.g. a loop bound.
    pub fn allocate_hidden(&mut self, purpose: &str) -> i32 {
        let name = format!("%{purpose}{}", self.hidden);
        self.hidden += 1;
        self.reserve(&name)
    }

    /// Offset of the innermost visible slot named `name`.
    pub fn lookup(&self, name: &str) -> Option<i32> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|(slot_name, _)| slot_name == name)
            .map(|(_, offset)| *offset)
    }

    pub fn into_locals(self) -> Vec<Local> {
        self.locals
    }
}
