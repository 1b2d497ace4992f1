use crate::runtime::{
    error::{RuntimeError, RuntimeResult},
    value::Value,
};
use std::collections::HashMap;

/// Global bindings plus one frame per active function call. A frame only
/// sees its own bindings and the globals, never its caller's.
#[derive(Default)]
pub struct Environment {
    globals: HashMap<String, Value>,
    frames: Vec<HashMap<String, Value>>,
    /// Expressions currently being evaluated, across all calls.
    evaluating: usize,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_frame(&mut self, bindings: HashMap<String, Value>) {
        self.frames.push(bindings);
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn enter_expression(&mut self, limit: usize) -> RuntimeResult<()> {
        if self.evaluating >= limit {
            return Err(RuntimeError::Unsupported {
                message: format!("expression nesting exceeded {limit} levels"),
            });
        }
        self.evaluating += 1;
        Ok(())
    }

    pub fn leave_expression(&mut self) {
        self.evaluating = self.evaluating.saturating_sub(1);
    }

    /// Declares in the innermost frame, or globally outside any call.
    pub fn declare(&mut self, name: &str, value: Value) {
        match self.frames.last_mut() {
            Some(frame) => frame.insert(name.to_string(), value),
            None => self.globals.insert(name.to_string(), value),
        };
    }

    pub fn assign(&mut self, name: &str, value: Value) -> RuntimeResult<()> {
        if let Some(slot) = self
            .frames
            .last_mut()
            .and_then(|frame| frame.get_mut(name))
        {
            *slot = value;
            return Ok(());
        }
        match self.globals.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(RuntimeError::UnknownSymbol {
                name: name.to_string(),
            }),
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.frames
            .last()
            .and_then(|frame| frame.get(name))
            .or_else(|| self.globals.get(name))
            .cloned()
    }
}
