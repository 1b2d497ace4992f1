use std::cell::RefCell;
use std::rc::Rc;

/// Where printed lines go. Clones share the same sink, so native functions
/// can capture a handle and print into it.
#[derive(Clone)]
pub struct Console {
    sink: Sink,
}

#[derive(Clone)]
enum Sink {
    Captured(Rc<RefCell<Vec<String>>>),
    Stdout,
}

impl Console {
    /// Keeps every line in memory without printing it.
    pub fn capture() -> Self {
        Self {
            sink: Sink::Captured(Rc::default()),
        }
    }

    /// Writes each line to stdout and keeps nothing.
    pub fn stdout() -> Self {
        Self { sink: Sink::Stdout }
    }

    pub fn log(&self, line: impl Into<String>) {
        match &self.sink {
            Sink::Captured(lines) => lines.borrow_mut().push(line.into()),
            Sink::Stdout => println!("{}", line.into()),
        }
    }

    /// Lines captured so far. Always empty for a stdout console.
    pub fn lines(&self) -> Vec<String> {
        match &self.sink {
            Sink::Captured(lines) => lines.borrow().clone(),
            Sink::Stdout => Vec::new(),
        }
    }
}
