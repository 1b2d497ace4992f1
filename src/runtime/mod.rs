pub mod console;
pub mod constructor;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod record;
pub mod value;

pub use console::Console;
pub use constructor::Constructor;
pub use error::{RuntimeError, RuntimeResult};
pub use interpreter::Interpreter;
pub use record::Record;
pub use value::{Function, Value};
