use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Unknown symbol `{name}`")]
    UnknownSymbol { name: String },
    #[error("No method `{key}` on the receiver or its prototype chain")]
    MissingMethod { key: String },
    #[error("Property `{key}` is a {type_name}, not a function")]
    NotCallable { key: String, type_name: &'static str },
    #[error("Constructor `{name}` expected {expected} arguments but received {received}")]
    ArityMismatch {
        name: String,
        expected: usize,
        received: usize,
    },
    #[error("Delegating to this record would close a prototype cycle")]
    DelegateCycle,
    #[error("Type mismatch: {message}")]
    TypeMismatch { message: String },
    #[error("Operation not supported: {message}")]
    Unsupported { message: String },
}
