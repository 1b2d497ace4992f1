pub mod diagnostics;
pub mod language;
pub mod runtime;
pub mod walkthrough;
