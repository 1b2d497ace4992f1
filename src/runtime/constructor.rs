use crate::runtime::{
    error::{RuntimeError, RuntimeResult},
    record::Record,
    value::{Function, Value},
};
use tracing::debug;

/// Blueprint for records of one "type". Every instance delegates to the
/// shared prototype record.
#[derive(Debug)]
pub struct Constructor {
    name: String,
    params: Vec<String>,
    prototype: Record,
    initializer: Option<Function>,
}

impl Constructor {
    /// Each parameter becomes an own property of the instance, in order.
    pub fn new<S: Into<String>>(name: &str, params: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.to_string(),
            params: params.into_iter().map(Into::into).collect(),
            prototype: Record::prototype_for(name),
            initializer: None,
        }
    }

    /// The initializer runs with the fresh instance as receiver and replaces
    /// the default parameter assignment.
    pub fn with_initializer<S: Into<String>>(
        name: &str,
        params: impl IntoIterator<Item = S>,
        initializer: Function,
    ) -> Self {
        Self {
            initializer: Some(initializer),
            ..Self::new(name, params)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn prototype(&self) -> &Record {
        &self.prototype
    }

    pub fn construct(&self, args: &[Value]) -> RuntimeResult<Record> {
        if args.len() != self.params.len() {
            return Err(RuntimeError::ArityMismatch {
                name: self.name.clone(),
                expected: self.params.len(),
                received: args.len(),
            });
        }
        let instance = Record::with_delegate(&self.prototype);
        match &self.initializer {
            Some(initializer) => {
                initializer.call(&instance, args)?;
            }
            None => {
                for (param, arg) in self.params.iter().zip(args) {
                    instance.set(param.as_str(), arg.clone());
                }
            }
        }
        debug!(constructor = %self.name, "constructed instance");
        Ok(instance)
    }
}
