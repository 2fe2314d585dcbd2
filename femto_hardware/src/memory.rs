use std::collections::HashMap;
use std::time::Duration;

use femto_traits::{BoxError, ChannelService, Value};

use crate::error::HwError;

/// Plain key/value store. Reads of channels never written fail like an
/// unconnected record would.
#[derive(Debug, Default, Clone)]
pub struct MemoryService {
    values: HashMap<String, Value>,
}

impl MemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: Value) -> Self {
        self.values.insert(name.to_string(), value);
        self
    }

    pub fn read(&self, name: &str) -> Result<Value, HwError> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| HwError::UnknownChannel(name.to_string()))
    }

    pub fn write(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

impl ChannelService for MemoryService {
    fn get(&mut self, name: &str, _timeout: Duration) -> Result<Value, BoxError> {
        Ok(self.read(name)?)
    }

    fn put(&mut self, name: &str, value: Value, _timeout: Duration) -> Result<(), BoxError> {
        self.write(name, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_channel_is_typed() {
        let mut svc = MemoryService::new().with("A", Value::Float(1.0));
        let t = Duration::from_millis(1);
        assert_eq!(svc.get("A", t).unwrap(), Value::Float(1.0));
        let err = svc.get("B", t).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HwError>(),
            Some(HwError::UnknownChannel(n)) if n == "B"
        ));
    }
}
