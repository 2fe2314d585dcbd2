//! Typed access to the control-system key/value service.
use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

/// Error type crossing the service boundary; backends pick their own concrete errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A value as carried by the channel service.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Float(f64),
    Int(i64),
    Bool(bool),
    Text(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Float(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
        }
    }
}

/// Key-addressed read/write service. Every call carries its own timeout.
pub trait ChannelService {
    fn get(&mut self, name: &str, timeout: Duration) -> Result<Value, BoxError>;
    fn put(&mut self, name: &str, value: Value, timeout: Duration) -> Result<(), BoxError>;
}

impl<T: ChannelService + ?Sized> ChannelService for Box<T> {
    fn get(&mut self, name: &str, timeout: Duration) -> Result<Value, BoxError> {
        (**self).get(name, timeout)
    }

    fn put(&mut self, name: &str, value: Value, timeout: Duration) -> Result<(), BoxError> {
        (**self).put(name, value, timeout)
    }
}

/// Rust types that can be read from and written to a channel.
pub trait ChannelValue: Sized {
    const KIND: &'static str;

    fn from_value(v: &Value) -> Option<Self>;
    fn into_value(self) -> Value;
}

impl ChannelValue for f64 {
    const KIND: &'static str = "float";

    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Float(x) => Some(*x),
            Value::Int(x) => Some(*x as f64),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Text(s) => s.trim().parse().ok(),
        }
    }

    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl ChannelValue for i64 {
    const KIND: &'static str = "int";

    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Int(x) => Some(*x),
            Value::Float(x) if x.is_finite() => Some(x.round() as i64),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Float(_) => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl ChannelValue for bool {
    const KIND: &'static str = "bool";

    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Bool(b) => Some(*b),
            Value::Int(x) => Some(*x != 0),
            Value::Float(x) => Some(*x != 0.0),
            Value::Text(_) => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl ChannelValue for String {
    const KIND: &'static str = "text";

    fn from_value(v: &Value) -> Option<Self> {
        Some(v.to_string())
    }

    fn into_value(self) -> Value {
        Value::Text(self)
    }
}

/// A channel returned a value that cannot be read as the handle's type.
#[derive(Debug, Clone)]
pub struct ValueKindError {
    pub channel: String,
    pub expected: &'static str,
    pub got: Value,
}

impl fmt::Display for ValueKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "channel {} returned {:?}, expected {}",
            self.channel, self.got, self.expected
        )
    }
}

impl std::error::Error for ValueKindError {}

/// Statically typed handle onto one named channel.
pub struct Channel<T> {
    name: String,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            _kind: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Channel").field(&self.name).finish()
    }
}

impl<T: ChannelValue> Channel<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            _kind: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get<S: ChannelService + ?Sized>(
        &self,
        svc: &mut S,
        timeout: Duration,
    ) -> Result<T, BoxError> {
        let raw = svc.get(&self.name, timeout)?;
        T::from_value(&raw).ok_or_else(|| {
            Box::new(ValueKindError {
                channel: self.name.clone(),
                expected: T::KIND,
                got: raw,
            }) as BoxError
        })
    }

    pub fn put<S: ChannelService + ?Sized>(
        &self,
        svc: &mut S,
        value: T,
        timeout: Duration,
    ) -> Result<(), BoxError> {
        svc.put(&self.name, value.into_value(), timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapService(HashMap<String, Value>);

    impl ChannelService for MapService {
        fn get(&mut self, name: &str, _timeout: Duration) -> Result<Value, BoxError> {
            self.0
                .get(name)
                .cloned()
                .ok_or_else(|| format!("no such channel: {name}").into())
        }

        fn put(&mut self, name: &str, value: Value, _timeout: Duration) -> Result<(), BoxError> {
            self.0.insert(name.to_string(), value);
            Ok(())
        }
    }

    #[test]
    fn typed_handles_convert_between_kinds() {
        let mut svc = MapService::default();
        let t = Duration::from_millis(10);
        let flag: Channel<bool> = Channel::new("X:FLAG");
        let count: Channel<i64> = Channel::new("X:FLAG");
        flag.put(&mut svc, true, t).unwrap();
        assert_eq!(count.get(&mut svc, t).unwrap(), 1);

        let pos: Channel<f64> = Channel::new("X:POS");
        svc.put("X:POS", Value::Int(7), t).unwrap();
        assert_eq!(pos.get(&mut svc, t).unwrap(), 7.0);
    }

    #[test]
    fn kind_mismatch_names_the_channel() {
        let mut svc = MapService::default();
        let t = Duration::from_millis(10);
        svc.put("X:MSG", Value::Text("hello".into()), t).unwrap();
        let as_bool: Channel<bool> = Channel::new("X:MSG");
        let err = as_bool.get(&mut svc, t).unwrap_err();
        assert!(err.to_string().contains("X:MSG"));
    }
}
