//! Method descriptors
//!
//! A descriptor is the static contract of one native method: its name, the
//! type of every parameter, and how it completes.

use std::fmt;
use tether_value::{ParamSpec, ValueTag};

/// How a method delivers its result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnKind {
    /// Result returned on the calling thread
    Sync,
    /// Completion delivered by invoking a callback token argument
    Callback,
    /// Completion delivered through a resolve/reject pair
    Promise,
}

impl ReturnKind {
    /// Whether completion happens after the call returns
    pub fn is_async(self) -> bool {
        !matches!(self, Self::Sync)
    }
}

impl fmt::Display for ReturnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sync => "sync",
            Self::Callback => "callback",
            Self::Promise => "promise",
        })
    }
}

/// Position of a method inside its module's table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodIndex(pub usize);

/// Static description of one native method
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    name: String,
    params: Vec<ParamSpec>,
    returns: ReturnKind,
}

impl MethodDescriptor {
    /// Create a descriptor with no parameters
    pub fn new(name: impl Into<String>, returns: ReturnKind) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns,
        }
    }

    /// Shorthand for a synchronous method
    pub fn sync(name: impl Into<String>) -> Self {
        Self::new(name, ReturnKind::Sync)
    }

    /// Shorthand for a callback-style method
    pub fn callback(name: impl Into<String>) -> Self {
        Self::new(name, ReturnKind::Callback)
    }

    /// Shorthand for a promise-style method
    pub fn promise(name: impl Into<String>) -> Self {
        Self::new(name, ReturnKind::Promise)
    }

    /// Append a parameter
    pub fn param(mut self, spec: impl Into<ParamSpec>) -> Self {
        self.params.push(spec.into());
        self
    }

    /// Append several parameters
    pub fn params<I, P>(mut self, specs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<ParamSpec>,
    {
        self.params.extend(specs.into_iter().map(Into::into));
        self
    }

    /// Get the method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the parameter specs in order
    pub fn param_specs(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Get the return convention
    pub fn returns(&self) -> ReturnKind {
        self.returns
    }

    /// Maximum number of arguments accepted
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Number of leading parameters that must be supplied.
    ///
    /// Trailing optional parameters may be omitted.
    pub fn required_arity(&self) -> usize {
        self.params
            .iter()
            .rposition(|p| !p.optional)
            .map_or(0, |i| i + 1)
    }

    /// Tag expected at `index`, if the method has that many parameters
    pub fn expected_tag(&self, index: usize) -> Option<ValueTag> {
        self.params.get(index).map(|p| p.tag)
    }

    /// Index of the first callback parameter
    pub fn first_callback_param(&self) -> Option<usize> {
        self.params.iter().position(|p| p.tag == ValueTag::Function)
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}{}", p.tag, if p.optional { "?" } else { "" })?;
        }
        write!(f, ") -> {}", self.returns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_arity_ignores_trailing_optionals() {
        let desc = MethodDescriptor::sync("format")
            .param(ValueTag::String)
            .param(ParamSpec::optional(ValueTag::Map))
            .param(ParamSpec::optional(ValueTag::Bool));

        assert_eq!(desc.arity(), 3);
        assert_eq!(desc.required_arity(), 1);
    }

    #[test]
    fn test_optional_before_required_is_still_required() {
        let desc = MethodDescriptor::sync("f")
            .param(ParamSpec::optional(ValueTag::Number))
            .param(ValueTag::String);
        assert_eq!(desc.required_arity(), 2);
    }

    #[test]
    fn test_display() {
        let desc = MethodDescriptor::promise("getLocation")
            .param(ValueTag::Number)
            .param(ParamSpec::optional(ValueTag::Map));
        assert_eq!(desc.to_string(), "getLocation(number, map?) -> promise");
    }
}
