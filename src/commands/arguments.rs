//! Declarative Command Argument Binding
//!
//! Command handlers describe their argument shape once - how many leading
//! positionals, which named arguments exist, whether each takes a value -
//! and hand the decoded request tail to [`ArgSchema::bind`]. Binding
//! separates positionals from named arguments, enforces the schema, and
//! gives the handler indexed and by-name lookup over borrowed values.
//!
//! Named arguments match case-insensitively (`px`, `PX`, and `Px` are the
//! same flag) and may appear in any order after the positionals.
//! Duplicates are rejected outright rather than resolved first-wins.

use crate::protocol::RespValue;
use thiserror::Error;

/// Binding failures. All of them are recoverable: the command is refused
/// with an error reply and the connection stays up.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArgError {
    #[error("arguments missing positional arg")]
    MissingPositional,

    #[error("arguments missing named arg: {0}")]
    MissingNamedArg(&'static str),

    #[error("named arg '{0}' missing value")]
    MissingValue(&'static str),

    #[error("encountered unknown arg: {0}")]
    UnknownArg(String),

    #[error("encountered duplicate arg: {0}")]
    DuplicateArg(&'static str),
}

/// Declaration of one named argument.
#[derive(Debug, Clone, Copy)]
pub struct ArgSpec {
    pub name: &'static str,
    pub required: bool,
    pub takes_value: bool,
}

impl ArgSpec {
    /// A flag that is optional and carries no value.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            required: false,
            takes_value: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_value(mut self) -> Self {
        self.takes_value = true;
        self
    }
}

/// The declared shape of a command's arguments.
#[derive(Debug, Clone, Default)]
pub struct ArgSchema {
    positionals: usize,
    specs: Vec<ArgSpec>,
}

impl ArgSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of leading positional arguments. Positionals are required.
    pub fn positionals(mut self, count: usize) -> Self {
        self.positionals = count;
        self
    }

    /// Declares a named argument.
    pub fn arg(mut self, spec: ArgSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Binds a decoded request tail (command name already stripped)
    /// against this schema.
    pub fn bind<'a>(&self, raw: &'a [RespValue]) -> Result<Arguments<'a>, ArgError> {
        if raw.len() < self.positionals {
            return Err(ArgError::MissingPositional);
        }
        let (positionals, mut rest) = raw.split_at(self.positionals);

        let mut named: Vec<NamedArg<'a>> = Vec::new();
        while let Some((lexeme, tail)) = rest.split_first() {
            let spec = self
                .specs
                .iter()
                .find(|spec| lexeme.eq_ignore_ascii_case(spec.name))
                .ok_or_else(|| ArgError::UnknownArg(lexeme.to_string()))?;

            if named.iter().any(|n| n.name == spec.name) {
                return Err(ArgError::DuplicateArg(spec.name));
            }

            if spec.takes_value {
                let (value, after) = tail
                    .split_first()
                    .ok_or(ArgError::MissingValue(spec.name))?;
                named.push(NamedArg {
                    name: spec.name,
                    value: Some(value),
                });
                rest = after;
            } else {
                named.push(NamedArg {
                    name: spec.name,
                    value: None,
                });
                rest = tail;
            }
        }

        for spec in &self.specs {
            if spec.required && !named.iter().any(|n| n.name == spec.name) {
                return Err(ArgError::MissingNamedArg(spec.name));
            }
        }

        Ok(Arguments { positionals, named })
    }
}

/// One bound named argument. `value` is `None` for flags declared without
/// a value.
#[derive(Debug, Clone, Copy)]
pub struct NamedArg<'a> {
    pub name: &'static str,
    pub value: Option<&'a RespValue>,
}

/// The result of a successful bind: positionals by index, named arguments
/// by their declared name. Everything borrows from the request.
#[derive(Debug)]
pub struct Arguments<'a> {
    positionals: &'a [RespValue],
    named: Vec<NamedArg<'a>>,
}

impl<'a> Arguments<'a> {
    /// The positional at `index`. Indices below the schema's declared
    /// count are always present.
    pub fn positional(&self, index: usize) -> &'a RespValue {
        &self.positionals[index]
    }

    /// Looks up a named argument by its declared name.
    pub fn named(&self, name: &str) -> Option<NamedArg<'a>> {
        self.named.iter().find(|n| n.name == name).copied()
    }
}
