//! Error classification.
//!
//! Each driver reduces its native error type to a [`NativeError`] and looks
//! it up in its own static table of [`Rule`]s. Tables are plain data so a new
//! backend or a new pattern never touches driver control flow.

use super::error::{DriverError, ErrorKind};

/// Backend error reduced to the parts classification looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeError {
    /// SQLSTATE, server error number or engine result code, when the backend
    /// reported one.
    pub code: Option<String>,
    /// Verbatim backend message. Becomes the classified error's text.
    pub message: String,
    /// The failure happened below the protocol (I/O, TLS, refused socket).
    pub transport: bool,
}

impl NativeError {
    pub fn new(code: Option<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            transport: false,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            transport: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match {
    /// Exact native code.
    Code(&'static str),
    /// Every code starting with this class, e.g. SQLSTATE class `08`.
    CodeClass(&'static str),
    /// Message starting with `prefix` and ending with `suffix`; the part in
    /// between is usually an object name.
    Message {
        prefix: &'static str,
        suffix: &'static str,
    },
}

/// One `(pattern -> tag)` row of a backend's classification table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub matcher: Match,
    pub kind: ErrorKind,
}

impl Rule {
    pub const fn code(code: &'static str, kind: ErrorKind) -> Self {
        Self {
            matcher: Match::Code(code),
            kind,
        }
    }

    pub const fn class(class: &'static str, kind: ErrorKind) -> Self {
        Self {
            matcher: Match::CodeClass(class),
            kind,
        }
    }

    pub const fn message(prefix: &'static str, suffix: &'static str, kind: ErrorKind) -> Self {
        Self {
            matcher: Match::Message { prefix, suffix },
            kind,
        }
    }

    pub fn matches(&self, error: &NativeError) -> bool {
        match self.matcher {
            Match::Code(code) => error.code.as_deref() == Some(code),
            Match::CodeClass(class) => error
                .code
                .as_deref()
                .is_some_and(|code| code.starts_with(class)),
            Match::Message { prefix, suffix } => {
                let message = error.message.as_str();
                message.len() >= prefix.len() + suffix.len()
                    && message.starts_with(prefix)
                    && message.ends_with(suffix)
            }
        }
    }
}

/// Kind assigned by the first matching rule. Transport failures nothing
/// matched are [`ErrorKind::ConnectionUnavailable`], the rest
/// [`ErrorKind::Unclassified`].
pub fn kind_of(rules: &[Rule], error: &NativeError) -> ErrorKind {
    rules
        .iter()
        .find(|rule| rule.matches(error))
        .map(|rule| rule.kind)
        .unwrap_or(if error.transport {
            ErrorKind::ConnectionUnavailable
        } else {
            ErrorKind::Unclassified
        })
}

/// Classify `error` against `rules`, keeping the backend message verbatim.
pub fn classify(rules: &[Rule], error: NativeError) -> DriverError {
    let kind = kind_of(rules, &error);
    DriverError::classified(kind, error.message)
}
