//! Backend error translation.
//!
//! CloudStack reports most failures as free text. Each resource family
//! declares an ordered [`ErrorTable`]; the first entry matching a backend
//! failure decides the front-facing error, and an unmatched failure becomes
//! `InternalError` carrying the backend text.

use crate::errors::{ErrorConstructor, GatewayError};

#[derive(Clone, Copy, Debug)]
pub enum Matcher {
    /// Case-sensitive substring of the backend `errortext`
    Text(&'static str),
    /// Exact backend `errorcode`
    Code(i64),
}

impl Matcher {
    fn matches(&self, text: &str, code: Option<i64>) -> bool {
        match self {
            Matcher::Text(needle) => text.contains(needle),
            Matcher::Code(expected) => code == Some(*expected),
        }
    }
}

pub struct ErrorTable {
    entries: &'static [(Matcher, ErrorConstructor)],
}

impl ErrorTable {
    pub const fn new(entries: &'static [(Matcher, ErrorConstructor)]) -> Self {
        ErrorTable { entries }
    }

    /// Maps one backend failure. Always produces an error.
    pub fn translate(&self, text: &str, code: Option<i64>) -> GatewayError {
        self.entries
            .iter()
            .find(|(matcher, _)| matcher.matches(text, code))
            .map(|(_, constructor)| constructor(text.to_string()))
            .unwrap_or_else(|| {
                tracing::warn!(?code, "Unmapped backend error: {text}");
                GatewayError::InternalError(text.to_string())
            })
    }

    /// Translates `BackendError`s and passes every other error through.
    pub fn translate_error(&self, error: GatewayError) -> GatewayError {
        match error {
            GatewayError::BackendError { text, code } => self.translate(&text, code),
            other => other,
        }
    }
}
