use crate::location::SourceLocation;
use serde::Serialize;
use std::sync::{Mutex, PoisonError};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum DiagnosticCategory {
    Warning,
    Error,
    Message,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DiagnosticMessage {
    pub code: u32,
    pub category: DiagnosticCategory,
    pub message: &'static str,
}

/// Codes reported by aggregation, resolution and contract checking.
pub mod codes {
    pub const NAME_NOT_FOUND: u32 = 1001;
    pub const BASE_TYPE_NOT_FOUND: u32 = 1002;
    pub const BASE_TYPE_NOT_A_CLASS: u32 = 1003;
    pub const MULTIPLE_BASE_CLASSES: u32 = 1004;
    pub const CYCLIC_BASE_TYPE: u32 = 1005;
    pub const CONFLICTING_MEMBER_SIGNATURE: u32 = 1006;
    pub const DUPLICATE_TYPE_DECLARATION: u32 = 1007;
    pub const ALIAS_TARGET_NOT_FOUND: u32 = 1008;
    pub const IMPORT_TARGET_NOT_A_NAMESPACE: u32 = 1009;
    pub const ENUM_INITIALIZER_NOT_CONSTANT: u32 = 1010;
    pub const ENUM_INITIALIZER_CYCLE: u32 = 1011;
    pub const ATTRIBUTE_TYPE_NOT_FOUND: u32 = 1012;
    pub const NO_APPLICABLE_ATTRIBUTE_CONSTRUCTOR: u32 = 1013;
    pub const MISSING_BASE_CONSTRUCTOR: u32 = 1014;
    pub const TOO_MANY_PARAMETERS: u32 = 1015;
    pub const CONDITION_NOT_BOOLEAN: u32 = 2001;
    pub const CONDITION_HAS_SIDE_EFFECTS: u32 = 2002;
    pub const CONSTANT_IN_LOCATION_SET: u32 = 2003;
    pub const OUT_PARAMETER_IN_PRECONDITION: u32 = 2004;
    pub const CONFLICTING_GENERIC_PARAMETER: u32 = 3001;
}

pub const DIAGNOSTIC_MESSAGES: &[DiagnosticMessage] = &[
    DiagnosticMessage {
        code: codes::NAME_NOT_FOUND,
        category: DiagnosticCategory::Error,
        message: "The name '{0}' does not exist in the current context.",
    },
    DiagnosticMessage {
        code: codes::BASE_TYPE_NOT_FOUND,
        category: DiagnosticCategory::Error,
        message: "The base type '{0}' of '{1}' could not be found.",
    },
    DiagnosticMessage {
        code: codes::BASE_TYPE_NOT_A_CLASS,
        category: DiagnosticCategory::Error,
        message: "'{0}' is not a class or interface and cannot be a base type of '{1}'.",
    },
    DiagnosticMessage {
        code: codes::MULTIPLE_BASE_CLASSES,
        category: DiagnosticCategory::Error,
        message: "Partial declarations of '{0}' must not specify different base classes.",
    },
    DiagnosticMessage {
        code: codes::CYCLIC_BASE_TYPE,
        category: DiagnosticCategory::Error,
        message: "Circular base type dependency involving '{0}'.",
    },
    DiagnosticMessage {
        code: codes::CONFLICTING_MEMBER_SIGNATURE,
        category: DiagnosticCategory::Error,
        message: "Type '{0}' already defines a member called '{1}' with the same signature.",
    },
    DiagnosticMessage {
        code: codes::DUPLICATE_TYPE_DECLARATION,
        category: DiagnosticCategory::Error,
        message: "The namespace or type '{0}' already contains a definition for '{1}'.",
    },
    DiagnosticMessage {
        code: codes::ALIAS_TARGET_NOT_FOUND,
        category: DiagnosticCategory::Error,
        message: "The target of alias '{0}' could not be found.",
    },
    DiagnosticMessage {
        code: codes::IMPORT_TARGET_NOT_A_NAMESPACE,
        category: DiagnosticCategory::Error,
        message: "'{0}' is not a namespace and cannot be imported.",
    },
    DiagnosticMessage {
        code: codes::ENUM_INITIALIZER_NOT_CONSTANT,
        category: DiagnosticCategory::Error,
        message: "The initializer of enum member '{0}' is not a constant.",
    },
    DiagnosticMessage {
        code: codes::ENUM_INITIALIZER_CYCLE,
        category: DiagnosticCategory::Error,
        message: "The evaluation of the constant value for '{0}' involves a circular definition.",
    },
    DiagnosticMessage {
        code: codes::ATTRIBUTE_TYPE_NOT_FOUND,
        category: DiagnosticCategory::Error,
        message: "The attribute type '{0}' could not be found.",
    },
    DiagnosticMessage {
        code: codes::NO_APPLICABLE_ATTRIBUTE_CONSTRUCTOR,
        category: DiagnosticCategory::Error,
        message: "No constructor of '{0}' accepts {1} argument(s).",
    },
    DiagnosticMessage {
        code: codes::MISSING_BASE_CONSTRUCTOR,
        category: DiagnosticCategory::Error,
        message: "'{0}' does not contain a constructor that takes 0 arguments.",
    },
    DiagnosticMessage {
        code: codes::TOO_MANY_PARAMETERS,
        category: DiagnosticCategory::Error,
        message: "'{0}' declares more than {1} parameters.",
    },
    DiagnosticMessage {
        code: codes::CONDITION_NOT_BOOLEAN,
        category: DiagnosticCategory::Error,
        message: "Cannot implicitly convert the contract condition to 'bool'.",
    },
    DiagnosticMessage {
        code: codes::CONDITION_HAS_SIDE_EFFECTS,
        category: DiagnosticCategory::Error,
        message: "Contract conditions must not have side effects.",
    },
    DiagnosticMessage {
        code: codes::CONSTANT_IN_LOCATION_SET,
        category: DiagnosticCategory::Error,
        message: "A constant cannot appear in a {0} clause.",
    },
    DiagnosticMessage {
        code: codes::OUT_PARAMETER_IN_PRECONDITION,
        category: DiagnosticCategory::Error,
        message: "The out parameter '{0}' cannot be referenced in a precondition.",
    },
    DiagnosticMessage {
        code: codes::CONFLICTING_GENERIC_PARAMETER,
        category: DiagnosticCategory::Warning,
        message: "Partial declarations of '{0}' declare generic parameter {1} with different constraints or variance.",
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticRelatedInformation {
    pub location: SourceLocation,
    pub message_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub category: DiagnosticCategory,
    pub code: u32,
    pub location: SourceLocation,
    pub message_text: String,
    pub related_information: Vec<DiagnosticRelatedInformation>,
}

impl Diagnostic {
    pub fn error(location: SourceLocation, message: impl Into<String>, code: u32) -> Self {
        Self {
            category: DiagnosticCategory::Error,
            code,
            location,
            message_text: message.into(),
            related_information: Vec::new(),
        }
    }

    pub fn warning(location: SourceLocation, message: impl Into<String>, code: u32) -> Self {
        Self {
            category: DiagnosticCategory::Warning,
            ..Self::error(location, message, code)
        }
    }

    /// Build a diagnostic from the message catalog, substituting `args`.
    pub fn from_code(location: SourceLocation, code: u32, args: &[&str]) -> Self {
        let (category, template) = DIAGNOSTIC_MESSAGES
            .iter()
            .find(|m| m.code == code)
            .map(|m| (m.category, m.message))
            .unwrap_or((DiagnosticCategory::Error, "{0}"));
        Self {
            category,
            ..Self::error(location, format_message(template, args), code)
        }
    }

    pub fn with_related(mut self, location: SourceLocation, message: impl Into<String>) -> Self {
        self.related_information
            .push(DiagnosticRelatedInformation {
                location,
                message_text: message.into(),
            });
        self
    }

    pub fn is_error(&self) -> bool {
        self.category == DiagnosticCategory::Error
    }
}

pub fn get_message_template(code: u32) -> Option<&'static str> {
    DIAGNOSTIC_MESSAGES
        .iter()
        .find(|m| m.code == code)
        .map(|m| m.message)
}

pub fn format_message(message: &str, args: &[&str]) -> String {
    let mut result = message.to_string();
    for (i, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{i}}}"), arg);
    }
    result
}

/// Accepts diagnostics. Reporting never changes any `has_errors` result.
pub trait ErrorSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Thread-safe collecting sink.
#[derive(Debug, Default)]
pub struct DiagnosticBag {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count_code(&self, code: u32) -> usize {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|d| d.code == code)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(Diagnostic::is_error)
    }
}

impl ErrorSink for DiagnosticBag {
    fn report(&self, diagnostic: Diagnostic) {
        tracing::debug!(
            code = diagnostic.code,
            message = %diagnostic.message_text,
            "diagnostic reported"
        );
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic);
    }
}

#[cfg(test)]
#[path = "../tests/diagnostics_tests.rs"]
mod tests;
