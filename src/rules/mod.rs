//! Ordered catalogue of migration rules.
//!
//! Each rule inspects one diagnostic and the source line it points at, and
//! either declines, produces an edit, or asks for a type check before it can
//! decide. Rules are tried in [`CATALOGUE`] order; the first one that does not
//! decline owns the diagnostic.
//!
//! # Example
//!
//! ```
//! use coc_codemod::diagnostic::{Diagnostic, Location};
//! use coc_codemod::rules::{evaluate, RuleOutcome};
//!
//! let diag = Diagnostic::new(
//!     "Property 'logError' does not exist on type 'Promise<void>'",
//!     Location::new(1, 14),
//! );
//! match evaluate(&diag, "doSomething().logError()") {
//!     RuleOutcome::Matched(m) => assert_eq!(m.edit.new_text, ""),
//!     other => panic!("unexpected outcome: {other:?}"),
//! }
//! ```

mod migrations;

use crate::diagnostic::{Diagnostic, Location, TypeInfo};
use crate::edit::TextEdit;
use std::fmt;

pub use migrations::{RELOCATED_PROPERTIES, WINDOW_IMPORT};

/// Stable identifier of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleId {
    RelocatedProperty,
    FloatFactoryArgs,
    FloatFactoryCreate,
    DocumentApplyEdits,
    PromiseLogError,
}

impl RuleId {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleId::RelocatedProperty => "relocated-property",
            RuleId::FloatFactoryArgs => "float-factory-args",
            RuleId::FloatFactoryCreate => "float-factory-create",
            RuleId::DocumentApplyEdits => "document-apply-edits",
            RuleId::PromiseLogError => "promise-log-error",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An accepted rewrite for one diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub rule: RuleId,
    pub edit: TextEdit,
    /// The file must import `window` from coc.nvim after this edit.
    pub needs_import: bool,
}

/// A match that is only valid if the receiver has the expected static type.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a pending type check produces no edit until confirmed"]
pub struct TypeCheck {
    pub rule: RuleId,
    /// Where to ask for type information (1-based line, 1-based byte column)
    pub location: Location,
    /// Suffix the reported display type must end with
    pub expected_type: &'static str,
    edit: TextEdit,
}

impl TypeCheck {
    /// Finalize the match against the type reported at [`TypeCheck::location`].
    pub fn confirm(self, info: &TypeInfo) -> Option<RuleMatch> {
        if !info.display_type.ends_with(self.expected_type) {
            return None;
        }
        Some(RuleMatch {
            rule: self.rule,
            edit: self.edit,
            needs_import: false,
        })
    }
}

/// Decision of a rule (or of the whole catalogue) for one diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    NoMatch,
    Matched(RuleMatch),
    NeedsTypeCheck(TypeCheck),
}

impl RuleOutcome {
    pub fn is_match(&self) -> bool {
        !matches!(self, RuleOutcome::NoMatch)
    }
}

/// Input handed to each rule.
#[derive(Debug, Clone, Copy)]
pub struct LineContext<'a> {
    /// 0-based line index of the diagnostic
    pub line_index: u32,
    /// Text of that line, without terminator
    pub text: &'a str,
}

/// A message/line predicate paired with an edit synthesizer.
pub struct Rule {
    pub id: RuleId,
    pub summary: &'static str,
    check: fn(&Diagnostic, &LineContext<'_>) -> RuleOutcome,
}

impl Rule {
    pub fn check(&self, diagnostic: &Diagnostic, line: &LineContext<'_>) -> RuleOutcome {
        (self.check)(diagnostic, line)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("summary", &self.summary)
            .finish()
    }
}

/// All rules in priority order.
pub const CATALOGUE: &[Rule] = &[
    Rule {
        id: RuleId::RelocatedProperty,
        summary: "workspace.<member> moved to window.<member>; adds the window import",
        check: migrations::relocated_property,
    },
    Rule {
        id: RuleId::FloatFactoryArgs,
        summary: "new FloatFactory(nvim, ...) takes only nvim",
        check: migrations::float_factory_args,
    },
    Rule {
        id: RuleId::FloatFactoryCreate,
        summary: "FloatFactory.create(docs, opts) renamed to show(docs)",
        check: migrations::float_factory_create,
    },
    Rule {
        id: RuleId::DocumentApplyEdits,
        summary: "Document.applyEdits(nvim, edits) takes only edits (checks receiver type)",
        check: migrations::document_apply_edits,
    },
    Rule {
        id: RuleId::PromiseLogError,
        summary: "Promise.logError() removed; drops the chained call",
        check: migrations::promise_log_error,
    },
];

/// Run `diagnostic` through the catalogue against the line it points at.
///
/// Returns the outcome of the first rule that does not decline.
pub fn evaluate(diagnostic: &Diagnostic, line: &str) -> RuleOutcome {
    let Some(line_index) = diagnostic.start.line_index() else {
        return RuleOutcome::NoMatch;
    };
    let context = LineContext {
        line_index: line_index as u32,
        text: line,
    };

    CATALOGUE
        .iter()
        .map(|rule| rule.check(diagnostic, &context))
        .find(RuleOutcome::is_match)
        .unwrap_or(RuleOutcome::NoMatch)
}
