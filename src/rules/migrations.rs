//! The coc.nvim API migrations, one check per rule.

use super::{LineContext, RuleId, RuleMatch, RuleOutcome, TypeCheck};
use crate::diagnostic::{Diagnostic, Location};
use crate::edit::{Range, TextEdit};
use crate::position::{byte_offset_for_char_index, char_index_for_byte_offset, char_slice, word_range_at};
use regex::Regex;
use std::sync::LazyLock;

/// Members that moved from `workspace` to `window`.
pub const RELOCATED_PROPERTIES: &[&str] = &[
    "showMessage",
    "runTerminalCommand",
    "openTerminal",
    "showQuickpick",
    "menuPick",
    "openLocalConfig",
    "showPrompt",
    "createStatusBarItem",
    "createOutputChannel",
    "showOutputChannel",
    "requestInput",
    "echoLines",
    "getCursorPosition",
    "moveTo",
    "getOffset",
];

/// Import inserted at the top of files that gained a `window.` reference.
pub const WINDOW_IMPORT: &str = "import {window} from 'coc.nvim'\n";

const ARITY_PREFIX: &str = "Expected 1 arguments,";
const FLOAT_CREATE_MESSAGE: &str = "Property 'create' does not exist on type 'FloatFactory'.";
const LOG_ERROR_PREFIX: &str = "Property 'logError' does not exist on type 'Promise";

static MISSING_ON_WORKSPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Property '(\w+)' does not exist on type 'typeof workspace'")
        .expect("valid relocated property regex")
});
static FLOAT_FACTORY_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"new FloatFactory\((\w+),.+?\)").expect("valid FloatFactory regex")
});
static FLOAT_CREATE_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bcreate\((\w+),.+?\)").expect("valid create regex"));
static APPLY_EDITS_HEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"applyEdits\(.*?,\s*").expect("valid applyEdits regex"));
static LOG_ERROR_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.logError\(\)").expect("valid logError regex"));

/// Net parenthesis depth of a line.
fn paren_balance(text: &str) -> isize {
    text.chars().fold(0, |depth, c| match c {
        '(' => depth + 1,
        ')' => depth - 1,
        _ => depth,
    })
}

/// Rewrite the line with `re` and turn the difference into a match.
///
/// With `keep_balance`, a rewrite that changes the parenthesis balance of the
/// line is discarded: the lazy argument match stopped inside a nested call.
fn rewrite_line(
    rule: RuleId,
    line: &LineContext<'_>,
    re: &Regex,
    replacement: &str,
    keep_balance: bool,
) -> RuleOutcome {
    let rewritten = re.replace(line.text, replacement);
    if keep_balance && paren_balance(&rewritten) != paren_balance(line.text) {
        return RuleOutcome::NoMatch;
    }
    match TextEdit::between_lines(line.line_index, line.text, &rewritten) {
        Some(edit) => RuleOutcome::Matched(RuleMatch {
            rule,
            edit,
            needs_import: false,
        }),
        None => RuleOutcome::NoMatch,
    }
}

/// `workspace.showMessage(...)` → `window.showMessage(...)`.
///
/// The diagnostic points at the property; the qualifier is the word ending
/// right before the dot that precedes it. Any qualifier is rewritten, so an
/// aliased import (`workspace as ws`) is fixed too. A qualifier that already
/// reads `window` is left alone.
pub(super) fn relocated_property(diag: &Diagnostic, line: &LineContext<'_>) -> RuleOutcome {
    let Some(caps) = MISSING_ON_WORKSPACE.captures(&diag.message) else {
        return RuleOutcome::NoMatch;
    };
    if !RELOCATED_PROPERTIES.contains(&&caps[1]) {
        return RuleOutcome::NoMatch;
    }

    let property = char_index_for_byte_offset(line.text, diag.start.offset);
    if property < 2 || char_slice(line.text, property - 1, property) != "." {
        return RuleOutcome::NoMatch;
    }
    let Some((start, end)) = word_range_at(line.text, property - 2) else {
        return RuleOutcome::NoMatch;
    };
    if char_slice(line.text, start, end) == "window" {
        return RuleOutcome::NoMatch;
    }

    RuleOutcome::Matched(RuleMatch {
        rule: RuleId::RelocatedProperty,
        edit: TextEdit::new(
            Range::on_line(line.line_index, start as u32, end as u32),
            "window",
        ),
        needs_import: true,
    })
}

/// `new FloatFactory(nvim, a, b)` → `new FloatFactory(nvim)`.
pub(super) fn float_factory_args(diag: &Diagnostic, line: &LineContext<'_>) -> RuleOutcome {
    if !diag.message.starts_with(ARITY_PREFIX) || !line.text.contains("new FloatFactory") {
        return RuleOutcome::NoMatch;
    }
    rewrite_line(
        RuleId::FloatFactoryArgs,
        line,
        &FLOAT_FACTORY_CALL,
        "new FloatFactory($1)",
        true,
    )
}

/// `factory.create(docs, opts)` → `factory.show(docs)`.
pub(super) fn float_factory_create(diag: &Diagnostic, line: &LineContext<'_>) -> RuleOutcome {
    if diag.message != FLOAT_CREATE_MESSAGE {
        return RuleOutcome::NoMatch;
    }
    rewrite_line(
        RuleId::FloatFactoryCreate,
        line,
        &FLOAT_CREATE_CALL,
        "show($1)",
        true,
    )
}

/// `doc.applyEdits(nvim, edits)` → `doc.applyEdits(edits)`, for `Document`
/// receivers only.
///
/// The message alone cannot tell a `Document` from other types with an
/// `applyEdits` method, so the match is deferred to a type check on the last
/// character of the receiver.
pub(super) fn document_apply_edits(diag: &Diagnostic, line: &LineContext<'_>) -> RuleOutcome {
    if !diag.message.starts_with(ARITY_PREFIX) {
        return RuleOutcome::NoMatch;
    }
    let Some(byte_index) = line.text.find("applyEdits") else {
        return RuleOutcome::NoMatch;
    };
    let method = line.text[..byte_index].chars().count();
    if method < 2 || char_slice(line.text, method - 1, method) != "." {
        return RuleOutcome::NoMatch;
    }

    let rewritten = APPLY_EDITS_HEAD.replace(line.text, "applyEdits(");
    let Some(edit) = TextEdit::between_lines(line.line_index, line.text, &rewritten) else {
        return RuleOutcome::NoMatch;
    };

    RuleOutcome::NeedsTypeCheck(TypeCheck {
        rule: RuleId::DocumentApplyEdits,
        location: Location::new(
            line.line_index as usize + 1,
            byte_offset_for_char_index(line.text, method - 2),
        ),
        expected_type: "Document",
        edit,
    })
}

/// `promise.logError()` → `promise`.
pub(super) fn promise_log_error(diag: &Diagnostic, line: &LineContext<'_>) -> RuleOutcome {
    if !diag.message.starts_with(LOG_ERROR_PREFIX) {
        return RuleOutcome::NoMatch;
    }
    rewrite_line(RuleId::PromiseLogError, line, &LOG_ERROR_CALL, "", false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::apply_batch;

    fn context(text: &str) -> LineContext<'_> {
        LineContext {
            line_index: 4,
            text,
        }
    }

    fn diag(message: &str, offset: usize) -> Diagnostic {
        Diagnostic::new(message, Location::new(5, offset))
    }

    /// Apply `edit` to `line` placed at line index 4 of a document.
    fn rewrite(line: &str, edit: TextEdit) -> String {
        let text = format!("\n\n\n\n{line}");
        let out = apply_batch(&text, &[edit]).unwrap();
        out["\n\n\n\n".len()..].to_string()
    }

    fn expect_match(outcome: RuleOutcome) -> RuleMatch {
        match outcome {
            RuleOutcome::Matched(m) => m,
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn test_relocated_property_rewrites_qualifier() {
        let line = "  workspace.showMessage('x')";
        let d = diag(
            "Property 'showMessage' does not exist on type 'typeof workspace'.",
            13,
        );
        let m = expect_match(relocated_property(&d, &context(line)));
        assert!(m.needs_import);
        assert_eq!(m.edit.range, Range::on_line(4, 2, 11));
        assert_eq!(rewrite(line, m.edit), "  window.showMessage('x')");
    }

    #[test]
    fn test_relocated_property_after_multibyte_text() {
        let line = "let s = '中文'; workspace.echoLines(lines)";
        let column = line.find("echoLines").unwrap() + 1;
        let d = diag(
            "Property 'echoLines' does not exist on type 'typeof workspace'.",
            column,
        );
        let m = expect_match(relocated_property(&d, &context(line)));
        assert_eq!(
            rewrite(line, m.edit),
            "let s = '中文'; window.echoLines(lines)"
        );
    }

    #[test]
    fn test_relocated_property_requires_allow_list() {
        let line = "workspace.openTextDocument(uri)";
        let d = diag(
            "Property 'openTextDocument' does not exist on type 'typeof workspace'.",
            11,
        );
        assert_eq!(relocated_property(&d, &context(line)), RuleOutcome::NoMatch);
    }

    #[test]
    fn test_relocated_property_aliased_import() {
        let line = "ws.showMessage('x')";
        let d = diag(
            "Property 'showMessage' does not exist on type 'typeof workspace'.",
            4,
        );
        let m = expect_match(relocated_property(&d, &context(line)));
        assert!(m.needs_import);
        assert_eq!(rewrite(line, m.edit), "window.showMessage('x')");
    }

    #[test]
    fn test_relocated_property_skips_window_qualifier() {
        let line = "window.showMessage('x')";
        let d = diag(
            "Property 'showMessage' does not exist on type 'typeof workspace'.",
            8,
        );
        assert_eq!(relocated_property(&d, &context(line)), RuleOutcome::NoMatch);
    }

    #[test]
    fn test_float_factory_args() {
        let line = "new FloatFactory(nvim, extra)";
        let d = diag("Expected 1 arguments, but got 2.", 1);
        let m = expect_match(float_factory_args(&d, &context(line)));
        assert_eq!(m.edit.new_text, "");
        assert_eq!(m.edit.range, Range::on_line(4, 21, 28));
        assert_eq!(rewrite(line, m.edit), "new FloatFactory(nvim)");
    }

    #[test]
    fn test_float_factory_args_many_arguments() {
        let line = "this.factory = new FloatFactory(this.nvim, env, false, 8)";
        let d = diag("Expected 1 arguments, but got 4.", 16);
        // `this.nvim` is not a bare word, so the line is left alone.
        assert_eq!(float_factory_args(&d, &context(line)), RuleOutcome::NoMatch);

        let line = "this.factory = new FloatFactory(nvim, env, false, 8)";
        let m = expect_match(float_factory_args(&d, &context(line)));
        assert_eq!(
            rewrite(line, m.edit),
            "this.factory = new FloatFactory(nvim)"
        );
    }

    #[test]
    fn test_float_factory_args_nested_call_left_alone() {
        let line = "new FloatFactory(nvim, getEnv())";
        let d = diag("Expected 1 arguments, but got 2.", 1);
        assert_eq!(float_factory_args(&d, &context(line)), RuleOutcome::NoMatch);
    }

    #[test]
    fn test_float_factory_create_nested_call_left_alone() {
        let line = "factory.create(docs, getOpts())";
        let d = diag("Property 'create' does not exist on type 'FloatFactory'.", 9);
        assert_eq!(float_factory_create(&d, &context(line)), RuleOutcome::NoMatch);
    }

    #[test]
    fn test_float_factory_create() {
        let line = "factory.create(win, opts)";
        let d = diag("Property 'create' does not exist on type 'FloatFactory'.", 9);
        let m = expect_match(float_factory_create(&d, &context(line)));
        assert_eq!(rewrite(line, m.edit), "factory.show(win)");
    }

    #[test]
    fn test_float_factory_create_requires_exact_message() {
        let line = "factory.create(win, opts)";
        let d = diag("Property 'create' does not exist on type 'FloatFactory'", 9);
        assert_eq!(float_factory_create(&d, &context(line)), RuleOutcome::NoMatch);
    }

    #[test]
    fn test_document_apply_edits_defers_to_type_check() {
        let line = "await this.doc.applyEdits(workspace.nvim, edits)";
        let d = diag("Expected 1 arguments, but got 2.", 27);
        let RuleOutcome::NeedsTypeCheck(check) = document_apply_edits(&d, &context(line)) else {
            panic!("expected a pending type check");
        };
        // Last character of `doc`.
        assert_eq!(check.location, Location::new(5, 14));
        assert_eq!(check.expected_type, "Document");
        assert_eq!(check.edit.range, Range::on_line(4, 26, 42));
    }

    #[test]
    fn test_document_apply_edits_requires_member_call() {
        let d = diag("Expected 1 arguments, but got 2.", 1);
        assert_eq!(
            document_apply_edits(&d, &context("applyEdits(nvim, edits)")),
            RuleOutcome::NoMatch
        );
        assert_eq!(
            document_apply_edits(&d, &context("doc.applyEdits(edits)")),
            RuleOutcome::NoMatch
        );
    }

    #[test]
    fn test_promise_log_error() {
        let line = "doSomething().logError()";
        let d = diag("Property 'logError' does not exist on type 'Promise<void>'", 14);
        let m = expect_match(promise_log_error(&d, &context(line)));
        assert_eq!(rewrite(line, m.edit), "doSomething()");
    }

    #[test]
    fn test_promise_log_error_only_first_call() {
        let line = "a().logError(); b().logError()";
        let d = diag("Property 'logError' does not exist on type 'Promise<boolean>'", 4);
        let m = expect_match(promise_log_error(&d, &context(line)));
        assert_eq!(
            rewrite(line, m.edit),
            "a(); b().logError()"
        );
    }
}
