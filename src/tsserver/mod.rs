//! `tsserver` as a [`DiagnosticSource`], spoken over stdio.
//!
//! One server process serves a whole run. Requests are strictly sequential:
//! each call writes one request and reads frames until the matching response,
//! skipping events in between.

pub mod protocol;

use crate::diagnostic::{CancelToken, Diagnostic, DiagnosticSource, Location, SourceError, TypeInfo};
use crate::edit::{Position, Range, TextEdit};
use crate::position::char_index_for_byte_offset;
use protocol::{
    read_message, DiagnosticWithLinePosition, DiagnosticsArgs, FileArgs, FileCodeEdits, FileScope,
    LocationArgs, OrganizeImportsArgs, QuickInfoBody, ReloadArgs, Request,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use tracing::{debug, trace};

/// Resolve the server command, preferring the workspace's local install.
pub fn resolve_command(workspace: &Path, command: &str) -> PathBuf {
    let command_path = Path::new(command);
    if command_path.components().count() == 1 {
        let local = workspace.join("node_modules/.bin").join(command);
        if local.exists() {
            return local;
        }
    }
    command_path.to_path_buf()
}

/// A running tsserver process.
pub struct TsServer {
    command: String,
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    seq: u64,
    opened: HashSet<PathBuf>,
}

impl TsServer {
    /// Start `command` with `args` in `cwd`.
    pub fn spawn(command: &Path, args: &[String], cwd: &Path) -> Result<Self, SourceError> {
        let shown = command.display().to_string();
        let mut child = Command::new(command)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| SourceError::Spawn {
                command: shown.clone(),
                source,
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            return Err(SourceError::Disconnected);
        };
        debug!(command = %shown, pid = child.id(), "started tsserver");

        Ok(Self {
            command: shown,
            child,
            stdin,
            stdout: BufReader::new(stdout),
            seq: 0,
            opened: HashSet::new(),
        })
    }

    fn write<A: Serialize>(&mut self, command: &str, arguments: A) -> Result<u64, SourceError> {
        self.seq += 1;
        let mut line = serde_json::to_string(&Request::new(self.seq, command, arguments))?;
        line.push('\n');
        trace!(request = %line.trim_end(), "tsserver request");
        self.stdin.write_all(line.as_bytes())?;
        self.stdin.flush()?;
        Ok(self.seq)
    }

    /// Send a command that produces no response.
    fn notify<A: Serialize>(
        &mut self,
        command: &str,
        arguments: A,
        cancel: &CancelToken,
    ) -> Result<(), SourceError> {
        cancel.check()?;
        self.write(command, arguments).map(drop)
    }

    /// Send a command and wait for its response body.
    fn request<A: Serialize, T: DeserializeOwned>(
        &mut self,
        command: &str,
        arguments: A,
        cancel: &CancelToken,
    ) -> Result<Option<T>, SourceError> {
        cancel.check()?;
        let seq = self.write(command, arguments)?;

        loop {
            let Some(message) = read_message(&mut self.stdout)? else {
                return Err(SourceError::Disconnected);
            };
            if !message.is_response_to(seq) {
                continue;
            }
            if message.success == Some(false) {
                return Err(SourceError::Request {
                    command: command.to_string(),
                    message: message.message.unwrap_or_default(),
                });
            }
            return match message.body {
                Some(body) if !body.is_null() => Ok(Some(serde_json::from_value(body)?)),
                _ => Ok(None),
            };
        }
    }

    fn ensure_open(&mut self, file: &Path, cancel: &CancelToken) -> Result<(), SourceError> {
        if self.opened.contains(file) {
            return Ok(());
        }
        let name = file_arg(file)?;
        self.notify("open", FileArgs { file: name }, cancel)?;
        self.opened.insert(file.to_path_buf());
        Ok(())
    }
}

fn file_arg(file: &Path) -> Result<&str, SourceError> {
    file.to_str()
        .ok_or_else(|| SourceError::Protocol(format!("non UTF-8 path: {}", file.display())))
}

/// Convert server code edits into character-addressed edits for `text`.
fn code_edits_to_text_edits(text: &str, changes: Vec<FileCodeEdits>, file: &Path) -> Vec<TextEdit> {
    let position = |loc: protocol::ProtocolLocation| {
        let index = loc.line.saturating_sub(1);
        let line = crate::edit::line_of(text, index).unwrap_or("");
        Position::new(index as u32, char_index_for_byte_offset(line, loc.offset) as u32)
    };
    changes
        .into_iter()
        .filter(|change| Path::new(&change.file_name) == file)
        .flat_map(|change| change.text_changes)
        .map(|edit| {
            TextEdit::new(
                Range::new(position(edit.start), position(edit.end)),
                edit.new_text,
            )
        })
        .collect()
}

impl DiagnosticSource for TsServer {
    fn diagnostics(
        &mut self,
        file: &Path,
        cancel: &CancelToken,
    ) -> Result<Vec<Diagnostic>, SourceError> {
        self.ensure_open(file, cancel)?;
        let args = DiagnosticsArgs {
            file: file_arg(file)?,
            include_line_position: true,
        };
        let body: Option<Vec<DiagnosticWithLinePosition>> =
            self.request("semanticDiagnosticsSync", args, cancel)?;
        Ok(body
            .unwrap_or_default()
            .into_iter()
            .map(Diagnostic::from)
            .collect())
    }

    fn type_info(
        &mut self,
        file: &Path,
        location: Location,
        cancel: &CancelToken,
    ) -> Result<TypeInfo, SourceError> {
        self.ensure_open(file, cancel)?;
        let args = LocationArgs {
            file: file_arg(file)?,
            line: location.line,
            offset: location.offset,
        };
        let body: Option<QuickInfoBody> = self.request("quickinfo", args, cancel)?;
        let body = body.ok_or_else(|| SourceError::Request {
            command: "quickinfo".to_string(),
            message: format!("no type information at {location}"),
        })?;
        Ok(TypeInfo::new(body.display_string))
    }

    fn reload(&mut self, file: &Path, cancel: &CancelToken) -> Result<(), SourceError> {
        self.ensure_open(file, cancel)?;
        let name = file_arg(file)?;
        let _: Option<serde_json::Value> = self.request(
            "reload",
            ReloadArgs {
                file: name,
                tmpfile: name,
            },
            cancel,
        )?;
        Ok(())
    }

    fn organize_imports(
        &mut self,
        file: &Path,
        cancel: &CancelToken,
    ) -> Result<Vec<TextEdit>, SourceError> {
        self.ensure_open(file, cancel)?;
        let args = OrganizeImportsArgs {
            scope: FileScope {
                kind: "file",
                args: FileArgs {
                    file: file_arg(file)?,
                },
            },
        };
        let body: Option<Vec<FileCodeEdits>> = self.request("organizeImports", args, cancel)?;
        let text = fs::read_to_string(file)?;
        Ok(code_edits_to_text_edits(&text, body.unwrap_or_default(), file))
    }
}

impl Drop for TsServer {
    fn drop(&mut self) {
        let _ = self.write("exit", serde_json::json!({}));
        if !matches!(self.child.try_wait(), Ok(Some(_))) {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
        debug!(command = %self.command, "stopped tsserver");
    }
}
