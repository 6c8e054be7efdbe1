//! Wire types and framing for the tsserver stdio protocol.
//!
//! Requests are written as one JSON object per line. Responses and events come
//! back as `Content-Length: N\r\n\r\n` frames whose body is a JSON object.

use crate::diagnostic::{Diagnostic, Location, SourceError};
use serde::{Deserialize, Serialize};
use std::io::BufRead;

#[derive(Debug, Serialize)]
pub struct Request<'a, A> {
    pub seq: u64,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub command: &'a str,
    pub arguments: A,
}

impl<'a, A> Request<'a, A> {
    pub fn new(seq: u64, command: &'a str, arguments: A) -> Self {
        Self {
            seq,
            kind: "request",
            command,
            arguments,
        }
    }
}

/// Any frame emitted by the server.
#[derive(Debug, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub request_seq: Option<u64>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub body: Option<serde_json::Value>,
}

impl Message {
    pub fn is_response_to(&self, seq: u64) -> bool {
        self.kind == "response" && self.request_seq == Some(seq)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProtocolLocation {
    pub line: usize,
    pub offset: usize,
}

impl From<ProtocolLocation> for Location {
    fn from(loc: ProtocolLocation) -> Self {
        Location::new(loc.line, loc.offset)
    }
}

#[derive(Debug, Serialize)]
pub struct FileArgs<'a> {
    pub file: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsArgs<'a> {
    pub file: &'a str,
    pub include_line_position: bool,
}

#[derive(Debug, Serialize)]
pub struct LocationArgs<'a> {
    pub file: &'a str,
    pub line: usize,
    pub offset: usize,
}

#[derive(Debug, Serialize)]
pub struct ReloadArgs<'a> {
    pub file: &'a str,
    pub tmpfile: &'a str,
}

#[derive(Debug, Serialize)]
pub struct OrganizeImportsArgs<'a> {
    pub scope: FileScope<'a>,
}

#[derive(Debug, Serialize)]
pub struct FileScope<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub args: FileArgs<'a>,
}

/// Body entry of `semanticDiagnosticsSync` with `includeLinePosition`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticWithLinePosition {
    pub message: String,
    pub start_location: ProtocolLocation,
    #[serde(default)]
    pub code: Option<u32>,
    #[serde(default)]
    pub category: Option<String>,
}

impl From<DiagnosticWithLinePosition> for Diagnostic {
    fn from(d: DiagnosticWithLinePosition) -> Self {
        Diagnostic {
            message: d.message,
            start: d.start_location.into(),
            code: d.code,
            category: d.category,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickInfoBody {
    pub display_string: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCodeEdits {
    pub file_name: String,
    pub text_changes: Vec<CodeEdit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeEdit {
    pub start: ProtocolLocation,
    pub end: ProtocolLocation,
    pub new_text: String,
}

/// Read one framed message. Returns `Ok(None)` at end of stream.
pub fn read_message<R: BufRead>(reader: &mut R) -> Result<Option<Message>, SourceError> {
    let mut content_length = None;
    let mut header = String::new();
    loop {
        header.clear();
        if reader.read_line(&mut header)? == 0 {
            return Ok(None);
        }
        let line = header.trim_end();
        if line.is_empty() {
            // Blank lines between frames carry no header.
            if content_length.is_some() {
                break;
            }
            continue;
        }
        if let Some(value) = line.strip_prefix("Content-Length:") {
            let length = value
                .trim()
                .parse::<usize>()
                .map_err(|e| SourceError::Protocol(format!("bad Content-Length {value:?}: {e}")))?;
            content_length = Some(length);
        }
    }

    let Some(length) = content_length else {
        return Err(SourceError::Protocol("frame without Content-Length".to_string()));
    };
    let mut body = vec![0; length];
    reader.read_exact(&mut body)?;
    let message = serde_json::from_slice(body.trim_ascii())?;
    Ok(Some(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    fn frame(json: &str) -> String {
        format!("Content-Length: {}\r\n\r\n{}\n", json.len() + 1, json)
    }

    #[test]
    fn test_request_serialization() {
        let request = Request::new(
            3,
            "semanticDiagnosticsSync",
            DiagnosticsArgs {
                file: "/w/a.ts",
                include_line_position: true,
            },
        );
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(
            json,
            r#"{"seq":3,"type":"request","command":"semanticDiagnosticsSync","arguments":{"file":"/w/a.ts","includeLinePosition":true}}"#
        );
    }

    #[test]
    fn test_organize_imports_args() {
        let args = OrganizeImportsArgs {
            scope: FileScope {
                kind: "file",
                args: FileArgs { file: "/w/a.ts" },
            },
        };
        assert_eq!(
            serde_json::to_string(&args).unwrap(),
            r#"{"scope":{"type":"file","args":{"file":"/w/a.ts"}}}"#
        );
    }

    #[test]
    fn test_read_frames_and_events() {
        let stream = [
            frame(r#"{"seq":0,"type":"event","event":"typingsInstallerPid","body":{"pid":1}}"#),
            frame(
                r#"{"seq":0,"type":"response","command":"quickinfo","request_seq":2,"success":true,"body":{"displayString":"const doc: Document"}}"#,
            ),
        ]
        .concat();
        let mut reader = BufReader::new(stream.as_bytes());

        let event = read_message(&mut reader).unwrap().unwrap();
        assert_eq!(event.kind, "event");
        assert!(!event.is_response_to(2));

        let response = read_message(&mut reader).unwrap().unwrap();
        assert!(response.is_response_to(2));
        let body: QuickInfoBody = serde_json::from_value(response.body.unwrap()).unwrap();
        assert_eq!(body.display_string, "const doc: Document");

        assert!(read_message(&mut reader).unwrap().is_none());
    }

    #[test]
    fn test_read_multibyte_body() {
        let json = r#"{"seq":0,"type":"response","request_seq":1,"success":false,"message":"无法"}"#;
        let stream = frame(json);
        let mut reader = BufReader::new(stream.as_bytes());
        let message = read_message(&mut reader).unwrap().unwrap();
        assert_eq!(message.success, Some(false));
        assert_eq!(message.message.as_deref(), Some("无法"));
    }

    #[test]
    fn test_read_rejects_bad_length() {
        let mut reader = BufReader::new("Content-Length: nope\r\n\r\n{}".as_bytes());
        assert!(matches!(
            read_message(&mut reader),
            Err(SourceError::Protocol(_))
        ));
    }

    #[test]
    fn test_diagnostic_conversion() {
        let raw = r#"{"message":"Property 'showMessage' does not exist on type 'typeof workspace'.","start":10,"length":11,"startLocation":{"line":3,"offset":11},"endLocation":{"line":3,"offset":22},"category":"error","code":2339}"#;
        let parsed: DiagnosticWithLinePosition = serde_json::from_str(raw).unwrap();
        let diagnostic = Diagnostic::from(parsed);
        assert_eq!(diagnostic.start, Location::new(3, 11));
        assert_eq!(diagnostic.code, Some(2339));
        assert_eq!(diagnostic.category.as_deref(), Some("error"));
    }
}
