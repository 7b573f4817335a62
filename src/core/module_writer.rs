use crate::domain::model::Protocol;
use crate::utils::error::{ExportError, Result};
use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter};
use std::io;

pub const HEADER: [&str; 3] = [
    "/*---------------------------------------------------------",
    " * Copyright (C) Microsoft Corporation. All rights reserved.",
    " *--------------------------------------------------------*/",
];

pub const EXPORT_PREFIX: &str = "export default ";

/// Renders the generated module: header, blank line, then the document as an
/// exported JSON literal. No trailing newline is written.
pub fn render_module<T: Serialize + ?Sized>(document: &T) -> Result<String> {
    let mut out = Vec::new();
    for line in HEADER {
        out.extend_from_slice(line.as_bytes());
        out.push(b'\n');
    }
    out.push(b'\n');
    out.extend_from_slice(EXPORT_PREFIX.as_bytes());

    let mut serializer = serde_json::Serializer::with_formatter(&mut out, AsciiPrettyFormatter::new());
    document.serialize(&mut serializer)?;

    Ok(String::from_utf8(out)?)
}

/// Reads a rendered module back into a protocol.
pub fn parse_module(module: &str) -> Result<Protocol> {
    Ok(serde_json::from_str(module_payload(module)?)?)
}

/// Reads a rendered module back as untyped JSON, keeping key order.
pub fn parse_module_json(module: &str) -> Result<serde_json::Value> {
    Ok(serde_json::from_str(module_payload(module)?)?)
}

fn module_payload(module: &str) -> Result<&str> {
    let mut lines = module.lines();
    for expected in HEADER {
        if lines.next() != Some(expected) {
            return Err(ExportError::ValidationError {
                message: "module does not start with the copyright header".to_string(),
            });
        }
    }

    module
        .find(EXPORT_PREFIX)
        .map(|start| &module[start + EXPORT_PREFIX.len()..])
        .ok_or_else(|| ExportError::ValidationError {
            message: format!("module has no `{}` statement", EXPORT_PREFIX.trim_end()),
        })
}

/// Two-space pretty printing with every character outside printable ASCII
/// written as a `\uXXXX` escape.
struct AsciiPrettyFormatter {
    inner: PrettyFormatter<'static>,
}

impl AsciiPrettyFormatter {
    fn new() -> Self {
        Self {
            inner: PrettyFormatter::with_indent(b"  "),
        }
    }
}

impl Formatter for AsciiPrettyFormatter {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }

    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut units = [0u16; 2];
        for c in fragment.chars() {
            if (' '..='~').contains(&c) {
                writer.write_all(&[c as u8])?;
            } else {
                for unit in c.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Annotations, Domain, Version};

    fn protocol_with_description(description: &str) -> Protocol {
        Protocol {
            version: Version {
                major: Some("1".to_string()),
                minor: Some("0".to_string()),
            },
            domains: vec![Domain::new("Foo", Annotations::new(description, false, false))],
        }
    }

    #[test]
    fn test_render_layout() {
        let module = render_module(&Protocol::default()).unwrap();
        assert_eq!(
            module,
            "/*---------------------------------------------------------\n \
             * Copyright (C) Microsoft Corporation. All rights reserved.\n \
             *--------------------------------------------------------*/\n\
             \n\
             export default {\n  \"version\": {},\n  \"domains\": []\n}"
        );
    }

    #[test]
    fn test_non_ascii_is_escaped() {
        let module = render_module(&protocol_with_description("caf\u{e9} \u{1f600}")).unwrap();
        assert!(module.is_ascii());
        assert!(module.contains(r#""description": "caf\u00e9 \ud83d\ude00""#));

        let parsed = parse_module(&module).unwrap();
        assert_eq!(
            parsed.domains[0].annotations.description.as_deref(),
            Some("caf\u{e9} \u{1f600}")
        );
    }

    #[test]
    fn test_control_characters_use_short_escapes() {
        let module = render_module(&protocol_with_description("line one\nline \"two\"")).unwrap();
        assert!(module.contains(r#""description": "line one\nline \"two\"""#));
    }

    #[test]
    fn test_parse_module_rejects_missing_header() {
        let err = parse_module("export default {}").unwrap_err();
        assert!(matches!(err, ExportError::ValidationError { .. }));
    }
}
