//! Parser for the line-oriented Protocol Definition Language.
//!
//! Indentation is significant: domains start at column 0, domain members
//! (`type`, `command`, `event`, `depends on`) at two spaces, item sections
//! (`parameters`, `returns`, `properties`, `enum`, `redirect`) at four and
//! section entries at six. Enum literals of an `enum` parameter sit at eight.
//!
//! `#` lines accumulate into a description that is attached to the next
//! declaration and dropped by any other line, including a blank one.

use crate::domain::model::{
    Annotations, Command, Domain, Event, KeyOrder, Parameter, PrimitiveType, Protocol,
    ProtocolDocument, TypeDef, TypeSpec,
};
use crate::utils::error::{ExportError, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static DOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(experimental )?(deprecated )?domain (.*)").expect("valid domain regex")
});
static DEPENDS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^  depends on ([^\s]+)").expect("valid depends regex"));
static TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^  (experimental )?(deprecated )?type (.*) extends (array of )?([^\s]+)")
        .expect("valid type regex")
});
static MEMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^  (experimental )?(deprecated )?(command|event) (.*)")
        .expect("valid command regex")
});
static PARAMETER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^      (experimental )?(deprecated )?(optional )?(array of )?([^\s]+) ([^\s]+)",
    )
    .expect("valid parameter regex")
});
static SECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^    (parameters|returns|properties)").expect("valid section regex")
});
static ENUM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^    enum").expect("valid enum regex"));
static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^version").expect("valid version regex"));
static MAJOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^  major (\d+)").expect("valid major regex"));
static MINOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^  minor (\d+)").expect("valid minor regex"));
static REDIRECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^    redirect ([^\s]+)").expect("valid redirect regex"));
static LITERAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^      (  )?[^\s]+$").expect("valid enum literal regex"));

/// Parses `text` as PDL when `file_name` ends in `.pdl`, otherwise reads it
/// as a JSON document that is passed through unchanged.
pub fn load_protocol(
    text: &str,
    file_name: &str,
    map_binary_to_string: bool,
) -> Result<ProtocolDocument> {
    if file_name.ends_with(".pdl") {
        parse(text, file_name, map_binary_to_string).map(ProtocolDocument::Pdl)
    } else {
        tracing::debug!("{} is not a .pdl file, reading it as JSON", file_name);
        Ok(ProtocolDocument::Json(serde_json::from_str(text)?))
    }
}

/// Parses PDL source. `file_name` only appears in error messages.
pub fn parse(text: &str, file_name: &str, map_binary_to_string: bool) -> Result<Protocol> {
    let mut parser = PdlParser::new(file_name, map_binary_to_string);
    for (index, line) in text.lines().enumerate() {
        parser.feed(index + 1, line)?;
    }
    Ok(parser.finish())
}

/// Maps a PDL type name to its JSON type description.
pub fn assign_type(type_name: &str, is_array: bool, map_binary_to_string: bool) -> TypeSpec {
    if is_array {
        return TypeSpec::array_of(assign_type(type_name, false, map_binary_to_string));
    }

    match PrimitiveType::from_name(type_name) {
        Some(PrimitiveType::Binary) if map_binary_to_string => {
            TypeSpec::primitive(PrimitiveType::String)
        }
        Some(primitive) => TypeSpec::primitive(primitive),
        None if type_name == "enum" => TypeSpec::primitive(PrimitiveType::String),
        None => TypeSpec::reference(type_name),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemKind {
    Type,
    Command,
    Event,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Parameters,
    Returns,
    Properties,
}

impl ItemKind {
    fn with_article(&self) -> &'static str {
        match self {
            ItemKind::Type => "a type",
            ItemKind::Command => "a command",
            ItemKind::Event => "an event",
        }
    }
}

impl Section {
    fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "parameters" => Section::Parameters,
            "returns" => Section::Returns,
            _ => Section::Properties,
        }
    }

    fn keyword(&self) -> &'static str {
        match self {
            Section::Parameters => "parameters",
            Section::Returns => "returns",
            Section::Properties => "properties",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumTarget {
    Type,
    Parameter,
}

/// Incremental parser state. The open item is always the last type, command
/// or event of the last domain, so only its kind is tracked.
struct PdlParser<'a> {
    file_name: &'a str,
    map_binary_to_string: bool,
    protocol: Protocol,
    description: String,
    item: Option<ItemKind>,
    section: Option<Section>,
    enum_target: Option<EnumTarget>,
}

fn parse_error(file: &str, line: usize, message: impl Into<String>) -> ExportError {
    ExportError::ParseError {
        file: file.to_string(),
        line,
        message: message.into(),
    }
}

fn annotations(caps: &Captures<'_>, description: &str) -> Annotations {
    Annotations::new(description, caps.get(1).is_some(), caps.get(2).is_some())
}

impl<'a> PdlParser<'a> {
    fn new(file_name: &'a str, map_binary_to_string: bool) -> Self {
        Self {
            file_name,
            map_binary_to_string,
            protocol: Protocol::default(),
            description: String::new(),
            item: None,
            section: None,
            enum_target: None,
        }
    }

    fn finish(self) -> Protocol {
        self.protocol
    }

    fn feed(&mut self, line_no: usize, line: &str) -> Result<()> {
        let trimmed = line.trim();

        if trimmed.starts_with('#') {
            if !self.description.is_empty() {
                self.description.push('\n');
            }
            // Drop the "# " marker.
            self.description.extend(trimmed.chars().skip(2));
            return Ok(());
        }

        let description = std::mem::take(&mut self.description);
        if trimmed.is_empty() {
            return Ok(());
        }

        self.parse_line(line_no, line, trimmed, &description)
    }

    fn parse_line(
        &mut self,
        line_no: usize,
        line: &str,
        trimmed: &str,
        description: &str,
    ) -> Result<()> {
        if let Some(caps) = DOMAIN_RE.captures(line) {
            self.open_domain(&caps, description);
            return Ok(());
        }
        if let Some(caps) = DEPENDS_RE.captures(line) {
            return self.add_dependency(line_no, &caps[1]);
        }
        if let Some(caps) = TYPE_RE.captures(line) {
            return self.declare_type(line_no, &caps, description);
        }
        if let Some(caps) = MEMBER_RE.captures(line) {
            return self.declare_member(line_no, &caps, description);
        }
        if let Some(caps) = PARAMETER_RE.captures(line) {
            return self.declare_parameter(line_no, &caps, description);
        }
        if let Some(caps) = SECTION_RE.captures(line) {
            return self.open_section(line_no, Section::from_keyword(&caps[1]));
        }
        if ENUM_RE.is_match(line) {
            return self.open_type_enum(line_no);
        }
        if VERSION_RE.is_match(line) {
            return Ok(());
        }
        if let Some(caps) = MAJOR_RE.captures(line) {
            self.protocol.version.major = Some(caps[1].to_string());
            return Ok(());
        }
        if let Some(caps) = MINOR_RE.captures(line) {
            self.protocol.version.minor = Some(caps[1].to_string());
            return Ok(());
        }
        if let Some(caps) = REDIRECT_RE.captures(line) {
            return self.set_redirect(line_no, &caps[1]);
        }
        if LITERAL_RE.is_match(line) {
            return self.add_enum_literal(line_no, trimmed);
        }

        Err(parse_error(
            self.file_name,
            line_no,
            format!("illegal token: `{}`", line),
        ))
    }

    fn current_domain(&mut self, line_no: usize, what: &str) -> Result<&mut Domain> {
        let file = self.file_name;
        self.protocol
            .domains
            .last_mut()
            .ok_or_else(|| parse_error(file, line_no, format!("{} outside of a domain", what)))
    }

    fn open_domain(&mut self, caps: &Captures<'_>, description: &str) {
        let domain = Domain::new(&caps[3], annotations(caps, description));
        tracing::trace!("domain {}", domain.domain);
        self.protocol.domains.push(domain);
        self.item = None;
        self.section = None;
        self.enum_target = None;
    }

    fn add_dependency(&mut self, line_no: usize, name: &str) -> Result<()> {
        let domain = self.current_domain(line_no, "`depends on`")?;
        domain
            .dependencies
            .get_or_insert_with(Vec::new)
            .push(name.to_string());
        domain.key_order.record("dependencies");
        Ok(())
    }

    fn declare_type(&mut self, line_no: usize, caps: &Captures<'_>, description: &str) -> Result<()> {
        let spec = assign_type(&caps[5], caps.get(4).is_some(), self.map_binary_to_string);
        let type_def = TypeDef {
            id: caps[3].to_string(),
            annotations: annotations(caps, description),
            spec,
            properties: None,
            enum_values: None,
            key_order: KeyOrder::default(),
        };

        let domain = self.current_domain(line_no, "type declared")?;
        domain.types.get_or_insert_with(Vec::new).push(type_def);
        domain.key_order.record("types");
        self.open_item(ItemKind::Type);
        Ok(())
    }

    fn declare_member(
        &mut self,
        line_no: usize,
        caps: &Captures<'_>,
        description: &str,
    ) -> Result<()> {
        let name = caps[4].to_string();
        let annotations = annotations(caps, description);
        let is_command = &caps[3] == "command";

        let domain = self.current_domain(line_no, &format!("{} declared", &caps[3]))?;
        if is_command {
            domain.commands.get_or_insert_with(Vec::new).push(Command {
                name,
                annotations,
                parameters: None,
                returns: None,
                redirect: None,
                key_order: KeyOrder::default(),
            });
            domain.key_order.record("commands");
            self.open_item(ItemKind::Command);
        } else {
            domain.events.get_or_insert_with(Vec::new).push(Event {
                name,
                annotations,
                parameters: None,
                redirect: None,
                key_order: KeyOrder::default(),
            });
            domain.key_order.record("events");
            self.open_item(ItemKind::Event);
        }
        Ok(())
    }

    fn open_item(&mut self, kind: ItemKind) {
        self.item = Some(kind);
        self.section = None;
        self.enum_target = None;
    }

    fn record_item_key(&mut self, item: ItemKind, key: &'static str) {
        if let Some(key_order) = self.item_key_order(item) {
            key_order.record(key);
        }
    }

    /// Key order of the open item.
    fn item_key_order(&mut self, item: ItemKind) -> Option<&mut KeyOrder> {
        let domain = self.protocol.domains.last_mut()?;
        match item {
            ItemKind::Type => domain.types.as_mut()?.last_mut().map(|t| &mut t.key_order),
            ItemKind::Command => domain.commands.as_mut()?.last_mut().map(|c| &mut c.key_order),
            ItemKind::Event => domain.events.as_mut()?.last_mut().map(|e| &mut e.key_order),
        }
    }

    /// The list backing `section` on the open item, if that combination exists.
    fn section_slot(
        &mut self,
        item: ItemKind,
        section: Section,
    ) -> Option<&mut Option<Vec<Parameter>>> {
        let domain = self.protocol.domains.last_mut()?;
        match (item, section) {
            (ItemKind::Type, Section::Properties) => {
                domain.types.as_mut()?.last_mut().map(|t| &mut t.properties)
            }
            (ItemKind::Command, Section::Parameters) => {
                domain.commands.as_mut()?.last_mut().map(|c| &mut c.parameters)
            }
            (ItemKind::Command, Section::Returns) => {
                domain.commands.as_mut()?.last_mut().map(|c| &mut c.returns)
            }
            (ItemKind::Event, Section::Parameters) => {
                domain.events.as_mut()?.last_mut().map(|e| &mut e.parameters)
            }
            _ => None,
        }
    }

    fn open_section(&mut self, line_no: usize, section: Section) -> Result<()> {
        let file = self.file_name;
        let item = self
            .item
            .ok_or_else(|| parse_error(file, line_no, "section outside of a type, command or event"))?;

        let slot = self.section_slot(item, section).ok_or_else(|| {
            parse_error(
                file,
                line_no,
                format!(
                    "`{}` is not allowed on {}",
                    section.keyword(),
                    item.with_article()
                ),
            )
        })?;
        // A repeated section header starts the list over.
        *slot = Some(Vec::new());
        self.record_item_key(item, section.keyword());

        self.section = Some(section);
        self.enum_target = None;
        Ok(())
    }

    fn open_parameters(&mut self, line_no: usize) -> Result<&mut Vec<Parameter>> {
        let file = self.file_name;
        let (item, section) = match (self.item, self.section) {
            (Some(item), Some(section)) => (item, section),
            _ => {
                return Err(parse_error(
                    file,
                    line_no,
                    "entry outside of a parameters, returns or properties section",
                ))
            }
        };

        self.section_slot(item, section)
            .map(|slot| slot.get_or_insert_with(Vec::new))
            .ok_or_else(|| parse_error(file, line_no, "section has no enclosing item"))
    }

    fn declare_parameter(
        &mut self,
        line_no: usize,
        caps: &Captures<'_>,
        description: &str,
    ) -> Result<()> {
        let type_name = &caps[5];
        let is_enum = type_name == "enum";
        let parameter = Parameter {
            name: caps[6].to_string(),
            annotations: annotations(caps, description),
            optional: caps.get(3).is_some(),
            spec: assign_type(type_name, caps.get(4).is_some(), self.map_binary_to_string),
            enum_values: is_enum.then(Vec::new),
        };

        self.open_parameters(line_no)?.push(parameter);
        self.enum_target = is_enum.then_some(EnumTarget::Parameter);
        Ok(())
    }

    fn open_type_enum(&mut self, line_no: usize) -> Result<()> {
        let file = self.file_name;
        if self.item != Some(ItemKind::Type) {
            return Err(parse_error(file, line_no, "`enum` is only allowed on a type"));
        }

        let type_def = self
            .current_domain(line_no, "enum")?
            .types
            .as_mut()
            .and_then(|types| types.last_mut())
            .ok_or_else(|| parse_error(file, line_no, "`enum` has no enclosing type"))?;
        type_def.enum_values = Some(Vec::new());
        type_def.key_order.record("enum");

        self.section = None;
        self.enum_target = Some(EnumTarget::Type);
        Ok(())
    }

    fn set_redirect(&mut self, line_no: usize, target: &str) -> Result<()> {
        let file = self.file_name;
        let item = self.item;
        let domain = self.current_domain(line_no, "`redirect`")?;
        let redirect = match item {
            Some(ItemKind::Command) => domain
                .commands
                .as_mut()
                .and_then(|commands| commands.last_mut())
                .map(|command| &mut command.redirect),
            Some(ItemKind::Event) => domain
                .events
                .as_mut()
                .and_then(|events| events.last_mut())
                .map(|event| &mut event.redirect),
            _ => None,
        };

        let redirect = redirect.ok_or_else(|| {
            parse_error(file, line_no, "`redirect` is only allowed on a command or event")
        })?;
        *redirect = Some(target.to_string());
        if let Some(item) = item {
            self.record_item_key(item, "redirect");
        }
        Ok(())
    }

    fn add_enum_literal(&mut self, line_no: usize, literal: &str) -> Result<()> {
        let file = self.file_name;
        let values = match self.enum_target {
            Some(EnumTarget::Type) => self
                .protocol
                .domains
                .last_mut()
                .and_then(|domain| domain.types.as_mut())
                .and_then(|types| types.last_mut())
                .and_then(|type_def| type_def.enum_values.as_mut()),
            Some(EnumTarget::Parameter) => self
                .open_parameters(line_no)?
                .last_mut()
                .and_then(|parameter| parameter.enum_values.as_mut()),
            None => None,
        };

        values
            .ok_or_else(|| parse_error(file, line_no, format!("enum literal `{}` outside of an enum", literal)))?
            .push(literal.to_string());
        Ok(())
    }
}
