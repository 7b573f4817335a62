use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

fn is_false(value: &bool) -> bool {
    !*value
}

/// A parsed protocol definition: version plus the list of domains.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Protocol {
    #[serde(default)]
    pub version: Version,
    #[serde(default)]
    pub domains: Vec<Domain>,
}

/// Version components are kept as the digit strings found in the source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Version {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minor: Option<String>,
}

/// Order in which optional sections first appeared in the source.
///
/// Only affects serialization; two declarations that differ in key order
/// alone compare equal.
#[derive(Debug, Clone, Default)]
pub struct KeyOrder(Vec<&'static str>);

impl KeyOrder {
    pub fn record(&mut self, key: &'static str) {
        if !self.0.contains(&key) {
            self.0.push(key);
        }
    }

    /// `keys` sorted by first appearance; unseen keys keep their given order
    /// after the seen ones.
    pub fn arrange(&self, keys: &[&'static str]) -> Vec<&'static str> {
        let mut arranged = keys.to_vec();
        arranged.sort_by_key(|key| {
            self.0
                .iter()
                .position(|seen| seen == key)
                .unwrap_or(usize::MAX)
        });
        arranged
    }
}

impl PartialEq for KeyOrder {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

fn serialize_present<M, T>(map: &mut M, key: &'static str, value: &Option<T>) -> Result<(), M::Error>
where
    M: SerializeMap,
    T: Serialize,
{
    match value {
        Some(value) => map.serialize_entry(key, value),
        None => Ok(()),
    }
}

/// Description and status flags shared by every declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub experimental: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub deprecated: bool,
}

impl Annotations {
    pub fn new(description: &str, experimental: bool, deprecated: bool) -> Self {
        Self {
            description: (!description.is_empty()).then(|| description.trim().to_string()),
            experimental,
            deprecated,
        }
    }

    fn serialize_entries<M: SerializeMap>(&self, map: &mut M) -> Result<(), M::Error> {
        serialize_present(map, "description", &self.description)?;
        if self.experimental {
            map.serialize_entry("experimental", &true)?;
        }
        if self.deprecated {
            map.serialize_entry("deprecated", &true)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Domain {
    pub domain: String,
    #[serde(flatten)]
    pub annotations: Annotations,
    #[serde(default)]
    pub dependencies: Option<Vec<String>>,
    #[serde(default)]
    pub types: Option<Vec<TypeDef>>,
    #[serde(default)]
    pub commands: Option<Vec<Command>>,
    #[serde(default)]
    pub events: Option<Vec<Event>>,
    #[serde(skip)]
    pub key_order: KeyOrder,
}

impl Domain {
    pub fn new(name: impl Into<String>, annotations: Annotations) -> Self {
        Self {
            domain: name.into(),
            annotations,
            dependencies: None,
            types: None,
            commands: None,
            events: None,
            key_order: KeyOrder::default(),
        }
    }
}

impl Serialize for Domain {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("domain", &self.domain)?;
        self.annotations.serialize_entries(&mut map)?;
        for key in self
            .key_order
            .arrange(&["dependencies", "types", "commands", "events"])
        {
            match key {
                "dependencies" => serialize_present(&mut map, key, &self.dependencies)?,
                "types" => serialize_present(&mut map, key, &self.types)?,
                "commands" => serialize_present(&mut map, key, &self.commands)?,
                _ => serialize_present(&mut map, key, &self.events)?,
            }
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    Integer,
    Number,
    Boolean,
    String,
    Object,
    Any,
    Array,
    Binary,
}

impl PrimitiveType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "string" => Some(Self::String),
            "object" => Some(Self::Object),
            "any" => Some(Self::Any),
            "array" => Some(Self::Array),
            "binary" => Some(Self::Binary),
            _ => None,
        }
    }
}

/// Either a primitive `type` (with `items` for arrays) or a `$ref` to a
/// declared type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeSpec {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub primitive: Option<PrimitiveType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<TypeSpec>>,
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl TypeSpec {
    pub fn primitive(primitive: PrimitiveType) -> Self {
        Self {
            primitive: Some(primitive),
            ..Self::default()
        }
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self {
            reference: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn array_of(items: TypeSpec) -> Self {
        Self {
            primitive: Some(PrimitiveType::Array),
            items: Some(Box::new(items)),
            reference: None,
        }
    }

    fn serialize_entries<M: SerializeMap>(&self, map: &mut M) -> Result<(), M::Error> {
        serialize_present(map, "type", &self.primitive)?;
        serialize_present(map, "items", &self.items)?;
        serialize_present(map, "$ref", &self.reference)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TypeDef {
    pub id: String,
    #[serde(flatten)]
    pub annotations: Annotations,
    #[serde(flatten)]
    pub spec: TypeSpec,
    #[serde(default)]
    pub properties: Option<Vec<Parameter>>,
    #[serde(rename = "enum", default)]
    pub enum_values: Option<Vec<String>>,
    #[serde(skip)]
    pub key_order: KeyOrder,
}

impl Serialize for TypeDef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", &self.id)?;
        self.annotations.serialize_entries(&mut map)?;
        self.spec.serialize_entries(&mut map)?;
        for key in self.key_order.arrange(&["properties", "enum"]) {
            match key {
                "properties" => serialize_present(&mut map, key, &self.properties)?,
                _ => serialize_present(&mut map, key, &self.enum_values)?,
            }
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Command {
    pub name: String,
    #[serde(flatten)]
    pub annotations: Annotations,
    #[serde(default)]
    pub parameters: Option<Vec<Parameter>>,
    #[serde(default)]
    pub returns: Option<Vec<Parameter>>,
    #[serde(default)]
    pub redirect: Option<String>,
    #[serde(skip)]
    pub key_order: KeyOrder,
}

impl Serialize for Command {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &self.name)?;
        self.annotations.serialize_entries(&mut map)?;
        for key in self
            .key_order
            .arrange(&["parameters", "returns", "redirect"])
        {
            match key {
                "parameters" => serialize_present(&mut map, key, &self.parameters)?,
                "returns" => serialize_present(&mut map, key, &self.returns)?,
                _ => serialize_present(&mut map, key, &self.redirect)?,
            }
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Event {
    pub name: String,
    #[serde(flatten)]
    pub annotations: Annotations,
    #[serde(default)]
    pub parameters: Option<Vec<Parameter>>,
    #[serde(default)]
    pub redirect: Option<String>,
    #[serde(skip)]
    pub key_order: KeyOrder,
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &self.name)?;
        self.annotations.serialize_entries(&mut map)?;
        for key in self.key_order.arrange(&["parameters", "redirect"]) {
            match key {
                "parameters" => serialize_present(&mut map, key, &self.parameters)?,
                _ => serialize_present(&mut map, key, &self.redirect)?,
            }
        }
        map.end()
    }
}

/// A command parameter, command return value, event parameter or type property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(flatten)]
    pub annotations: Annotations,
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,
    #[serde(flatten)]
    pub spec: TypeSpec,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProtocolSummary {
    pub domains: usize,
    pub types: usize,
    pub commands: usize,
    pub events: usize,
}

impl fmt::Display for ProtocolSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} domains, {} types, {} commands, {} events",
            self.domains, self.types, self.commands, self.events
        )
    }
}

impl Protocol {
    pub fn summary(&self) -> ProtocolSummary {
        let count = |len: Option<usize>| len.unwrap_or(0);
        self.domains.iter().fold(
            ProtocolSummary {
                domains: self.domains.len(),
                ..ProtocolSummary::default()
            },
            |mut summary, domain| {
                summary.types += count(domain.types.as_ref().map(Vec::len));
                summary.commands += count(domain.commands.as_ref().map(Vec::len));
                summary.events += count(domain.events.as_ref().map(Vec::len));
                summary
            },
        )
    }
}

/// What the transform step hands to the writer.
///
/// JSON sources are passed through as-is, with their key order, unknown keys
/// and `false` flags intact.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProtocolDocument {
    Pdl(Protocol),
    Json(serde_json::Value),
}

impl ProtocolDocument {
    pub fn summary(&self) -> ProtocolSummary {
        match self {
            ProtocolDocument::Pdl(protocol) => protocol.summary(),
            ProtocolDocument::Json(value) => {
                let len = |value: &serde_json::Value, key: &str| {
                    value.get(key).and_then(|v| v.as_array()).map_or(0, Vec::len)
                };
                let domains = value
                    .get("domains")
                    .and_then(|v| v.as_array())
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                domains.iter().fold(
                    ProtocolSummary {
                        domains: domains.len(),
                        ..ProtocolSummary::default()
                    },
                    |mut summary, domain| {
                        summary.types += len(domain, "types");
                        summary.commands += len(domain, "commands");
                        summary.events += len(domain, "events");
                        summary
                    },
                )
            }
        }
    }
}

/// Where the PDL text comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PdlSource {
    File(String),
    Url(String),
}

impl fmt::Display for PdlSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdlSource::File(path) => write!(f, "file {}", path),
            PdlSource::Url(url) => write!(f, "url {}", url),
        }
    }
}

/// Raw source text plus the file name used to pick the parser.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub name: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_order_arrange() {
        let mut order = KeyOrder::default();
        order.record("redirect");
        order.record("parameters");
        order.record("redirect");
        assert_eq!(
            order.arrange(&["parameters", "returns", "redirect"]),
            vec!["redirect", "parameters", "returns"]
        );
        assert_eq!(KeyOrder::default(), order);
    }

    #[test]
    fn test_command_keys_follow_source_order() {
        let mut command = Command {
            name: "detach".to_string(),
            annotations: Annotations::new("", false, true),
            parameters: Some(Vec::new()),
            returns: None,
            redirect: Some("Target".to_string()),
            key_order: KeyOrder::default(),
        };
        command.key_order.record("redirect");
        command.key_order.record("parameters");

        assert_eq!(
            serde_json::to_string(&command).unwrap(),
            r#"{"name":"detach","deprecated":true,"redirect":"Target","parameters":[]}"#
        );
    }

    #[test]
    fn test_json_document_summary() {
        let document = ProtocolDocument::Json(json!({
            "domains": [
                {"domain": "A", "types": [{"id": "T"}], "commands": [{"name": "c"}, {"name": "d"}]},
                {"domain": "B", "events": [{"name": "e"}]}
            ]
        }));
        assert_eq!(
            document.summary(),
            ProtocolSummary {
                domains: 2,
                types: 1,
                commands: 2,
                events: 1
            }
        );
        assert_eq!(
            ProtocolDocument::Json(json!({})).summary(),
            ProtocolSummary::default()
        );
    }
}
