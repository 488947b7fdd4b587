// ── Declaration parsing ──
//
// A `DeclarationParser` turns the raw submitted document into tenant →
// class → body form. Schema validation is the parser's business; the
// default parser only enforces the structure the normalizer relies on.

use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::model::declaration::unwrap_envelope;
use crate::model::{ClassMap, ConfigTree, Controls, ParsedDeclaration};
use crate::normalize::classes::is_singleton;

/// Pluggable declaration parser.
pub trait DeclarationParser: Send + Sync {
    fn parse(&self, raw: &Value) -> Result<ParsedDeclaration, CoreError>;
}

/// Parser for `{ "class": "Device", <tenant>: { "class": "Tenant", ... } }`
/// documents, optionally wrapped in a `{ "class": "DO", "declaration" }`
/// envelope.
///
/// Several objects of the same singleton class are merged property by
/// property, later objects winning.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultParser;

/// Tenant members that are plain properties rather than class objects.
const TENANT_PROPERTIES: &[&str] = &["class", "label", "remark"];

fn parse_error(message: impl Into<String>) -> CoreError {
    CoreError::Parse {
        message: message.into(),
    }
}

impl DefaultParser {
    fn parse_tenant(tenant: &str, body: &Map<String, Value>) -> Result<ClassMap, CoreError> {
        let mut classes = ClassMap::new();

        for (name, member) in body {
            if TENANT_PROPERTIES.contains(&name.as_str()) {
                continue;
            }
            if name == "hostname" {
                if let Value::String(_) = member {
                    classes.insert(name.clone(), member.clone());
                }
                continue;
            }
            let Value::Object(object) = member else {
                continue;
            };
            let Some(class) = object.get("class").and_then(Value::as_str) else {
                return Err(parse_error(format!(
                    "object {tenant}/{name} is missing a class"
                )));
            };

            let mut properties = object.clone();
            properties.remove("class");

            let slot = classes
                .entry(class.to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            let Value::Object(slot) = slot else {
                continue;
            };
            if is_singleton(class) {
                slot.extend(properties);
            } else {
                slot.insert(name.clone(), Value::Object(properties));
            }
        }

        Ok(classes)
    }
}

impl DeclarationParser for DefaultParser {
    fn parse(&self, raw: &Value) -> Result<ParsedDeclaration, CoreError> {
        let device = unwrap_envelope(raw);
        let Value::Object(root) = device else {
            return Err(parse_error("declaration must be a JSON object"));
        };
        match root.get("class").and_then(Value::as_str) {
            Some("Device") => {}
            Some(other) => {
                return Err(parse_error(format!(
                    "expected class Device, found {other}"
                )));
            }
            None => return Err(parse_error("declaration has no class")),
        }

        let mut tenants = ConfigTree::new();
        for (name, member) in root {
            let Value::Object(body) = member else {
                continue;
            };
            if body.get("class").and_then(Value::as_str) != Some("Tenant") {
                continue;
            }
            tenants.insert(name.clone(), Self::parse_tenant(name, body)?);
        }

        Ok(ParsedDeclaration {
            controls: Controls::from_raw(raw),
            tenants,
            parsed: true,
        })
    }
}
