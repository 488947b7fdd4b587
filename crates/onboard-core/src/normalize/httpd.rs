// ── HTTPD ──

use serde_json::Value;

use super::FixupContext;
use crate::error::CoreError;

/// `allow` is a list on the device; a bare string other than `"none"`
/// means a one-element list.
pub(crate) fn allow_list(ctx: &mut FixupContext<'_>) -> Result<(), CoreError> {
    let Some(Value::Object(httpd)) = ctx.classes.get_mut("HTTPD") else {
        return Ok(());
    };
    let allow = match httpd.get("allow") {
        Some(Value::String(s)) if s != "none" => Value::Array(vec![Value::String(s.clone())]),
        _ => return Ok(()),
    };
    httpd.insert("allow".into(), allow);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::ClassMap;

    fn run(allow: Value) -> Value {
        let mut classes = json!({ "HTTPD": { "allow": allow } })
            .as_object()
            .unwrap()
            .clone();
        let current = ClassMap::new();
        allow_list(&mut FixupContext {
            tenant: "Common",
            classes: &mut classes,
            current: &current,
        })
        .unwrap();
        classes["HTTPD"]["allow"].clone()
    }

    #[test]
    fn all_becomes_list() {
        assert_eq!(run(json!("all")), json!(["all"]));
    }

    #[test]
    fn none_is_kept() {
        assert_eq!(run(json!("none")), json!("none"));
    }

    #[test]
    fn single_address_becomes_list() {
        assert_eq!(run(json!("10.0.0.0/8")), json!(["10.0.0.0/8"]));
    }

    #[test]
    fn list_is_untouched() {
        assert_eq!(run(json!(["10.0.0.0/8", "all"])), json!(["10.0.0.0/8", "all"]));
    }
}
