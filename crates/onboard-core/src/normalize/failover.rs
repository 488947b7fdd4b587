// ── FailoverUnicast ──
//
// Unicast failover addresses can be declared as a single `address`/`port`
// pair or as an array under `addressPorts` (older declarations spell it
// `unicastAddress`). The effective form is always `addressPorts`.

use serde_json::{Value, json};

use super::FixupContext;
use crate::error::CoreError;

pub(crate) const DEFAULT_UNICAST_PORT: u16 = 1026;

pub(crate) const BOTH_FORMS_MESSAGE: &str = "Cannot have Failover Unicasts with both address and addressPort properties provided. \
This can happen when multiple Failover Unicast objects are provided in the declaration. \
To configure multiple Failover Unicasts, use only addressPorts.";

pub(crate) const BOTH_ARRAYS_MESSAGE: &str =
    "Cannot have Failover Unicasts with both addressPorts and unicastAddress properties provided.";

pub(crate) fn canonicalize(ctx: &mut FixupContext<'_>) -> Result<(), CoreError> {
    let Some(Value::Object(unicast)) = ctx.classes.get_mut("FailoverUnicast") else {
        return Ok(());
    };

    let has_single = unicast.contains_key("address");
    let has_ports = unicast.contains_key("addressPorts");
    let has_legacy = unicast.contains_key("unicastAddress");

    if has_ports && has_legacy {
        return Err(CoreError::validation(BOTH_ARRAYS_MESSAGE));
    }
    if has_single && (has_ports || has_legacy) {
        return Err(CoreError::validation(BOTH_FORMS_MESSAGE));
    }

    if has_single {
        let address = unicast.remove("address").unwrap_or(Value::Null);
        let port = unicast
            .remove("port")
            .unwrap_or_else(|| json!(DEFAULT_UNICAST_PORT));
        unicast.insert(
            "addressPorts".into(),
            json!([{ "address": address, "port": port }]),
        );
    } else if let Some(legacy) = unicast.remove("unicastAddress") {
        unicast.insert("addressPorts".into(), legacy);
    }

    if let Some(Value::Array(entries)) = unicast.get_mut("addressPorts") {
        for entry in entries.iter_mut().filter_map(Value::as_object_mut) {
            entry
                .entry("port")
                .or_insert_with(|| json!(DEFAULT_UNICAST_PORT));
        }
    }
    Ok(())
}
