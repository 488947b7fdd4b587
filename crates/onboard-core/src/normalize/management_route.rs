// ── ManagementRoute ──
//
// When `System.preserveOrigDhcpRoutes` is set, routes the DHCP client
// installed on the management interface are carried into the effective
// config so the diff does not delete them.

use serde_json::{Map, Value};

use super::FixupContext;
use crate::error::CoreError;

/// Description the device puts on DHCP-installed management routes.
pub(crate) const DHCP_ROUTE_DESCRIPTION: &str = "configured-by-dhcp";

pub(crate) fn preserve_dhcp_routes(ctx: &mut FixupContext<'_>) -> Result<(), CoreError> {
    let preserve = ctx
        .classes
        .get("System")
        .and_then(|s| s.get("preserveOrigDhcpRoutes"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !preserve {
        return Ok(());
    }

    let Some(current_routes) = ctx.current.get("ManagementRoute").and_then(Value::as_object) else {
        return Ok(());
    };
    let dhcp: Vec<(&String, &Value)> = current_routes
        .iter()
        .filter(|(_, route)| {
            route.get("description").and_then(Value::as_str) == Some(DHCP_ROUTE_DESCRIPTION)
        })
        .collect();
    if dhcp.is_empty() {
        return Ok(());
    }

    let routes = ctx
        .classes
        .entry("ManagementRoute")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(routes) = routes {
        for (name, route) in dhcp {
            routes.entry(name.clone()).or_insert_with(|| route.clone());
        }
    }
    Ok(())
}
