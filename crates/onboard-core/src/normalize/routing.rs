// ── Routing access and prefix lists ──
//
// The device stores every address in these lists with an explicit mask,
// and stores any-address matches as a zero-length network of the entry's
// family. Declarations are rewritten to that form before diffing.

use std::str::FromStr;

use ipnetwork::IpNetwork;
use serde_json::Value;

use super::FixupContext;
use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Parsed {
    v4: bool,
    wildcard: bool,
    masked: bool,
}

fn parse(raw: &str) -> Option<Parsed> {
    let net = IpNetwork::from_str(raw).ok()?;
    Some(Parsed {
        v4: net.is_ipv4(),
        wildcard: net.ip().is_unspecified(),
        masked: raw.contains('/'),
    })
}

fn host_mask(raw: &str, v4: bool) -> String {
    if v4 {
        format!("{raw}/32")
    } else {
        format!("{raw}/128")
    }
}

fn any_network(v4: bool) -> &'static str {
    if v4 { "0.0.0.0/0" } else { "::/0" }
}

/// Canonical form of an access-list address.
///
/// A wildcard takes the family of its non-wildcard partner, or its own
/// family when there is no such partner.
fn access_address(raw: &str, own: Option<Parsed>, partner: Option<Parsed>) -> Option<String> {
    let own = own?;
    if own.wildcard {
        let v4 = partner.filter(|p| !p.wildcard).map_or(own.v4, |p| p.v4);
        return Some(any_network(v4).to_owned());
    }
    (!own.masked).then(|| host_mask(raw, own.v4))
}

fn access_entry(entry: &mut serde_json::Map<String, Value>) {
    let source = entry.get("source").and_then(Value::as_str).map(str::to_owned);
    let destination = entry
        .get("destination")
        .and_then(Value::as_str)
        .map(str::to_owned);
    let source_parsed = source.as_deref().and_then(parse);
    let destination_parsed = destination.as_deref().and_then(parse);

    if let Some(raw) = &source {
        if let Some(canonical) = access_address(raw, source_parsed, destination_parsed) {
            entry.insert("source".into(), Value::String(canonical));
        }
    }
    if let Some(raw) = &destination {
        if let Some(canonical) = access_address(raw, destination_parsed, source_parsed) {
            entry.insert("destination".into(), Value::String(canonical));
        }
    }
}

/// `":N"` means `"0:N"` and `"N:"` means `"N:0"`.
fn prefix_len_range(raw: &str) -> Option<String> {
    let (low, high) = raw.split_once(':')?;
    if !low.is_empty() && !high.is_empty() {
        return None;
    }
    let low = if low.is_empty() { "0" } else { low };
    let high = if high.is_empty() { "0" } else { high };
    Some(format!("{low}:{high}"))
}

fn prefix_entry(entry: &mut serde_json::Map<String, Value>) {
    if let Some(raw) = entry.get("prefix").and_then(Value::as_str) {
        if let Some(parsed) = parse(raw).filter(|p| !p.masked) {
            let masked = host_mask(raw, parsed.v4);
            entry.insert("prefix".into(), Value::String(masked));
        }
    }
    if let Some(range) = entry
        .get("prefixLenRange")
        .and_then(Value::as_str)
        .and_then(prefix_len_range)
    {
        entry.insert("prefixLenRange".into(), Value::String(range));
    }
}

fn for_each_entry(
    ctx: &mut FixupContext<'_>,
    class: &str,
    mut f: impl FnMut(&mut serde_json::Map<String, Value>),
) {
    let Some(Value::Object(lists)) = ctx.classes.get_mut(class) else {
        return;
    };
    for list in lists.values_mut() {
        if let Some(Value::Array(entries)) = list.get_mut("entries") {
            entries
                .iter_mut()
                .filter_map(Value::as_object_mut)
                .for_each(&mut f);
        }
    }
}

pub(crate) fn access_lists(ctx: &mut FixupContext<'_>) -> Result<(), CoreError> {
    for_each_entry(ctx, "RoutingAccessList", access_entry);
    Ok(())
}

pub(crate) fn prefix_lists(ctx: &mut FixupContext<'_>) -> Result<(), CoreError> {
    for_each_entry(ctx, "RoutingPrefixList", prefix_entry);
    Ok(())
}
