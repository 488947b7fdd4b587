// ── LDAP certificate references ──
//
// The device never reports certificate contents back, only the file object
// it stored them in. Declared PEM material (plain or base64) is replaced
// by that file reference with a content checksum, so a re-declared
// certificate diffs equal and a changed one does not.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use super::FixupContext;
use crate::error::CoreError;

/// `(ldap property, device file name)`.
const CERT_FILES: &[(&str, &str)] = &[
    ("sslCaCert", "do_ldapCaCert.crt"),
    ("sslClientCert", "do_ldapClientCert.crt"),
    ("sslClientKey", "do_ldapClientCert.key"),
];

/// Extract the PEM text from a declared value.
///
/// Accepts a bare string or `{ certificate }` / `{ privateKey }` /
/// `{ base64 }` objects. Values that already are file references yield
/// `None`.
fn pem_text(value: &Value) -> Option<String> {
    let raw = match value {
        Value::String(s) => s.as_str(),
        Value::Object(obj) if obj.contains_key("checksum") => return None,
        Value::Object(obj) => ["certificate", "privateKey", "base64"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_str))?,
        _ => return None,
    };
    if raw.contains("-----BEGIN") {
        return Some(raw.to_owned());
    }
    let decoded = STANDARD
        .decode(raw.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok());
    Some(decoded.unwrap_or_else(|| raw.to_owned()))
}

/// `SHA256:<byte length>:<hex digest>`.
pub(crate) fn checksum(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    format!("SHA256:{}:{digest:x}", content.len())
}

pub(crate) fn cert_references(ctx: &mut FixupContext<'_>) -> Result<(), CoreError> {
    let Some(ldap) = ctx
        .classes
        .get_mut("Authentication")
        .and_then(|auth| auth.get_mut("ldap"))
        .and_then(Value::as_object_mut)
    else {
        return Ok(());
    };

    for (property, file) in CERT_FILES {
        let Some(pem) = ldap.get(*property).and_then(pem_text) else {
            continue;
        };
        ldap.insert(
            (*property).to_owned(),
            json!({
                "name": file,
                "partition": ctx.tenant,
                "checksum": checksum(&pem),
            }),
        );
    }
    Ok(())
}
