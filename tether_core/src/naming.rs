// tether_core/src/naming.rs

//! Topic naming for a bridged entity.
//!
//! Legal identifier characters are ASCII letters, digits, `_` and `/`.
//! Leading and trailing slashes are ignored, empty segments (`//`) are
//! rejected. The namespace may be empty, the name may not.

use crate::error::{BridgeError, BridgeResult};

/// The pair of topics one entity uses on the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicNames {
    /// Outbound state, `/<namespace>/<name>/State`.
    pub state: String,
    /// Inbound commands, `/<namespace>/<name>/Command`.
    pub command: String,
}

pub const STATE_SUFFIX: &str = "State";
pub const COMMAND_SUFFIX: &str = "Command";

/// Derives the state and command topics for an entity.
pub fn resolve(name: &str, namespace: &str) -> BridgeResult<TopicNames> {
    let name = normalize("name", name)?;
    if name.is_empty() {
        return Err(BridgeError::InvalidIdentifier {
            field: "name",
            value: name,
            reason: "must not be empty".to_string(),
        });
    }
    let namespace = normalize("namespace", namespace)?;

    let base = if namespace.is_empty() {
        format!("/{}", name)
    } else {
        format!("/{}/{}", namespace, name)
    };

    Ok(TopicNames {
        state: format!("{}/{}", base, STATE_SUFFIX),
        command: format!("{}/{}", base, COMMAND_SUFFIX),
    })
}

pub fn is_legal_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '/'
}

/// Validates one identifier and strips its outer slashes.
fn normalize(field: &'static str, raw: &str) -> BridgeResult<String> {
    if let Some(bad) = raw.chars().find(|c| !is_legal_char(*c)) {
        return Err(BridgeError::InvalidIdentifier {
            field,
            value: raw.to_string(),
            reason: format!("illegal character {:?}", bad),
        });
    }

    let trimmed = raw.trim_matches('/');
    if trimmed.contains("//") {
        return Err(BridgeError::InvalidIdentifier {
            field,
            value: raw.to_string(),
            reason: "empty path segment".to_string(),
        });
    }
    Ok(trimmed.to_string())
}
