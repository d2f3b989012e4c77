use crate::field::GuidedProperties;

use serde_json::{Map, Value};
use tracing::warn;

/// Shell line that pulls the authorized keys out of the metadata agent on
/// OS-virtualized instances.
pub const ADD_AUTHKEYS_CMD: &str =
    "/usr/sbin/mdata-get root_authorized_keys > /root/.ssh/authorized_keys";

/// Marker cloud-init requires at the top of user-data.
pub const CLOUD_CONFIG_MARKER: &str = "#cloud-config";

/// Prefix cloud-init user-data with the `#cloud-config` marker. Idempotent:
/// already-prefixed text comes back unchanged.
pub fn prefix_cloud_config(text: &str) -> String {
    if text == CLOUD_CONFIG_MARKER {
        format!("{}\n", CLOUD_CONFIG_MARKER)
    } else if text.starts_with("#cloud-config\n") {
        text.to_string()
    } else {
        format!("{}\n{}", CLOUD_CONFIG_MARKER, text)
    }
}

/// Append the authorized-keys extraction line to a user script unless it is
/// already there.
fn with_authkeys_line(script: Option<String>) -> String {
    match script {
        Some(script) if script.contains(ADD_AUTHKEYS_CMD) => script,
        Some(script) => format!("{}\n{}", script, ADD_AUTHKEYS_CMD),
        None => ADD_AUTHKEYS_CMD.to_string(),
    }
}

/// Merge a key into a metadata namespace object, creating the namespace if
/// needed. An existing namespace is merged into, never replaced.
fn insert_metadata(props: &mut GuidedProperties, namespace: &str, key: &str, value: Value) {
    let entry = props
        .entry(namespace.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(map) = entry {
        map.insert(key.to_string(), value);
    } else {
        warn!("replacing non-object {} value with a metadata namespace", namespace);
        let mut map = Map::new();
        map.insert(key.to_string(), value);
        *entry = Value::Object(map);
    }
}

fn take_string(props: &mut GuidedProperties, key: &str) -> Option<String> {
    match props.remove(key) {
        Some(Value::String(text)) if !text.is_empty() => Some(text),
        Some(Value::String(_)) | None => None,
        Some(other) => {
            warn!("ignoring non-string {} value: {}", key, other);
            None
        }
    }
}

/// Fold SSH keys, user script, cloud-init data and the root password into the
/// `customer_metadata` and `internal_metadata` namespaces, and rename `alias`
/// to `hostname`. The source keys are consumed from the top level.
pub fn compose_metadata(props: &mut GuidedProperties, hvm: bool) {
    let mut user_script = take_string(props, "user_script");

    if let Some(keys) = take_string(props, "root_authorized_keys") {
        // Zones fetch the keys through the metadata agent at first boot
        if !hvm {
            user_script = Some(with_authkeys_line(user_script));
        }
        insert_metadata(props, "customer_metadata", "root_authorized_keys", keys.into());
    }

    if let Some(script) = user_script {
        insert_metadata(props, "customer_metadata", "user-script", script.into());
    }

    if let Some(data) = take_string(props, "cloudinit_data") {
        insert_metadata(
            props,
            "customer_metadata",
            "cloud-init:user-data",
            prefix_cloud_config(&data).into(),
        );
    }

    if let Some(root_pw) = take_string(props, "root_pw") {
        insert_metadata(props, "internal_metadata", "root_pw", root_pw.into());
    }

    if let Some(alias) = props.remove("alias") {
        props.insert(String::from("hostname"), alias);
    }
}
