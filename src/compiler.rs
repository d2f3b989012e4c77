use crate::brand::Brand;
use crate::disk::{self, ImageInfo};
use crate::error::{PayloadError, Result};
use crate::field::{self, FieldDescriptor};
use crate::merge::{self, MergePolicy};
use crate::metadata;
use crate::nic::{self, NicForm};

use serde_json::{json, Map, Value};
use std::str::FromStr;
use tracing::{debug, warn};
use uuid::Uuid;

/// Everything one compile works from. The compiler reads these inputs and
/// nothing else; it owns no state between invocations.
#[derive(Debug, Clone, Default)]
pub struct CompileInput {
    /// Guided form fields, NIC sub-fields excluded.
    pub fields: Vec<FieldDescriptor>,
    pub nic: NicForm,
    /// Manifest details of the selected image, when one is selected.
    pub image: Option<ImageInfo>,
    /// The additional-properties document as the operator last left it.
    pub overlay_text: String,
    pub policy: MergePolicy,
    /// Uuid assigned by a previous compile, re-injected so repeated compiles
    /// track the same instance.
    pub sticky_uuid: Option<Uuid>,
}

/// A default the compiler derived for a form field. Handed back to the
/// caller to apply to the host form; the compiler never writes into the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestedField {
    pub name: String,
    pub value: Value,
}

#[derive(Debug, Clone)]
pub struct CompileOutput {
    /// The merged instance payload.
    pub payload: Map<String, Value>,
    /// Pretty re-serialization of the exact additional-properties object
    /// used in the merge, for display back to the operator.
    pub overlay: String,
    /// The uuid carried by the payload.
    pub uuid: Uuid,
    pub suggested_fields: Vec<SuggestedField>,
}

impl CompileOutput {
    /// The payload as pretty JSON for the read-only final view.
    pub fn payload_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.payload).map_err(PayloadError::Serialize)
    }

    /// The payload as compact JSON for submission.
    pub fn payload_compact(&self) -> Result<String> {
        serde_json::to_string(&self.payload).map_err(PayloadError::Serialize)
    }
}

/// Compile the guided form and the additional-properties document into a
/// single instance payload.
///
/// Synchronous and deterministic: the guided properties are rebuilt from
/// scratch, merged with the freshly parsed overlay, then normalized. The
/// only fatal failure is an unparsable overlay, raised before any output is
/// produced.
pub fn compile(input: &CompileInput) -> Result<CompileOutput> {
    let additional = merge::parse_overlay(&input.overlay_text)?;

    let mut props = field::encode_fields(&input.fields);

    let brand = props
        .get("brand")
        .and_then(Value::as_str)
        .and_then(|raw| match Brand::from_str(raw) {
            Ok(brand) => Some(brand),
            Err(_) => {
                warn!("unknown brand \"{}\", treating as os-virtualized", raw);
                None
            }
        });
    let hvm = brand.is_some_and(|brand| brand.is_hvm());
    debug!("compiling payload, brand {:?}", brand);

    if let Some(nic) = nic::build_nic(&input.nic, hvm) {
        props.insert(String::from("nics"), json!([nic]));
    }

    disk::derive_disks(&mut props, brand, input.image.as_ref());

    if let Some(raw) = props
        .get("resolvers")
        .and_then(Value::as_str)
        .map(str::to_string)
    {
        let resolvers = nic::split_list(&raw);
        if resolvers.is_empty() {
            props.remove("resolvers");
        } else {
            props.insert(String::from("resolvers"), json!(resolvers));
        }
    }

    let mut suggested_fields = Vec::new();
    if hvm && !props.contains_key("cpu_cap") {
        if let Some(vcpus) = props.get("vcpus").and_then(Value::as_i64) {
            if vcpus > 0 {
                let cpu_cap = vcpus * 100;
                props.insert(String::from("cpu_cap"), json!(cpu_cap));
                suggested_fields.push(SuggestedField {
                    name: String::from("cpu_cap"),
                    value: json!(cpu_cap),
                });
            }
        }
    }

    metadata::compose_metadata(&mut props, hvm);

    let mut payload = merge::merge_payloads(&props, &additional, input.policy);
    disk::strip_foreign_disks(&mut payload);
    let uuid = merge::ensure_uuid(&mut payload, input.sticky_uuid);

    let overlay =
        serde_json::to_string_pretty(&additional).map_err(PayloadError::Serialize)?;

    Ok(CompileOutput {
        payload,
        overlay,
        uuid,
        suggested_fields,
    })
}
