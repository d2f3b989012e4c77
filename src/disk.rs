use crate::brand::Brand;
use crate::field::GuidedProperties;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::str::FromStr;
use tracing::{debug, warn};

/// Official images published on or after this date boot bhyve with uefi.
pub const UEFI_PUBLISHED_CUTOFF: &str = "2023-01-01T00:00:00Z";

/// Source URL of the official image server.
pub const OFFICIAL_IMAGE_SOURCE: &str = "https://images.smartos.org/";

/// The slice of an image manifest the disk deriver needs: where the image
/// came from, when it was published, and an explicit bootrom requirement if
/// the manifest carries one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageInfo {
    pub source: Option<String>,
    pub published_at: Option<String>,
    pub bootrom: Option<String>,
}

impl ImageInfo {
    /// Whether the instance should boot with a uefi bootrom.
    pub fn uses_uefi_bootrom(&self, brand: Brand) -> bool {
        if let Some(bootrom) = &self.bootrom {
            if bootrom == "uefi" {
                return true;
            }
        }

        if brand == Brand::Bhyve {
            if let Some(source) = &self.source {
                if source == OFFICIAL_IMAGE_SOURCE {
                    if let Some(published) = &self.published_at {
                        if published.as_str() >= UEFI_PUBLISHED_CUTOFF {
                            return true;
                        }
                    }
                }
            }
        }

        false
    }
}

/// A boot disk descriptor as vmadm expects it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DiskSpec {
    pub image_uuid: String,
    pub boot: bool,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
}

/// Derive brand-conditional disk and firmware attributes.
///
/// HVM brands turn the guided `image_uuid` (and for bhyve the
/// `primary_disk_size` in GiB) into a boot disk; both source fields are
/// consumed so they never leak into the payload as top-level scalars.
/// Non-HVM brands never carry disks.
pub fn derive_disks(props: &mut GuidedProperties, brand: Option<Brand>, image: Option<&ImageInfo>) {
    let image_uuid = props
        .get("image_uuid")
        .and_then(Value::as_str)
        .map(str::to_string);

    match (brand, image_uuid) {
        (Some(Brand::Bhyve), Some(image_uuid)) => {
            debug!("deriving bhyve boot disk for image {}", image_uuid);
            let size = props
                .get("primary_disk_size")
                .and_then(Value::as_i64)
                .map(|gib| gib * 1024);
            let disk = DiskSpec {
                image_uuid,
                boot: true,
                model: String::from("virtio"),
                size,
            };
            props.insert(String::from("disks"), json!([disk]));
            if let Some(size) = size {
                props.insert(String::from("flexible_disk_size"), json!(size));
            }
            if image.is_some_and(|image| image.uses_uefi_bootrom(Brand::Bhyve)) {
                props.insert(String::from("bootrom"), json!("uefi"));
            }
            props.remove("image_uuid");
            props.remove("primary_disk_size");
        }
        (Some(Brand::Kvm), Some(image_uuid)) => {
            debug!("deriving kvm boot disk for image {}", image_uuid);
            let disk = DiskSpec {
                image_uuid,
                boot: true,
                model: String::from("virtio"),
                size: None,
            };
            props.insert(String::from("disks"), json!([disk]));
            props.remove("image_uuid");
            props.remove("primary_disk_size");
        }
        _ => {
            if props.remove("disks").is_some() {
                warn!("dropping disks from guided properties for non-hvm brand");
            }
        }
    }
}

/// Remove a `disks` key from the merged document when its brand is not
/// hardware-virtualized, regardless of where the key came from. Silent
/// normalization, not an error.
pub fn strip_foreign_disks(doc: &mut Map<String, Value>) {
    let hvm = doc
        .get("brand")
        .and_then(Value::as_str)
        .and_then(|raw| Brand::from_str(raw).ok())
        .is_some_and(|brand| brand.is_hvm());

    if !hvm && doc.remove("disks").is_some() {
        warn!("dropping disks from final payload for non-hvm brand");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props_with(entries: &[(&str, Value)]) -> GuidedProperties {
        let mut props = GuidedProperties::new();
        for (key, value) in entries {
            props.insert(key.to_string(), value.clone());
        }
        props
    }

    #[test]
    fn test_bhyve_disk_and_flexible_size() {
        let mut props = props_with(&[
            ("brand", json!("bhyve")),
            ("image_uuid", json!("49ecbe12-dd45-4e6a-a1c2-8a9d4b91a0d4")),
            ("primary_disk_size", json!(16)),
        ]);
        derive_disks(&mut props, Some(Brand::Bhyve), None);
        assert_eq!(
            props.get("disks"),
            Some(&json!([{
                "image_uuid": "49ecbe12-dd45-4e6a-a1c2-8a9d4b91a0d4",
                "boot": true,
                "model": "virtio",
                "size": 16384,
            }]))
        );
        assert_eq!(props.get("flexible_disk_size"), Some(&json!(16384)));
        assert!(!props.contains_key("image_uuid"));
        assert!(!props.contains_key("primary_disk_size"));
    }

    #[test]
    fn test_bhyve_disk_without_size() {
        let mut props = props_with(&[
            ("brand", json!("bhyve")),
            ("image_uuid", json!("49ecbe12-dd45-4e6a-a1c2-8a9d4b91a0d4")),
        ]);
        derive_disks(&mut props, Some(Brand::Bhyve), None);
        assert_eq!(
            props.get("disks"),
            Some(&json!([{
                "image_uuid": "49ecbe12-dd45-4e6a-a1c2-8a9d4b91a0d4",
                "boot": true,
                "model": "virtio",
            }]))
        );
        assert!(!props.contains_key("flexible_disk_size"));
    }

    #[test]
    fn test_kvm_disk_has_no_size() {
        let mut props = props_with(&[
            ("brand", json!("kvm")),
            ("image_uuid", json!("9188054f-12e9-4760-9bb2-b6b43b5b2c3e")),
            ("primary_disk_size", json!(16)),
        ]);
        derive_disks(&mut props, Some(Brand::Kvm), None);
        assert_eq!(
            props.get("disks"),
            Some(&json!([{
                "image_uuid": "9188054f-12e9-4760-9bb2-b6b43b5b2c3e",
                "boot": true,
                "model": "virtio",
            }]))
        );
        assert!(!props.contains_key("flexible_disk_size"));
        assert!(!props.contains_key("image_uuid"));
    }

    #[test]
    fn test_non_hvm_disks_are_dropped() {
        let mut props = props_with(&[
            ("brand", json!("joyent")),
            ("disks", json!([{"boot": true}])),
        ]);
        derive_disks(&mut props, Some(Brand::Joyent), None);
        assert!(!props.contains_key("disks"));
    }

    #[test]
    fn test_uefi_cutoff() {
        let official = ImageInfo {
            source: Some(OFFICIAL_IMAGE_SOURCE.to_string()),
            published_at: Some("2023-06-01T00:00:00Z".to_string()),
            bootrom: None,
        };
        assert!(official.uses_uefi_bootrom(Brand::Bhyve));
        assert!(!official.uses_uefi_bootrom(Brand::Kvm));

        let old = ImageInfo {
            source: Some(OFFICIAL_IMAGE_SOURCE.to_string()),
            published_at: Some("2022-12-31T23:59:59Z".to_string()),
            bootrom: None,
        };
        assert!(!old.uses_uefi_bootrom(Brand::Bhyve));

        let unofficial = ImageInfo {
            source: Some("https://images.example.com/".to_string()),
            published_at: Some("2024-01-01T00:00:00Z".to_string()),
            bootrom: None,
        };
        assert!(!unofficial.uses_uefi_bootrom(Brand::Bhyve));

        let required = ImageInfo {
            source: None,
            published_at: None,
            bootrom: Some("uefi".to_string()),
        };
        assert!(required.uses_uefi_bootrom(Brand::Kvm));
    }

    #[test]
    fn test_bootrom_set_for_recent_official_image() {
        let image = ImageInfo {
            source: Some(OFFICIAL_IMAGE_SOURCE.to_string()),
            published_at: Some("2023-06-01T00:00:00Z".to_string()),
            bootrom: None,
        };
        let mut props = props_with(&[
            ("brand", json!("bhyve")),
            ("image_uuid", json!("49ecbe12-dd45-4e6a-a1c2-8a9d4b91a0d4")),
            ("primary_disk_size", json!(8)),
        ]);
        derive_disks(&mut props, Some(Brand::Bhyve), Some(&image));
        assert_eq!(props.get("bootrom"), Some(&json!("uefi")));
    }

    #[test]
    fn test_strip_foreign_disks() {
        let mut doc = props_with(&[
            ("brand", json!("lx")),
            ("disks", json!([{"boot": true}])),
        ]);
        strip_foreign_disks(&mut doc);
        assert!(!doc.contains_key("disks"));

        let mut doc = props_with(&[
            ("brand", json!("bhyve")),
            ("disks", json!([{"boot": true}])),
        ]);
        strip_foreign_disks(&mut doc);
        assert!(doc.contains_key("disks"));

        // No brand at all reads as not hardware-virtualized
        let mut doc = props_with(&[("disks", json!([{"boot": true}]))]);
        strip_foreign_disks(&mut doc);
        assert!(!doc.contains_key("disks"));
    }
}
