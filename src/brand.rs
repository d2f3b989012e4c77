use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The virtualization technology backing an instance. `joyent`,
/// `joyent-minimal` and `lx` are OS-level zones; `bhyve` and `kvm` are
/// hardware-virtualized.
#[derive(
    Serialize, Deserialize, Display, EnumString, Debug, Clone, Copy, Eq, PartialEq,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Brand {
    Joyent,
    JoyentMinimal,
    Bhyve,
    Kvm,
    Lx,
}

impl Brand {
    pub fn is_hvm(&self) -> bool {
        matches!(self, Brand::Bhyve | Brand::Kvm)
    }
}
