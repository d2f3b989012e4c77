use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Addressing mode selected for one IP family.
#[derive(
    Serialize, Deserialize, Display, EnumString, Debug, Clone, Copy, Eq, PartialEq, Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AddressSetup {
    #[default]
    None,
    Auto,
    Static,
    Manual,
}

/// NIC sub-fields captured from the guided form. Address and gateway fields
/// hold a single value in static mode and a comma-separated list in manual
/// mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NicForm {
    pub nic_tag: String,
    pub ipv4: AddressSetup,
    pub ipv4_address: String,
    pub ipv4_prefix: String,
    pub ipv4_gateway: String,
    pub ipv6: AddressSetup,
    pub ipv6_address: String,
    pub ipv6_prefix: String,
    pub ipv6_gateway: String,
}

/// A single NIC descriptor as vmadm expects it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NicSpec {
    pub nic_tag: String,
    pub ips: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateways: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Split a comma-separated value into trimmed, non-empty entries.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn push_unique(ips: &mut Vec<String>, ip: String) {
    if !ips.contains(&ip) {
        ips.push(ip);
    }
}

/// Derive zero or one NIC from the guided sub-fields. No tag selected means
/// no NIC in the payload. The two IP families resolve independently; the
/// "dhcp" and "addrconf" sentinels are never duplicated.
pub fn build_nic(form: &NicForm, hvm: bool) -> Option<NicSpec> {
    let nic_tag = form.nic_tag.trim();
    if nic_tag.is_empty() {
        return None;
    }

    let mut ips: Vec<String> = Vec::new();
    let mut gateways: Vec<String> = Vec::new();

    match form.ipv4 {
        AddressSetup::Static => {
            let address = form.ipv4_address.trim();
            if !address.is_empty() {
                push_unique(&mut ips, with_prefix(address, &form.ipv4_prefix));
            }
            let gateway = form.ipv4_gateway.trim();
            if !gateway.is_empty() {
                gateways.push(gateway.to_string());
            }
        }
        AddressSetup::Auto => push_unique(&mut ips, String::from("dhcp")),
        AddressSetup::Manual => {
            for address in split_list(&form.ipv4_address) {
                push_unique(&mut ips, address);
            }
            gateways.extend(split_list(&form.ipv4_gateway));
        }
        AddressSetup::None => {}
    }

    match form.ipv6 {
        AddressSetup::Static => {
            let address = form.ipv6_address.trim();
            if !address.is_empty() {
                push_unique(&mut ips, with_prefix(address, &form.ipv6_prefix));
            }
            let gateway = form.ipv6_gateway.trim();
            if !gateway.is_empty() {
                gateways.push(gateway.to_string());
            }
        }
        AddressSetup::Auto => push_unique(&mut ips, String::from("addrconf")),
        AddressSetup::Manual => {
            for address in split_list(&form.ipv6_address) {
                push_unique(&mut ips, address);
            }
            gateways.extend(split_list(&form.ipv6_gateway));
        }
        AddressSetup::None => {}
    }

    Some(NicSpec {
        nic_tag: nic_tag.to_string(),
        ips,
        gateways: if gateways.is_empty() {
            None
        } else {
            Some(gateways)
        },
        model: hvm.then(|| String::from("virtio")),
    })
}

fn with_prefix(address: &str, prefix: &str) -> String {
    let prefix = prefix.trim();
    if prefix.is_empty() {
        address.to_string()
    } else {
        format!("{}/{}", address, prefix)
    }
}
