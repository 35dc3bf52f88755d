//! Network interfaces of a host

use crate::domain::inventory::HostVirtualNic;
use serde::{Deserialize, Serialize};

/// One network interface with its hardware and IP addresses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub name: String,
    pub macs: Vec<String>,
    pub ipv4s: Vec<String>,
    pub ipv6s: Vec<String>,
}

impl NetworkInterface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl From<&HostVirtualNic> for NetworkInterface {
    fn from(vnic: &HostVirtualNic) -> Self {
        let mut nic = NetworkInterface::new(vnic.device.clone());
        if !vnic.mac.is_empty() {
            nic.macs.push(vnic.mac.clone());
        }
        if !vnic.ip_address.is_empty() {
            nic.ipv4s.push(vnic.ip_address.clone());
        }
        if let Some(ipv6s) = &vnic.ipv6_addresses {
            nic.ipv6s.extend(ipv6s.iter().cloned());
        }
        nic
    }
}

/// Comma-joined IPv4 addresses across interfaces
pub fn joined_ipv4s(nics: &[NetworkInterface]) -> String {
    nics.iter()
        .flat_map(|n| n.ipv4s.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(",")
}

/// Comma-joined IPv6 addresses across interfaces
pub fn joined_ipv6s(nics: &[NetworkInterface]) -> String {
    nics.iter()
        .flat_map(|n| n.ipv6s.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vnic() {
        let vnic = HostVirtualNic {
            device: "vmk0".into(),
            mac: "00:50:56:6a:11:02".into(),
            ip_address: "10.0.0.21".into(),
            ipv6_addresses: Some(vec!["fe80::250:56ff:fe6a:1102".into(), "2001:db8::21".into()]),
        };
        let nic = NetworkInterface::from(&vnic);

        assert_eq!(nic.name, "vmk0");
        assert_eq!(nic.macs, vec!["00:50:56:6a:11:02"]);
        assert_eq!(nic.ipv6s.len(), 2);
    }

    #[test]
    fn test_joined_addresses() {
        let mut a = NetworkInterface::new("eth0");
        a.ipv4s.push("10.0.0.1".into());
        let mut b = NetworkInterface::new("eth1");
        b.ipv4s.push("10.0.1.1".into());
        b.ipv6s.push("fe80::1".into());

        let nics = vec![a, b];
        assert_eq!(joined_ipv4s(&nics), "10.0.0.1,10.0.1.1");
        assert_eq!(joined_ipv6s(&nics), "fe80::1");
        assert_eq!(joined_ipv4s(&[]), "");
    }
}
