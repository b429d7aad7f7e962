//! Network topology: nodes, links, and sites, plus the requests that edit them.

use meshpack::wire_enum;
use meshpack::wire_struct;

wire_enum! {
    pub enum NodeType {
        Cn = 1,
        Dn = 2,
    }
}

wire_enum! {
    pub enum LinkType {
        Wireless = 1,
        Ethernet = 2,
    }
}

wire_enum! {
    pub enum NodeStatusType {
        Offline = 1,
        Online = 2,
        OnlineInitiator = 3,
    }
}

wire_enum! {
    pub enum PolarityType {
        Odd = 1,
        Even = 2,
        HybridOdd = 3,
        HybridEven = 4,
    }
}

wire_struct! {
    pub struct Location {
        1 => latitude: f64,
        2 => longitude: f64,
        3 => altitude: f64,
        4 => accuracy: f64,
    }
}

wire_struct! {
    pub struct Site {
        1 => name: String,
        2 => location: Location,
    }
}

wire_struct! {
    pub struct GolayIdx {
        1 => tx_golay_idx: i64,
        2 => rx_golay_idx: i64,
    }
}

wire_struct! {
    pub struct Node {
        1 => name: String,
        2 => node_type: NodeType,
        3 => mac_addr: String,
        4 => pop_node: bool,
        5 => status: NodeStatusType,
        6 => wlan_mac_addrs: Vec<String>,
        7 => site_name: String,
        8 => ant_azimuth: f64,
        9 => ant_elevation: f64,
        10 => polarity: Option<PolarityType>,
        11 => golay_idx: Option<GolayIdx>,
    }
}

wire_struct! {
    pub struct Link {
        1 => name: String,
        2 => a_node_name: String,
        3 => z_node_name: String,
        4 => link_type: LinkType,
        5 => is_alive: bool,
        6 => linkup_attempts: i64,
        7 => a_node_mac: String,
        8 => z_node_mac: String,
        9 => is_backup_cn_link: Option<bool>,
    }
}

impl Link {
    /// Canonical link name: both endpoints in lexical order, so either
    /// direction names the same link.
    pub fn name_for(a: &str, z: &str) -> String {
        let (first, second) = if a <= z { (a, z) } else { (z, a) };
        format!("link-{}-{}", first, second)
    }
}

wire_struct! {
    pub struct Topology {
        1 => name: String,
        2 => nodes: Vec<Node>,
        3 => links: Vec<Link>,
        4 => sites: Vec<Site>,
    }
}

wire_struct! {
    pub struct GetTopology {}
}

wire_struct! {
    pub struct AddNode {
        1 => node: Node,
    }
}

wire_struct! {
    pub struct DelNode {
        1 => node_name: String,
        2 => force: bool,
    }
}

wire_struct! {
    pub struct EditNode {
        1 => node_name: String,
        2 => new_node: Node,
    }
}

wire_struct! {
    pub struct AddLink {
        1 => link: Link,
    }
}

wire_struct! {
    pub struct DelLink {
        1 => a_node_name: String,
        2 => z_node_name: String,
        3 => force: bool,
    }
}

wire_struct! {
    pub struct AddSite {
        1 => site: Site,
    }
}

wire_struct! {
    pub struct DelSite {
        1 => site_name: String,
    }
}

wire_struct! {
    pub struct EditSite {
        1 => site_name: String,
        2 => new_site: Site,
    }
}

wire_struct! {
    pub struct SetNodeMac {
        1 => node_name: String,
        2 => node_mac: String,
        3 => force: bool,
    }
}

wire_struct! {
    pub struct SetNodeMacList {
        1 => set_node_mac_list: Vec<SetNodeMac>,
    }
}
