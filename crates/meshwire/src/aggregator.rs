//! Aggregator messages: traffic generation and its own status view.

use std::collections::BTreeMap;

use meshpack::wire_enum;
use meshpack::wire_struct;

wire_enum! {
    pub enum IperfTransportProtocol {
        Tcp = 6,
        Udp = 17,
    }
}

wire_struct! {
    pub struct IperfOptions {
        1 => bitrate: Option<i64>,
        2 => time_sec: Option<i32>,
        3 => protocol: Option<IperfTransportProtocol>,
    }
}

wire_struct! {
    pub struct StartIperf {
        1 => src_node_id: String,
        2 => dst_node_id: String,
        3 => options: Option<IperfOptions>,
    }
}

wire_struct! {
    pub struct StopIperf {
        1 => id: String,
    }
}

wire_struct! {
    pub struct AggrGetStatusReport {}
}

wire_struct! {
    pub struct AggrNodeReport {
        1 => time_stamp: i64,
        2 => ipv6_address: String,
        3 => version: String,
    }
}

wire_struct! {
    pub struct AggrStatusReport {
        1 => status_reports: BTreeMap<String, AggrNodeReport>,
        2 => version: Option<String>,
    }
}

wire_struct! {
    pub struct AggrAck {
        1 => success: bool,
        2 => message: String,
    }
}
