//! Per-node status reports as collected by the controller.

use std::collections::BTreeMap;

use meshpack::wire_enum;
use meshpack::wire_struct;

use crate::topology::NodeStatusType;

wire_enum! {
    pub enum UpgradeStatusType {
        None = 10,
        DownloadingImage = 20,
        DownloadFailed = 30,
        FlashingImage = 40,
        FlashFailed = 50,
        Flashed = 60,
        CommitFailed = 70,
    }
}

wire_struct! {
    pub struct ImageMeta {
        1 => md5: String,
        2 => version: String,
    }
}

wire_struct! {
    pub struct UpgradeStatus {
        1 => us_type: UpgradeStatusType,
        2 => next_image: ImageMeta,
        3 => reason: String,
        4 => upgrade_req_id: String,
        5 => when_to_commit: i64,
    }
}

wire_struct! {
    pub struct StatusReport {
        1 => time_stamp: i64,
        2 => ipv6_address: String,
        3 => version: String,
        4 => uboot_version: String,
        5 => status: NodeStatusType,
        6 => upgrade_status: UpgradeStatus,
        7 => config_md5: String,
        8 => hardware_model: String,
    }
}

wire_struct! {
    pub struct GetStatusDump {}
}

wire_struct! {
    /// Latest report of every node, keyed by node MAC.
    pub struct StatusDump {
        1 => time_stamp: i64,
        2 => status_reports: BTreeMap<String, StatusReport>,
        3 => version: Option<String>,
    }
}

wire_struct! {
    pub struct RebootReq {
        1 => nodes: Vec<String>,
        2 => force: bool,
        3 => seconds_to_reboot: i32,
    }
}
