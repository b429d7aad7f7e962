//! Rolling software upgrades and the image store behind them.

use std::collections::BTreeSet;

use meshpack::wire_enum;
use meshpack::wire_struct;

wire_enum! {
    pub enum UpgradeGroupType {
        Nodes = 10,
        Network = 20,
    }
}

wire_enum! {
    pub enum UpgradeReqType {
        PrepareUpgrade = 10,
        CommitUpgrade = 20,
        ResetStatus = 30,
    }
}

wire_struct! {
    pub struct UpgradeTorrentParams {
        1 => download_timeout: i64,
        2 => download_limit: Option<i64>,
        3 => upload_limit: Option<i64>,
        4 => max_connections: Option<i64>,
    }
}

wire_struct! {
    pub struct UpgradeReq {
        1 => ur_type: UpgradeReqType,
        2 => upgrade_req_id: String,
        3 => md5: String,
        4 => image_url: String,
        5 => schedule_to_commit: Option<i64>,
        6 => download_attempts: Option<i64>,
        7 => torrent_params: Option<UpgradeTorrentParams>,
    }
}

wire_struct! {
    pub struct UpgradeGroupReq {
        1 => ug_type: UpgradeGroupType,
        2 => nodes: Vec<String>,
        3 => exclude_nodes: Vec<String>,
        4 => ur_req: UpgradeReq,
        5 => timeout: i64,
        6 => skip_failure: bool,
        7 => version: String,
        8 => skip_links: Vec<String>,
        9 => limit: i64,
        10 => retry_limit: i64,
    }
}

wire_struct! {
    pub struct UpgradeStateReq {}
}

wire_struct! {
    pub struct UpgradeStateDump {
        1 => cur_batch: Vec<String>,
        2 => pending_batches: Vec<Vec<String>>,
        3 => cur_req: UpgradeGroupReq,
        4 => pending_reqs: Vec<UpgradeGroupReq>,
    }
}

wire_struct! {
    pub struct UpgradeAbortReq {
        1 => abort_all: bool,
        2 => req_ids: Vec<String>,
    }
}

wire_struct! {
    pub struct UpgradeCommitPlanReq {
        1 => limit: i64,
        2 => exclude_nodes: Vec<String>,
    }
}

wire_struct! {
    pub struct UpgradeCommitPlan {
        1 => commit_batches: Vec<BTreeSet<String>>,
        2 => canary_links: Vec<String>,
    }
}

wire_struct! {
    pub struct UpgradeImage {
        1 => name: String,
        2 => magnet_uri: String,
        3 => md5: String,
        4 => http_uri: Option<String>,
    }
}

wire_struct! {
    pub struct UpgradeAddImageReq {
        1 => image_url: String,
    }
}

wire_struct! {
    pub struct UpgradeDelImageReq {
        1 => name: String,
    }
}

wire_struct! {
    pub struct UpgradeListImagesReq {}
}

wire_struct! {
    pub struct UpgradeListImagesResp {
        1 => images: Vec<UpgradeImage>,
    }
}
