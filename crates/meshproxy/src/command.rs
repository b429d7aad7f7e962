//! # Commands
//!
//! One-shot operations requested by the web tier. Each [`Command`] variant has
//! typed parameters and a pure mapping onto exactly one request struct.
//!
//! Commands arrive as JSON objects tagged by `type`, with camelCase names and
//! camelCase parameter keys; schema structs nested inside (`node`, `site`) keep
//! their own field names.

use std::collections::BTreeMap;

use meshwire::AggrMessageType as A;
use meshwire::CtrlMessageType as C;
use meshwire::MessageType;
use meshwire::aggregator::IperfOptions;
use meshwire::aggregator::IperfTransportProtocol;
use meshwire::aggregator::StartIperf;
use meshwire::aggregator::StopIperf;
use meshwire::config::GetCtrlConfigBaseReq;
use meshwire::config::GetCtrlConfigNetworkOverridesReq;
use meshwire::config::GetCtrlConfigNodeOverridesReq;
use meshwire::config::GetCtrlConfigReq;
use meshwire::config::SetCtrlConfigNetworkOverridesReq;
use meshwire::config::SetCtrlConfigNodeOverridesReq;
use meshwire::ignition::GetIgnitionState;
use meshwire::ignition::IgnitionParams;
use meshwire::ignition::LinkActionType;
use meshwire::ignition::SetLinkStatusReq;
use meshwire::status::GetStatusDump;
use meshwire::status::RebootReq;
use meshwire::topology;
use meshwire::topology::GetTopology;
use meshwire::topology::Link;
use meshwire::topology::LinkType;
use meshwire::topology::Node;
use meshwire::topology::SetNodeMac;
use meshwire::topology::SetNodeMacList;
use meshwire::topology::Site;
use meshwire::upgrade::UpgradeAbortReq;
use meshwire::upgrade::UpgradeAddImageReq;
use meshwire::upgrade::UpgradeCommitPlanReq;
use meshwire::upgrade::UpgradeDelImageReq;
use meshwire::upgrade::UpgradeGroupReq;
use meshwire::upgrade::UpgradeGroupType;
use meshwire::upgrade::UpgradeListImagesReq;
use meshwire::upgrade::UpgradeReq;
use meshwire::upgrade::UpgradeReqType;
use meshwire::upgrade::UpgradeStateReq;
use meshwire::upgrade::UpgradeTorrentParams;
use serde::Deserialize;
use serde_json::Value;

use crate::dispatcher::Request;
use crate::error::ProxyError;
use crate::error::Result;

/// Declares the command table once: each variant with its wire name and the
/// request type it sends. Generates [`COMMANDS`], [`Command::name`] and
/// [`Command::message_type`] from the same rows.
macro_rules! command_table {
    ($($variant:ident => $name:literal, $t:expr;)*) => {
        /// Every command name with the request type it sends.
        pub const COMMANDS: &[(&str, MessageType)] = &[$(($name, $t),)*];

        impl Command {
            pub fn name(&self) -> &'static str {
                match self {
                    $(Command::$variant { .. } => $name,)*
                }
            }

            /// The request type this command sends.
            pub fn message_type(&self) -> MessageType {
                match self {
                    $(Command::$variant { .. } => $t,)*
                }
            }
        }
    };
}

command_table! {
    GetTopology => "getTopology", MessageType::Ctrl(C::GetTopology);
    GetStatusDump => "getStatusDump", MessageType::Ctrl(C::GetStatusDump);
    SetLinkStatus => "setLinkStatus", MessageType::Ctrl(C::SetLinkStatusReq);
    AddLink => "addLink", MessageType::Ctrl(C::AddLink);
    DelLink => "delLink", MessageType::Ctrl(C::DelLink);
    AddNode => "addNode", MessageType::Ctrl(C::AddNode);
    DelNode => "delNode", MessageType::Ctrl(C::DelNode);
    EditNode => "editNode", MessageType::Ctrl(C::EditNode);
    AddSite => "addSite", MessageType::Ctrl(C::AddSite);
    DelSite => "delSite", MessageType::Ctrl(C::DelSite);
    EditSite => "editSite", MessageType::Ctrl(C::EditSite);
    RebootNode => "rebootNode", MessageType::Ctrl(C::RebootRequest);
    SetMac => "setMac", MessageType::Ctrl(C::SetNodeMac);
    SetMacList => "setMacList", MessageType::Ctrl(C::SetNodeMacList);
    GetIgnitionState => "getIgnitionState", MessageType::Ctrl(C::GetIgnitionState);
    SetNetworkIgnitionState => "setNetworkIgnitionState", MessageType::Ctrl(C::SetIgnitionParams);
    SetLinkIgnitionState => "setLinkIgnitionState", MessageType::Ctrl(C::SetIgnitionParams);
    PrepareUpgrade => "prepareUpgrade", MessageType::Ctrl(C::UpgradeGroupReq);
    CommitUpgrade => "commitUpgrade", MessageType::Ctrl(C::UpgradeGroupReq);
    ResetUpgradeStatus => "resetUpgradeStatus", MessageType::Ctrl(C::UpgradeGroupReq);
    AbortUpgrade => "abortUpgrade", MessageType::Ctrl(C::UpgradeAbortReq);
    GetUpgradeState => "getUpgradeState", MessageType::Ctrl(C::UpgradeStateReq);
    GetCommitPlan => "getCommitPlan", MessageType::Ctrl(C::UpgradeCommitPlanReq);
    AddUpgradeImage => "addUpgradeImage", MessageType::Ctrl(C::UpgradeAddImageReq);
    DeleteUpgradeImage => "deleteUpgradeImage", MessageType::Ctrl(C::UpgradeDelImageReq);
    ListUpgradeImages => "listUpgradeImages", MessageType::Ctrl(C::UpgradeListImagesReq);
    GetCtrlConfig => "getCtrlConfig", MessageType::Ctrl(C::GetCtrlConfigReq);
    GetBaseConfig => "getBaseConfig", MessageType::Ctrl(C::GetCtrlConfigBaseReq);
    GetNetworkOverrideConfig => "getNetworkOverrideConfig", MessageType::Ctrl(C::GetCtrlConfigNetworkOverridesReq);
    SetNetworkOverrideConfig => "setNetworkOverrideConfig", MessageType::Ctrl(C::SetCtrlConfigNetworkOverridesReq);
    GetNodeOverrideConfig => "getNodeOverrideConfig", MessageType::Ctrl(C::GetCtrlConfigNodeOverridesReq);
    SetNodeOverrideConfig => "setNodeOverrideConfig", MessageType::Ctrl(C::SetCtrlConfigNodeOverridesReq);
    StartTraffic => "startTraffic", MessageType::Aggr(A::StartIperf);
    StopTraffic => "stopTraffic", MessageType::Aggr(A::StopIperf);
}

/// Request type for a command name.
pub fn lookup(name: &str) -> Option<MessageType> {
    COMMANDS.iter().find(|(n, _)| *n == name).map(|&(_, t)| t)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkAction {
    Up,
    Down,
}

impl From<LinkAction> for LinkActionType {
    fn from(action: LinkAction) -> Self {
        match action {
            LinkAction::Up => LinkActionType::LinkUp,
            LinkAction::Down => LinkActionType::LinkDown,
        }
    }
}

/// Batch selection shared by the upgrade group commands.
/// An empty `nodes` list targets the whole network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpgradeGroupParams {
    pub request_id: String,
    pub nodes: Vec<String>,
    pub exclude_nodes: Vec<String>,
    pub skip_links: Vec<String>,
    pub timeout: i64,
    pub skip_failure: bool,
    pub version: String,
    pub limit: i64,
    pub retry_limit: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TorrentParams {
    pub download_timeout: i64,
    pub download_limit: Option<i64>,
    pub upload_limit: Option<i64>,
    pub max_connections: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareUpgradeParams {
    #[serde(flatten)]
    pub group: UpgradeGroupParams,
    pub image_url: String,
    pub md5: String,
    pub download_attempts: Option<i64>,
    pub torrent: Option<TorrentParams>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitUpgradeParams {
    #[serde(flatten)]
    pub group: UpgradeGroupParams,
    /// Seconds to wait before committing. Absent commits now.
    pub schedule_to_commit: Option<i64>,
}

fn default_reboot_delay() -> i32 {
    5
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Command {
    GetTopology,
    GetStatusDump,
    SetLinkStatus {
        action: LinkAction,
        initiator_node: String,
        responder_node: String,
    },
    AddLink {
        node_a: String,
        node_z: String,
        #[serde(default)]
        link_type: LinkType,
        is_backup_cn_link: Option<bool>,
    },
    DelLink {
        node_a: String,
        node_z: String,
        #[serde(default)]
        force: bool,
    },
    AddNode {
        node: Node,
    },
    DelNode {
        node_name: String,
        #[serde(default)]
        force: bool,
    },
    EditNode {
        node_name: String,
        new_node: Node,
    },
    AddSite {
        site: Site,
    },
    DelSite {
        site_name: String,
    },
    EditSite {
        site_name: String,
        new_site: Site,
    },
    RebootNode {
        nodes: Vec<String>,
        #[serde(default)]
        force: bool,
        #[serde(default = "default_reboot_delay")]
        seconds_to_reboot: i32,
    },
    SetMac {
        node_name: String,
        mac: String,
        #[serde(default)]
        force: bool,
    },
    SetMacList {
        /// node name to MAC
        node_macs: BTreeMap<String, String>,
        #[serde(default)]
        force: bool,
    },
    GetIgnitionState,
    SetNetworkIgnitionState {
        enabled: bool,
    },
    SetLinkIgnitionState {
        link_name: String,
        enabled: bool,
    },
    PrepareUpgrade(PrepareUpgradeParams),
    CommitUpgrade(CommitUpgradeParams),
    ResetUpgradeStatus(UpgradeGroupParams),
    AbortUpgrade {
        #[serde(default)]
        abort_all: bool,
        #[serde(default)]
        req_ids: Vec<String>,
    },
    GetUpgradeState,
    GetCommitPlan {
        #[serde(default)]
        limit: i64,
        #[serde(default)]
        exclude_nodes: Vec<String>,
    },
    AddUpgradeImage {
        image_url: String,
    },
    DeleteUpgradeImage {
        name: String,
    },
    ListUpgradeImages,
    GetCtrlConfig {
        sw_version: String,
    },
    GetBaseConfig {
        #[serde(default)]
        sw_versions: Vec<String>,
    },
    GetNetworkOverrideConfig,
    SetNetworkOverrideConfig {
        overrides: Value,
    },
    GetNodeOverrideConfig {
        #[serde(default)]
        nodes: Vec<String>,
    },
    SetNodeOverrideConfig {
        overrides: Value,
    },
    StartTraffic {
        src_node: String,
        dst_node: String,
        bitrate: Option<i64>,
        time_sec: Option<i32>,
        protocol: Option<IperfTransportProtocol>,
    },
    StopTraffic {
        session_id: String,
    },
}

impl Command {
    /// Parses a command from its name and a JSON parameter object.
    ///
    /// Unknown names fail with [`ProxyError::UnknownCommand`] before the
    /// parameters are looked at.
    pub fn from_named(name: &str, params: Value) -> Result<Self> {
        if lookup(name).is_none() {
            return Err(ProxyError::UnknownCommand(name.to_string()));
        }
        let mut object = match params {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => return Err(invalid(name, format!("expected an object, got {}", other))),
        };
        object.insert("type".into(), Value::String(name.to_string()));
        serde_json::from_value(Value::Object(object)).map_err(|e| invalid(name, e.to_string()))
    }

    /// Builds the encoded request. Pure: no I/O, no clock.
    pub fn to_request(&self) -> Result<Request> {
        let t = self.message_type();
        let name = self.name();

        let request = match self {
            Command::GetTopology => Request::new(t, &GetTopology {}),
            Command::GetStatusDump => Request::new(t, &GetStatusDump {}),
            Command::SetLinkStatus { action, initiator_node, responder_node } => Request::new(
                t,
                &SetLinkStatusReq {
                    action: (*action).into(),
                    initiator_node_name: initiator_node.clone(),
                    responder_node_name: responder_node.clone(),
                },
            ),
            Command::AddLink { node_a, node_z, link_type, is_backup_cn_link } => {
                let (a, z) = ordered_pair(name, node_a, node_z)?;
                let link = Link {
                    name: Link::name_for(a, z),
                    a_node_name: a.to_string(),
                    z_node_name: z.to_string(),
                    link_type: *link_type,
                    is_backup_cn_link: *is_backup_cn_link,
                    ..Link::default()
                };
                Request::new(t, &topology::AddLink { link })
            }
            Command::DelLink { node_a, node_z, force } => {
                let (a, z) = ordered_pair(name, node_a, node_z)?;
                Request::new(
                    t,
                    &topology::DelLink {
                        a_node_name: a.to_string(),
                        z_node_name: z.to_string(),
                        force: *force,
                    },
                )
            }
            Command::AddNode { node } => Request::new(t, &topology::AddNode { node: node.clone() }),
            Command::DelNode { node_name, force } => Request::new(
                t,
                &topology::DelNode { node_name: node_name.clone(), force: *force },
            ),
            Command::EditNode { node_name, new_node } => Request::new(
                t,
                &topology::EditNode { node_name: node_name.clone(), new_node: new_node.clone() },
            ),
            Command::AddSite { site } => Request::new(t, &topology::AddSite { site: site.clone() }),
            Command::DelSite { site_name } => {
                Request::new(t, &topology::DelSite { site_name: site_name.clone() })
            }
            Command::EditSite { site_name, new_site } => Request::new(
                t,
                &topology::EditSite { site_name: site_name.clone(), new_site: new_site.clone() },
            ),
            Command::RebootNode { nodes, force, seconds_to_reboot } => {
                if nodes.is_empty() {
                    return Err(invalid(name, "no nodes given"));
                }
                Request::new(
                    t,
                    &RebootReq { nodes: nodes.clone(), force: *force, seconds_to_reboot: *seconds_to_reboot },
                )
            }
            Command::SetMac { node_name, mac, force } => Request::new(
                t,
                &SetNodeMac { node_name: node_name.clone(), node_mac: mac.clone(), force: *force },
            ),
            Command::SetMacList { node_macs, force } => {
                let set_node_mac_list = node_macs
                    .iter()
                    .map(|(node_name, mac)| SetNodeMac {
                        node_name: node_name.clone(),
                        node_mac: mac.clone(),
                        force: *force,
                    })
                    .collect();
                Request::new(t, &SetNodeMacList { set_node_mac_list })
            }
            Command::GetIgnitionState => Request::new(t, &GetIgnitionState {}),
            Command::SetNetworkIgnitionState { enabled } => Request::new(
                t,
                &IgnitionParams { enable: Some(*enabled), ..IgnitionParams::default() },
            ),
            Command::SetLinkIgnitionState { link_name, enabled } => {
                let link_auto_ignite = BTreeMap::from([(link_name.clone(), *enabled)]);
                Request::new(
                    t,
                    &IgnitionParams { link_auto_ignite: Some(link_auto_ignite), ..IgnitionParams::default() },
                )
            }
            Command::PrepareUpgrade(p) => {
                let ur_req = UpgradeReq {
                    ur_type: UpgradeReqType::PrepareUpgrade,
                    md5: p.md5.clone(),
                    image_url: p.image_url.clone(),
                    download_attempts: p.download_attempts,
                    torrent_params: p.torrent.as_ref().map(|tp| UpgradeTorrentParams {
                        download_timeout: tp.download_timeout,
                        download_limit: tp.download_limit,
                        upload_limit: tp.upload_limit,
                        max_connections: tp.max_connections,
                    }),
                    ..UpgradeReq::default()
                };
                Request::new(t, &upgrade_group(name, &p.group, ur_req)?)
            }
            Command::CommitUpgrade(p) => {
                let ur_req = UpgradeReq {
                    ur_type: UpgradeReqType::CommitUpgrade,
                    schedule_to_commit: p.schedule_to_commit,
                    ..UpgradeReq::default()
                };
                Request::new(t, &upgrade_group(name, &p.group, ur_req)?)
            }
            Command::ResetUpgradeStatus(group) => {
                let ur_req = UpgradeReq { ur_type: UpgradeReqType::ResetStatus, ..UpgradeReq::default() };
                Request::new(t, &upgrade_group(name, group, ur_req)?)
            }
            Command::AbortUpgrade { abort_all, req_ids } => {
                if !abort_all && req_ids.is_empty() {
                    return Err(invalid(name, "give reqIds or set abortAll"));
                }
                Request::new(t, &UpgradeAbortReq { abort_all: *abort_all, req_ids: req_ids.clone() })
            }
            Command::GetUpgradeState => Request::new(t, &UpgradeStateReq {}),
            Command::GetCommitPlan { limit, exclude_nodes } => Request::new(
                t,
                &UpgradeCommitPlanReq { limit: *limit, exclude_nodes: exclude_nodes.clone() },
            ),
            Command::AddUpgradeImage { image_url } => {
                Request::new(t, &UpgradeAddImageReq { image_url: image_url.clone() })
            }
            Command::DeleteUpgradeImage { name: image } => {
                Request::new(t, &UpgradeDelImageReq { name: image.clone() })
            }
            Command::ListUpgradeImages => Request::new(t, &UpgradeListImagesReq {}),
            Command::GetCtrlConfig { sw_version } => {
                Request::new(t, &GetCtrlConfigReq { sw_version: sw_version.clone() })
            }
            Command::GetBaseConfig { sw_versions } => {
                Request::new(t, &GetCtrlConfigBaseReq { sw_versions: sw_versions.clone() })
            }
            Command::GetNetworkOverrideConfig => Request::new(t, &GetCtrlConfigNetworkOverridesReq {}),
            Command::SetNetworkOverrideConfig { overrides } => Request::new(
                t,
                &SetCtrlConfigNetworkOverridesReq { overrides: config_text(name, overrides)? },
            ),
            Command::GetNodeOverrideConfig { nodes } => {
                Request::new(t, &GetCtrlConfigNodeOverridesReq { nodes: nodes.clone() })
            }
            Command::SetNodeOverrideConfig { overrides } => Request::new(
                t,
                &SetCtrlConfigNodeOverridesReq { overrides: config_text(name, overrides)? },
            ),
            Command::StartTraffic { src_node, dst_node, bitrate, time_sec, protocol } => {
                let options = (bitrate.is_some() || time_sec.is_some() || protocol.is_some()).then(|| {
                    IperfOptions { bitrate: *bitrate, time_sec: *time_sec, protocol: *protocol }
                });
                Request::new(
                    t,
                    &StartIperf { src_node_id: src_node.clone(), dst_node_id: dst_node.clone(), options },
                )
            }
            Command::StopTraffic { session_id } => Request::new(t, &StopIperf { id: session_id.clone() }),
        };
        Ok(request?)
    }
}

fn invalid(command: &str, reason: impl Into<String>) -> ProxyError {
    ProxyError::InvalidParams { command: command.to_string(), reason: reason.into() }
}

/// Link endpoints in canonical order, rejecting self-links.
fn ordered_pair<'a>(command: &str, a: &'a str, z: &'a str) -> Result<(&'a str, &'a str)> {
    if a.is_empty() || z.is_empty() {
        return Err(invalid(command, "both link endpoints are required"));
    }
    if a == z {
        return Err(invalid(command, "a link needs two distinct nodes"));
    }
    Ok(if a < z { (a, z) } else { (z, a) })
}

fn upgrade_group(command: &str, group: &UpgradeGroupParams, mut ur_req: UpgradeReq) -> Result<UpgradeGroupReq> {
    if group.request_id.is_empty() {
        return Err(invalid(command, "requestId is required"));
    }
    ur_req.upgrade_req_id = group.request_id.clone();

    let ug_type = if group.nodes.is_empty() { UpgradeGroupType::Network } else { UpgradeGroupType::Nodes };
    Ok(UpgradeGroupReq {
        ug_type,
        nodes: group.nodes.clone(),
        exclude_nodes: group.exclude_nodes.clone(),
        ur_req,
        timeout: group.timeout,
        skip_failure: group.skip_failure,
        version: group.version.clone(),
        skip_links: group.skip_links.clone(),
        limit: group.limit,
        retry_limit: group.retry_limit,
    })
}

/// Overrides travel as JSON text and must be an object.
fn config_text(command: &str, overrides: &Value) -> Result<String> {
    if !overrides.is_object() {
        return Err(invalid(command, "overrides must be a JSON object"));
    }
    Ok(overrides.to_string())
}
