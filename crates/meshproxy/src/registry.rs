//! # Message Type Registry
//!
//! Which backend application receives each request type, which type answers
//! it, and how to decode each answer. Both tables are exhaustive `match`es, so
//! adding a message type without routing it does not compile. [`verify`]
//! re-checks the tables at startup.

use std::fmt;

use meshwire::AggrMessageType as A;
use meshwire::Backend;
use meshwire::CtrlMessageType as C;
use meshwire::E2EAck;
use meshwire::Message;
use meshwire::MessageType;
use meshwire::WireError;
use meshwire::aggregator::AggrAck;
use meshwire::aggregator::AggrStatusReport;
use meshwire::config::GetCtrlConfigBaseResp;
use meshwire::config::GetCtrlConfigNetworkOverridesResp;
use meshwire::config::GetCtrlConfigNodeOverridesResp;
use meshwire::config::GetCtrlConfigResp;
use meshwire::ignition::IgnitionState;
use meshwire::scan::ScanStatus;
use meshwire::status::StatusDump;
use meshwire::topology::Topology;
use meshwire::upgrade::UpgradeCommitPlan;
use meshwire::upgrade::UpgradeListImagesResp;
use meshwire::upgrade::UpgradeStateDump;
use serde::Serialize;
use tracing::error;

use crate::command;

// receiving applications inside the controller
const CTRL_STATUS_APP: &str = "ctrl-app-STATUS_APP";
const CTRL_IGNITION_APP: &str = "ctrl-app-IGNITION_APP";
const CTRL_TOPOLOGY_APP: &str = "ctrl-app-TOPOLOGY_APP";
const CTRL_SCAN_APP: &str = "ctrl-app-SCAN_APP";
const CTRL_UPGRADE_APP: &str = "ctrl-app-UPGRADE_APP";
const CTRL_CONFIG_APP: &str = "ctrl-app-CONFIG_APP";

// receiving applications inside the aggregator
const AGGR_STATUS_APP: &str = "aggr-app-STATUS_APP";
const AGGR_TRAFFIC_APP: &str = "aggr-app-TRAFFIC_APP";

/// Identity prefixes for our own dealer sockets.
pub const CTRL_SENDER_APP: &str = "ctrl-app-NMS_PROXY";
pub const AGGR_SENDER_APP: &str = "aggr-app-NMS_PROXY";

/// Where a request goes and what comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub backend: Backend,
    pub receiver_app: &'static str,
    pub sender_app: &'static str,
    pub response: MessageType,
}

/// Routes a request type. Response-only types have no route.
pub fn route(message_type: MessageType) -> Option<Route> {
    match message_type {
        MessageType::Ctrl(t) => ctrl_route(t),
        MessageType::Aggr(t) => aggr_route(t),
    }
}

fn ctrl_route(t: C) -> Option<Route> {
    let (receiver_app, response) = match t {
        C::GetStatusDump => (CTRL_STATUS_APP, C::StatusDump),
        C::RebootRequest => (CTRL_STATUS_APP, C::E2eAck),

        C::GetIgnitionState => (CTRL_IGNITION_APP, C::IgnitionState),
        C::SetIgnitionParams | C::SetLinkStatusReq => (CTRL_IGNITION_APP, C::E2eAck),

        C::GetTopology => (CTRL_TOPOLOGY_APP, C::Topology),
        C::SetNodeMac
        | C::SetNodeMacList
        | C::AddNode
        | C::DelNode
        | C::EditNode
        | C::AddLink
        | C::DelLink
        | C::AddSite
        | C::DelSite
        | C::EditSite => (CTRL_TOPOLOGY_APP, C::E2eAck),

        C::GetScanStatus => (CTRL_SCAN_APP, C::ScanStatus),
        C::ResetScanStatus => (CTRL_SCAN_APP, C::E2eAck),

        C::UpgradeStateReq => (CTRL_UPGRADE_APP, C::UpgradeStateDump),
        C::UpgradeCommitPlanReq => (CTRL_UPGRADE_APP, C::UpgradeCommitPlan),
        C::UpgradeListImagesReq => (CTRL_UPGRADE_APP, C::UpgradeListImagesResp),
        C::UpgradeGroupReq | C::UpgradeAbortReq | C::UpgradeAddImageReq | C::UpgradeDelImageReq => {
            (CTRL_UPGRADE_APP, C::E2eAck)
        }

        C::GetCtrlConfigReq => (CTRL_CONFIG_APP, C::GetCtrlConfigResp),
        C::GetCtrlConfigBaseReq => (CTRL_CONFIG_APP, C::GetCtrlConfigBaseResp),
        C::GetCtrlConfigNetworkOverridesReq => (CTRL_CONFIG_APP, C::GetCtrlConfigNetworkOverridesResp),
        C::GetCtrlConfigNodeOverridesReq => (CTRL_CONFIG_APP, C::GetCtrlConfigNodeOverridesResp),
        C::SetCtrlConfigNetworkOverridesReq | C::SetCtrlConfigNodeOverridesReq => (CTRL_CONFIG_APP, C::E2eAck),

        C::StatusDump
        | C::IgnitionState
        | C::Topology
        | C::ScanStatus
        | C::UpgradeStateDump
        | C::UpgradeCommitPlan
        | C::UpgradeListImagesResp
        | C::GetCtrlConfigResp
        | C::GetCtrlConfigBaseResp
        | C::GetCtrlConfigNetworkOverridesResp
        | C::GetCtrlConfigNodeOverridesResp
        | C::E2eAck => return None,
    };
    Some(Route {
        backend: Backend::Controller,
        receiver_app,
        sender_app: CTRL_SENDER_APP,
        response: MessageType::Ctrl(response),
    })
}

fn aggr_route(t: A) -> Option<Route> {
    let (receiver_app, response) = match t {
        A::GetStatusReport => (AGGR_STATUS_APP, A::StatusReport),
        A::StartIperf | A::StopIperf => (AGGR_TRAFFIC_APP, A::AggrAck),
        A::StatusReport | A::AggrAck => return None,
    };
    Some(Route {
        backend: Backend::Aggregator,
        receiver_app,
        sender_app: AGGR_SENDER_APP,
        response: MessageType::Aggr(response),
    })
}

/// A decoded reply, serialized upstream as its inner struct.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Ack(E2EAck),
    Topology(Topology),
    StatusDump(StatusDump),
    IgnitionState(IgnitionState),
    ScanStatus(ScanStatus),
    UpgradeState(UpgradeStateDump),
    CommitPlan(UpgradeCommitPlan),
    UpgradeImages(UpgradeListImagesResp),
    CtrlConfig(GetCtrlConfigResp),
    BaseConfig(GetCtrlConfigBaseResp),
    NetworkOverrides(GetCtrlConfigNetworkOverridesResp),
    NodeOverrides(GetCtrlConfigNodeOverridesResp),
    AggrAck(AggrAck),
    AggrStatusReport(AggrStatusReport),
}

impl Response {
    /// `(success, message)` for either backend's acknowledgement.
    pub fn ack(&self) -> Option<(bool, &str)> {
        match self {
            Response::Ack(ack) => Some((ack.success, ack.message.as_str())),
            Response::AggrAck(ack) => Some((ack.success, ack.message.as_str())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    Wire(WireError),
    /// A request type arrived where a reply was expected.
    NotAResponse(MessageType),
    /// A reply of some other type than the request asked for.
    Unexpected { expected: MessageType, found: MessageType },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wire(e) => write!(f, "{}", e),
            Self::NotAResponse(t) => write!(f, "{} is not a response type", t),
            Self::Unexpected { expected, found } => {
                write!(f, "Expected {}, received {}", expected, found)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<WireError> for DecodeError {
    fn from(e: WireError) -> Self {
        Self::Wire(e)
    }
}

fn is_ack(t: MessageType) -> bool {
    matches!(t, MessageType::Ctrl(C::E2eAck) | MessageType::Aggr(A::AggrAck))
}

/// Decodes a reply envelope from `backend`.
///
/// The reply must carry `expected`, or the backend's ack type, which may stand
/// in for any reply.
pub fn decode_response(backend: Backend, expected: MessageType, bytes: &[u8]) -> Result<Response, DecodeError> {
    let message = meshwire::decode_message(bytes)?;
    let found = message.message_type(backend)?;
    if found != expected && !is_ack(found) {
        return Err(DecodeError::Unexpected { expected, found });
    }
    decode_payload(found, &message)
}

fn decode_payload(found: MessageType, message: &Message) -> Result<Response, DecodeError> {
    let response = match found {
        MessageType::Ctrl(t) => match t {
            C::StatusDump => Response::StatusDump(message.payload()?),
            C::IgnitionState => Response::IgnitionState(message.payload()?),
            C::Topology => Response::Topology(message.payload()?),
            C::ScanStatus => Response::ScanStatus(message.payload()?),
            C::UpgradeStateDump => Response::UpgradeState(message.payload()?),
            C::UpgradeCommitPlan => Response::CommitPlan(message.payload()?),
            C::UpgradeListImagesResp => Response::UpgradeImages(message.payload()?),
            C::GetCtrlConfigResp => Response::CtrlConfig(message.payload()?),
            C::GetCtrlConfigBaseResp => Response::BaseConfig(message.payload()?),
            C::GetCtrlConfigNetworkOverridesResp => Response::NetworkOverrides(message.payload()?),
            C::GetCtrlConfigNodeOverridesResp => Response::NodeOverrides(message.payload()?),
            C::E2eAck => Response::Ack(message.payload()?),

            C::GetStatusDump
            | C::RebootRequest
            | C::GetIgnitionState
            | C::SetIgnitionParams
            | C::SetLinkStatusReq
            | C::GetTopology
            | C::SetNodeMac
            | C::SetNodeMacList
            | C::AddNode
            | C::DelNode
            | C::EditNode
            | C::AddLink
            | C::DelLink
            | C::AddSite
            | C::DelSite
            | C::EditSite
            | C::GetScanStatus
            | C::ResetScanStatus
            | C::UpgradeGroupReq
            | C::UpgradeStateReq
            | C::UpgradeAbortReq
            | C::UpgradeCommitPlanReq
            | C::UpgradeAddImageReq
            | C::UpgradeDelImageReq
            | C::UpgradeListImagesReq
            | C::GetCtrlConfigReq
            | C::GetCtrlConfigBaseReq
            | C::GetCtrlConfigNetworkOverridesReq
            | C::SetCtrlConfigNetworkOverridesReq
            | C::GetCtrlConfigNodeOverridesReq
            | C::SetCtrlConfigNodeOverridesReq => return Err(DecodeError::NotAResponse(found)),
        },
        MessageType::Aggr(t) => match t {
            A::StatusReport => Response::AggrStatusReport(message.payload()?),
            A::AggrAck => Response::AggrAck(message.payload()?),
            A::GetStatusReport | A::StartIperf | A::StopIperf => {
                return Err(DecodeError::NotAResponse(found));
            }
        },
    };
    Ok(response)
}

/// Registry inconsistencies found by [`verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryGap(pub Vec<String>);

impl fmt::Display for RegistryGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "message registry incomplete: {}", self.0.join("; "))
    }
}

impl std::error::Error for RegistryGap {}

/// Checks that every message type is either routed or decodable, that every
/// route's reply decodes, and that every command maps to a routed type.
/// Returns the number of routed request types.
pub fn verify() -> Result<usize, RegistryGap> {
    let mut gaps = Vec::new();
    let mut routed = 0;

    for t in MessageType::all() {
        match route(t) {
            Some(r) => {
                routed += 1;
                if r.backend != t.backend() || r.response.backend() != t.backend() {
                    gaps.push(format!("{} routes across backends", t));
                }
                if !decodes_as_response(r.response) {
                    gaps.push(format!("{} answers with {} which has no decoder", t, r.response));
                }
            }
            None if decodes_as_response(t) => {}
            None => gaps.push(format!("{} is neither routed nor decodable", t)),
        }
    }

    for &(name, t) in command::COMMANDS {
        if route(t).is_none() {
            gaps.push(format!("command {} maps to unroutable {}", name, t));
        }
    }

    if gaps.is_empty() {
        return Ok(routed);
    }
    for gap in &gaps {
        error!(gap = %gap, "registry gap");
    }
    Err(RegistryGap(gaps))
}

fn decodes_as_response(t: MessageType) -> bool {
    // a lone STOP byte is the empty struct, which decodes as any struct's default
    let empty = Message { m_type: t.as_i32(), value: vec![0x00] };
    decode_payload(t, &empty).is_ok()
}
