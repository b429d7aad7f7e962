//! # Message Types
//!
//! Each backend numbers its messages independently, so a raw `mType` only means
//! something together with the [`Backend`] it came from.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::WireError;

meshpack::wire_enum! {
    /// Controller message namespace.
    pub enum CtrlMessageType {
        // status
        GetStatusDump = 101,
        StatusDump = 102,
        RebootRequest = 103,

        // ignition
        GetIgnitionState = 201,
        IgnitionState = 202,
        SetIgnitionParams = 203,
        SetLinkStatusReq = 204,

        // topology
        GetTopology = 301,
        Topology = 302,
        SetNodeMac = 303,
        SetNodeMacList = 304,
        AddNode = 305,
        DelNode = 306,
        EditNode = 307,
        AddLink = 308,
        DelLink = 309,
        AddSite = 310,
        DelSite = 311,
        EditSite = 312,

        // scan
        GetScanStatus = 351,
        ScanStatus = 352,
        ResetScanStatus = 353,

        // upgrade
        UpgradeGroupReq = 401,
        UpgradeStateReq = 402,
        UpgradeStateDump = 403,
        UpgradeAbortReq = 404,
        UpgradeCommitPlanReq = 405,
        UpgradeCommitPlan = 406,
        UpgradeAddImageReq = 407,
        UpgradeDelImageReq = 408,
        UpgradeListImagesReq = 409,
        UpgradeListImagesResp = 410,

        // config
        GetCtrlConfigReq = 501,
        GetCtrlConfigResp = 502,
        GetCtrlConfigBaseReq = 503,
        GetCtrlConfigBaseResp = 504,
        GetCtrlConfigNetworkOverridesReq = 505,
        GetCtrlConfigNetworkOverridesResp = 506,
        SetCtrlConfigNetworkOverridesReq = 507,
        GetCtrlConfigNodeOverridesReq = 508,
        GetCtrlConfigNodeOverridesResp = 509,
        SetCtrlConfigNodeOverridesReq = 510,

        E2eAck = 1001,
    }
}

meshpack::wire_enum! {
    /// Aggregator message namespace.
    pub enum AggrMessageType {
        GetStatusReport = 101,
        StatusReport = 102,
        StartIperf = 201,
        StopIperf = 202,
        AggrAck = 1001,
    }
}

/// The service a message is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Controller,
    Aggregator,
}

impl Backend {
    pub const ALL: [Backend; 2] = [Backend::Controller, Backend::Aggregator];

    /// Well-known TCP port of the backend's dealer socket.
    pub fn default_port(self) -> u16 {
        match self {
            Backend::Controller => 17077,
            Backend::Aggregator => 18100,
        }
    }

    /// Resolves a raw `mType` inside this backend's namespace.
    pub fn message_type(self, value: i32) -> Result<MessageType, WireError> {
        let found = match self {
            Backend::Controller => CtrlMessageType::from_i32(value).map(MessageType::Ctrl),
            Backend::Aggregator => AggrMessageType::from_i32(value).map(MessageType::Aggr),
        };
        found.ok_or(WireError::UnknownMessageType { backend: self, value })
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Controller => write!(f, "controller"),
            Backend::Aggregator => write!(f, "aggregator"),
        }
    }
}

/// A message type qualified by its namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageType {
    Ctrl(CtrlMessageType),
    Aggr(AggrMessageType),
}

impl MessageType {
    pub fn backend(self) -> Backend {
        match self {
            MessageType::Ctrl(_) => Backend::Controller,
            MessageType::Aggr(_) => Backend::Aggregator,
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            MessageType::Ctrl(t) => t.as_i32(),
            MessageType::Aggr(t) => t.as_i32(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageType::Ctrl(t) => t.name(),
            MessageType::Aggr(t) => t.name(),
        }
    }

    /// Every type of both namespaces.
    pub fn all() -> impl Iterator<Item = MessageType> {
        let ctrl = CtrlMessageType::ALL.iter().copied().map(MessageType::Ctrl);
        let aggr = AggrMessageType::ALL.iter().copied().map(MessageType::Aggr);
        ctrl.chain(aggr)
    }
}

impl From<CtrlMessageType> for MessageType {
    fn from(t: CtrlMessageType) -> Self {
        MessageType::Ctrl(t)
    }
}

impl From<AggrMessageType> for MessageType {
    fn from(t: AggrMessageType) -> Self {
        MessageType::Aggr(t)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.backend(), self.name())
    }
}
