//! Link ignition: which links the controller brings up, and how eagerly.

use std::collections::BTreeMap;

use meshpack::wire_enum;
use meshpack::wire_struct;

wire_enum! {
    pub enum LinkActionType {
        LinkUp = 1,
        LinkDown = 2,
    }
}

wire_struct! {
    pub struct IgnitionCandidate {
        1 => initiator_node_name: String,
        2 => link_name: String,
    }
}

wire_struct! {
    /// Unset members leave the controller's current value alone.
    pub struct IgnitionParams {
        1 => enable: Option<bool>,
        2 => link_up_interval: Option<i64>,
        3 => link_up_dampen_interval: Option<i64>,
        4 => link_auto_ignite: Option<BTreeMap<String, bool>>,
    }
}

wire_struct! {
    pub struct GetIgnitionState {}
}

wire_struct! {
    pub struct IgnitionState {
        1 => visited_node_names: Vec<String>,
        2 => ig_candidates: Vec<IgnitionCandidate>,
        3 => last_ig_candidates: Vec<IgnitionCandidate>,
        4 => ig_params: IgnitionParams,
    }
}

wire_struct! {
    pub struct SetLinkStatusReq {
        1 => action: LinkActionType,
        2 => initiator_node_name: String,
        3 => responder_node_name: String,
    }
}
