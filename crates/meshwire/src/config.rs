//! Controller-managed node configuration. Configs travel as JSON text.

use meshpack::wire_struct;

wire_struct! {
    pub struct GetCtrlConfigReq {
        1 => sw_version: String,
    }
}

wire_struct! {
    pub struct GetCtrlConfigResp {
        1 => config: String,
    }
}

wire_struct! {
    pub struct GetCtrlConfigBaseReq {
        1 => sw_versions: Vec<String>,
    }
}

wire_struct! {
    pub struct GetCtrlConfigBaseResp {
        1 => config: String,
    }
}

wire_struct! {
    pub struct GetCtrlConfigNetworkOverridesReq {}
}

wire_struct! {
    pub struct GetCtrlConfigNetworkOverridesResp {
        1 => overrides: String,
    }
}

wire_struct! {
    pub struct SetCtrlConfigNetworkOverridesReq {
        1 => overrides: String,
    }
}

wire_struct! {
    pub struct GetCtrlConfigNodeOverridesReq {
        1 => nodes: Vec<String>,
    }
}

wire_struct! {
    pub struct GetCtrlConfigNodeOverridesResp {
        1 => overrides: String,
    }
}

wire_struct! {
    pub struct SetCtrlConfigNodeOverridesReq {
        1 => overrides: String,
    }
}
