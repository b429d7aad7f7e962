//! Beam scan results held by the controller until they are reset.

use std::collections::BTreeMap;

use meshpack::wire_struct;

wire_struct! {
    pub struct ScanResp {
        1 => token: i32,
        2 => cur_superframe_num: i64,
        3 => status: i32,
        4 => tx_pwr_index: Option<i16>,
    }
}

wire_struct! {
    pub struct ScanData {
        1 => tx_node: String,
        2 => start_bwgd_idx: i64,
        3 => scan_type: i32,
        4 => responses: BTreeMap<String, ScanResp>,
    }
}

wire_struct! {
    pub struct GetScanStatus {
        1 => is_concise: bool,
        2 => token_from: Option<i32>,
        3 => token_to: Option<i32>,
    }
}

wire_struct! {
    /// Scans keyed by token.
    pub struct ScanStatus {
        1 => scans: BTreeMap<i32, ScanData>,
    }
}

impl ScanStatus {
    /// Lowest and highest token present, if any.
    pub fn token_range(&self) -> Option<(i32, i32)> {
        let first = *self.scans.keys().next()?;
        let last = *self.scans.keys().next_back()?;
        Some((first, last))
    }
}

wire_struct! {
    pub struct ResetScanStatus {
        1 => token_from: Option<i32>,
        2 => token_to: Option<i32>,
    }
}
