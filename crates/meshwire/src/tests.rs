use std::collections::BTreeMap;
use std::collections::BTreeSet;

use meshpack::WireStruct;

use crate::aggregator::*;
use crate::config::*;
use crate::ignition::*;
use crate::scan::*;
use crate::status::*;
use crate::topology::*;
use crate::upgrade::*;
use crate::*;
use crate::AggrMessageType as A;
use crate::CtrlMessageType as C;

fn node(name: &str) -> Node {
    Node {
        name: name.into(),
        node_type: NodeType::Dn,
        mac_addr: format!("00:00:00:00:00:{:02x}", name.len()),
        pop_node: name.ends_with('1'),
        status: NodeStatusType::OnlineInitiator,
        wlan_mac_addrs: vec!["aa:bb:cc:dd:ee:01".into()],
        site_name: "roof".into(),
        ant_azimuth: 12.5,
        ant_elevation: -1.0,
        polarity: Some(PolarityType::HybridOdd),
        golay_idx: None,
    }
}

fn topology() -> Topology {
    Topology {
        name: "net-a".into(),
        nodes: vec![node("n1"), node("n2")],
        links: vec![Link {
            name: Link::name_for("n2", "n1"),
            a_node_name: "n1".into(),
            z_node_name: "n2".into(),
            link_type: LinkType::Wireless,
            is_alive: true,
            linkup_attempts: 3,
            ..Link::default()
        }],
        sites: vec![Site {
            name: "roof".into(),
            location: Location { latitude: 37.48, longitude: -122.15, altitude: 30.0, accuracy: 1.0 },
        }],
    }
}

// ============================================================================
//  ENVELOPE
// ============================================================================

#[test]
fn test_envelope_layout_for_empty_request() -> Result<()> {
    let bytes = encode_message(CtrlMessageType::GetTopology.into(), &GetTopology {})?;
    // i32 field 1 = zigzag(301), binary field 2 = [STOP], STOP
    assert_eq!(bytes, vec![0x15, 0xDA, 0x04, 0x18, 0x01, 0x00, 0x00]);
    Ok(())
}

#[test]
fn test_double_framing_roundtrip() -> Result<()> {
    let value = topology();
    let bytes = encode_message(CtrlMessageType::Topology.into(), &value)?;

    let message = decode_message(&bytes)?;
    assert_eq!(
        message.message_type(Backend::Controller)?,
        MessageType::Ctrl(CtrlMessageType::Topology)
    );
    assert_eq!(message.value, meshpack::encode(&value)?);
    assert_eq!(message.payload::<Topology>()?, value);
    Ok(())
}

#[test]
fn test_nested_shapes_roundtrip() -> Result<()> {
    let mut reports = BTreeMap::new();
    reports.insert(
        "00:00:00:00:00:01".to_string(),
        StatusReport {
            time_stamp: 1_700_000_000,
            version: "RELEASE_M78".into(),
            status: NodeStatusType::Online,
            upgrade_status: UpgradeStatus {
                us_type: UpgradeStatusType::Flashed,
                next_image: ImageMeta { md5: "abc".into(), version: "M79".into() },
                ..UpgradeStatus::default()
            },
            ..StatusReport::default()
        },
    );
    let dump = StatusDump { time_stamp: 5, status_reports: reports, version: None };
    let back: StatusDump = decode_message(&encode_message(CtrlMessageType::StatusDump.into(), &dump)?)?.payload()?;
    assert_eq!(back, dump);

    let plan = UpgradeStateDump {
        cur_batch: vec!["n1".into()],
        pending_batches: vec![vec!["n2".into(), "n3".into()], vec![]],
        cur_req: UpgradeGroupReq {
            ug_type: UpgradeGroupType::Network,
            ur_req: UpgradeReq {
                ur_type: UpgradeReqType::CommitUpgrade,
                upgrade_req_id: "r1".into(),
                schedule_to_commit: Some(0),
                torrent_params: Some(UpgradeTorrentParams { download_timeout: 100, ..Default::default() }),
                ..UpgradeReq::default()
            },
            skip_failure: true,
            ..UpgradeGroupReq::default()
        },
        pending_reqs: vec![],
    };
    assert_eq!(meshpack::decode::<UpgradeStateDump>(&meshpack::encode(&plan)?)?, plan);

    let ignition = IgnitionState {
        ig_params: IgnitionParams {
            enable: Some(false),
            link_auto_ignite: Some([("link-n1-n2".to_string(), false)].into_iter().collect()),
            ..IgnitionParams::default()
        },
        ..IgnitionState::default()
    };
    assert_eq!(meshpack::decode::<IgnitionState>(&meshpack::encode(&ignition)?)?, ignition);
    Ok(())
}

#[test]
fn test_truncated_envelope_is_an_error() -> Result<()> {
    let bytes = encode_message(CtrlMessageType::Topology.into(), &topology())?;
    assert!(matches!(decode_message(&bytes[..bytes.len() / 2]), Err(WireError::Codec(_))));

    // outer envelope intact, inner payload cut short
    let mut message = decode_message(&bytes)?;
    message.value.truncate(message.value.len() - 1);
    assert!(matches!(message.payload::<Topology>(), Err(WireError::Codec(_))));
    Ok(())
}

// ============================================================================
//  ROUND TRIP TABLE
// ============================================================================

/// Runs each value through the envelope and records its type.
#[derive(Default)]
struct Table {
    seen: Vec<MessageType>,
}

impl Table {
    fn check<T>(&mut self, m_type: impl Into<MessageType>, value: T) -> Result<()>
    where
        T: WireStruct + PartialEq + std::fmt::Debug,
    {
        let m_type = m_type.into();
        let message = decode_message(&encode_message(m_type, &value)?)?;
        assert_eq!(message.m_type, m_type.as_i32());
        assert_eq!(message.payload::<T>()?, value, "{}", m_type);
        self.seen.push(m_type);
        Ok(())
    }
}

fn upgrade_group(ug_type: UpgradeGroupType) -> UpgradeGroupReq {
    UpgradeGroupReq {
        ug_type,
        nodes: vec!["n1".into(), "n2".into()],
        exclude_nodes: vec!["n3".into()],
        ur_req: UpgradeReq {
            ur_type: UpgradeReqType::PrepareUpgrade,
            upgrade_req_id: "req-7".into(),
            md5: "d41d8cd98f00b204e9800998ecf8427e".into(),
            image_url: "http://images/m80.bin".into(),
            schedule_to_commit: None,
            download_attempts: Some(i64::MAX),
            torrent_params: Some(UpgradeTorrentParams {
                download_timeout: 180,
                download_limit: Some(-1),
                upload_limit: None,
                max_connections: Some(i64::MIN),
            }),
        },
        timeout: 600,
        skip_failure: true,
        version: "RELEASE_M80".into(),
        skip_links: vec![Link::name_for("n1", "n2")],
        limit: -1,
        retry_limit: 3,
    }
}

#[test]
fn test_every_response_type_roundtrips() -> Result<()> {
    let mut table = Table::default();

    let mut reports = BTreeMap::new();
    reports.insert(
        "00:00:00:00:00:02".to_string(),
        StatusReport {
            time_stamp: i64::MAX,
            ipv6_address: "2001:db8::2".into(),
            version: "RELEASE_M78".into(),
            uboot_version: "2017.01".into(),
            status: NodeStatusType::Offline,
            upgrade_status: UpgradeStatus {
                us_type: UpgradeStatusType::CommitFailed,
                next_image: ImageMeta { md5: "beef".into(), version: "M79".into() },
                reason: "ü is not ascii".into(),
                upgrade_req_id: "req-1".into(),
                when_to_commit: i64::MIN,
            },
            config_md5: "".into(),
            hardware_model: "NXP".into(),
        },
    );
    reports.insert("00:00:00:00:00:03".to_string(), StatusReport::default());
    table.check(C::StatusDump, StatusDump { time_stamp: 0, status_reports: reports, version: Some("v".into()) })?;

    table.check(
        C::IgnitionState,
        IgnitionState {
            visited_node_names: vec!["n1".into(), "".into()],
            ig_candidates: vec![IgnitionCandidate {
                initiator_node_name: "n1".into(),
                link_name: Link::name_for("n1", "n2"),
            }],
            last_ig_candidates: vec![],
            ig_params: IgnitionParams {
                enable: Some(true),
                link_up_interval: Some(i64::MAX),
                link_up_dampen_interval: None,
                link_auto_ignite: Some(BTreeMap::new()),
            },
        },
    )?;

    let mut extreme = node("n9");
    extreme.ant_azimuth = f64::MAX;
    extreme.ant_elevation = f64::MIN_POSITIVE;
    extreme.polarity = None;
    extreme.golay_idx = Some(GolayIdx { tx_golay_idx: i64::MIN, rx_golay_idx: 0 });
    let mut topo = topology();
    topo.nodes.push(extreme);
    topo.links[0].is_backup_cn_link = Some(false);
    table.check(C::Topology, topo)?;

    let mut responses = BTreeMap::new();
    responses.insert(
        "n2".to_string(),
        ScanResp { token: i32::MIN, cur_superframe_num: i64::MAX, status: -1, tx_pwr_index: Some(i16::MIN) },
    );
    responses.insert("n3".to_string(), ScanResp { tx_pwr_index: None, ..ScanResp::default() });
    let mut scans = BTreeMap::new();
    scans.insert(
        i32::MAX,
        ScanData { tx_node: "n1".into(), start_bwgd_idx: 1 << 40, scan_type: 2, responses },
    );
    scans.insert(0, ScanData::default());
    table.check(C::ScanStatus, ScanStatus { scans })?;

    table.check(
        C::UpgradeStateDump,
        UpgradeStateDump {
            cur_batch: vec![],
            pending_batches: vec![vec![], vec!["n4".into()]],
            cur_req: upgrade_group(UpgradeGroupType::Nodes),
            pending_reqs: vec![upgrade_group(UpgradeGroupType::Network), UpgradeGroupReq::default()],
        },
    )?;

    table.check(
        C::UpgradeCommitPlan,
        UpgradeCommitPlan {
            commit_batches: vec![
                ["n2", "n1"].into_iter().map(String::from).collect::<BTreeSet<_>>(),
                BTreeSet::new(),
            ],
            canary_links: vec![Link::name_for("n2", "n1")],
        },
    )?;

    table.check(
        C::UpgradeListImagesResp,
        UpgradeListImagesResp {
            images: vec![
                UpgradeImage {
                    name: "m80".into(),
                    magnet_uri: "magnet:?xt=urn:btih:00".into(),
                    md5: "00ff".into(),
                    http_uri: Some("http://images/m80.bin".into()),
                },
                UpgradeImage { http_uri: None, ..UpgradeImage::default() },
            ],
        },
    )?;

    let json = r#"{"radioParamsBase":{"fwParams":{"txPower":28}}}"#.to_string();
    table.check(C::GetCtrlConfigResp, GetCtrlConfigResp { config: json.clone() })?;
    table.check(C::GetCtrlConfigBaseResp, GetCtrlConfigBaseResp { config: "{}".into() })?;
    table.check(C::GetCtrlConfigNetworkOverridesResp, GetCtrlConfigNetworkOverridesResp { overrides: json })?;
    table.check(C::GetCtrlConfigNodeOverridesResp, GetCtrlConfigNodeOverridesResp { overrides: "".into() })?;
    table.check(C::E2eAck, E2EAck { success: true, message: "x".repeat(300) })?;

    let mut aggr_reports = BTreeMap::new();
    aggr_reports.insert(
        "00:00:00:00:00:01".to_string(),
        AggrNodeReport { time_stamp: -1, ipv6_address: "::1".into(), version: "A1".into() },
    );
    table.check(A::StatusReport, AggrStatusReport { status_reports: aggr_reports, version: None })?;
    table.check(A::AggrAck, AggrAck { success: false, message: "busy".into() })?;

    assert_eq!(table.seen.len(), 14);
    Ok(())
}

#[test]
fn test_every_request_type_roundtrips() -> Result<()> {
    let mut table = Table::default();

    table.check(C::GetStatusDump, GetStatusDump {})?;
    table.check(
        C::RebootRequest,
        RebootReq { nodes: vec!["n1".into(), "n2".into()], force: true, seconds_to_reboot: i32::MAX },
    )?;
    table.check(C::GetIgnitionState, GetIgnitionState {})?;
    table.check(
        C::SetIgnitionParams,
        IgnitionParams {
            enable: Some(false),
            link_up_interval: None,
            link_up_dampen_interval: Some(0),
            link_auto_ignite: Some([("link-n1-n2".to_string(), true)].into_iter().collect()),
        },
    )?;
    table.check(
        C::SetLinkStatusReq,
        SetLinkStatusReq {
            action: LinkActionType::LinkDown,
            initiator_node_name: "n1".into(),
            responder_node_name: "n2".into(),
        },
    )?;

    table.check(C::GetTopology, GetTopology {})?;
    table.check(
        C::SetNodeMac,
        SetNodeMac { node_name: "n1".into(), node_mac: "aa:bb:cc:dd:ee:ff".into(), force: true },
    )?;
    table.check(
        C::SetNodeMacList,
        SetNodeMacList {
            set_node_mac_list: vec![
                SetNodeMac { node_name: "n1".into(), node_mac: "aa:bb:cc:dd:ee:01".into(), force: false },
                SetNodeMac::default(),
            ],
        },
    )?;
    table.check(C::AddNode, AddNode { node: node("n7") })?;
    table.check(C::DelNode, DelNode { node_name: "n7".into(), force: false })?;
    table.check(C::EditNode, EditNode { node_name: "n7".into(), new_node: node("n8") })?;
    table.check(
        C::AddLink,
        AddLink {
            link: Link {
                name: Link::name_for("n2", "n1"),
                a_node_name: "n1".into(),
                z_node_name: "n2".into(),
                link_type: LinkType::Ethernet,
                is_backup_cn_link: Some(true),
                ..Link::default()
            },
        },
    )?;
    table.check(C::DelLink, DelLink { a_node_name: "n1".into(), z_node_name: "n2".into(), force: true })?;
    table.check(
        C::AddSite,
        AddSite {
            site: Site {
                name: "pole".into(),
                location: Location { latitude: -90.0, longitude: 180.0, altitude: f64::MIN, accuracy: 0.0 },
            },
        },
    )?;
    table.check(C::DelSite, DelSite { site_name: "pole".into() })?;
    table.check(C::EditSite, EditSite { site_name: "pole".into(), new_site: Site::default() })?;

    table.check(C::GetScanStatus, GetScanStatus { is_concise: true, token_from: Some(i32::MIN), token_to: None })?;
    table.check(C::ResetScanStatus, ResetScanStatus { token_from: Some(5), token_to: Some(i32::MAX) })?;

    table.check(C::UpgradeGroupReq, upgrade_group(UpgradeGroupType::Network))?;
    table.check(C::UpgradeStateReq, UpgradeStateReq {})?;
    table.check(C::UpgradeAbortReq, UpgradeAbortReq { abort_all: false, req_ids: vec!["req-7".into()] })?;
    table.check(C::UpgradeCommitPlanReq, UpgradeCommitPlanReq { limit: i64::MIN, exclude_nodes: vec!["n1".into()] })?;
    table.check(C::UpgradeAddImageReq, UpgradeAddImageReq { image_url: "http://images/m80.bin".into() })?;
    table.check(C::UpgradeDelImageReq, UpgradeDelImageReq { name: "m80".into() })?;
    table.check(C::UpgradeListImagesReq, UpgradeListImagesReq {})?;

    table.check(C::GetCtrlConfigReq, GetCtrlConfigReq { sw_version: "RELEASE_M80".into() })?;
    table.check(C::GetCtrlConfigBaseReq, GetCtrlConfigBaseReq { sw_versions: vec!["M79".into(), "M80".into()] })?;
    table.check(C::GetCtrlConfigNetworkOverridesReq, GetCtrlConfigNetworkOverridesReq {})?;
    table.check(
        C::SetCtrlConfigNetworkOverridesReq,
        SetCtrlConfigNetworkOverridesReq { overrides: r#"{"sysParams":{}}"#.into() },
    )?;
    table.check(C::GetCtrlConfigNodeOverridesReq, GetCtrlConfigNodeOverridesReq { nodes: vec![] })?;
    table.check(
        C::SetCtrlConfigNodeOverridesReq,
        SetCtrlConfigNodeOverridesReq { overrides: r#"{"n1":{"envParams":{}}}"#.into() },
    )?;

    table.check(A::GetStatusReport, AggrGetStatusReport {})?;
    table.check(
        A::StartIperf,
        StartIperf {
            src_node_id: "n1".into(),
            dst_node_id: "n2".into(),
            options: Some(IperfOptions {
                bitrate: Some(i64::MAX),
                time_sec: Some(0),
                protocol: Some(IperfTransportProtocol::Udp),
            }),
        },
    )?;
    table.check(A::StopIperf, StopIperf { id: "session-1".into() })?;

    // every type not yet seen is a response, covered above
    let responses = [
        MessageType::from(C::StatusDump),
        C::IgnitionState.into(),
        C::Topology.into(),
        C::ScanStatus.into(),
        C::UpgradeStateDump.into(),
        C::UpgradeCommitPlan.into(),
        C::UpgradeListImagesResp.into(),
        C::GetCtrlConfigResp.into(),
        C::GetCtrlConfigBaseResp.into(),
        C::GetCtrlConfigNetworkOverridesResp.into(),
        C::GetCtrlConfigNodeOverridesResp.into(),
        C::E2eAck.into(),
        A::StatusReport.into(),
        A::AggrAck.into(),
    ];
    for t in MessageType::all() {
        assert!(table.seen.contains(&t) || responses.contains(&t), "{} has no round trip", t);
    }
    Ok(())
}

#[test]
fn test_absent_options_stay_absent() -> Result<()> {
    let mut table = Table::default();
    let bare = StartIperf { src_node_id: "n1".into(), dst_node_id: "n2".into(), options: None };
    table.check(A::StartIperf, bare.clone())?;
    table.check(
        A::StartIperf,
        StartIperf { options: Some(IperfOptions::default()), ..bare.clone() },
    )?;

    // an empty options struct still occupies its field
    let with_empty = meshpack::encode(&StartIperf { options: Some(IperfOptions::default()), ..bare.clone() })?;
    assert_eq!(with_empty.len(), meshpack::encode(&bare)?.len() + 2);
    Ok(())
}

// ============================================================================
//  MESSAGE TYPES
// ============================================================================

#[test]
fn test_namespaces_are_independent() {
    // same number, different meaning per backend
    assert_eq!(
        Backend::Controller.message_type(101),
        Ok(MessageType::Ctrl(CtrlMessageType::GetStatusDump))
    );
    assert_eq!(
        Backend::Aggregator.message_type(101),
        Ok(MessageType::Aggr(AggrMessageType::GetStatusReport))
    );
    assert_eq!(
        Backend::Aggregator.message_type(301),
        Err(WireError::UnknownMessageType { backend: Backend::Aggregator, value: 301 })
    );
}

#[test]
fn test_message_type_values_are_unique() {
    for backend in Backend::ALL {
        let values: Vec<i32> = MessageType::all()
            .filter(|t| t.backend() == backend)
            .map(MessageType::as_i32)
            .collect();
        let mut sorted = values.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), values.len(), "duplicate value in {}", backend);
    }
}

#[test]
fn test_message_type_display() {
    assert_eq!(MessageType::from(CtrlMessageType::E2eAck).to_string(), "controller::E2eAck");
    assert_eq!(MessageType::from(AggrMessageType::StartIperf).to_string(), "aggregator::StartIperf");
}

// ============================================================================
//  SCHEMA HELPERS
// ============================================================================

#[test]
fn test_link_name_is_order_independent() {
    assert_eq!(Link::name_for("b", "a"), "link-a-b");
    assert_eq!(Link::name_for("a", "b"), "link-a-b");
}

#[test]
fn test_scan_token_range() {
    assert_eq!(ScanStatus::default().token_range(), None);

    let scans = [12, 5, 9].into_iter().map(|t| (t, ScanData::default())).collect();
    assert_eq!(ScanStatus { scans }.token_range(), Some((5, 12)));
}

#[test]
fn test_json_shape() -> std::result::Result<(), serde_json::Error> {
    let ack = E2EAck { success: false, message: "conflict".into() };
    assert_eq!(serde_json::to_string(&ack)?, r#"{"success":false,"message":"conflict"}"#);

    let iperf: StartIperf = serde_json::from_str(r#"{"src_node_id":"a","options":{"protocol":"UDP"}}"#)?;
    assert_eq!(iperf.dst_node_id, "");
    assert_eq!(iperf.options.and_then(|o| o.protocol), Some(IperfTransportProtocol::Udp));
    Ok(())
}
