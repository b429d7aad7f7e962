//! # Poll Orchestrator
//!
//! Fans the periodic status reads out over every managed network. All requests
//! of one poll run concurrently and each result is published the moment it
//! lands, so one slow controller never holds back another network's updates.
//!
//! Polls are driven from outside, one call per instruction. There is no timer
//! in here.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use meshwire::AggrMessageType as A;
use meshwire::Backend;
use meshwire::CtrlMessageType as C;
use meshwire::WireError;
use meshwire::aggregator::AggrGetStatusReport;
use meshwire::ignition::GetIgnitionState;
use meshwire::scan::GetScanStatus;
use meshwire::scan::ResetScanStatus;
use meshwire::status::GetStatusDump;
use meshwire::topology::GetTopology;
use meshwire::upgrade::UpgradeStateReq;
use serde::Serialize;
use serde::ser::SerializeMap;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::warn;

use crate::dispatcher::Dispatcher;
use crate::dispatcher::Request;
use crate::dispatcher::RequestEvent;
use crate::endpoint::ManagedNetwork;
use crate::registry::Response;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollKind {
    TopologyUpdate,
    StatusDumpUpdate,
    IgnitionState,
    UpgradeState,
    ScanStatus,
    StatusReport,
}

impl PollKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PollKind::TopologyUpdate => "topology_update",
            PollKind::StatusDumpUpdate => "status_dump_update",
            PollKind::IgnitionState => "ignition_state",
            PollKind::UpgradeState => "upgrade_state",
            PollKind::ScanStatus => "scan_status",
            PollKind::StatusReport => "status_report",
        }
    }

    /// Key the payload is published under.
    pub fn payload_key(self) -> &'static str {
        match self {
            PollKind::TopologyUpdate => "topology",
            PollKind::StatusDumpUpdate => "status_dump",
            PollKind::IgnitionState => "ignition_state",
            PollKind::UpgradeState => "upgrade_state",
            PollKind::ScanStatus => "scan_status",
            PollKind::StatusReport => "status_report",
        }
    }

    pub fn backend(self) -> Backend {
        match self {
            PollKind::StatusReport => Backend::Aggregator,
            _ => Backend::Controller,
        }
    }

    fn request(self, scan_concise: bool) -> Result<Request, WireError> {
        match self {
            PollKind::TopologyUpdate => Request::new(C::GetTopology, &GetTopology {}),
            PollKind::StatusDumpUpdate => Request::new(C::GetStatusDump, &GetStatusDump {}),
            PollKind::IgnitionState => Request::new(C::GetIgnitionState, &GetIgnitionState {}),
            PollKind::UpgradeState => Request::new(C::UpgradeStateReq, &UpgradeStateReq {}),
            PollKind::ScanStatus => Request::new(
                C::GetScanStatus,
                &GetScanStatus { is_concise: scan_concise, ..GetScanStatus::default() },
            ),
            PollKind::StatusReport => Request::new(A::GetStatusReport, &AggrGetStatusReport {}),
        }
    }
}

/// One poll result for one network.
#[derive(Debug, Clone, PartialEq)]
pub struct PollUpdate {
    pub name: String,
    pub kind: PollKind,
    pub success: bool,
    pub response_time: u64,
    pub payload: Option<Response>,
    pub error: Option<String>,
}

impl PollUpdate {
    fn from_event(network: &ManagedNetwork, kind: PollKind, event: RequestEvent) -> Self {
        let (payload, error) = match event.outcome {
            Ok(response) => (Some(response), None),
            Err(failure) => (None, Some(failure.reason)),
        };
        Self {
            name: network.name.clone(),
            kind,
            success: event.success,
            response_time: event.elapsed_ms,
            payload,
            error,
        }
    }

    fn failed(network: &ManagedNetwork, kind: PollKind, reason: String) -> Self {
        Self {
            name: network.name.clone(),
            kind,
            success: false,
            response_time: 0,
            payload: None,
            error: Some(reason),
        }
    }
}

/// `{"name", "type", "success", "response_time", <payload key>}`, plus
/// `"error"` on failure. The payload key is present either way, `null` when
/// the request failed.
impl Serialize for PollUpdate {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("type", self.kind.as_str())?;
        map.serialize_entry("success", &self.success)?;
        map.serialize_entry("response_time", &self.response_time)?;
        map.serialize_entry(self.kind.payload_key(), &self.payload)?;
        if let Some(error) = &self.error {
            map.serialize_entry("error", error)?;
        }
        map.end()
    }
}

/// Where poll results go.
pub trait UpdateSink: Send + Sync {
    fn publish(&self, update: PollUpdate);
}

impl<T> UpdateSink for mpsc::UnboundedSender<T>
where
    T: From<PollUpdate> + Send,
{
    fn publish(&self, update: PollUpdate) {
        if self.send(T::from(update)).is_err() {
            debug!("update sink closed, dropping poll result");
        }
    }
}

pub struct Poller {
    dispatcher: Arc<Dispatcher>,
}

impl Poller {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Kinds read on every regular poll.
    pub fn kinds(&self) -> Vec<PollKind> {
        let mut kinds = vec![
            PollKind::TopologyUpdate,
            PollKind::StatusDumpUpdate,
            PollKind::IgnitionState,
            PollKind::UpgradeState,
        ];
        if self.dispatcher.config().poll.aggregator_status_report {
            kinds.push(PollKind::StatusReport);
        }
        kinds
    }

    /// Reads every poll kind from every network, publishing as results land.
    pub async fn poll(&self, networks: &[ManagedNetwork], sink: &dyn UpdateSink) {
        let kinds = self.kinds();
        let mut pending = FuturesUnordered::new();
        for network in networks {
            for &kind in &kinds {
                pending.push(self.poll_one(network, kind));
            }
        }

        while let Some(update) = pending.next().await {
            sink.publish(update);
        }
    }

    /// Reads scan results from every network, clearing what was read.
    pub async fn scan_poll(&self, networks: &[ManagedNetwork], sink: &dyn UpdateSink) {
        let mut pending: FuturesUnordered<_> = networks.iter().map(|network| self.scan_one(network)).collect();
        while let Some(update) = pending.next().await {
            sink.publish(update);
        }
    }

    async fn poll_one(&self, network: &ManagedNetwork, kind: PollKind) -> PollUpdate {
        let request = match kind.request(self.dispatcher.config().poll.scan_concise) {
            Ok(request) => request,
            Err(e) => return PollUpdate::failed(network, kind, e.to_string()),
        };
        let endpoint = self.dispatcher.endpoint(network, kind.backend());
        let event = self.dispatcher.send_request(endpoint, request).await;
        debug!(
            network = %network.name,
            msg_type = %event.message_type,
            elapsed_ms = event.elapsed_ms,
            success = event.success,
            "poll result"
        );
        PollUpdate::from_event(network, kind, event)
    }

    /// Read, then reset the read token range, then publish. The reset is awaited
    /// so the next scan poll never sees the same results twice.
    async fn scan_one(&self, network: &ManagedNetwork) -> PollUpdate {
        let kind = PollKind::ScanStatus;
        let endpoint = self.dispatcher.endpoint(network, kind.backend());
        let request = match kind.request(self.dispatcher.config().poll.scan_concise) {
            Ok(request) => request,
            Err(e) => return PollUpdate::failed(network, kind, e.to_string()),
        };

        let event = self.dispatcher.send_request(endpoint, request).await;
        let range = match &event.outcome {
            Ok(Response::ScanStatus(status)) => status.token_range(),
            _ => None,
        };

        if let Some((token_from, token_to)) = range {
            let reset = ResetScanStatus { token_from: Some(token_from), token_to: Some(token_to) };
            match Request::new(C::ResetScanStatus, &reset) {
                Ok(request) => {
                    let done = self.dispatcher.send_request(endpoint, request).await;
                    if let Err(failure) = &done.outcome {
                        warn!(
                            network = %network.name,
                            token_from,
                            token_to,
                            reason = %failure.reason,
                            "scan reset failed"
                        );
                    }
                }
                Err(e) => warn!(network = %network.name, error = %e, "scan reset not encodable"),
            }
        }

        PollUpdate::from_event(network, kind, event)
    }
}
