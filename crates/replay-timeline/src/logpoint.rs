// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Logpoint analyses.
//!
//! A logpoint is a named group (`log_group_id`) of one or more remote
//! analyses. Each analysis is created with a mapper program, attached to
//! locations or event kinds, and run; the backend then pushes the points
//! it hits and the evaluated results, keyed by analysis id.
//!
//! Bookkeeping lives in a shared [`Registry`] so results can be routed from
//! the session's event loop while setup calls are still in flight:
//!
//! - An analysis is registered under its group *before* its creation
//!   request completes, so removal can always find and release it.
//! - Only the first analysis of a set operation may register the group.
//!   Later ones join it, and fail with [`TimelineError::LogpointRemoved`]
//!   once it is gone.
//! - Events for an analysis id whose creation has not answered yet are
//!   parked and replayed once the id is mapped.
//! - Events for a group that was removed are dropped.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use replay_client::{RequestScope, Transport};
use replay_protocol::methods::{
    names, AddEventHandlerEntryPointsParams, AddExceptionPointsParams, AddLocationParams,
    AddRandomPointsParams, AnalysisParams, CreateAnalysisParams, CreateAnalysisResult,
};
use replay_protocol::pause_data::{PauseData, PauseIndex, ProtocolValue, ResolvedValue};
use replay_protocol::{
    AnalysisEntry, AnalysisId, AnalysisPoint, AnalysisPointsEvent, AnalysisResultEvent,
    ExecutionPoint, Location, PauseId, SessionId,
};
use serde::Deserialize;
use tokio::sync::watch;
use tracing::{debug, instrument, trace, warn};

use crate::error::TimelineError;
use crate::mapper;

/// Identifier of a logpoint group.
pub type LogGroupId = String;

/// Analysis ids with parked events, at most.
const MAX_PARKED_ANALYSES: usize = 64;

/// One evaluated logpoint hit.
#[derive(Debug, Clone, PartialEq)]
pub struct LogpointMessage {
    /// Group the hit belongs to.
    pub log_group_id: LogGroupId,
    /// Hit point.
    pub point: ExecutionPoint,
    /// Wall-clock time in ms.
    pub time: f64,
    /// Pause the values can be inspected under.
    pub pause_id: Option<PauseId>,
    /// Top frame location.
    pub location: Option<Location>,
    /// Evaluated values.
    pub values: Vec<ResolvedValue>,
}

/// A hit whose values have not been evaluated yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PointLoading {
    /// Group the hit belongs to.
    pub log_group_id: LogGroupId,
    /// Hit point.
    pub point: ExecutionPoint,
    /// Wall-clock time in ms.
    pub time: f64,
    /// Frame location.
    pub location: Option<Location>,
}

/// Receiver of logpoint output. Calls are made from whichever task routes
/// the events; implementations should return quickly.
pub trait LogpointHandler: Send + Sync + 'static {
    /// An evaluated hit.
    fn on_result(&self, message: LogpointMessage);
    /// A hit is known but not evaluated yet.
    fn on_point_loading(&self, _loading: PointLoading) {}
    /// Every message of the group should be discarded.
    fn clear_logpoint(&self, _log_group_id: &str) {}
}

/// Mapper output decoded from an analysis result.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogpointValue {
    /// Wall-clock time in ms.
    pub time: f64,
    /// Pause id.
    #[serde(default)]
    pub pause_id: Option<PauseId>,
    /// Top frame location; the first entry is the generated location.
    #[serde(default)]
    pub location: Vec<Location>,
    /// Evaluated values.
    #[serde(default)]
    pub values: Vec<ProtocolValue>,
    /// Pause data the values refer to.
    #[serde(default)]
    pub data: PauseData,
    /// Framework listeners found on an event object.
    #[serde(default)]
    pub framework_listeners: Option<ProtocolValue>,
}

/// Script ids known for each URL.
#[derive(Debug, Clone, Default)]
pub struct ScriptUrls {
    scripts: HashMap<String, Vec<String>>,
}

impl ScriptUrls {
    /// Record that `script_id` was loaded from `url`.
    pub fn add(&mut self, url: impl Into<String>, script_id: impl Into<String>) {
        self.scripts.entry(url.into()).or_default().push(script_id.into());
    }

    /// Scripts loaded from `url`.
    pub fn scripts(&self, url: &str) -> &[String] {
        self.scripts.get(url).map_or(&[], Vec::as_slice)
    }
}

enum Parked {
    Points(Vec<AnalysisPoint>),
    Results(Vec<AnalysisEntry>),
}

struct LogpointInfo {
    analyses: Vec<watch::Receiver<Option<AnalysisId>>>,
    points: Vec<AnalysisPoint>,
    point_count: watch::Sender<usize>,
    conditional: bool,
}

impl LogpointInfo {
    fn new(conditional: bool) -> Self {
        Self {
            analyses: Vec::new(),
            points: Vec::new(),
            point_count: watch::Sender::new(0),
            conditional,
        }
    }
}

#[derive(Default)]
struct Registry {
    logpoints: HashMap<LogGroupId, LogpointInfo>,
    groups: HashMap<AnalysisId, LogGroupId>,
    parked: HashMap<AnalysisId, Vec<Parked>>,
    parked_order: VecDeque<AnalysisId>,
}

impl Registry {
    fn park(&mut self, analysis_id: &AnalysisId, batch: Parked) {
        if !self.parked.contains_key(analysis_id) {
            if self.parked_order.len() >= MAX_PARKED_ANALYSES {
                if let Some(evicted) = self.parked_order.pop_front() {
                    warn!(analysis_id = %evicted, "dropping events for unknown analysis");
                    self.parked.remove(&evicted);
                }
            }
            self.parked_order.push_back(analysis_id.clone());
        }
        self.parked.entry(analysis_id.clone()).or_default().push(batch);
    }

    fn unpark(&mut self, analysis_id: &AnalysisId) -> Vec<Parked> {
        self.parked_order.retain(|id| id != analysis_id);
        self.parked.remove(analysis_id).unwrap_or_default()
    }
}

enum Route {
    Group(LogGroupId),
    Parked,
    Removed,
}

/// How a new analysis attaches to its group.
#[derive(Debug, Clone, Copy)]
enum Join {
    /// Register the group if it is not known yet.
    Register { conditional: bool },
    /// The group must still be registered.
    Existing,
}

/// Logpoint pipeline for one session. Cheap to clone; clones share state.
pub struct AnalysisPipeline<T: Transport> {
    transport: T,
    session_id: SessionId,
    registry: Arc<Mutex<Registry>>,
    handler: Arc<dyn LogpointHandler>,
    random_groups: Arc<AtomicU64>,
}

impl<T: Transport> Clone for AnalysisPipeline<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            session_id: self.session_id.clone(),
            registry: Arc::clone(&self.registry),
            handler: Arc::clone(&self.handler),
            random_groups: Arc::clone(&self.random_groups),
        }
    }
}

impl<T: Transport> AnalysisPipeline<T> {
    /// Pipeline reporting to `handler`.
    pub fn new(transport: T, session_id: SessionId, handler: Arc<dyn LogpointHandler>) -> Self {
        Self {
            transport,
            session_id,
            registry: Arc::new(Mutex::new(Registry::default())),
            handler,
            random_groups: Arc::new(AtomicU64::new(0)),
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn scope(&self) -> RequestScope {
        RequestScope::session(&self.session_id)
    }

    /// Groups currently registered.
    pub fn log_group_ids(&self) -> Vec<LogGroupId> {
        self.registry().logpoints.keys().cloned().collect()
    }

    /// Points reported so far for a group.
    pub fn points(&self, log_group_id: &str) -> Vec<AnalysisPoint> {
        self.registry()
            .logpoints
            .get(log_group_id)
            .map(|info| info.points.clone())
            .unwrap_or_default()
    }

    /// Create one analysis under `log_group_id`, registering the group.
    ///
    /// The analysis is registered before the creation request is answered;
    /// if the group is removed meanwhile, the analysis is released as soon
    /// as its id is known.
    pub async fn create_analysis(
        &self,
        log_group_id: &str,
        mapper: String,
        conditional: bool,
    ) -> Result<AnalysisId, TimelineError> {
        self.create_in_group(log_group_id, mapper, Join::Register { conditional })
            .await
    }

    #[instrument(skip(self, mapper), fields(session = %self.session_id))]
    async fn create_in_group(
        &self,
        log_group_id: &str,
        mapper: String,
        join: Join,
    ) -> Result<AnalysisId, TimelineError> {
        let (id_tx, id_rx) = watch::channel(None);
        let slot = id_rx.clone();
        {
            let mut registry = self.registry();
            let info = match join {
                Join::Register { conditional } => Some(
                    registry
                        .logpoints
                        .entry(log_group_id.to_string())
                        .or_insert_with(|| LogpointInfo::new(conditional)),
                ),
                Join::Existing => registry.logpoints.get_mut(log_group_id),
            };
            let Some(info) = info else {
                debug!(log_group_id, "logpoint removed before analysis creation");
                return Err(TimelineError::LogpointRemoved(log_group_id.to_string()));
            };
            info.analyses.push(id_rx);
        }

        let created: Result<CreateAnalysisResult, _> = self
            .transport
            .call(
                names::CREATE_ANALYSIS,
                &CreateAnalysisParams {
                    mapper,
                    effectful: true,
                },
                RequestScope::none(),
            )
            .await;
        let analysis_id = match created {
            Ok(created) => created.analysis_id,
            Err(err) => {
                self.forget_slot(log_group_id, &slot, join);
                return Err(err.into());
            }
        };

        let parked = {
            let mut registry = self.registry();
            registry
                .groups
                .insert(analysis_id.clone(), log_group_id.to_string());
            registry.unpark(&analysis_id)
        };
        id_tx.send_replace(Some(analysis_id.clone()));
        debug!(%analysis_id, "analysis created");

        for batch in parked {
            match batch {
                Parked::Points(points) => self.route_points(&analysis_id, points),
                Parked::Results(results) => self.route_results(&analysis_id, results),
            }
        }
        Ok(analysis_id)
    }

    // A failed creation leaves nothing to release. A group registered for
    // it alone is dropped again.
    fn forget_slot(
        &self,
        log_group_id: &str,
        slot: &watch::Receiver<Option<AnalysisId>>,
        join: Join,
    ) {
        let mut registry = self.registry();
        let Some(info) = registry.logpoints.get_mut(log_group_id) else {
            return;
        };
        info.analyses.retain(|analysis| !analysis.same_channel(slot));
        if matches!(join, Join::Register { .. }) && info.analyses.is_empty() && info.points.is_empty() {
            registry.logpoints.remove(log_group_id);
        }
    }

    fn run(&self, analysis_id: &AnalysisId) {
        let params = AnalysisParams {
            analysis_id: analysis_id.clone(),
        };
        self.transport.post(names::RUN_ANALYSIS, &params, self.scope());
        self.transport
            .post(names::FIND_ANALYSIS_POINTS, &params, self.scope());
    }

    fn add_location(
        &self,
        analysis_id: &AnalysisId,
        location: Location,
        on_stack_frame: Option<ExecutionPoint>,
    ) {
        self.transport.post(
            names::ADD_LOCATION,
            &AddLocationParams {
                analysis_id: analysis_id.clone(),
                session_id: self.session_id.clone(),
                location,
                on_stack_frame,
            },
            self.scope(),
        );
    }

    /// Logpoint at a source location. With a condition, hits where it is
    /// falsy produce no message; their points are still reported.
    pub async fn set_logpoint(
        &self,
        log_group_id: &str,
        location: Location,
        text: &str,
        condition: Option<&str>,
    ) -> Result<AnalysisId, TimelineError> {
        let join = Join::Register {
            conditional: condition.is_some(),
        };
        self.location_analysis(log_group_id, location, text, condition, join)
            .await
    }

    async fn location_analysis(
        &self,
        log_group_id: &str,
        location: Location,
        text: &str,
        condition: Option<&str>,
        join: Join,
    ) -> Result<AnalysisId, TimelineError> {
        let analysis_id = self
            .create_in_group(log_group_id, mapper::logpoint(text, condition), join)
            .await?;
        self.add_location(&analysis_id, location, None);
        self.run(&analysis_id);
        Ok(analysis_id)
    }

    /// Logpoint at a line/column in every script loaded from `url`. Stops
    /// with [`TimelineError::LogpointRemoved`] when the logpoint is removed
    /// part way through.
    #[allow(clippy::too_many_arguments)]
    pub async fn set_logpoint_by_url(
        &self,
        log_group_id: &str,
        scripts: &ScriptUrls,
        url: &str,
        line: u32,
        column: u32,
        text: &str,
        condition: Option<&str>,
    ) -> Result<Vec<AnalysisId>, TimelineError> {
        let script_ids = scripts.scripts(url);
        if script_ids.is_empty() {
            return Err(TimelineError::UnknownUrl(url.to_string()));
        }
        let mut ids = Vec::with_capacity(script_ids.len());
        let mut join = Join::Register {
            conditional: condition.is_some(),
        };
        for script_id in script_ids {
            let location = Location {
                script_id: script_id.clone(),
                line,
                column,
            };
            ids.push(
                self.location_analysis(log_group_id, location, text, condition, join)
                    .await?,
            );
            join = Join::Existing;
        }
        Ok(ids)
    }

    /// Logpoint at the entry of handlers for the given DOM event types.
    pub async fn set_event_logpoint(
        &self,
        log_group_id: &str,
        event_types: &[String],
    ) -> Result<AnalysisId, TimelineError> {
        let analysis_id = self
            .create_analysis(log_group_id, mapper::event_logpoint(true), false)
            .await?;
        for event_type in event_types {
            self.transport.post(
                names::ADD_EVENT_HANDLER_ENTRY_POINTS,
                &AddEventHandlerEntryPointsParams {
                    analysis_id: analysis_id.clone(),
                    session_id: self.session_id.clone(),
                    event_type: event_type.clone(),
                },
                self.scope(),
            );
        }
        self.run(&analysis_id);
        Ok(analysis_id)
    }

    /// Logpoint at every thrown exception.
    pub async fn set_exception_logpoint(
        &self,
        log_group_id: &str,
    ) -> Result<AnalysisId, TimelineError> {
        let analysis_id = self
            .create_analysis(log_group_id, mapper::exception_logpoint(), false)
            .await?;
        self.transport.post(
            names::ADD_EXCEPTION_POINTS,
            &AddExceptionPointsParams {
                analysis_id: analysis_id.clone(),
                session_id: self.session_id.clone(),
            },
            self.scope(),
        );
        self.run(&analysis_id);
        Ok(analysis_id)
    }

    /// Sample `num_points` random points from the recording. Resolves once
    /// that many points have been reported.
    pub async fn set_random_logpoint(
        &self,
        num_points: u32,
    ) -> Result<Vec<ExecutionPoint>, TimelineError> {
        let n = self.random_groups.fetch_add(1, Ordering::Relaxed);
        let log_group_id = format!("random-{n}");
        let analysis_id = self
            .create_analysis(&log_group_id, mapper::random_points(), false)
            .await?;
        let mut count = self
            .registry()
            .logpoints
            .get(&log_group_id)
            .map(|info| info.point_count.subscribe())
            .ok_or_else(|| TimelineError::LogpointRemoved(log_group_id.clone()))?;
        self.transport.post(
            names::ADD_RANDOM_POINTS,
            &AddRandomPointsParams {
                analysis_id: analysis_id.clone(),
                session_id: self.session_id.clone(),
                num_points,
            },
            self.scope(),
        );
        self.run(&analysis_id);

        let wanted = usize::try_from(num_points).unwrap_or(usize::MAX);
        if count.wait_for(|n| *n >= wanted).await.is_err() {
            return Err(TimelineError::LogpointRemoved(log_group_id));
        }
        Ok(self
            .points(&log_group_id)
            .into_iter()
            .map(|p| p.point)
            .collect())
    }

    /// Remove a logpoint: clear its messages, forget it, and release every
    /// analysis it created (including ones still being created).
    pub fn remove_logpoint(&self, log_group_id: &str) {
        let Some(info) = self.registry().logpoints.remove(log_group_id) else {
            trace!(log_group_id, "logpoint not registered");
            return;
        };
        self.handler.clear_logpoint(log_group_id);
        for mut analysis in info.analyses {
            let transport = self.transport.clone();
            let scope = self.scope();
            tokio::spawn(async move {
                let analysis_id = match analysis.wait_for(Option::is_some).await {
                    Ok(id) => id.clone(),
                    Err(_) => None,
                };
                match analysis_id {
                    Some(analysis_id) => {
                        transport.post(
                            names::RELEASE_ANALYSIS,
                            &AnalysisParams { analysis_id },
                            scope,
                        );
                    }
                    None => debug!("analysis was never created"),
                }
            });
        }
    }

    fn route(&self, analysis_id: &AnalysisId, batch: impl FnOnce() -> Parked) -> Route {
        let mut registry = self.registry();
        match registry.groups.get(analysis_id).cloned() {
            Some(group) if registry.logpoints.contains_key(&group) => Route::Group(group),
            Some(_) => Route::Removed,
            None => {
                registry.park(analysis_id, batch());
                Route::Parked
            }
        }
    }

    /// Route an `analysisPoints` event.
    pub fn on_analysis_points(&self, event: AnalysisPointsEvent) {
        debug!(analysis_id = %event.analysis_id, count = event.points.len(), "AnalysisPoints");
        let AnalysisPointsEvent {
            analysis_id,
            points,
        } = event;
        self.route_points(&analysis_id, points);
    }

    fn route_points(&self, analysis_id: &AnalysisId, points: Vec<AnalysisPoint>) {
        let mut pending = Some(points);
        let group = match self.route(analysis_id, || {
            Parked::Points(pending.take().unwrap_or_default())
        }) {
            Route::Group(group) => group,
            Route::Parked | Route::Removed => return,
        };
        let points = pending.unwrap_or_default();

        let show_loading = {
            let mut registry = self.registry();
            let Some(info) = registry.logpoints.get_mut(&group) else {
                return;
            };
            info.points.extend(points.iter().cloned());
            let total = info.points.len();
            info.point_count.send_replace(total);
            !info.conditional
        };
        if show_loading {
            for point in points {
                self.handler.on_point_loading(PointLoading {
                    log_group_id: group.clone(),
                    location: point.frame.first().cloned(),
                    point: point.point,
                    time: point.time,
                });
            }
        }
    }

    /// Route an `analysisResult` event.
    pub fn on_analysis_result(&self, event: AnalysisResultEvent) {
        debug!(analysis_id = %event.analysis_id, count = event.results.len(), "AnalysisResults");
        let AnalysisResultEvent {
            analysis_id,
            results,
        } = event;
        self.route_results(&analysis_id, results);
    }

    fn route_results(&self, analysis_id: &AnalysisId, results: Vec<AnalysisEntry>) {
        let mut pending = Some(results);
        let group = match self.route(analysis_id, || {
            Parked::Results(pending.take().unwrap_or_default())
        }) {
            Route::Group(group) => group,
            Route::Parked => return,
            Route::Removed => {
                debug!(%analysis_id, "dropping results for removed logpoint");
                return;
            }
        };

        for entry in pending.unwrap_or_default() {
            let value: LogpointValue = match serde_json::from_value(entry.value) {
                Ok(value) => value,
                Err(err) => {
                    warn!(%analysis_id, ?err, "undecodable analysis result");
                    continue;
                }
            };
            let index = PauseIndex::collect([&value.data]);
            self.handler.on_result(LogpointMessage {
                log_group_id: group.clone(),
                point: entry.key.clone(),
                time: value.time,
                pause_id: value.pause_id.clone(),
                location: value.location.first().cloned(),
                values: value.values.iter().map(|v| index.resolve(v)).collect(),
            });

            if let Some(listeners) = &value.framework_listeners {
                let locations = framework_listener_locations(&index.resolve(listeners));
                if !locations.is_empty() {
                    let pipeline = self.clone();
                    let group = group.clone();
                    let point = entry.key;
                    tokio::spawn(async move {
                        if let Err(err) = pipeline
                            .add_framework_analysis(&group, point, locations)
                            .await
                        {
                            warn!(?err, log_group_id = %group, "framework listener analysis failed");
                        }
                    });
                }
            }
        }
    }

    /// Secondary analysis over framework listener functions, restricted to
    /// calls made while `point`'s frame is on the stack.
    async fn add_framework_analysis(
        &self,
        log_group_id: &str,
        point: ExecutionPoint,
        locations: Vec<Location>,
    ) -> Result<(), TimelineError> {
        let created = self
            .create_in_group(log_group_id, mapper::event_logpoint(false), Join::Existing)
            .await;
        let analysis_id = match created {
            Ok(analysis_id) => analysis_id,
            Err(TimelineError::LogpointRemoved(_)) => return Ok(()),
            Err(err) => return Err(err),
        };
        for location in locations {
            self.add_location(&analysis_id, location, Some(point.clone()));
        }
        self.run(&analysis_id);
        Ok(())
    }
}

/// Source locations of the function-valued properties of a resolved
/// framework-listener object.
pub fn framework_listener_locations(listeners: &ResolvedValue) -> Vec<Location> {
    let ResolvedValue::Object(object) = listeners else {
        return Vec::new();
    };
    object
        .properties
        .iter()
        .filter_map(|(_, value)| match value {
            ResolvedValue::Object(function) if function.is_function() => {
                function.function_location.first().cloned()
            }
            _ => None,
        })
        .collect()
}
