use serde::{Serialize, Serializer};
use std::collections::HashMap;

use crate::deep_link::DeepLink;
use crate::error::{NodeIssue, SessionError};
use crate::fetcher::{WeatherCache, WeatherFetcher};
use crate::geocoder::{GeoCache, Geocoder};
use crate::models::{
    CityInput, CityTarget, Coordinates, GeoResult, HorizonDays, Slot, SlotPatch, WeatherParameter,
    WeatherQuery,
};
use crate::registry::SlotRegistry;
use crate::render::{render_route, render_series, Chart, RouteMap};
use crate::upstream::{GeocodeLookup, WeatherLookup};

/// A derived output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    Chart(CityTarget),
    RouteMap,
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chart(target) => write!(f, "chart({})", target),
            Self::RouteMap => write!(f, "route map"),
        }
    }
}

/// An input a node can depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputKey {
    Query(CityTarget),
    Parameter(CityTarget),
    Horizon(CityTarget),
    SlotCount,
}

impl NodeId {
    fn depends_on(self, input: InputKey) -> bool {
        match (self, input) {
            (
                Self::Chart(node),
                InputKey::Query(target) | InputKey::Parameter(target) | InputKey::Horizon(target),
            ) => node == target,
            (Self::Chart(_), InputKey::SlotCount) => false,
            (Self::RouteMap, InputKey::Query(_) | InputKey::SlotCount) => true,
            (Self::RouteMap, InputKey::Parameter(_) | InputKey::Horizon(_)) => false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Event {
    DeepLink(DeepLink),
    SetCity {
        target: CityTarget,
        name: String,
    },
    SetParameter {
        target: CityTarget,
        parameter: WeatherParameter,
    },
    SetHorizon {
        target: CityTarget,
        days: HorizonDays,
    },
    AddSlot,
    /// Per-slot control values as reported by a front end that may not have
    /// caught up with the registry yet
    SlotControls {
        parameters: Vec<WeatherParameter>,
        horizons: Vec<HorizonDays>,
    },
}

fn serialize_issue<S: Serializer>(issue: &Option<NodeIssue>, s: S) -> Result<S::Ok, S::Error> {
    match issue {
        Some(issue) => s.serialize_some(&issue.to_string()),
        None => s.serialize_none(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartNode {
    pub chart: Chart,
    pub location: Option<Coordinates>,
    #[serde(serialize_with = "serialize_issue")]
    pub issue: Option<NodeIssue>,
}

impl ChartNode {
    fn blank(issue: NodeIssue) -> Self {
        Self {
            chart: Chart::empty(),
            location: None,
            issue: Some(issue),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStop {
    pub city: String,
    pub name: String,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedStop {
    pub city: String,
    pub name: String,
    #[serde(serialize_with = "serialize_issue")]
    pub issue: Option<NodeIssue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RouteNode {
    pub map: RouteMap,
    pub stops: Vec<RouteStop>,
    /// Named cities that could not be placed on the map
    pub skipped: Vec<SkippedStop>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CityView {
    #[serde(flatten)]
    pub input: CityInput,
    pub output: ChartNode,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotView {
    #[serde(flatten)]
    pub slot: Slot,
    pub output: ChartNode,
}

/// Everything currently published by a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub start: CityView,
    pub end: CityView,
    pub intermediates: Vec<SlotView>,
    pub route: RouteNode,
}

/// Reactive session state
///
/// Every published output is a node with a fixed set of declared inputs. An
/// event changes some inputs and exactly the nodes that depend on one of them
/// are recomputed, in route order. Outputs are never memoized: a recomputation
/// re-derives the chart or map from the cached geocode and weather lookups.
#[derive(Debug)]
pub struct Orchestrator<G, W> {
    geocoder: Geocoder<G>,
    fetcher: WeatherFetcher<W>,
    start: CityInput,
    end: CityInput,
    registry: SlotRegistry,
    start_chart: ChartNode,
    end_chart: ChartNode,
    slot_charts: Vec<ChartNode>,
    route: RouteNode,
    recompute_counts: HashMap<NodeId, u64>,
    deep_link_applied: bool,
    /// Set by the first accepted edit; deep links are refused afterwards
    edited: bool,
}

impl<G: GeocodeLookup, W: WeatherLookup> Orchestrator<G, W> {
    /// Creates an empty session with its own caches
    pub fn new(geocode_lookup: G, weather_lookup: W) -> Self {
        Self {
            geocoder: Geocoder::new(geocode_lookup, GeoCache::new()),
            fetcher: WeatherFetcher::new(weather_lookup, WeatherCache::new()),
            start: CityInput::default(),
            end: CityInput::default(),
            registry: SlotRegistry::new(),
            start_chart: ChartNode::default(),
            end_chart: ChartNode::default(),
            slot_charts: Vec::new(),
            route: RouteNode::default(),
            recompute_counts: HashMap::new(),
            deep_link_applied: false,
            edited: false,
        }
    }

    /// Applies one event and recomputes the nodes that depend on what it
    /// changed, returning those nodes in evaluation order
    ///
    /// A rejected event leaves the session untouched.
    pub async fn apply(&mut self, event: Event) -> Result<Vec<NodeId>, SessionError> {
        let is_deep_link = matches!(event, Event::DeepLink(_));
        let changed = self.mutate(event)?;
        if !is_deep_link {
            self.edited = true;
        }
        self.geocoder.begin_event();
        let affected = self.affected_nodes(&changed);

        for node in &affected {
            self.recompute(*node).await;
        }

        tracing::debug!(
            "Recomputed {} node(s): {:?}",
            affected.len(),
            affected
        );
        Ok(affected)
    }

    fn mutate(&mut self, event: Event) -> Result<Vec<InputKey>, SessionError> {
        match event {
            Event::DeepLink(link) => {
                if self.deep_link_applied {
                    return Err(SessionError::DeepLinkAlreadyApplied);
                }
                if self.edited {
                    return Err(SessionError::SessionAlreadyStarted);
                }
                tracing::info!(
                    "Seeding session from deep link: {:?} -> {:?}",
                    link.start_city,
                    link.end_city
                );
                let days = link.days.unwrap_or_default();
                self.start.query = link.start_city;
                self.start.horizon_days = days;
                self.end.query = link.end_city;
                self.end.horizon_days = days;
                self.deep_link_applied = true;
                Ok(vec![
                    InputKey::Query(CityTarget::Start),
                    InputKey::Horizon(CityTarget::Start),
                    InputKey::Query(CityTarget::End),
                    InputKey::Horizon(CityTarget::End),
                ])
            }
            Event::SetCity { target, name } => {
                self.update_input(
                    target,
                    SlotPatch {
                        query: Some(name),
                        ..SlotPatch::default()
                    },
                )?;
                Ok(vec![InputKey::Query(target)])
            }
            Event::SetParameter { target, parameter } => {
                self.update_input(
                    target,
                    SlotPatch {
                        parameter: Some(parameter),
                        ..SlotPatch::default()
                    },
                )?;
                Ok(vec![InputKey::Parameter(target)])
            }
            Event::SetHorizon { target, days } => {
                self.update_input(
                    target,
                    SlotPatch {
                        horizon_days: Some(days),
                        ..SlotPatch::default()
                    },
                )?;
                Ok(vec![InputKey::Horizon(target)])
            }
            Event::AddSlot => {
                let index = self.registry.add_slot().index;
                self.slot_charts.push(ChartNode::default());
                tracing::info!("Added intermediate city #{}", index);
                let target = CityTarget::Slot(index);
                Ok(vec![
                    InputKey::SlotCount,
                    InputKey::Query(target),
                    InputKey::Parameter(target),
                    InputKey::Horizon(target),
                ])
            }
            Event::SlotControls {
                parameters,
                horizons,
            } => {
                let consistent = self
                    .registry
                    .len()
                    .min(parameters.len())
                    .min(horizons.len());
                if consistent < self.registry.len() {
                    tracing::debug!(
                        "Slot controls cover {} of {} slots",
                        consistent,
                        self.registry.len()
                    );
                }

                let mut changed = Vec::new();
                for (index, (&parameter, &horizon_days)) in
                    parameters.iter().zip(&horizons).take(consistent).enumerate()
                {
                    let target = CityTarget::Slot(index);
                    let Some(slot) = self.registry.get(index) else {
                        break;
                    };
                    let mut patch = SlotPatch::default();
                    if slot.input.parameter != parameter {
                        patch.parameter = Some(parameter);
                        changed.push(InputKey::Parameter(target));
                    }
                    if slot.input.horizon_days != horizon_days {
                        patch.horizon_days = Some(horizon_days);
                        changed.push(InputKey::Horizon(target));
                    }
                    self.registry.update_slot(index, patch)?;
                }
                Ok(changed)
            }
        }
    }

    fn update_input(&mut self, target: CityTarget, patch: SlotPatch) -> Result<(), SessionError> {
        match target {
            CityTarget::Start => self.start.apply(patch),
            CityTarget::End => self.end.apply(patch),
            CityTarget::Slot(index) => {
                self.registry.update_slot(index, patch)?;
            }
        }
        Ok(())
    }

    fn affected_nodes(&self, changed: &[InputKey]) -> Vec<NodeId> {
        std::iter::once(NodeId::Chart(CityTarget::Start))
            .chain((0..self.registry.len()).map(|i| NodeId::Chart(CityTarget::Slot(i))))
            .chain([NodeId::Chart(CityTarget::End), NodeId::RouteMap])
            .filter(|node| changed.iter().any(|&input| node.depends_on(input)))
            .collect()
    }

    fn input(&self, target: CityTarget) -> Option<&CityInput> {
        match target {
            CityTarget::Start => Some(&self.start),
            CityTarget::End => Some(&self.end),
            CityTarget::Slot(index) => self.registry.get(index).map(|slot| &slot.input),
        }
    }

    async fn recompute(&mut self, node: NodeId) {
        *self.recompute_counts.entry(node).or_insert(0) += 1;

        match node {
            NodeId::Chart(target) => {
                let Some(input) = self.input(target).cloned() else {
                    return;
                };
                let output = self.compute_chart(&input).await;
                match &output.issue {
                    Some(NodeIssue::InputEmpty) => tracing::debug!("{} has no city", node),
                    Some(issue) => tracing::warn!("{} is blank: {}", node, issue),
                    None => {}
                }
                match target {
                    CityTarget::Start => self.start_chart = output,
                    CityTarget::End => self.end_chart = output,
                    CityTarget::Slot(index) => {
                        if let Some(slot_chart) = self.slot_charts.get_mut(index) {
                            *slot_chart = output;
                        }
                    }
                }
            }
            NodeId::RouteMap => {
                self.route = self.compute_route().await;
            }
        }
    }

    async fn compute_chart(&mut self, input: &CityInput) -> ChartNode {
        if !input.has_name() {
            return ChartNode::blank(NodeIssue::InputEmpty);
        }

        let at = match self.geocoder.resolve(&input.query).await {
            Ok(GeoResult::Found(at)) => at,
            Ok(GeoResult::NotFound) => {
                return ChartNode::blank(NodeIssue::GeocodeNotFound {
                    name: input.query.clone(),
                })
            }
            Err(issue) => return ChartNode::blank(issue),
        };

        let query = WeatherQuery::new(input.parameter, at, input.horizon_days);
        match self.fetcher.fetch(query).await {
            Ok(series) => ChartNode {
                chart: render_series(&series, input.parameter),
                location: Some(at),
                issue: None,
            },
            Err(issue) => ChartNode {
                chart: Chart::empty(),
                location: Some(at),
                issue: Some(issue),
            },
        }
    }

    async fn compute_route(&mut self) -> RouteNode {
        let named: Vec<(CityTarget, String)> = std::iter::once((CityTarget::Start, &self.start))
            .chain(
                self.registry
                    .slots()
                    .iter()
                    .map(|slot| (CityTarget::Slot(slot.index), &slot.input)),
            )
            .chain(std::iter::once((CityTarget::End, &self.end)))
            .filter(|(_, input)| input.has_name())
            .map(|(target, input)| (target, input.query.clone()))
            .collect();

        let mut stops = Vec::new();
        let mut skipped = Vec::new();
        for (target, name) in named {
            match self.geocoder.resolve(&name).await {
                Ok(GeoResult::Found(coordinates)) => stops.push(RouteStop {
                    city: target.to_string(),
                    name,
                    coordinates,
                }),
                Ok(GeoResult::NotFound) => skipped.push(SkippedStop {
                    city: target.to_string(),
                    issue: Some(NodeIssue::GeocodeNotFound { name: name.clone() }),
                    name,
                }),
                Err(issue) => skipped.push(SkippedStop {
                    city: target.to_string(),
                    name,
                    issue: Some(issue),
                }),
            }
        }

        let points: Vec<Coordinates> = stops.iter().map(|stop| stop.coordinates).collect();
        RouteNode {
            map: render_route(&points),
            stops,
            skipped,
        }
    }

    /// Copies out every published input and output
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            start: CityView {
                input: self.start.clone(),
                output: self.start_chart.clone(),
            },
            end: CityView {
                input: self.end.clone(),
                output: self.end_chart.clone(),
            },
            intermediates: self
                .registry
                .slots()
                .iter()
                .zip(&self.slot_charts)
                .map(|(slot, output)| SlotView {
                    slot: slot.clone(),
                    output: output.clone(),
                })
                .collect(),
            route: self.route.clone(),
        }
    }

    /// Latest chart published for a city
    pub fn chart(&self, target: CityTarget) -> Option<&ChartNode> {
        match target {
            CityTarget::Start => Some(&self.start_chart),
            CityTarget::End => Some(&self.end_chart),
            CityTarget::Slot(index) => self.slot_charts.get(index),
        }
    }

    /// Latest route map
    pub fn route(&self) -> &RouteNode {
        &self.route
    }

    /// Intermediate city slots in index order
    pub fn registry(&self) -> &SlotRegistry {
        &self.registry
    }

    /// How many times a node has been recomputed this session
    pub fn recompute_count(&self, node: NodeId) -> u64 {
        self.recompute_counts.get(&node).copied().unwrap_or(0)
    }

    /// Ends the session: caches, slots and outputs are dropped and a new deep
    /// link may be applied
    pub fn reset(&mut self) {
        tracing::info!(
            "Resetting session ({} geocode and {} weather entries cached)",
            self.geocoder.cached_entries(),
            self.fetcher.cached_entries()
        );
        self.geocoder.clear();
        self.fetcher.clear();
        self.start = CityInput::default();
        self.end = CityInput::default();
        self.registry.clear();
        self.start_chart = ChartNode::default();
        self.end_chart = ChartNode::default();
        self.slot_charts.clear();
        self.route = RouteNode::default();
        self.recompute_counts.clear();
        self.deep_link_applied = false;
        self.edited = false;
    }
}
