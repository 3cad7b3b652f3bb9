//! Diagram placement for components.
//!
//! Every algorithm returns top-left coordinates keyed by component UUID;
//! `LayoutEngine` then shifts the result so nothing sits closer than
//! `POSITION_MARGIN` to the origin.

use crate::domain::model::{Component, Connection};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

pub const COMPONENT_WIDTH: f64 = 120.0;
pub const COMPONENT_HEIGHT: f64 = 80.0;
pub const POSITION_MARGIN: f64 = 50.0;
const MIN_OPTIMAL_SPACING: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentPosition {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ComponentPosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            width: COMPONENT_WIDTH,
            height: COMPONENT_HEIGHT,
        }
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum LayoutType {
    Grid,
    Hierarchical,
    ForceDirected,
    Circular,
    Layered,
}

impl LayoutType {
    pub const ALL: [LayoutType; 5] = [
        LayoutType::Grid,
        LayoutType::Hierarchical,
        LayoutType::ForceDirected,
        LayoutType::Circular,
        LayoutType::Layered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutType::Grid => "grid",
            LayoutType::Hierarchical => "hierarchical",
            LayoutType::ForceDirected => "force_directed",
            LayoutType::Circular => "circular",
            LayoutType::Layered => "layered",
        }
    }
}

impl fmt::Display for LayoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HierarchyDirection {
    #[default]
    TopDown,
    LeftRight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutParameters {
    pub component_spacing_x: f64,
    pub component_spacing_y: f64,
    pub layer_spacing: f64,
    pub min_spacing: f64,
    /// `None` picks roughly square grids.
    pub grid_columns: Option<usize>,
    pub repulsion_force: f64,
    pub attraction_force: f64,
    pub iterations: usize,
    pub damping: f64,
    pub hierarchy_direction: HierarchyDirection,
    pub circle_radius: f64,
    pub center_important: bool,
    /// Seed for the force-directed start positions.
    pub seed: u64,
}

impl Default for LayoutParameters {
    fn default() -> Self {
        Self {
            component_spacing_x: 180.0,
            component_spacing_y: 150.0,
            layer_spacing: 200.0,
            min_spacing: 100.0,
            grid_columns: None,
            repulsion_force: 1000.0,
            attraction_force: 0.5,
            iterations: 50,
            damping: 0.9,
            hierarchy_direction: HierarchyDirection::TopDown,
            circle_radius: 300.0,
            center_important: true,
            seed: 42,
        }
    }
}

pub type Positions = BTreeMap<String, ComponentPosition>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutResult {
    pub layout_type: LayoutType,
    pub positions: Positions,
}

impl LayoutResult {
    pub fn empty(layout_type: LayoutType) -> Self {
        Self {
            layout_type,
            positions: Positions::new(),
        }
    }

    /// (min_x, min_y, max_right, max_bottom), `None` when nothing was placed.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut iter = self.positions.values();
        let first = iter.next()?;
        Some(iter.fold(
            (first.x, first.y, first.right(), first.bottom()),
            |(min_x, min_y, max_x, max_y), p| {
                (
                    min_x.min(p.x),
                    min_y.min(p.y),
                    max_x.max(p.right()),
                    max_y.max(p.bottom()),
                )
            },
        ))
    }
}

pub trait LayoutAlgorithm {
    fn apply(
        &self,
        components: &[&Component],
        connections: &[Connection],
        params: &LayoutParameters,
    ) -> Positions;
}

/// (provider component, requester component) pairs restricted to `components`.
fn component_edges<'a>(
    components: &[&Component],
    connections: &'a [Connection],
) -> Vec<(&'a str, &'a str)> {
    let known: HashSet<&str> = components.iter().map(|c| c.uuid.as_str()).collect();
    connections
        .iter()
        .filter_map(|conn| {
            let provider = conn.provider.component_uuid.as_deref()?;
            let requester = conn.requester.component_uuid.as_deref()?;
            (known.contains(provider) && known.contains(requester)).then_some((provider, requester))
        })
        .collect()
}

fn sort_by_type_ports_name(components: &mut [&Component]) {
    components.sort_by(|a, b| {
        a.component_type
            .layout_priority()
            .cmp(&b.component_type.layout_priority())
            .then_with(|| b.port_count().cmp(&a.port_count()))
            .then_with(|| a.short_name.cmp(&b.short_name))
    });
}

pub struct GridLayout;

impl LayoutAlgorithm for GridLayout {
    fn apply(
        &self,
        components: &[&Component],
        _connections: &[Connection],
        params: &LayoutParameters,
    ) -> Positions {
        let mut positions = Positions::new();
        if components.is_empty() {
            return positions;
        }

        let n = components.len();
        let cols = params
            .grid_columns
            .filter(|c| *c > 0)
            .unwrap_or_else(|| ((n as f64).sqrt().ceil() as usize).max(1));
        let rows = n.div_ceil(cols);

        let mut sorted = components.to_vec();
        sort_by_type_ports_name(&mut sorted);

        for (i, component) in sorted.iter().enumerate() {
            let x = (i % cols) as f64 * params.component_spacing_x;
            let y = (i / cols) as f64 * params.component_spacing_y;
            positions.insert(component.uuid.clone(), ComponentPosition::new(x, y));
        }

        tracing::debug!("Grid layout: {}x{} for {} components", cols, rows, n);
        positions
    }
}

pub struct HierarchicalLayout;

impl HierarchicalLayout {
    /// Requester -> providers it depends on.
    fn dependency_graph<'a>(
        components: &[&'a Component],
        connections: &'a [Connection],
    ) -> HashMap<&'a str, HashSet<&'a str>> {
        let mut graph: HashMap<&str, HashSet<&str>> = components
            .iter()
            .map(|c| (c.uuid.as_str(), HashSet::new()))
            .collect();
        for (provider, requester) in component_edges(components, connections) {
            if provider != requester {
                graph.entry(requester).or_default().insert(provider);
            }
        }
        graph
    }

    fn layers<'a>(
        components: &[&'a Component],
        graph: &HashMap<&str, HashSet<&str>>,
    ) -> Vec<Vec<&'a Component>> {
        let mut layers = Vec::new();
        let mut placed: HashSet<&str> = HashSet::new();
        let mut remaining: Vec<&Component> = components.to_vec();
        let deps_of = |c: &Component| graph.get(c.uuid.as_str());

        while !remaining.is_empty() {
            let (ready, blocked): (Vec<&Component>, Vec<&Component>) =
                remaining.into_iter().partition(|c| {
                    deps_of(*c)
                        .map(|deps| deps.iter().all(|d| placed.contains(d)))
                        .unwrap_or(true)
                });
            remaining = blocked;

            let layer = if ready.is_empty() {
                // 循環相依: 取相依數最少的元件打破循環
                let Some(index) = remaining
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, c)| deps_of(**c).map(HashSet::len).unwrap_or(0))
                    .map(|(i, _)| i)
                else {
                    break;
                };
                vec![remaining.remove(index)]
            } else {
                ready
            };

            placed.extend(layer.iter().map(|c| c.uuid.as_str()));
            layers.push(layer);
        }
        layers
    }
}

impl LayoutAlgorithm for HierarchicalLayout {
    fn apply(
        &self,
        components: &[&Component],
        connections: &[Connection],
        params: &LayoutParameters,
    ) -> Positions {
        let mut positions = Positions::new();
        if components.is_empty() {
            return positions;
        }

        let graph = Self::dependency_graph(components, connections);
        let layers = Self::layers(components, &graph);

        for (layer_index, layer) in layers.iter().enumerate() {
            let mut sorted = layer.clone();
            sort_by_type_ports_name(&mut sorted);
            let layer_offset = layer_index as f64 * params.layer_spacing;

            for (index, component) in sorted.iter().enumerate() {
                let (x, y) = match params.hierarchy_direction {
                    HierarchyDirection::TopDown => {
                        (index as f64 * params.component_spacing_x, layer_offset)
                    }
                    HierarchyDirection::LeftRight => {
                        (layer_offset, index as f64 * params.component_spacing_y)
                    }
                };
                positions.insert(component.uuid.clone(), ComponentPosition::new(x, y));
            }
        }

        tracing::debug!("Hierarchical layout with {} layers", layers.len());
        positions
    }
}

pub struct ForceDirectedLayout;

impl LayoutAlgorithm for ForceDirectedLayout {
    fn apply(
        &self,
        components: &[&Component],
        connections: &[Connection],
        params: &LayoutParameters,
    ) -> Positions {
        let mut positions = Positions::new();
        match components {
            [] => return positions,
            [only] => {
                positions.insert(only.uuid.clone(), ComponentPosition::new(0.0, 0.0));
                return positions;
            }
            _ => {}
        }

        let n = components.len();
        let index: HashMap<&str, usize> = components
            .iter()
            .enumerate()
            .map(|(i, c)| (c.uuid.as_str(), i))
            .collect();
        let edges: Vec<(usize, usize)> = component_edges(components, connections)
            .into_iter()
            .filter_map(|(p, r)| Some((*index.get(p)?, *index.get(r)?)))
            .collect();

        let mut rng = StdRng::seed_from_u64(params.seed);
        let half = (n as f64).sqrt() * 200.0 / 2.0;
        let mut pos: Vec<(f64, f64)> = (0..n)
            .map(|_| (rng.gen_range(-half..half), rng.gen_range(-half..half)))
            .collect();
        let mut vel = vec![(0.0_f64, 0.0_f64); n];

        for _ in 0..params.iterations {
            let mut force = vec![(0.0_f64, 0.0_f64); n];

            for i in 0..n {
                for j in (i + 1)..n {
                    let mut dx = pos[i].0 - pos[j].0;
                    let mut dy = pos[i].1 - pos[j].1;
                    let mut distance = (dx * dx + dy * dy).sqrt();
                    if distance < 1.0 {
                        distance = 1.0;
                        dx = rng.gen_range(-1.0..1.0);
                        dy = rng.gen_range(-1.0..1.0);
                    }
                    let magnitude = params.repulsion_force / (distance * distance);
                    let (fx, fy) = (dx / distance * magnitude, dy / distance * magnitude);
                    force[i].0 += fx;
                    force[i].1 += fy;
                    force[j].0 -= fx;
                    force[j].1 -= fy;
                }
            }

            for &(provider, requester) in &edges {
                let dx = pos[requester].0 - pos[provider].0;
                let dy = pos[requester].1 - pos[provider].1;
                let distance = (dx * dx + dy * dy).sqrt();
                if distance < 1.0 {
                    continue;
                }
                let magnitude = params.attraction_force * distance;
                let (fx, fy) = (dx / distance * magnitude, dy / distance * magnitude);
                force[provider].0 += fx;
                force[provider].1 += fy;
                force[requester].0 -= fx;
                force[requester].1 -= fy;
            }

            for i in 0..n {
                vel[i].0 = (vel[i].0 + force[i].0) * params.damping;
                vel[i].1 = (vel[i].1 + force[i].1) * params.damping;
                pos[i].0 += vel[i].0;
                pos[i].1 += vel[i].1;
            }
        }

        for (component, (x, y)) in components.iter().zip(pos) {
            positions.insert(component.uuid.clone(), ComponentPosition::new(x, y));
        }
        tracing::debug!(
            "Force-directed layout: {} iterations, {} edges",
            params.iterations,
            edges.len()
        );
        positions
    }
}

pub struct CircularLayout;

impl CircularLayout {
    fn connection_counts<'a>(
        components: &[&'a Component],
        connections: &[Connection],
    ) -> HashMap<&'a str, usize> {
        let mut counts: HashMap<&str, usize> =
            components.iter().map(|c| (c.uuid.as_str(), 0)).collect();
        for conn in connections {
            for uuid in [&conn.provider.component_uuid, &conn.requester.component_uuid]
                .into_iter()
                .flatten()
            {
                if let Some(count) = counts.get_mut(uuid.as_str()) {
                    *count += 1;
                }
            }
        }
        counts
    }
}

impl LayoutAlgorithm for CircularLayout {
    fn apply(
        &self,
        components: &[&Component],
        connections: &[Connection],
        params: &LayoutParameters,
    ) -> Positions {
        let mut positions = Positions::new();
        match components {
            [] => return positions,
            [only] => {
                positions.insert(only.uuid.clone(), ComponentPosition::new(0.0, 0.0));
                return positions;
            }
            _ => {}
        }

        let counts = Self::connection_counts(components, connections);
        let count_of = |uuid: &str| counts.get(uuid).copied().unwrap_or(0);

        let mut sorted = components.to_vec();
        sorted.sort_by(|a, b| {
            count_of(&b.uuid)
                .cmp(&count_of(&a.uuid))
                .then_with(|| a.component_type.tag().cmp(b.component_type.tag()))
                .then_with(|| a.short_name.cmp(&b.short_name))
        });

        let step = std::f64::consts::TAU / sorted.len() as f64;
        for (i, component) in sorted.iter().enumerate() {
            let angle = i as f64 * step;
            positions.insert(
                component.uuid.clone(),
                ComponentPosition::new(
                    params.circle_radius * angle.cos(),
                    params.circle_radius * angle.sin(),
                ),
            );
        }

        if params.center_important && !connections.is_empty() {
            // 同數量時取第一個出現的元件
            let central = components
                .iter()
                .fold(None::<&&Component>, |best, c| match best {
                    Some(b) if count_of(&b.uuid) >= count_of(&c.uuid) => Some(b),
                    _ => Some(c),
                })
                .filter(|c| count_of(&c.uuid) > 0);
            if let Some(central) = central {
                positions.insert(central.uuid.clone(), ComponentPosition::new(0.0, 0.0));
            }
        }

        positions
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutInfo {
    pub available_layouts: Vec<&'static str>,
    pub parameters: LayoutParameters,
}

#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    parameters: LayoutParameters,
}

impl LayoutEngine {
    pub fn new(parameters: LayoutParameters) -> Self {
        Self { parameters }
    }

    pub fn parameters(&self) -> &LayoutParameters {
        &self.parameters
    }

    pub fn set_parameters(&mut self, parameters: LayoutParameters) {
        self.parameters = parameters;
    }

    fn algorithm(layout_type: LayoutType) -> Option<&'static dyn LayoutAlgorithm> {
        match layout_type {
            LayoutType::Grid => Some(&GridLayout),
            LayoutType::Hierarchical => Some(&HierarchicalLayout),
            LayoutType::ForceDirected => Some(&ForceDirectedLayout),
            LayoutType::Circular => Some(&CircularLayout),
            LayoutType::Layered => None,
        }
    }

    pub fn apply_layout(
        &self,
        components: &[&Component],
        connections: &[Connection],
        layout_type: LayoutType,
    ) -> LayoutResult {
        if components.is_empty() {
            return LayoutResult::empty(layout_type);
        }

        let (effective, algorithm) = match Self::algorithm(layout_type) {
            Some(algorithm) => (layout_type, algorithm),
            None => {
                tracing::warn!("No {} layout algorithm available, using grid", layout_type);
                (LayoutType::Grid, &GridLayout as &dyn LayoutAlgorithm)
            }
        };

        let mut positions = algorithm.apply(components, connections, &self.parameters);
        post_process_positions(&mut positions);

        tracing::info!(
            "📐 Applied {} layout to {} components",
            effective,
            components.len()
        );
        LayoutResult {
            layout_type: effective,
            positions,
        }
    }

    pub fn layout_info(&self) -> LayoutInfo {
        LayoutInfo {
            available_layouts: LayoutType::ALL.iter().map(LayoutType::as_str).collect(),
            parameters: self.parameters.clone(),
        }
    }
}

/// Shifts everything so the smallest x and y are at least `POSITION_MARGIN`.
pub fn post_process_positions(positions: &mut Positions) {
    let Some(min_x) = positions.values().map(|p| p.x).reduce(f64::min) else {
        return;
    };
    let min_y = positions.values().map(|p| p.y).fold(f64::INFINITY, f64::min);

    let x_offset = if min_x < POSITION_MARGIN { POSITION_MARGIN - min_x } else { 0.0 };
    let y_offset = if min_y < POSITION_MARGIN { POSITION_MARGIN - min_y } else { 0.0 };

    for position in positions.values_mut() {
        position.x += x_offset;
        position.y += y_offset;
    }
}

pub fn detect_best_layout(num_components: usize, num_connections: usize) -> LayoutType {
    if num_components <= 1 {
        LayoutType::Grid
    } else if num_components <= 6 {
        if num_connections > 0 {
            LayoutType::Circular
        } else {
            LayoutType::Grid
        }
    } else if num_connections as f64 > num_components as f64 * 0.5 {
        LayoutType::ForceDirected
    } else if num_connections > 0 {
        LayoutType::Hierarchical
    } else {
        LayoutType::Grid
    }
}

/// Spacing that spreads a square-ish grid over `area` (width, height).
pub fn calculate_optimal_spacing(num_components: usize, area: (f64, f64)) -> (f64, f64) {
    let (width, height) = area;
    let n = num_components.max(1);
    let cols = ((n as f64).sqrt().ceil() as usize).max(1);
    let rows = n.div_ceil(cols);

    let spacing_x = if cols > 1 { width / (cols - 1) as f64 } else { width };
    let spacing_y = if rows > 1 { height / (rows - 1) as f64 } else { height };

    (
        spacing_x.max(MIN_OPTIMAL_SPACING),
        spacing_y.max(MIN_OPTIMAL_SPACING),
    )
}
