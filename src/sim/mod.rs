mod forces;
mod seed;

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::geom::Vec2;
use crate::records::Category;

use forces::ForceParams;

/// Fixed multiplier on a selected node's effective radius, applied to
/// collision as well as readout so the layout reacts physically.
pub const SELECTION_BOOST: f32 = 1.35;

pub(crate) const EDGE_PADDING: f32 = 12.0;
pub(crate) const MIN_USABLE_DIM: f32 = 64.0;

const DEFAULT_ANCHOR_RADIUS: f32 = 40.0;
const ALPHA_INITIAL: f32 = 1.0;
const ALPHA_MIN: f32 = 0.005;
// Larger viewports get more friction per tick and slower cooling at
// the same time: raising friction alone would cool the layout before
// large nodes finish travelling.
const ALPHA_DECAY_SMALL_VIEW: f32 = 0.035;
const ALPHA_DECAY_LARGE_VIEW: f32 = 0.02;
const VELOCITY_DECAY_SMALL_VIEW: f32 = 0.25;
const VELOCITY_DECAY_LARGE_VIEW: f32 = 0.38;
const LARGE_VIEW_MIN_DIM: f32 = 600.0;
const REHEAT_SMALL: f32 = 0.2;
const REHEAT_LARGE: f32 = 0.5;
const LARGE_CHANGE_FRACTION: f32 = 0.25;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dimensions {
    pub width: f32,
    pub height: f32,
}

impl Dimensions {
    pub fn new(width: f32, height: f32) -> Dimensions {
        Dimensions { width, height }
    }

    pub fn min_dim(self) -> f32 {
        self.width.min(self.height)
    }
}

/// Immutable description of one tag node handed to the simulation.
#[derive(Clone, Debug)]
pub struct NodeSpec {
    pub id: String,
    pub category: Category,
    pub radius: f32,
    pub scale: f32,
}

struct SimNode {
    id: String,
    category: Option<Category>,
    radius: f32,
    scale: f32,
    selected: bool,
    pos: Vec2,
    vel: Vec2,
    fixed: bool,
}

impl SimNode {
    fn effective_radius(&self) -> f32 {
        let boost = if self.selected { SELECTION_BOOST } else { 1.0 };
        self.radius * self.scale * boost
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Seeded,
    Running,
    Settling,
    Disposed,
}

/// Position snapshot handed to the presentation layer each frame.
/// Positions are engine-private; this copy is the only way out.
#[derive(Clone, Debug)]
pub struct NodePosition {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub category: Option<Category>,
}

/// Iterative layout for one anchor plus one node per tag. The host
/// drives `tick` once per rendered frame; between ticks it may submit
/// new dimensions, scale factors, or selection state, never positions.
pub struct Simulation {
    nodes: Vec<SimNode>,
    phase: Phase,
    dims: Option<Dimensions>,
    alpha: f32,
    alpha_target: f32,
    alpha_decay: f32,
    velocity_decay: f32,
    collision_padding: f32,
    distance_min: f32,
    exclusion_radius: f32,
}

impl Simulation {
    /// Build a simulation in the Uninitialized state. Nothing moves
    /// until the first `update_dimensions` call seeds positions.
    pub fn new(anchor_label: impl Into<String>, specs: Vec<NodeSpec>) -> Simulation {
        let mut nodes = Vec::with_capacity(specs.len() + 1);
        nodes.push(SimNode {
            id: anchor_label.into(),
            category: None,
            radius: DEFAULT_ANCHOR_RADIUS,
            scale: 1.0,
            selected: false,
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            fixed: true,
        });

        for spec in specs {
            if nodes.iter().any(|node| node.id == spec.id) {
                trace!(id = %spec.id, "skipping duplicate node spec");
                continue;
            }
            nodes.push(SimNode {
                id: spec.id,
                category: Some(spec.category),
                radius: spec.radius,
                scale: spec.scale,
                selected: false,
                pos: Vec2::ZERO,
                vel: Vec2::ZERO,
                fixed: false,
            });
        }

        Simulation {
            nodes,
            phase: Phase::Uninitialized,
            dims: None,
            alpha: ALPHA_INITIAL,
            alpha_target: 0.0,
            alpha_decay: ALPHA_DECAY_SMALL_VIEW,
            velocity_decay: VELOCITY_DECAY_SMALL_VIEW,
            collision_padding: 4.0,
            distance_min: 8.0,
            exclusion_radius: DEFAULT_ANCHOR_RADIUS + 12.0,
        }
    }

    /// First call with dimensions seeds the layout; later calls re-seed
    /// only the nodes the new viewport pushed out of bounds, then
    /// reheat.
    pub fn update_dimensions(&mut self, dims: Dimensions) {
        if self.phase == Phase::Disposed {
            return;
        }

        let first = self.dims.is_none();
        self.dims = Some(dims);
        self.retune(dims);

        if first {
            seed::seed_nodes(&mut self.nodes, dims, self.exclusion_radius);
            self.phase = Phase::Seeded;
            debug!(
                width = dims.width,
                height = dims.height,
                nodes = self.nodes.len(),
                "seeded layout"
            );
        } else {
            let reseeded = seed::reseed_out_of_bounds(&mut self.nodes, dims, self.exclusion_radius);
            trace!(reseeded, "viewport resized");
            // A resize moves every node's frame of reference.
            self.reheat(REHEAT_LARGE);
        }
    }

    fn retune(&mut self, dims: Dimensions) {
        let min_dim = dims.min_dim().max(1.0);
        let large = min_dim >= LARGE_VIEW_MIN_DIM;
        self.velocity_decay = if large {
            VELOCITY_DECAY_LARGE_VIEW
        } else {
            VELOCITY_DECAY_SMALL_VIEW
        };
        self.alpha_decay = if large {
            ALPHA_DECAY_LARGE_VIEW
        } else {
            ALPHA_DECAY_SMALL_VIEW
        };

        // Spacing follows viewport size and crowding rather than fixed
        // constants, so relative density looks the same on any screen.
        let crowding = (self.nodes.len().saturating_sub(1).max(1) as f32).sqrt();
        self.collision_padding = ((min_dim * 0.02) / crowding).clamp(1.5, 9.0);
        self.distance_min = ((min_dim * 0.05) / crowding).clamp(4.0, 28.0);
        let anchor_radius = self
            .nodes
            .first()
            .map(|anchor| anchor.radius)
            .unwrap_or(DEFAULT_ANCHOR_RADIUS);
        self.exclusion_radius = (min_dim * 0.12).max(anchor_radius + 12.0);
    }

    /// Advance one frame. Returns true while nodes are still in motion;
    /// a settled or unseeded simulation ticks as a cheap no-op.
    pub fn tick(&mut self) -> bool {
        match self.phase {
            Phase::Uninitialized | Phase::Disposed => return false,
            Phase::Seeded | Phase::Running | Phase::Settling => {}
        }
        if self.nodes.len() < 2 {
            self.phase = Phase::Settling;
            return false;
        }
        if self.phase == Phase::Settling && self.alpha < ALPHA_MIN {
            return false;
        }
        let Some(dims) = self.dims else {
            return false;
        };

        self.phase = Phase::Running;
        self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;

        let params = ForceParams {
            alpha: self.alpha,
            velocity_decay: self.velocity_decay,
            distance_min: self.distance_min,
            collision_padding: self.collision_padding,
            dims,
        };
        let any_motion = forces::apply_forces(&mut self.nodes, &params);

        if self.alpha < ALPHA_MIN || !any_motion {
            self.phase = Phase::Settling;
            debug!(alpha = self.alpha, "layout settled");
            return false;
        }
        true
    }

    /// Drive ticks until the layout settles or the budget runs out.
    /// Returns the number of ticks executed.
    pub fn run_until_settled(&mut self, max_ticks: usize) -> usize {
        for done in 0..max_ticks {
            if !self.tick() {
                return done + 1;
            }
        }
        max_ticks
    }

    /// Apply new per-tag scale factors. The reheat is sized by the
    /// fraction of nodes the update actually changed.
    pub fn update_scale_factors(&mut self, factors: &HashMap<String, f64>) {
        if self.phase == Phase::Disposed {
            return;
        }
        let mut affected = 0usize;
        for node in self.nodes.iter_mut().skip(1) {
            if let Some(&factor) = factors.get(&node.id) {
                let factor = factor as f32;
                if (node.scale - factor).abs() > 1e-4 {
                    node.scale = factor;
                    affected += 1;
                }
            }
        }
        self.reheat_for_change(affected);
    }

    /// Select or deselect one node; its effective radius changes by
    /// [`SELECTION_BOOST`], which the collision pass feels immediately.
    pub fn set_selected(&mut self, id: &str, selected: bool) {
        if self.phase == Phase::Disposed {
            return;
        }
        let mut affected = 0usize;
        for node in self.nodes.iter_mut().skip(1) {
            if node.id == id && node.selected != selected {
                node.selected = selected;
                affected += 1;
            }
        }
        self.reheat_for_change(affected);
    }

    fn reheat_for_change(&mut self, affected: usize) {
        if affected == 0 {
            return;
        }
        let population = self.nodes.len().saturating_sub(1).max(1);
        let fraction = affected as f32 / population as f32;
        let target = if fraction > LARGE_CHANGE_FRACTION {
            REHEAT_LARGE
        } else {
            REHEAT_SMALL
        };
        self.reheat(target);
    }

    fn reheat(&mut self, target: f32) {
        if matches!(self.phase, Phase::Uninitialized | Phase::Disposed) {
            return;
        }
        self.alpha = self.alpha.max(target);
        if self.phase == Phase::Settling {
            self.phase = Phase::Running;
        }
        debug!(alpha = self.alpha, "reheated layout");
    }

    /// Snapshot of current positions and effective radii, anchor first.
    pub fn positions(&self) -> Vec<NodePosition> {
        self.nodes
            .iter()
            .map(|node| NodePosition {
                id: node.id.clone(),
                x: node.pos.x,
                y: node.pos.y,
                radius: node.effective_radius(),
                category: node.category,
            })
            .collect()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.phase, Phase::Settling)
    }

    /// Number of non-anchor nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    pub fn exclusion_radius(&self) -> f32 {
        self.exclusion_radius
    }

    /// Terminal: stop ticking and release node storage. Every later
    /// call on this handle is a no-op.
    pub fn dispose(&mut self) {
        self.nodes.clear();
        self.nodes.shrink_to_fit();
        self.phase = Phase::Disposed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(id: &str, radius: f32, scale: f32) -> NodeSpec {
        NodeSpec {
            id: id.to_owned(),
            category: Category::Language,
            radius,
            scale,
        }
    }

    fn specs() -> Vec<NodeSpec> {
        vec![
            spec("Rust", 26.0, 1.4),
            spec("TypeScript", 26.0, 1.2),
            spec("React", 22.0, 1.0),
            spec("PostgreSQL", 22.0, 0.9),
            spec("Docker", 20.0, 0.8),
            spec("Kubernetes", 20.0, 0.8),
            spec("GraphQL", 18.0, 0.75),
            spec("Redis", 18.0, 0.75),
        ]
    }

    fn seeded() -> Simulation {
        let mut sim = Simulation::new("me", specs());
        sim.update_dimensions(Dimensions::new(900.0, 700.0));
        sim
    }

    #[test]
    fn starts_uninitialized_and_ticks_as_noop() {
        let mut sim = Simulation::new("me", specs());
        assert_eq!(sim.phase(), Phase::Uninitialized);
        assert!(!sim.tick());
        assert_eq!(sim.phase(), Phase::Uninitialized);
    }

    #[test]
    fn seeding_respects_exclusion_disk_and_viewport() {
        let sim = seeded();
        let dims = Dimensions::new(900.0, 700.0);
        let positions = sim.positions();
        let anchor = &positions[0];
        assert_eq!(anchor.x, dims.width / 2.0);
        assert_eq!(anchor.y, dims.height / 2.0);

        for node in &positions[1..] {
            let dx = node.x - anchor.x;
            let dy = node.y - anchor.y;
            let distance = (dx * dx + dy * dy).sqrt();
            assert!(
                distance >= sim.exclusion_radius() + node.radius,
                "{} landed inside the exclusion disk",
                node.id
            );
            assert!(node.x - node.radius >= EDGE_PADDING, "{} off left", node.id);
            assert!(node.y - node.radius >= EDGE_PADDING, "{} off top", node.id);
            assert!(
                node.x + node.radius <= dims.width - EDGE_PADDING,
                "{} off right",
                node.id
            );
            assert!(
                node.y + node.radius <= dims.height - EDGE_PADDING,
                "{} off bottom",
                node.id
            );
        }
    }

    #[test]
    fn seeding_is_deterministic() {
        let a = seeded().positions();
        let b = seeded().positions();
        for (left, right) in a.iter().zip(&b) {
            assert_eq!(left.id, right.id);
            assert_eq!((left.x, left.y), (right.x, right.y));
        }
    }

    #[test]
    fn one_node_per_unique_id() {
        let mut duplicated = specs();
        duplicated.push(spec("Rust", 30.0, 2.0));
        let sim = Simulation::new("me", duplicated);
        assert_eq!(sim.node_count(), specs().len());
    }

    #[test]
    fn zero_nodes_is_a_noop_simulation() {
        let mut sim = Simulation::new("me", Vec::new());
        sim.update_dimensions(Dimensions::new(800.0, 600.0));
        assert!(!sim.tick());
        assert!(sim.is_settled());
    }

    #[test]
    fn degenerate_viewport_seeds_without_panicking() {
        let mut sim = Simulation::new("me", specs());
        sim.update_dimensions(Dimensions::new(3.0, 2.0));
        for node in sim.positions() {
            assert!(node.x.is_finite() && node.y.is_finite());
        }
    }

    #[test]
    fn simulation_settles_within_budget() {
        let mut sim = seeded();
        let ticks = sim.run_until_settled(5_000);
        assert!(sim.is_settled(), "still hot after {ticks} ticks");
    }

    #[test]
    fn settled_nodes_do_not_overlap_much() {
        let mut sim = seeded();
        sim.run_until_settled(5_000);
        let positions = sim.positions();
        for (i, a) in positions.iter().enumerate().skip(1) {
            for b in positions.iter().skip(i + 1) {
                let dx = a.x - b.x;
                let dy = a.y - b.y;
                let distance = (dx * dx + dy * dy).sqrt();
                let min_gap = a.radius + b.radius;
                assert!(
                    distance >= min_gap * 0.8,
                    "{} and {} overlap: {distance} < {min_gap}",
                    a.id,
                    b.id
                );
            }
        }
    }

    #[test]
    fn small_change_reheats_gently_large_change_hotter() {
        let mut sim = seeded();
        sim.run_until_settled(5_000);
        assert!(sim.is_settled());

        // One of eight nodes: a small change.
        sim.alpha = 0.0;
        let one: HashMap<String, f64> = [("Rust".to_owned(), 2.0)].into();
        sim.update_scale_factors(&one);
        assert_eq!(sim.phase(), Phase::Running);
        assert!((sim.alpha() - REHEAT_SMALL).abs() < 1e-6);

        sim.run_until_settled(5_000);
        assert!(sim.is_settled());

        // Every node: a large change, hotter reheat.
        sim.alpha = 0.0;
        let all: HashMap<String, f64> = specs()
            .into_iter()
            .map(|node| (node.id, 1.0))
            .collect();
        sim.update_scale_factors(&all);
        assert_eq!(sim.phase(), Phase::Running);
        assert!((sim.alpha() - REHEAT_LARGE).abs() < 1e-6);
    }

    #[test]
    fn unchanged_scale_factors_do_not_reheat() {
        let mut sim = seeded();
        sim.run_until_settled(5_000);
        let same: HashMap<String, f64> = [("Rust".to_owned(), 1.4)].into();
        sim.update_scale_factors(&same);
        assert!(sim.is_settled());
    }

    #[test]
    fn selection_boosts_effective_radius_and_reheats() {
        let mut sim = seeded();
        sim.run_until_settled(5_000);

        let before = sim
            .positions()
            .into_iter()
            .find(|node| node.id == "Rust")
            .unwrap()
            .radius;
        sim.set_selected("Rust", true);
        let after = sim
            .positions()
            .into_iter()
            .find(|node| node.id == "Rust")
            .unwrap()
            .radius;

        assert!((after / before - SELECTION_BOOST).abs() < 1e-4);
        assert_eq!(sim.phase(), Phase::Running);
    }

    #[test]
    fn resize_reheats_and_keeps_nodes_in_new_bounds() {
        let mut sim = seeded();
        sim.run_until_settled(5_000);

        let dims = Dimensions::new(400.0, 300.0);
        sim.update_dimensions(dims);
        assert_eq!(sim.phase(), Phase::Running);

        sim.run_until_settled(5_000);
        for node in &sim.positions()[1..] {
            assert!(node.x - node.radius >= EDGE_PADDING - 1e-3);
            assert!(node.x + node.radius <= dims.width - EDGE_PADDING + 1e-3);
            assert!(node.y - node.radius >= EDGE_PADDING - 1e-3);
            assert!(node.y + node.radius <= dims.height - EDGE_PADDING + 1e-3);
        }
    }

    #[test]
    fn dispose_is_terminal() {
        let mut sim = seeded();
        sim.dispose();
        assert_eq!(sim.phase(), Phase::Disposed);
        assert!(sim.positions().is_empty());
        assert!(!sim.tick());
        sim.update_dimensions(Dimensions::new(800.0, 600.0));
        assert_eq!(sim.phase(), Phase::Disposed);
    }
}
