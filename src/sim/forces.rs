use std::f32::consts::TAU;

use crate::geom::{Vec2, vec2};

use super::{Dimensions, EDGE_PADDING, MIN_USABLE_DIM, SimNode};

const REPULSION_STRENGTH: f32 = 900.0;
const COLLISION_STRENGTH: f32 = 0.55;
const CENTER_STRENGTH: f32 = 0.06;
const MAX_SPEED: f32 = 18.0;
const SLEEP_SPEED: f32 = 0.02;

pub(super) struct ForceParams {
    pub alpha: f32,
    pub velocity_decay: f32,
    pub distance_min: f32,
    pub collision_padding: f32,
    pub dims: Dimensions,
}

/// One integration step: repulsion, collision, centering, then
/// mass-weighted damping. Returns true if any node is still moving.
pub(super) fn apply_forces(nodes: &mut [SimNode], params: &ForceParams) -> bool {
    let count = nodes.len();
    let mut forces = vec![Vec2::ZERO; count];

    // Many-body repulsion with a floor on the effective distance so
    // near-coincident nodes cannot produce unbounded forces.
    let floor_sq = params.distance_min * params.distance_min;
    for i in 0..count {
        for j in (i + 1)..count {
            let delta = nodes[i].pos - nodes[j].pos;
            let distance_sq = delta.length_sq().max(floor_sq);
            let direction = if delta.length_sq() > 1e-8 {
                delta.normalized()
            } else {
                pair_escape_direction(i, j)
            };
            let push = direction * (REPULSION_STRENGTH * params.alpha / distance_sq);
            forces[i] += push;
            forces[j] -= push;
        }
    }

    // Pairwise overlap resolution against scaled radii. Not scaled by
    // alpha: overlap must resolve even in a cool layout.
    for i in 0..count {
        for j in (i + 1)..count {
            let min_gap = nodes[i].effective_radius()
                + nodes[j].effective_radius()
                + params.collision_padding;
            let delta = nodes[i].pos - nodes[j].pos;
            let distance = delta.length();
            if distance >= min_gap {
                continue;
            }
            let direction = if distance > 1e-4 {
                delta / distance
            } else {
                pair_escape_direction(i, j)
            };
            let overlap_push = (min_gap - distance) * COLLISION_STRENGTH;
            forces[i] += direction * overlap_push;
            forces[j] -= direction * overlap_push;
        }
    }

    // Weak pull toward the anchor keeps the cloud from drifting.
    let center = nodes[0].pos;
    for (index, force) in forces.iter_mut().enumerate().skip(1) {
        *force -= (nodes[index].pos - center) * (CENTER_STRENGTH * params.alpha);
    }

    // Mass-weighted damping: strength falls off with
    // (radius / average radius)^2, so small nodes shed velocity fast
    // while heavy nodes keep their momentum.
    let mut radius_sum = 0.0;
    for node in nodes.iter().skip(1) {
        radius_sum += node.effective_radius();
    }
    let average_radius = if count > 1 {
        (radius_sum / (count - 1) as f32).max(1.0)
    } else {
        1.0
    };

    let mut any_motion = false;
    for (index, node) in nodes.iter_mut().enumerate() {
        if node.fixed {
            node.vel = Vec2::ZERO;
            continue;
        }

        let mass_ratio = (node.effective_radius() / average_radius).max(0.2);
        let damping = (params.velocity_decay / (mass_ratio * mass_ratio)).clamp(0.0, 0.9);

        let mut velocity = (node.vel + forces[index]) * (1.0 - damping);
        let speed = velocity.length();
        if speed > MAX_SPEED {
            velocity = velocity * (MAX_SPEED / speed);
        }
        if velocity.length() < SLEEP_SPEED {
            velocity = Vec2::ZERO;
        }

        node.vel = velocity;
        node.pos += velocity;
        clamp_to_viewport(node, params.dims);

        if node.vel.length_sq() > 1e-6 {
            any_motion = true;
        }
    }

    any_motion
}

fn clamp_to_viewport(node: &mut SimNode, dims: Dimensions) {
    if dims.min_dim() < MIN_USABLE_DIM {
        return;
    }
    let radius = node.effective_radius();

    let lo_x = EDGE_PADDING + radius;
    let hi_x = dims.width - EDGE_PADDING - radius;
    if lo_x < hi_x {
        node.pos.x = node.pos.x.clamp(lo_x, hi_x);
    }

    let lo_y = EDGE_PADDING + radius;
    let hi_y = dims.height - EDGE_PADDING - radius;
    if lo_y < hi_y {
        node.pos.y = node.pos.y.clamp(lo_y, hi_y);
    }
}

/// Deterministic separation direction for coincident nodes.
fn pair_escape_direction(from: usize, to: usize) -> Vec2 {
    let angle = ((from as f32) * 0.618_034 + (to as f32) * 0.414_214) * TAU;
    vec2(angle.cos(), angle.sin())
}
