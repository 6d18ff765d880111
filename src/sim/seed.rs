use std::f32::consts::TAU;

use tracing::trace;

use crate::geom::{Vec2, vec2};
use crate::util::stable_pair;

use super::{Dimensions, EDGE_PADDING, MIN_USABLE_DIM, SimNode};

const SEED_MARGIN: f32 = 6.0;
const FALLBACK_RADIAL: f32 = 24.0;

/// Place every non-anchor node on a ray from the anchor: a hash-seeded
/// angle, and a radial distance between the anchor's exclusion disk and
/// the farthest point that keeps the whole circle inside the padded
/// viewport along that ray.
pub(super) fn seed_nodes(nodes: &mut [SimNode], dims: Dimensions, exclusion_radius: f32) {
    let Some((anchor, rest)) = nodes.split_first_mut() else {
        return;
    };
    let center = vec2(dims.width / 2.0, dims.height / 2.0);
    anchor.pos = center;
    anchor.vel = Vec2::ZERO;

    for node in rest {
        place_node(node, center, dims, exclusion_radius);
    }
}

/// After a resize, nodes that ended up outside the padded viewport or
/// inside the exclusion disk are re-placed; everything else keeps its
/// position so the layout change stays incremental.
pub(super) fn reseed_out_of_bounds(
    nodes: &mut [SimNode],
    dims: Dimensions,
    exclusion_radius: f32,
) -> usize {
    let Some((anchor, rest)) = nodes.split_first_mut() else {
        return 0;
    };
    let center = vec2(dims.width / 2.0, dims.height / 2.0);
    anchor.pos = center;

    let mut reseeded = 0;
    for node in rest {
        let radius = node.effective_radius();
        let in_exclusion = (node.pos - center).length() < exclusion_radius + radius;
        let outside = node.pos.x - radius < EDGE_PADDING
            || node.pos.x + radius > dims.width - EDGE_PADDING
            || node.pos.y - radius < EDGE_PADDING
            || node.pos.y + radius > dims.height - EDGE_PADDING;
        if in_exclusion || outside {
            place_node(node, center, dims, exclusion_radius);
            reseeded += 1;
        }
    }
    reseeded
}

fn place_node(node: &mut SimNode, center: Vec2, dims: Dimensions, exclusion_radius: f32) {
    let (angle_fraction, radial_fraction) = stable_pair(&node.id);
    let angle = angle_fraction * TAU;
    let direction = vec2(angle.cos(), angle.sin());

    let radius = node.effective_radius();
    let min_radial = exclusion_radius + radius + SEED_MARGIN;

    let radial = if dims.min_dim() < MIN_USABLE_DIM {
        // Degenerate viewport: skip the ray math entirely.
        FALLBACK_RADIAL
    } else {
        let max_radial = ray_limit(center, direction, dims, radius);
        if max_radial <= min_radial {
            min_radial
        } else {
            let t = radial_fraction * 0.5 + 0.5;
            min_radial + t * (max_radial - min_radial)
        }
    };

    node.pos = center + direction * radial;
    node.vel = Vec2::ZERO;
    trace!(id = %node.id, x = node.pos.x, y = node.pos.y, "seeded node");
}

/// Farthest distance along `direction` from `center` at which a circle
/// of `radius` still fits inside the padded viewport. Computed per axis
/// against the box, not against an inscribed circle, so diagonal rays
/// can use the full corner room.
fn ray_limit(center: Vec2, direction: Vec2, dims: Dimensions, radius: f32) -> f32 {
    let mut limit = f32::MAX;

    let lo_x = EDGE_PADDING + radius;
    let hi_x = dims.width - EDGE_PADDING - radius;
    if direction.x > f32::EPSILON {
        limit = limit.min((hi_x - center.x) / direction.x);
    } else if direction.x < -f32::EPSILON {
        limit = limit.min((lo_x - center.x) / direction.x);
    }

    let lo_y = EDGE_PADDING + radius;
    let hi_y = dims.height - EDGE_PADDING - radius;
    if direction.y > f32::EPSILON {
        limit = limit.min((hi_y - center.y) / direction.y);
    } else if direction.y < -f32::EPSILON {
        limit = limit.min((lo_y - center.y) / direction.y);
    }

    limit.max(0.0)
}
