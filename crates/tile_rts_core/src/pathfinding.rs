//! Grid-based pathfinding using A* algorithm.
//!
//! Costs are integers (orthogonal step 10, diagonal step 14) so results are
//! identical on every platform. Only off-grid, blocked, and wall tiles stop
//! movement; resource tiles are passable and diagonal steps may cut corners.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::map::Map;
use crate::math::Tile;

/// Default cap on node expansions per search.
pub const DEFAULT_MAX_NODES: usize = 8192;

/// Cost of an orthogonal step.
const ORTHOGONAL_COST: i32 = 10;

/// Cost of a diagonal step (approximation of 10 * sqrt(2)).
const DIAGONAL_COST: i32 = 14;

/// Orthogonal direction offsets.
const DIRECTIONS_4: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Direction offsets for 8-directional movement; orthogonal moves first.
const DIRECTIONS_8: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// Which neighbours a unit may step to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Connectivity {
    /// North, south, east, west.
    Four,
    /// Orthogonal plus diagonal.
    #[default]
    Eight,
}

impl Connectivity {
    fn directions(self) -> &'static [(i32, i32)] {
        match self {
            Self::Four => &DIRECTIONS_4,
            Self::Eight => &DIRECTIONS_8,
        }
    }

    /// Admissible heuristic for this movement model, in cost units.
    fn heuristic(self, from: Tile, to: Tile) -> i32 {
        let dx = (from.x - to.x).abs();
        let dy = (from.y - to.y).abs();
        match self {
            Self::Four => (dx + dy) * ORTHOGONAL_COST,
            Self::Eight => {
                let (lo, hi) = if dx < dy { (dx, dy) } else { (dy, dx) };
                hi * ORTHOGONAL_COST + lo * (DIAGONAL_COST - ORTHOGONAL_COST)
            }
        }
    }
}

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct AStarNode {
    index: usize,
    g_score: i32,
    /// f_score = g_score + heuristic
    f_score: i32,
    /// Insertion sequence; earlier pushes win ties.
    tie_breaker: u64,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap, so we reverse the comparison for min-heap behavior.
        match other.f_score.cmp(&self.f_score) {
            Ordering::Equal => other.tie_breaker.cmp(&self.tie_breaker),
            ord => ord,
        }
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find a path from `start` to `goal`.
///
/// Returns the waypoints to traverse, excluding `start` and ending at
/// `goal`; an empty path when `start == goal`. Returns `None` if the goal
/// is unreachable, out of bounds, or the search expands more than
/// `max_nodes` nodes.
#[must_use]
pub fn find_path(
    map: &Map,
    start: Tile,
    goal: Tile,
    connectivity: Connectivity,
    max_nodes: usize,
) -> Option<Vec<Tile>> {
    if start == goal {
        return Some(Vec::new());
    }
    let start_index = map.index(start)?;
    let goal_index = map.index(goal)?;

    let cells = (map.width() as usize) * (map.height() as usize);
    let mut g_score = vec![i32::MAX; cells];
    let mut came_from: Vec<Option<usize>> = vec![None; cells];
    let mut open_set = BinaryHeap::new();
    let mut sequence: u64 = 0;

    g_score[start_index] = 0;
    open_set.push(AStarNode {
        index: start_index,
        g_score: 0,
        f_score: connectivity.heuristic(start, goal),
        tie_breaker: sequence,
    });

    let mut expanded = 0usize;
    while let Some(current) = open_set.pop() {
        // Stale entry superseded by a cheaper push.
        if current.g_score > g_score[current.index] {
            continue;
        }

        expanded += 1;
        if expanded > max_nodes {
            tracing::debug!(%start, %goal, max_nodes, "Path search exceeded node budget");
            return None;
        }

        if current.index == goal_index {
            return Some(reconstruct_path(map, &came_from, start_index, goal_index));
        }

        let here = map.tile_at_index(current.index);
        for (i, &(dx, dy)) in connectivity.directions().iter().enumerate() {
            let next = here.offset(dx, dy);
            if !map.is_walkable(next) {
                continue;
            }
            let Some(next_index) = map.index(next) else {
                continue;
            };

            let step = if i < 4 { ORTHOGONAL_COST } else { DIAGONAL_COST };
            let tentative_g = current.g_score + step;
            if tentative_g < g_score[next_index] {
                g_score[next_index] = tentative_g;
                came_from[next_index] = Some(current.index);
                sequence += 1;
                open_set.push(AStarNode {
                    index: next_index,
                    g_score: tentative_g,
                    f_score: tentative_g + connectivity.heuristic(next, goal),
                    tie_breaker: sequence,
                });
            }
        }
    }

    None
}

/// Walk parent links from the goal back to the start.
fn reconstruct_path(
    map: &Map,
    came_from: &[Option<usize>],
    start_index: usize,
    goal_index: usize,
) -> Vec<Tile> {
    let mut path = Vec::new();
    let mut current = goal_index;
    while current != start_index {
        path.push(map.tile_at_index(current));
        match came_from[current] {
            Some(prev) => current = prev,
            None => break,
        }
    }
    path.reverse();
    path
}
