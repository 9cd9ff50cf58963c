//! Grid-based pathfinding using the A* algorithm, and the path oracle the
//! enemy AI consumes.
//!
//! Path costs are integers so the open set orders deterministically; world
//! positions are converted to and from cell centres at the boundary.
//!
//! The AI never calls [`find_path`] directly. It goes through a
//! [`PathOracle`], which answers requests asynchronously: a request made
//! on one tick is resolved by the oracle's [`PathOracle::tick`] and can be
//! polled afterwards. Hosts with their own navigation backend implement
//! the trait; [`GridPathOracle`] is the built-in implementation.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::Vec2;

/// Cell types for navigation grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellType {
    /// Normal walkable terrain (cost: 1).
    #[default]
    Walkable,
    /// Impassable terrain.
    Blocked,
    /// Slow terrain with 2x movement cost.
    SlowTerrain,
}

impl CellType {
    /// Returns the movement cost for this cell type.
    /// Returns `None` for blocked cells.
    #[must_use]
    pub const fn movement_cost(self) -> Option<u32> {
        match self {
            Self::Walkable => Some(1),
            Self::Blocked => None,
            Self::SlowTerrain => Some(2),
        }
    }

    /// Returns true if this cell is walkable.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        !matches!(self, Self::Blocked)
    }
}

/// Navigation grid for pathfinding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavGrid {
    /// Grid width in cells.
    width: u32,
    /// Grid height in cells.
    height: u32,
    /// Cell data stored in row-major order.
    cells: Vec<CellType>,
    /// Size of each cell in world units.
    cell_size: f32,
    /// World position of the grid's lower-left corner.
    origin: Vec2,
}

impl NavGrid {
    /// Create a new navigation grid with all cells walkable.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] if `width` or `height` is zero,
    /// or if `cell_size` is not positive.
    pub fn new(width: u32, height: u32, cell_size: f32) -> Result<Self> {
        Self::with_origin(width, height, cell_size, Vec2::ZERO)
    }

    /// Create a grid whose cell (0, 0) starts at `origin`.
    ///
    /// # Errors
    ///
    /// Same as [`NavGrid::new`].
    pub fn with_origin(width: u32, height: u32, cell_size: f32, origin: Vec2) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(GameError::InvalidConfig(format!(
                "NavGrid dimensions must be positive, got {width}x{height}"
            )));
        }
        if !(cell_size > 0.0 && cell_size.is_finite()) {
            return Err(GameError::InvalidConfig(format!(
                "NavGrid cell_size must be positive, got {cell_size}"
            )));
        }

        let cell_count = (width as usize) * (height as usize);
        Ok(Self {
            width,
            height,
            cells: vec![CellType::Walkable; cell_count],
            cell_size,
            origin,
        })
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Cell size in world units.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    #[inline]
    fn coords_to_index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }

    /// Check if coordinates are within grid bounds.
    #[must_use]
    pub fn in_bounds(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    /// Get cell type at coordinates.
    /// Returns `None` if out of bounds.
    #[must_use]
    pub fn get_cell(&self, x: u32, y: u32) -> Option<CellType> {
        if self.in_bounds(x, y) {
            Some(self.cells[self.coords_to_index(x, y)])
        } else {
            None
        }
    }

    /// Set cell type at coordinates.
    /// Returns `false` if out of bounds.
    pub fn set_cell(&mut self, x: u32, y: u32, cell_type: CellType) -> bool {
        if self.in_bounds(x, y) {
            let index = self.coords_to_index(x, y);
            self.cells[index] = cell_type;
            true
        } else {
            false
        }
    }

    /// Check if a cell is walkable.
    #[must_use]
    pub fn is_walkable(&self, x: u32, y: u32) -> bool {
        self.get_cell(x, y).is_some_and(CellType::is_walkable)
    }

    /// Convert world position to grid coordinates.
    ///
    /// Returns `None` if the position is outside the grid bounds.
    #[must_use]
    pub fn world_to_grid(&self, pos: Vec2) -> Option<(u32, u32)> {
        let local = pos - self.origin;
        if !local.is_finite() || local.x < 0.0 || local.y < 0.0 {
            return None;
        }

        let x = (local.x / self.cell_size).floor() as i64;
        let y = (local.y / self.cell_size).floor() as i64;

        if x < i64::from(self.width) && y < i64::from(self.height) {
            Some((x as u32, y as u32))
        } else {
            None
        }
    }

    /// Convert grid coordinates to world position (center of cell).
    #[must_use]
    pub fn grid_to_world(&self, x: u32, y: u32) -> Vec2 {
        let half = self.cell_size / 2.0;
        self.origin
            + Vec2::new(
                x as f32 * self.cell_size + half,
                y as f32 * self.cell_size + half,
            )
    }

    /// Get movement cost for a cell.
    /// Returns `None` for blocked or out-of-bounds cells.
    #[must_use]
    pub fn movement_cost(&self, x: u32, y: u32) -> Option<u32> {
        self.get_cell(x, y).and_then(CellType::movement_cost)
    }
}

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct AStarNode {
    x: u32,
    y: u32,
    /// g + heuristic.
    f_score: u32,
    /// Lower coordinates first when f_scores are equal.
    tie_breaker: u64,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse for lowest f first.
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

/// Direction offsets for 8-directional movement.
const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Chebyshev distance heuristic (suitable for 8-directional movement).
#[inline]
fn chebyshev_heuristic(x1: u32, y1: u32, x2: u32, y2: u32) -> u32 {
    x1.abs_diff(x2).max(y1.abs_diff(y2))
}

/// Diagonal moves may not cut corners through blocked cells.
#[inline]
fn is_diagonal_valid(grid: &NavGrid, x: u32, y: u32, dx: i32, dy: i32) -> bool {
    if dx != 0 && dy != 0 {
        let check_x = (x as i32 + dx) as u32;
        let check_y = (y as i32 + dy) as u32;
        grid.is_walkable(check_x, y) && grid.is_walkable(x, check_y)
    } else {
        true
    }
}

fn no_path(start: Vec2, goal: Vec2) -> GameError {
    GameError::PathNotFound {
        from_x: start.x,
        from_y: start.y,
        to_x: goal.x,
        to_y: goal.y,
    }
}

/// Find a path from start to goal using A* algorithm.
///
/// Returns the cell-centre waypoints from the start cell to the goal cell.
///
/// # Errors
///
/// Returns [`GameError::PathNotFound`] if start or goal is outside the grid
/// or blocked, or if no path connects them.
pub fn find_path(grid: &NavGrid, start: Vec2, goal: Vec2) -> Result<Vec<Vec2>> {
    let (start_x, start_y) = grid.world_to_grid(start).ok_or_else(|| no_path(start, goal))?;
    let (goal_x, goal_y) = grid.world_to_grid(goal).ok_or_else(|| no_path(start, goal))?;

    if !grid.is_walkable(start_x, start_y) || !grid.is_walkable(goal_x, goal_y) {
        return Err(no_path(start, goal));
    }

    if start_x == goal_x && start_y == goal_y {
        return Ok(vec![grid.grid_to_world(start_x, start_y)]);
    }

    find_path_grid(grid, (start_x, start_y), (goal_x, goal_y))
        .ok_or_else(|| no_path(start, goal))
}

fn find_path_grid(grid: &NavGrid, start: (u32, u32), goal: (u32, u32)) -> Option<Vec<Vec2>> {
    let mut open_set: BinaryHeap<AStarNode> = BinaryHeap::new();
    let mut came_from: HashMap<(u32, u32), (u32, u32)> = HashMap::new();
    let mut g_score: HashMap<(u32, u32), u32> = HashMap::new();

    g_score.insert(start, 0);
    open_set.push(AStarNode {
        x: start.0,
        y: start.1,
        f_score: chebyshev_heuristic(start.0, start.1, goal.0, goal.1),
        tie_breaker: coords_to_tie_breaker(start.0, start.1),
    });

    while let Some(current) = open_set.pop() {
        if (current.x, current.y) == goal {
            return Some(reconstruct_path(grid, &came_from, goal));
        }

        let current_g = g_score
            .get(&(current.x, current.y))
            .copied()
            .unwrap_or(u32::MAX);

        for &(dx, dy) in &DIRECTIONS {
            let nx = current.x as i32 + dx;
            let ny = current.y as i32 + dy;
            if nx < 0 || ny < 0 {
                continue;
            }
            let (nx, ny) = (nx as u32, ny as u32);

            let Some(cell_cost) = grid.movement_cost(nx, ny) else {
                continue;
            };
            if !is_diagonal_valid(grid, current.x, current.y, dx, dy) {
                continue;
            }

            let tentative_g = current_g.saturating_add(cell_cost);
            let neighbor_g = g_score.get(&(nx, ny)).copied().unwrap_or(u32::MAX);

            if tentative_g < neighbor_g {
                came_from.insert((nx, ny), (current.x, current.y));
                g_score.insert((nx, ny), tentative_g);
                open_set.push(AStarNode {
                    x: nx,
                    y: ny,
                    f_score: tentative_g + chebyshev_heuristic(nx, ny, goal.0, goal.1),
                    tie_breaker: coords_to_tie_breaker(nx, ny),
                });
            }
        }
    }

    None
}

#[inline]
fn coords_to_tie_breaker(x: u32, y: u32) -> u64 {
    (u64::from(y) << 32) | u64::from(x)
}

fn reconstruct_path(
    grid: &NavGrid,
    came_from: &HashMap<(u32, u32), (u32, u32)>,
    goal: (u32, u32),
) -> Vec<Vec2> {
    let mut path = vec![grid.grid_to_world(goal.0, goal.1)];
    let mut current = goal;

    while let Some(&prev) = came_from.get(&current) {
        path.push(grid.grid_to_world(prev.0, prev.1));
        current = prev;
    }

    path.reverse();
    path
}

/// Smooth a path by removing unnecessary waypoints.
///
/// Uses line-of-sight checks to skip intermediate waypoints while
/// ensuring the path doesn't cut through obstacles.
#[must_use]
pub fn smooth_path(grid: &NavGrid, path: Vec<Vec2>) -> Vec<Vec2> {
    if path.len() <= 2 {
        return path;
    }

    let mut smoothed = Vec::with_capacity(path.len());
    smoothed.push(path[0]);

    let mut current_idx = 0;
    while current_idx < path.len() - 1 {
        let mut furthest_visible = current_idx + 1;
        for check_idx in (current_idx + 2)..path.len() {
            if has_line_of_sight(grid, path[current_idx], path[check_idx]) {
                furthest_visible = check_idx;
            }
        }
        smoothed.push(path[furthest_visible]);
        current_idx = furthest_visible;
    }

    smoothed
}

/// Bresenham walk through grid cells between two world positions.
fn has_line_of_sight(grid: &NavGrid, start: Vec2, end: Vec2) -> bool {
    let Some((x0, y0)) = grid.world_to_grid(start) else {
        return false;
    };
    let Some((x1, y1)) = grid.world_to_grid(end) else {
        return false;
    };

    let dx = (x1 as i32 - x0 as i32).abs();
    let dy = (y1 as i32 - y0 as i32).abs();
    let sx = if x0 < x1 { 1i32 } else { -1i32 };
    let sy = if y0 < y1 { 1i32 } else { -1i32 };
    let mut err = dx - dy;

    let mut x = x0 as i32;
    let mut y = y0 as i32;

    loop {
        if !grid.is_walkable(x as u32, y as u32) {
            return false;
        }
        if x == x1 as i32 && y == y1 as i32 {
            break;
        }

        let e2 = 2 * err;
        if e2 > -dy && e2 < dx {
            let next_x = x + sx;
            let next_y = y + sy;
            if !grid.is_walkable(next_x as u32, y as u32)
                || !grid.is_walkable(x as u32, next_y as u32)
            {
                return false;
            }
        }
        if e2 > -dy {
            err -= dy;
            x += sx;
        }
        if e2 < dx {
            err += dx;
            y += sy;
        }
    }

    true
}

// ============================================================================
// Path oracle
// ============================================================================

/// Handle for an outstanding path request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathTicket(pub u64);

/// Black-box waypoint producer consumed by the enemy AI.
pub trait PathOracle {
    /// Ask for a path. The answer is available from [`poll`](Self::poll)
    /// after the next [`tick`](Self::tick) at the earliest.
    fn request(&mut self, start: Vec2, goal: Vec2) -> PathTicket;

    /// Take the answer for a ticket if it is ready.
    fn poll(&mut self, ticket: PathTicket) -> Option<Result<Vec<Vec2>>>;

    /// Drop a request whose answer is no longer wanted.
    fn cancel(&mut self, ticket: PathTicket);

    /// Resolve pending requests.
    fn tick(&mut self);
}

#[derive(Debug)]
enum Request {
    Pending { start: Vec2, goal: Vec2 },
    Done(Result<Vec<Vec2>>),
}

/// [`PathOracle`] backed by A* over a [`NavGrid`].
#[derive(Debug)]
pub struct GridPathOracle {
    grid: NavGrid,
    smooth: bool,
    requests: BTreeMap<PathTicket, Request>,
    next_ticket: u64,
}

impl GridPathOracle {
    /// Create an oracle over `grid`, smoothing results when `smooth` is set.
    #[must_use]
    pub fn new(grid: NavGrid, smooth: bool) -> Self {
        Self {
            grid,
            smooth,
            requests: BTreeMap::new(),
            next_ticket: 0,
        }
    }

    /// The underlying grid.
    #[must_use]
    pub const fn grid(&self) -> &NavGrid {
        &self.grid
    }

    /// Number of requests not yet polled.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.requests.len()
    }
}

impl PathOracle for GridPathOracle {
    fn request(&mut self, start: Vec2, goal: Vec2) -> PathTicket {
        let ticket = PathTicket(self.next_ticket);
        self.next_ticket += 1;
        self.requests.insert(ticket, Request::Pending { start, goal });
        ticket
    }

    fn poll(&mut self, ticket: PathTicket) -> Option<Result<Vec<Vec2>>> {
        match self.requests.remove(&ticket)? {
            Request::Done(result) => Some(result),
            pending @ Request::Pending { .. } => {
                self.requests.insert(ticket, pending);
                None
            }
        }
    }

    fn cancel(&mut self, ticket: PathTicket) {
        self.requests.remove(&ticket);
    }

    fn tick(&mut self) {
        for request in self.requests.values_mut() {
            if let Request::Pending { start, goal } = *request {
                let result = find_path(&self.grid, start, goal).map(|path| {
                    if self.smooth {
                        smooth_path(&self.grid, path)
                    } else {
                        path
                    }
                });
                *request = Request::Done(result);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(w: u32, h: u32) -> NavGrid {
        NavGrid::new(w, h, 1.0).unwrap()
    }

    fn vec2(x: f32, y: f32) -> Vec2 {
        Vec2::new(x, y)
    }

    #[test]
    fn test_cell_type_costs() {
        assert_eq!(CellType::Walkable.movement_cost(), Some(1));
        assert_eq!(CellType::Blocked.movement_cost(), None);
        assert_eq!(CellType::SlowTerrain.movement_cost(), Some(2));
    }

    #[test]
    fn test_invalid_grid_rejected() {
        assert!(NavGrid::new(0, 10, 1.0).is_err());
        assert!(NavGrid::new(10, 10, 0.0).is_err());
        assert!(NavGrid::new(10, 10, f32::NAN).is_err());
    }

    #[test]
    fn test_world_to_grid_conversion() {
        let grid = NavGrid::new(10, 10, 2.0).unwrap();
        assert_eq!(grid.world_to_grid(vec2(1.0, 1.0)), Some((0, 0)));
        assert_eq!(grid.world_to_grid(vec2(3.0, 3.0)), Some((1, 1)));
        assert_eq!(grid.world_to_grid(vec2(19.0, 19.0)), Some((9, 9)));
        assert_eq!(grid.world_to_grid(vec2(20.0, 20.0)), None);
        assert_eq!(grid.world_to_grid(vec2(-1.0, 0.0)), None);
    }

    #[test]
    fn test_grid_origin_offset() {
        let grid = NavGrid::with_origin(4, 4, 1.0, vec2(-2.0, -2.0)).unwrap();
        assert_eq!(grid.world_to_grid(vec2(-1.5, -1.5)), Some((0, 0)));
        assert_eq!(grid.grid_to_world(3, 3), vec2(1.5, 1.5));
    }

    #[test]
    fn test_simple_path() {
        let path = find_path(&grid(10, 10), vec2(0.5, 0.5), vec2(5.5, 5.5)).unwrap();
        let last = path.last().unwrap();
        assert_eq!(*last, vec2(5.5, 5.5));
        assert_eq!(path.len(), 6);
    }

    #[test]
    fn test_path_around_obstacle() {
        let mut grid = grid(10, 10);
        for y in 2..8 {
            grid.set_cell(5, y, CellType::Blocked);
        }

        let path = find_path(&grid, vec2(2.5, 5.5), vec2(8.5, 5.5)).unwrap();
        assert!(!path.is_empty());
        for point in &path {
            let (gx, gy) = grid.world_to_grid(*point).unwrap();
            assert!(grid.is_walkable(gx, gy), "path crosses ({gx}, {gy})");
        }
    }

    #[test]
    fn test_no_path_exists() {
        let mut grid = grid(10, 10);
        for y in 0..10 {
            grid.set_cell(5, y, CellType::Blocked);
        }
        let result = find_path(&grid, vec2(2.5, 5.5), vec2(8.5, 5.5));
        assert!(matches!(result, Err(GameError::PathNotFound { .. })));
    }

    #[test]
    fn test_blocked_goal() {
        let mut grid = grid(10, 10);
        grid.set_cell(5, 5, CellType::Blocked);
        assert!(find_path(&grid, vec2(0.5, 0.5), vec2(5.5, 5.5)).is_err());
    }

    #[test]
    fn test_path_to_same_cell() {
        let path = find_path(&grid(10, 10), vec2(5.2, 5.2), vec2(5.8, 5.8)).unwrap();
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn test_path_smoothing() {
        let path = vec![
            vec2(0.5, 0.5),
            vec2(1.5, 1.5),
            vec2(2.5, 2.5),
            vec2(3.5, 3.5),
        ];
        let smoothed = smooth_path(&grid(10, 10), path);
        assert_eq!(smoothed, vec![vec2(0.5, 0.5), vec2(3.5, 3.5)]);
    }

    #[test]
    fn test_determinism() {
        let mut grid = grid(20, 20);
        for i in 5..15 {
            grid.set_cell(10, i, CellType::Blocked);
        }
        let a = find_path(&grid, vec2(5.5, 10.5), vec2(15.5, 10.5)).unwrap();
        let b = find_path(&grid, vec2(5.5, 10.5), vec2(15.5, 10.5)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_chebyshev_heuristic() {
        assert_eq!(chebyshev_heuristic(0, 0, 5, 5), 5);
        assert_eq!(chebyshev_heuristic(0, 0, 3, 7), 7);
        assert_eq!(chebyshev_heuristic(5, 5, 5, 5), 0);
    }

    #[test]
    fn test_oracle_answers_after_tick() {
        let mut oracle = GridPathOracle::new(grid(10, 10), true);
        let ticket = oracle.request(vec2(0.5, 0.5), vec2(8.5, 0.5));

        assert!(oracle.poll(ticket).is_none());
        oracle.tick();
        let path = oracle.poll(ticket).unwrap().unwrap();
        assert_eq!(path.last().copied(), Some(vec2(8.5, 0.5)));
        assert!(oracle.poll(ticket).is_none());
        assert_eq!(oracle.outstanding(), 0);
    }

    #[test]
    fn test_oracle_reports_failure() {
        let mut oracle = GridPathOracle::new(grid(4, 4), false);
        let ticket = oracle.request(vec2(0.5, 0.5), vec2(40.0, 40.0));
        oracle.tick();
        assert!(oracle.poll(ticket).unwrap().is_err());
    }

    #[test]
    fn test_oracle_cancel() {
        let mut oracle = GridPathOracle::new(grid(4, 4), false);
        let ticket = oracle.request(vec2(0.5, 0.5), vec2(3.5, 3.5));
        oracle.cancel(ticket);
        oracle.tick();
        assert!(oracle.poll(ticket).is_none());
    }
}
