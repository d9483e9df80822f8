//! Per-player heatmaps: position occupancy, touch density, and boost pickup
//! density over a 24x16 grid of the full pitch.

use ndarray::Array2;
use serde::Serialize;

use crate::constants::{BACK_WALL_Y, SIDE_WALL_X};
use crate::events::types::{EventsBundle, PadType};
use crate::math::Vec3;
use crate::normalize::Frame;

const X_BINS: usize = 24;
const Y_BINS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridExtent {
    pub xmin: f32,
    pub xmax: f32,
    pub ymin: f32,
    pub ymax: f32,
}

impl GridExtent {
    fn full_pitch() -> Self {
        Self {
            xmin: -SIDE_WALL_X,
            xmax: SIDE_WALL_X,
            ymin: -BACK_WALL_Y,
            ymax: BACK_WALL_Y,
        }
    }
}

/// A normalized grid with values in [0, 1], serialized row by row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapGrid {
    pub x_bins: usize,
    pub y_bins: usize,
    pub extent: GridExtent,
    pub values: Vec<Vec<f32>>,
}

impl HeatmapGrid {
    fn from_array(grid: Array2<f32>, extent: GridExtent) -> Self {
        Self {
            x_bins: grid.ncols(),
            y_bins: grid.nrows(),
            extent,
            values: grid.outer_iter().map(|row| row.to_vec()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heatmaps {
    pub position_occupancy_grid: HeatmapGrid,
    pub touch_density_grid: HeatmapGrid,
    pub boost_pickup_grid: HeatmapGrid,
}

fn grid_coords(position: Vec3, extent: &GridExtent) -> (usize, usize) {
    let x_norm = (position.x - extent.xmin) / (extent.xmax - extent.xmin);
    let y_norm = (position.y - extent.ymin) / (extent.ymax - extent.ymin);
    let x_idx = ((x_norm * X_BINS as f32) as isize).clamp(0, X_BINS as isize - 1) as usize;
    let y_idx = ((y_norm * Y_BINS as f32) as isize).clamp(0, Y_BINS as isize - 1) as usize;
    (x_idx, y_idx)
}

/// Generate position, touch, and boost pickup heatmaps for one player.
pub fn generate_heatmaps(frames: &[Frame], player_id: &str, events: &EventsBundle) -> Heatmaps {
    let extent = GridExtent::full_pitch();

    // Occupancy normalizes to per-frame share.
    let mut position_grid = Array2::<f32>::zeros((Y_BINS, X_BINS));
    let mut total_frames = 0u64;
    for frame in frames {
        let Some(player) = frame.player(player_id) else {
            continue;
        };
        let (x, y) = grid_coords(player.position, &extent);
        position_grid[[y, x]] += 1.0;
        total_frames += 1;
    }
    if total_frames > 0 {
        position_grid.mapv_inplace(|v| v / total_frames as f32);
    }

    // Touch density is max-normalized.
    let mut touch_grid = Array2::<f32>::zeros((Y_BINS, X_BINS));
    for touch in events.touches.iter().filter(|t| t.player_id == player_id) {
        let (x, y) = grid_coords(touch.location, &extent);
        touch_grid[[y, x]] += 1.0;
    }
    max_normalize(&mut touch_grid);

    // Pickups are max-normalized with big pads double-weighted.
    let mut boost_grid = Array2::<f32>::zeros((Y_BINS, X_BINS));
    for pickup in events
        .boost_pickups
        .iter()
        .filter(|p| p.player_id == player_id)
    {
        let (x, y) = grid_coords(pickup.location, &extent);
        let weight = if pickup.pad_type == PadType::Big {
            2.0
        } else {
            1.0
        };
        boost_grid[[y, x]] += weight;
    }
    max_normalize(&mut boost_grid);

    Heatmaps {
        position_occupancy_grid: HeatmapGrid::from_array(position_grid, extent),
        touch_density_grid: HeatmapGrid::from_array(touch_grid, extent),
        boost_pickup_grid: HeatmapGrid::from_array(boost_grid, extent),
    }
}

fn max_normalize(grid: &mut Array2<f32>) {
    let max = grid.iter().cloned().fold(0.0f32, f32::max);
    if max > 0.0 {
        grid.mapv_inplace(|v| v / max);
    }
}
