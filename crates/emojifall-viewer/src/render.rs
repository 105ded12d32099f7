//! Character-grid rasterizer for the gravity world.
//!
//! The browser installation draws sprites on a canvas; the terminal
//! viewer gets the same scene as a grid of cells, one emoji per body,
//! with a ground line along the bottom edge and the center obstacle
//! shaded in. World pixels scale linearly onto the grid.

use emojifall_sim::{BodySnapshot, StaticKind, WorldConfig};

/// Cell drawn where nothing else is.
const EMPTY_CELL: &str = " ";

/// Cell drawn along the ground line.
const GROUND_CELL: &str = "─";

/// Cell drawn inside the center obstacle.
const OBSTACLE_CELL: &str = "▒";

/// Map a world coordinate to a grid cell index.
///
/// Returns `None` for positions outside the visible range (bodies above
/// the top edge have not entered the picture yet).
// The value is clamped non-negative and below `cells` before conversion,
// so the cast cannot truncate into a wrong cell.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn cell_index(position: f64, world_extent: f64, cells: usize) -> Option<usize> {
    if !position.is_finite() || position < 0.0 || world_extent <= 0.0 {
        return None;
    }
    let scaled = (position / world_extent) * cells_as_f64(cells);
    if scaled < 0.0 {
        return None;
    }
    let index = scaled.floor() as usize;
    if index >= cells { None } else { Some(index) }
}

// Grids are tens of cells wide; precision loss is impossible at that size.
#[allow(clippy::cast_precision_loss)]
const fn cells_as_f64(cells: usize) -> f64 {
    cells as f64
}

/// Rasterize one snapshot of the world into a printable frame.
///
/// `columns` x `rows` is the output size in cells; the final row is the
/// ground line.
pub fn render_frame(
    snapshot: &[BodySnapshot],
    config: &WorldConfig,
    obstacle: Option<(f64, f64)>,
    columns: usize,
    rows: usize,
) -> String {
    if columns == 0 || rows == 0 {
        return String::new();
    }

    let mut cells: Vec<Vec<&str>> = vec![vec![EMPTY_CELL; columns]; rows];

    // Ground line along the bottom row.
    if let Some(bottom) = cells.last_mut() {
        for cell in bottom.iter_mut() {
            *cell = GROUND_CELL;
        }
    }

    // Center obstacle, if installed.
    if let Some((width, height)) = obstacle {
        shade_obstacle(&mut cells, config, width, height, columns, rows);
    }

    // Bodies draw over everything else.
    for body in snapshot {
        let Some(column) = cell_index(body.position.x, config.width, columns) else {
            continue;
        };
        let Some(row) = cell_index(body.position.y, config.height, rows) else {
            continue;
        };
        if let Some(cell) = cells.get_mut(row).and_then(|r| r.get_mut(column)) {
            *cell = body.emoji.as_str();
        }
    }

    let mut frame = String::new();
    for row in &cells {
        frame.extend(row.iter().copied());
        frame.push('\n');
    }
    frame
}

/// Shade the cells covered by the center obstacle rectangle.
fn shade_obstacle(
    cells: &mut [Vec<&str>],
    config: &WorldConfig,
    width: f64,
    height: f64,
    columns: usize,
    rows: usize,
) {
    let center_x = config.width / 2.0;
    let center_y = config.height / 2.0;
    let min_x = center_x - width / 2.0;
    let max_x = center_x + width / 2.0;
    let min_y = center_y - height / 2.0;
    let max_y = center_y + height / 2.0;

    let Some(first_column) = cell_index(min_x, config.width, columns) else {
        return;
    };
    let Some(last_column) = cell_index(max_x, config.width, columns) else {
        return;
    };
    let Some(first_row) = cell_index(min_y, config.height, rows) else {
        return;
    };
    let Some(last_row) = cell_index(max_y, config.height, rows) else {
        return;
    };

    for row in first_row..=last_row {
        for column in first_column..=last_column {
            if let Some(cell) = cells.get_mut(row).and_then(|r| r.get_mut(column)) {
                *cell = OBSTACLE_CELL;
            }
        }
    }
}
