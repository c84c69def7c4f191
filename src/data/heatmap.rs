/// Gridded kernel density of feature positions, normalised to `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityGrid {
    min: [f64; 2],
    cell: [f64; 2],
    cols: usize,
    rows: usize,
    values: Vec<f32>,
}

impl DensityGrid {
    /// Accumulate a biweight kernel `(1 - d²)²` of `radius` (data units per
    /// axis) for each point over a `cols × rows` grid spanning `min..max`.
    pub fn build(
        points: impl IntoIterator<Item = [f64; 2]>,
        min: [f64; 2],
        max: [f64; 2],
        cols: usize,
        rows: usize,
        radius: [f64; 2],
    ) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        let cell = [(max[0] - min[0]) / cols as f64, (max[1] - min[1]) / rows as f64];
        let mut values = vec![0.0f32; cols * rows];

        if cell[0] > 0.0 && cell[1] > 0.0 && radius[0] > 0.0 && radius[1] > 0.0 {
            let reach_x = (radius[0] / cell[0]).ceil() as i64;
            let reach_y = (radius[1] / cell[1]).ceil() as i64;

            // Any point further out than this cannot reach the grid.
            let limit_x = cols as i64 + reach_x + 1;
            let limit_y = rows as i64 + reach_y + 1;

            for [x, y] in points {
                let cx = (((x - min[0]) / cell[0]).floor() as i64).clamp(-limit_x, limit_x);
                let cy = (((y - min[1]) / cell[1]).floor() as i64).clamp(-limit_y, limit_y);

                for row in (cy - reach_y).max(0)..=(cy + reach_y).min(rows as i64 - 1) {
                    for col in (cx - reach_x).max(0)..=(cx + reach_x).min(cols as i64 - 1) {
                        let centre_x = min[0] + (col as f64 + 0.5) * cell[0];
                        let centre_y = min[1] + (row as f64 + 0.5) * cell[1];
                        let dx = (centre_x - x) / radius[0];
                        let dy = (centre_y - y) / radius[1];
                        let d2 = dx * dx + dy * dy;
                        if d2 < 1.0 {
                            let w = 1.0 - d2;
                            values[row as usize * cols + col as usize] += (w * w) as f32;
                        }
                    }
                }
            }
        }

        let peak = values.iter().copied().fold(0.0f32, f32::max);
        if peak > 0.0 {
            values.iter_mut().for_each(|v| *v /= peak);
        }

        DensityGrid {
            min,
            cell,
            cols,
            rows,
            values,
        }
    }

    #[cfg(test)]
    pub fn value(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        self.values.get(row * self.cols + col).copied()
    }

    /// Non-empty cells as `([x0, y0], [x1, y1], density)`.
    pub fn cells(&self, threshold: f32) -> impl Iterator<Item = ([f64; 2], [f64; 2], f32)> + '_ {
        self.values.iter().enumerate().filter_map(move |(i, &v)| {
            if v <= threshold {
                return None;
            }
            let col = (i % self.cols) as f64;
            let row = (i / self.cols) as f64;
            let x0 = self.min[0] + col * self.cell[0];
            let y0 = self.min[1] + row * self.cell[1];
            Some(([x0, y0], [x0 + self.cell[0], y0 + self.cell[1]], v))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_point_peaks_at_its_cell() {
        let grid = DensityGrid::build([[5.0, 5.0]], [0.0, 0.0], [10.0, 10.0], 10, 10, [2.0, 2.0]);
        assert_eq!(grid.value(5, 5), Some(1.0));
        assert_eq!(grid.value(0, 0), Some(0.0));
        assert!(grid.value(4, 5).unwrap() > 0.0);
        assert_eq!(grid.value(10, 0), None);
    }

    #[test]
    fn denser_area_is_hotter() {
        let points = [[2.5, 2.5], [2.5, 2.5], [2.5, 2.5], [7.5, 7.5]];
        let grid = DensityGrid::build(points, [0.0, 0.0], [10.0, 10.0], 10, 10, [1.0, 1.0]);
        assert_eq!(grid.value(2, 2), Some(1.0));
        let cold = grid.value(7, 7).unwrap();
        assert!(cold > 0.3 && cold < 0.4);
    }

    #[test]
    fn empty_input_has_no_cells() {
        let grid = DensityGrid::build([], [0.0, 0.0], [1.0, 1.0], 4, 4, [0.5, 0.5]);
        assert_eq!(grid.cells(0.0).count(), 0);
    }

    #[test]
    fn far_away_points_are_ignored() {
        let points = [[1e300, 5.0], [f64::MAX, f64::MIN], [5.0, 5.0]];
        let grid = DensityGrid::build(points, [0.0, 0.0], [10.0, 10.0], 10, 10, [2.0, 2.0]);
        assert_eq!(grid.value(5, 5), Some(1.0));
        assert_eq!(grid.value(9, 5), Some(0.0));
    }

    #[test]
    fn points_outside_the_grid_still_contribute_at_the_edge() {
        let grid = DensityGrid::build([[-0.5, 5.0]], [0.0, 0.0], [10.0, 10.0], 10, 10, [2.0, 2.0]);
        assert!(grid.value(0, 5).unwrap() > 0.0);
        assert_eq!(grid.value(9, 5), Some(0.0));
    }
}
