use intentsim_data::Position;

/// Cell edge of the neighbour index used by the interaction pass.
pub const INDEX_CELL_SIZE: f64 = 20.0;
/// Upper bound on grid cells; larger domains get a coarser grid.
pub const MAX_INDEX_CELLS: usize = 1 << 21;

fn axis_len(extent: f64, cell_size: f64) -> usize {
    let n = (extent / cell_size).ceil();
    if n.is_finite() && n >= 1.0 {
        n as usize
    } else {
        1
    }
}

fn product(dims: [usize; 3]) -> Option<usize> {
    dims[0].checked_mul(dims[1])?.checked_mul(dims[2])
}

#[derive(Clone, Debug, Default)]
/// Uniform 3-D grid over particle positions for neighbour queries.
///
/// Uses the "offset array" layout (like compressed sparse rows):
/// `cell_offsets[i]..cell_offsets[i + 1]` indexes into `entity_indices` for
/// every particle in cell `i`. Within a cell, indices keep insertion order.
///
/// Positions outside the domain are clamped into the border cells instead of
/// being dropped, so a query never misses a particle that is actually within
/// range. Callers still check exact distances.
///
/// # Examples
/// ```
/// use intentsim_core::spatial_hash::SpatialHash;
/// use intentsim_data::Position;
///
/// let positions = vec![
///     Position::new(15.0, 15.0, 1.0),
///     Position::new(25.0, 25.0, 1.0),
///     Position::new(85.0, 85.0, 1.0),
/// ];
/// let mut spatial = SpatialHash::new(10.0, 100.0, 100.0, 10.0);
/// spatial.build(&positions);
///
/// let mut nearby = Vec::new();
/// spatial.query_into(&Position::new(15.0, 15.0, 1.0), 20.0, &mut nearby);
/// assert!(nearby.contains(&0) && nearby.contains(&1));
/// ```
pub struct SpatialHash {
    pub cell_size: f64,
    pub width: f64,
    pub height: f64,
    pub depth: f64,
    pub cols: usize,
    pub rows: usize,
    pub layers: usize,
    pub cell_offsets: Vec<usize>,
    pub entity_indices: Vec<usize>,
}

impl SpatialHash {
    /// Creates an empty hash covering `width x height x depth` world units.
    pub fn new(cell_size: f64, width: f64, height: f64, depth: f64) -> Self {
        let mut hash = Self {
            cell_size,
            ..Default::default()
        };
        hash.resize(width, height, depth);
        hash
    }

    /// Cells needed to cover the extent at `cell_size`, or `None` on overflow.
    #[must_use]
    pub fn cell_count(cell_size: f64, width: f64, height: f64, depth: f64) -> Option<usize> {
        product([
            axis_len(width, cell_size),
            axis_len(height, cell_size),
            axis_len(depth, cell_size),
        ])
    }

    fn resize(&mut self, width: f64, height: f64, depth: f64) {
        self.width = width;
        self.height = height;
        self.depth = depth;
        let mut dims = [
            axis_len(width, self.cell_size),
            axis_len(height, self.cell_size),
            axis_len(depth, self.cell_size),
        ];
        // Past the cap, halve the longest axis. Positions beyond the last
        // cell clamp into it, so queries still see every candidate.
        while product(dims).map_or(true, |n| n > MAX_INDEX_CELLS) {
            let longest = (0..3).max_by_key(|&i| dims[i]).unwrap_or(0);
            dims[longest] = (dims[longest] / 2).max(1);
        }
        [self.cols, self.rows, self.layers] = dims;
        self.cell_offsets.clear();
        self.cell_offsets
            .resize(self.cols * self.rows * self.layers + 1, 0);
        self.entity_indices.clear();
    }

    #[inline]
    fn axis_cell(&self, coord: f64, len: usize) -> usize {
        let c = (coord / self.cell_size).floor();
        if c.is_nan() {
            0
        } else {
            c.clamp(0.0, (len - 1) as f64) as usize
        }
    }

    #[inline]
    fn flat(&self, cx: usize, cy: usize, cz: usize) -> usize {
        (cz * self.rows + cy) * self.cols + cx
    }

    /// Flat cell index containing a position (clamped into the grid).
    #[inline]
    pub fn get_cell_idx(&self, position: &Position) -> usize {
        self.flat(
            self.axis_cell(position.x, self.cols),
            self.axis_cell(position.y, self.rows),
            self.axis_cell(position.z, self.layers),
        )
    }

    /// Rebuilds the index from scratch. Entity `i` is `positions[i]`.
    pub fn build(&mut self, positions: &[Position]) {
        let cell_count = self.cols * self.rows * self.layers;
        let mut counts = vec![0usize; cell_count];
        for p in positions {
            counts[self.get_cell_idx(p)] += 1;
        }

        self.cell_offsets.resize(cell_count + 1, 0);
        let mut total = 0;
        for (i, &count) in counts.iter().enumerate() {
            self.cell_offsets[i] = total;
            total += count;
        }
        self.cell_offsets[cell_count] = total;

        self.entity_indices.clear();
        self.entity_indices.resize(positions.len(), 0);
        let mut cursor = self.cell_offsets[..cell_count].to_vec();
        for (entity_idx, p) in positions.iter().enumerate() {
            let cell = self.get_cell_idx(p);
            self.entity_indices[cursor[cell]] = entity_idx;
            cursor[cell] += 1;
        }
    }

    fn cell_range(&self, center: f64, radius: f64, len: usize) -> (usize, usize) {
        (
            self.axis_cell(center - radius, len),
            self.axis_cell(center + radius, len),
        )
    }

    /// Invokes `callback` with every entity whose cell intersects the query cube.
    pub fn query_callback<F>(&self, center: &Position, radius: f64, mut callback: F)
    where
        F: FnMut(usize),
    {
        let (min_cx, max_cx) = self.cell_range(center.x, radius, self.cols);
        let (min_cy, max_cy) = self.cell_range(center.y, radius, self.rows);
        let (min_cz, max_cz) = self.cell_range(center.z, radius, self.layers);

        for cz in min_cz..=max_cz {
            for cy in min_cy..=max_cy {
                for cx in min_cx..=max_cx {
                    let cell_idx = self.flat(cx, cy, cz);
                    let start = self.cell_offsets[cell_idx];
                    let end = self.cell_offsets[cell_idx + 1];
                    for &entity_idx in &self.entity_indices[start..end] {
                        callback(entity_idx);
                    }
                }
            }
        }
    }

    #[inline]
    pub fn query_into(&self, center: &Position, radius: f64, result: &mut Vec<usize>) {
        result.clear();
        self.query_callback(center, radius, |idx| result.push(idx));
    }
}
