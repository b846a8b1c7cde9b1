//! The intent field: a 3-D scalar grid in `[-1, 1]`.
//!
//! Cells live in one flat row-major buffer indexed `(z * height + y) * width + x`
//! and are mutated in place. Every write goes through [`clamp_unit`], so the
//! range invariant holds after any sequence of operations.

use crate::config::{Domain, FieldTuning};
use crate::error::{Result, SimError};
use intentsim_data::{Charge, Particle, Position};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Band used to classify cells as positive, negative or neutral for analysis.
pub const REGION_THRESHOLD: f64 = 0.3;

/// Clamps to `[-1, 1]`, collapsing NaN to zero.
#[inline]
#[must_use]
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}

#[inline]
fn region_of(value: f64) -> i8 {
    if value > REGION_THRESHOLD {
        1
    } else if value < -REGION_THRESHOLD {
        -1
    } else {
        0
    }
}

/// Nearest index along one axis, clamped into `[0, len)`.
#[inline]
fn nearest_index(coord: f64, len: usize) -> usize {
    let rounded = coord.round();
    if rounded.is_nan() {
        0
    } else {
        rounded.clamp(0.0, (len - 1) as f64) as usize
    }
}

/// A propagating sinusoidal wave superimposed on the field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wave {
    pub origin: (usize, usize, usize),
    pub wavelength: f64,
    pub strength: f64,
}

/// A localised positive or negative blob.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    pub center: (usize, usize, usize),
    pub radius: usize,
    pub positive: bool,
}

/// What a single field update did.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FieldPulse {
    pub activated_cells: usize,
    pub wave: Option<Wave>,
    pub hotspot: Option<Hotspot>,
}

/// Summary statistics of the field, computed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldAnalysis {
    pub average: f64,
    pub variance: f64,
    pub positive_fraction: f64,
    pub negative_fraction: f64,
    pub neutral_fraction: f64,
    /// Mean absolute difference between axis-adjacent cells.
    pub gradient_strength: f64,
    /// Mean squared cell value.
    pub field_energy: f64,
    /// Cell count of the largest 6-connected same-region patch.
    pub largest_region: usize,
    pub pattern_complexity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntentField {
    width: usize,
    height: usize,
    depth: usize,
    cells: Vec<f64>,
}

impl IntentField {
    /// Creates a field with every cell uniform in `[-1, 1]`.
    pub fn new_random<R: Rng>(width: usize, height: usize, depth: usize, rng: &mut R) -> Self {
        let size = width * height * depth;
        let cells = (0..size).map(|_| rng.gen::<f64>() * 2.0 - 1.0).collect();
        Self {
            width,
            height,
            depth,
            cells,
        }
    }

    /// Creates a field with every cell set to `value` (clamped).
    #[must_use]
    pub fn filled(width: usize, height: usize, depth: usize, value: f64) -> Self {
        Self {
            width,
            height,
            depth,
            cells: vec![clamp_unit(value); width * height * depth],
        }
    }

    /// Rebuilds a field from a `[z][y][x]` nested array.
    pub fn from_nested(nested: &[Vec<Vec<f64>>]) -> Result<Self> {
        let depth = nested.len();
        let height = nested.first().map_or(0, Vec::len);
        let width = nested.first().and_then(|p| p.first()).map_or(0, Vec::len);
        if depth == 0 || height == 0 || width == 0 {
            return Err(SimError::invalid_state("intent field is empty"));
        }

        let mut cells = Vec::with_capacity(width * height * depth);
        for (z, plane) in nested.iter().enumerate() {
            if plane.len() != height {
                return Err(SimError::invalid_state(format!(
                    "intent field plane {z} has {} rows, expected {height}",
                    plane.len()
                )));
            }
            for (y, row) in plane.iter().enumerate() {
                if row.len() != width {
                    return Err(SimError::invalid_state(format!(
                        "intent field row ({z}, {y}) has {} cells, expected {width}",
                        row.len()
                    )));
                }
                cells.extend(row.iter().copied().map(clamp_unit));
            }
        }
        Ok(Self {
            width,
            height,
            depth,
            cells,
        })
    }

    /// Exports the field as a `[z][y][x]` nested array.
    #[must_use]
    pub fn to_nested(&self) -> Vec<Vec<Vec<f64>>> {
        self.cells
            .chunks(self.width * self.height)
            .map(|plane| plane.chunks(self.width).map(<[f64]>::to_vec).collect())
            .collect()
    }

    #[must_use]
    pub fn dimensions(&self) -> (usize, usize, usize) {
        (self.width, self.height, self.depth)
    }

    #[must_use]
    pub fn cells(&self) -> &[f64] {
        &self.cells
    }

    #[inline(always)]
    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.height + y) * self.width + x
    }

    #[must_use]
    pub fn get(&self, x: usize, y: usize, z: usize) -> Option<f64> {
        (x < self.width && y < self.height && z < self.depth)
            .then(|| self.cells[self.index(x, y, z)])
    }

    pub fn set(&mut self, x: usize, y: usize, z: usize, value: f64) {
        if x < self.width && y < self.height && z < self.depth {
            let idx = self.index(x, y, z);
            self.cells[idx] = clamp_unit(value);
        }
    }

    /// Nearest-cell lookup in cell coordinates. Out-of-range and non-finite
    /// coordinates clamp to the grid; this never fails.
    #[must_use]
    pub fn sample(&self, x: f64, y: f64, z: f64) -> f64 {
        let ix = nearest_index(x, self.width);
        let iy = nearest_index(y, self.height);
        let iz = nearest_index(z, self.depth);
        self.cells[self.index(ix, iy, iz)]
    }

    /// Samples the cell containing a world-space position.
    #[must_use]
    pub fn sample_world(&self, position: &Position, domain: &Domain) -> f64 {
        let (cx, cy, cz) = self.cell_coords(position, domain);
        self.sample(cx, cy, cz)
    }

    /// Fractional cell coordinates whose rounding selects the containing cell.
    fn cell_coords(&self, position: &Position, domain: &Domain) -> (f64, f64, f64) {
        (
            position.x / domain.width * self.width as f64 - 0.5,
            position.y / domain.height * self.height as f64 - 0.5,
            position.z / domain.depth * self.depth as f64 - 0.5,
        )
    }

    /// Applies one stochastic update step.
    ///
    /// Cells are activated independently; global effects are drawn afterwards.
    /// With a zero rate and zero wave/hotspot probabilities the buffer is left
    /// bit-for-bit unchanged.
    pub fn update<R: Rng>(
        &mut self,
        fluctuation_rate: f64,
        probabilistic: bool,
        tuning: &FieldTuning,
        rng: &mut R,
    ) -> FieldPulse {
        let mut pulse = FieldPulse::default();

        for cell in &mut self.cells {
            if rng.gen::<f64>() >= tuning.activation_probability {
                continue;
            }
            pulse.activated_cells += 1;
            let delta = if probabilistic {
                gaussian(rng) * fluctuation_rate * tuning.gaussian_scale
            } else {
                (rng.gen::<f64>() * 2.0 - 1.0) * fluctuation_rate
            };
            if delta != 0.0 {
                *cell = clamp_unit(*cell + delta);
            }
        }

        if rng.gen::<f64>() < tuning.wave_probability {
            let wave = Wave {
                origin: self.random_cell(rng),
                wavelength: rng.gen_range(tuning.wavelength_min..tuning.wavelength_max),
                strength: rng.gen::<f64>() * tuning.wave_strength * fluctuation_rate,
            };
            self.apply_wave(&wave);
            pulse.wave = Some(wave);
        }

        if rng.gen::<f64>() < tuning.hotspot_probability {
            let hotspot = Hotspot {
                center: self.random_cell(rng),
                radius: rng.gen_range(tuning.hotspot_radius_min..=tuning.hotspot_radius_max),
                positive: rng.gen_bool(0.5),
            };
            self.apply_hotspot(&hotspot, tuning.hotspot_intensity);
            pulse.hotspot = Some(hotspot);
        }

        pulse
    }

    fn random_cell<R: Rng>(&self, rng: &mut R) -> (usize, usize, usize) {
        (
            rng.gen_range(0..self.width),
            rng.gen_range(0..self.height),
            rng.gen_range(0..self.depth),
        )
    }

    /// Superimposes `sin(2πd/λ) · A · exp(-d / 2λ)` around the wave origin.
    pub fn apply_wave(&mut self, wave: &Wave) {
        if wave.strength == 0.0 {
            return;
        }
        let (ox, oy, oz) = wave.origin;
        for z in 0..self.depth {
            for y in 0..self.height {
                for x in 0..self.width {
                    let d = distance((x, y, z), (ox, oy, oz));
                    let effect = (d / wave.wavelength * 2.0 * PI).sin()
                        * wave.strength
                        * (-d / (2.0 * wave.wavelength)).exp();
                    let idx = self.index(x, y, z);
                    self.cells[idx] = clamp_unit(self.cells[idx] + effect);
                }
            }
        }
    }

    /// Adds a linearly decaying blob of `±intensity` within the hotspot radius.
    pub fn apply_hotspot(&mut self, hotspot: &Hotspot, intensity: f64) {
        let (cx, cy, cz) = hotspot.center;
        let r = hotspot.radius;
        let sign = if hotspot.positive { 1.0 } else { -1.0 };
        for z in cz.saturating_sub(r)..(cz + r + 1).min(self.depth) {
            for y in cy.saturating_sub(r)..(cy + r + 1).min(self.height) {
                for x in cx.saturating_sub(r)..(cx + r + 1).min(self.width) {
                    let d = distance((x, y, z), (cx, cy, cz));
                    if d > r as f64 {
                        continue;
                    }
                    let strength = (1.0 - d / r as f64) * intensity * sign;
                    let idx = self.index(x, y, z);
                    self.cells[idx] = clamp_unit(self.cells[idx] + strength);
                }
            }
        }
    }

    /// Lets particles write their charge back into the cell they occupy.
    pub fn imprint(&mut self, particles: &[Particle], domain: &Domain, tuning: &FieldTuning) {
        for p in particles {
            let (cx, cy, cz) = self.cell_coords(&p.position, domain);
            let idx = self.index(
                nearest_index(cx, self.width),
                nearest_index(cy, self.height),
                nearest_index(cz, self.depth),
            );
            let cell = &mut self.cells[idx];
            *cell = match p.charge {
                Charge::Positive => clamp_unit(*cell + tuning.imprint_strength),
                Charge::Negative => clamp_unit(*cell - tuning.imprint_strength),
                Charge::Neutral => clamp_unit(*cell * tuning.neutral_relaxation),
            };
        }
    }

    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.cells.is_empty() {
            return 0.0;
        }
        self.cells.iter().sum::<f64>() / self.cells.len() as f64
    }

    #[must_use]
    pub fn variance(&self) -> f64 {
        if self.cells.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        self.cells.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / self.cells.len() as f64
    }

    /// Axis-adjacent cell pairs as flat index pairs.
    fn for_each_adjacent_pair<F: FnMut(usize, usize)>(&self, mut f: F) {
        for z in 0..self.depth {
            for y in 0..self.height {
                for x in 0..self.width {
                    let idx = self.index(x, y, z);
                    if x + 1 < self.width {
                        f(idx, self.index(x + 1, y, z));
                    }
                    if y + 1 < self.height {
                        f(idx, self.index(x, y + 1, z));
                    }
                    if z + 1 < self.depth {
                        f(idx, self.index(x, y, z + 1));
                    }
                }
            }
        }
    }

    /// Share of adjacent cell pairs that fall in different regions.
    ///
    /// A cheap compressibility proxy: smooth fields score near 0, noisy ones
    /// near 1. This is a heuristic, not Kolmogorov complexity.
    #[must_use]
    pub fn edge_transition_ratio(&self) -> f64 {
        let mut pairs = 0usize;
        let mut edges = 0usize;
        self.for_each_adjacent_pair(|a, b| {
            pairs += 1;
            if region_of(self.cells[a]) != region_of(self.cells[b]) {
                edges += 1;
            }
        });
        if pairs == 0 {
            0.0
        } else {
            edges as f64 / pairs as f64
        }
    }

    fn largest_region(&self) -> usize {
        let mut visited = vec![false; self.cells.len()];
        let mut stack = Vec::new();
        let mut largest = 0;

        for start in 0..self.cells.len() {
            if visited[start] {
                continue;
            }
            let region = region_of(self.cells[start]);
            visited[start] = true;
            stack.push(start);
            let mut size = 0;

            while let Some(idx) = stack.pop() {
                size += 1;
                let x = idx % self.width;
                let y = (idx / self.width) % self.height;
                let z = idx / (self.width * self.height);
                let neighbours = [
                    (x > 0).then(|| idx - 1),
                    (x + 1 < self.width).then(|| idx + 1),
                    (y > 0).then(|| idx - self.width),
                    (y + 1 < self.height).then(|| idx + self.width),
                    (z > 0).then(|| idx - self.width * self.height),
                    (z + 1 < self.depth).then(|| idx + self.width * self.height),
                ];
                for n in neighbours.into_iter().flatten() {
                    if !visited[n] && region_of(self.cells[n]) == region {
                        visited[n] = true;
                        stack.push(n);
                    }
                }
            }
            largest = largest.max(size);
        }
        largest
    }

    /// Computes [`FieldAnalysis`] over the whole grid.
    #[must_use]
    pub fn analyze(&self) -> FieldAnalysis {
        let n = self.cells.len() as f64;
        let average = self.mean();
        let variance = self.variance();

        let (mut positive, mut negative) = (0usize, 0usize);
        for &v in &self.cells {
            match region_of(v) {
                1 => positive += 1,
                -1 => negative += 1,
                _ => {}
            }
        }
        let positive_fraction = positive as f64 / n;
        let negative_fraction = negative as f64 / n;
        let neutral_fraction = 1.0 - positive_fraction - negative_fraction;

        let mut gradient_sum = 0.0;
        let mut pairs = 0usize;
        self.for_each_adjacent_pair(|a, b| {
            gradient_sum += (self.cells[a] - self.cells[b]).abs();
            pairs += 1;
        });
        let gradient_strength = if pairs == 0 {
            0.0
        } else {
            gradient_sum / pairs as f64
        };

        let field_energy = self.cells.iter().map(|v| v * v).sum::<f64>() / n;

        let balance = normalized_entropy(&[positive_fraction, negative_fraction, neutral_fraction]);
        let pattern_complexity = 0.3 * balance
            + 0.4 * (variance * 5.0).min(1.0)
            + 0.3 * self.edge_transition_ratio();

        FieldAnalysis {
            average,
            variance,
            positive_fraction,
            negative_fraction,
            neutral_fraction,
            gradient_strength,
            field_energy,
            largest_region: self.largest_region(),
            pattern_complexity,
        }
    }
}

fn distance(a: (usize, usize, usize), b: (usize, usize, usize)) -> f64 {
    let dx = a.0 as f64 - b.0 as f64;
    let dy = a.1 as f64 - b.1 as f64;
    let dz = a.2 as f64 - b.2 as f64;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Standard normal sample via Box–Muller.
fn gaussian<R: Rng>(rng: &mut R) -> f64 {
    // (0, 1] keeps ln() finite.
    let u1 = 1.0 - rng.gen::<f64>();
    let u2 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).sin()
}

/// Shannon entropy of a probability vector, normalised to `[0, 1]`.
pub(crate) fn normalized_entropy(probabilities: &[f64]) -> f64 {
    if probabilities.len() < 2 {
        return 0.0;
    }
    let h: f64 = probabilities
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| -p * p.log2())
        .sum();
    h / (probabilities.len() as f64).log2()
}
