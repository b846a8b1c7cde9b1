//! Owned collection of live particles.

use intentsim_data::Particle;
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleStore {
    particles: Vec<Particle>,
}

impl ParticleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_vec(particles: Vec<Particle>) -> Self {
        Self { particles }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    pub fn as_mut_slice(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Particle> {
        self.particles.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Particle> {
        self.particles.iter_mut()
    }

    /// Adds a particle unless the store already holds `max` particles.
    pub fn push_bounded(&mut self, particle: Particle, max: usize) -> bool {
        if self.particles.len() >= max {
            return false;
        }
        self.particles.push(particle);
        true
    }

    /// Adds a particle regardless of capacity. Reserved for inflation bursts.
    pub fn push_unbounded(&mut self, particle: Particle) {
        self.particles.push(particle);
    }

    /// Keeps only particles matching the predicate; returns how many were removed.
    pub fn retain<F: FnMut(&Particle) -> bool>(&mut self, f: F) -> usize {
        let before = self.particles.len();
        self.particles.retain(f);
        before - self.particles.len()
    }

    /// Drops particles with non-finite attributes.
    pub fn sanitize(&mut self) -> usize {
        let removed = self.retain(Particle::is_well_formed);
        if removed > 0 {
            warn!(removed, "Dropped malformed particles");
        }
        removed
    }

    pub fn clear_cluster_ids(&mut self) {
        for p in &mut self.particles {
            p.cluster_id = None;
        }
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Particle> {
        self.particles
    }
}
