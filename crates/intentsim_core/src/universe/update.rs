use super::{tick_seed, Universe};
use crate::lifecycle::{creation_budget, spawn_from_field};
use crate::spatial_hash::{SpatialHash, INDEX_CELL_SIZE};
use crate::systems::cluster::{
    apply_growth, detect_stable_clusters, evolve_cluster_intelligence,
    generate_cluster_narratives, identify_emergent_entities, ClusterParams,
};
use crate::systems::inflation::{burst_size, intent_information};
use crate::systems::interaction::{interact_all, InteractionContext};
use crate::systems::motion::{advance, MotionContext};
use crate::systems::stats::{compute_stats, StatsInput};
use intentsim_data::{InflationEvent, LiveEvent};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Instant;
use tracing::{debug, info};

impl Universe {
    /// Advances the simulation by one tick.
    ///
    /// Does nothing while paused. Passes run in a fixed order:
    /// inflation expiry, field, creation, sanitize, motion, interactions,
    /// clustering (with intelligence growth, narratives and emergence),
    /// statistics, anomalies, inflation check, snapshot, telemetry.
    ///
    /// # Returns
    /// Everything notable that happened this tick, in pass order.
    pub fn tick(&mut self) -> Vec<LiveEvent> {
        if !self.running {
            return Vec::new();
        }
        let started = Instant::now();

        self.frame += 1;
        self.simulation_time += self.config.time_step;
        if self.config.deterministic {
            let seed = tick_seed(self.config.seed.unwrap_or(0), self.frame);
            self.rng = ChaCha8Rng::from_seed(seed);
        }

        let mut events = Vec::new();

        self.pass_inflation_expiry(&mut events);
        self.pass_field();
        self.pass_creation();

        let culled = self.store.sanitize() + self.pass_motion();
        if culled > 0 {
            self.metrics.add("culled", culled as u64);
            events.push(LiveEvent::Culled {
                tick: self.frame,
                count: culled,
            });
        }

        self.pass_interactions();
        self.pass_clusters(&mut events);
        self.refresh_snapshot();
        self.pass_anomalies(&mut events);
        if self.pass_inflation_check(&mut events) {
            // The burst changed the population after statistics ran.
            self.refresh_snapshot();
        }
        self.attach_history();

        self.metrics.record_tick(
            started.elapsed(),
            self.store.len(),
            self.detection.clusters.len(),
        );
        events
    }

    fn pass_inflation_expiry(&mut self, events: &mut Vec<LiveEvent>) {
        if self.inflation.expire(self.frame, &self.config.tuning.inflation) {
            self.domain = self.base_domain;
            info!(tick = self.frame, "Inflation ended, domain reverted");
            events.push(LiveEvent::InflationEnded { tick: self.frame });
        }
    }

    fn pass_field(&mut self) {
        let tuning = &self.config.tuning.field;
        let pulse = self.field.update(
            self.config.fluctuation_rate,
            self.config.probabilistic_intent,
            tuning,
            &mut self.rng,
        );
        if pulse.wave.is_some() || pulse.hotspot.is_some() {
            debug!(
                tick = self.frame,
                wave = pulse.wave.is_some(),
                hotspot = pulse.hotspot.is_some(),
                "Field pulse"
            );
        }
        if tuning.particle_imprint {
            self.field
                .imprint(self.store.as_slice(), &self.domain, tuning);
        }
    }

    fn pass_creation(&mut self) {
        let budget = creation_budget(
            self.config.particle_creation_rate,
            self.store.len(),
            self.config.max_particles,
            self.config.tuning.spawn.max_per_tick,
            &mut self.rng,
        );
        if budget == 0 {
            return;
        }
        let options = self.spawn_options(false);
        for _ in 0..budget {
            let particle = spawn_from_field(
                &self.field,
                &self.domain,
                self.frame,
                &options,
                &mut self.rng,
            );
            self.store.push_bounded(particle, self.config.max_particles);
        }
    }

    fn pass_motion(&mut self) -> usize {
        let ctx = MotionContext {
            field: &self.field,
            domain: &self.domain,
            boundary: self.config.boundary_mode,
            tuning: &self.config.tuning.motion,
            energy_conservation: self.config.energy_conservation,
            dt: self.config.time_step,
        };
        advance(&mut self.store, &ctx, &mut self.rng).removed()
    }

    fn pass_interactions(&mut self) {
        let d = self.domain;
        if self.spatial_hash.width != d.width
            || self.spatial_hash.height != d.height
            || self.spatial_hash.depth != d.depth
        {
            self.spatial_hash = SpatialHash::new(INDEX_CELL_SIZE, d.width, d.height, d.depth);
        }

        let ctx = InteractionContext {
            tuning: &self.config.tuning.interaction,
            learning_rate: self.config.learning_rate,
            tick: self.frame,
        };
        let report = interact_all(
            self.store.as_mut_slice(),
            &ctx,
            Some(&mut self.spatial_hash),
        );
        self.interactions_count += report.pairs;
    }

    fn pass_clusters(&mut self, events: &mut Vec<LiveEvent>) {
        let tuning = &self.config.tuning.cluster;
        let params = ClusterParams {
            tuning,
            radius_factor: self.config.tuning.interaction.radius_factor,
            stability_threshold: self.config.stability_threshold,
        };
        self.detection = detect_stable_clusters(self.store.as_slice(), &params);

        self.store.clear_cluster_ids();
        let particles = self.store.as_mut_slice();
        for cluster in &self.detection.clusters {
            for &i in &cluster.members {
                particles[i].cluster_id = Some(cluster.id);
            }
        }

        // Growth is driven by the previous tick's complexity index.
        let growth = evolve_cluster_intelligence(
            &mut self.detection.clusters,
            self.snapshot.complexity_index,
            self.config.learning_rate,
        );
        apply_growth(
            particles,
            &self.detection.clusters,
            &growth,
            self.config.tuning.interaction.max_complexity,
        );

        for trigger in
            generate_cluster_narratives(&self.detection.clusters, self.frame, tuning, &mut self.rng)
        {
            self.metrics.increment_counter("narratives");
            events.push(LiveEvent::ClusterNarrative {
                tick: self.frame,
                trigger,
            });
        }

        for entity in identify_emergent_entities(&self.detection.clusters, tuning.emergence_threshold)
        {
            if !self.promoted.insert(entity.id.clone()) {
                continue;
            }
            info!(
                tick = self.frame,
                entity = %entity.id,
                size = entity.size,
                index = entity.intelligence_index,
                "Emergent entity"
            );
            self.metrics.increment_counter("emergences");
            events.push(LiveEvent::Emergence {
                tick: self.frame,
                entity,
            });
        }
    }

    fn pass_anomalies(&mut self, events: &mut Vec<LiveEvent>) {
        let found = self.anomaly_detector.detect(
            self.frame,
            &self.snapshot,
            self.store.as_slice(),
            &self.config.tuning.anomaly,
            &mut self.rng,
        );
        let history = self.config.tuning.anomaly.history;
        for anomaly in found {
            self.metrics.increment_counter("anomalies");
            self.anomalies.push_back(anomaly.clone());
            while self.anomalies.len() > history {
                self.anomalies.pop_front();
            }
            events.push(LiveEvent::Anomaly {
                tick: self.frame,
                anomaly,
            });
        }
    }

    fn pass_inflation_check(&mut self, events: &mut Vec<LiveEvent>) -> bool {
        let information = intent_information(
            self.snapshot.average_intent_magnitude,
            self.snapshot.average_knowledge,
            self.snapshot.complexity_index,
        );
        match self.evaluate_inflation(information) {
            Some(inflation) => {
                events.push(LiveEvent::InflationStarted {
                    tick: self.frame,
                    inflation,
                });
                true
            }
            None => false,
        }
    }

    /// Starts an inflation if `information` warrants one and none is active.
    ///
    /// On trigger the domain grows by `expansion_factor` and a burst of
    /// post-inflation particles is added, bypassing `max_particles`.
    pub fn evaluate_inflation(&mut self, information: f64) -> Option<InflationEvent> {
        let tuning = &self.config.tuning.inflation;
        if !self
            .inflation
            .check(information, self.store.len(), tuning, &mut self.rng)
        {
            return None;
        }

        let before = self.store.len();
        self.inflation.begin(self.frame);
        self.domain = self.base_domain.scaled(tuning.expansion_factor);

        let burst = burst_size(tuning, self.config.max_particles);
        let options = self.spawn_options(true);
        for _ in 0..burst {
            let particle = spawn_from_field(
                &self.field,
                &self.domain,
                self.frame,
                &options,
                &mut self.rng,
            );
            self.store.push_unbounded(particle);
        }

        let event = InflationEvent {
            timestamp: self.frame,
            intent_information: information,
            particles_before: before,
            particles_after: self.store.len(),
        };
        info!(
            tick = self.frame,
            intent_information = information,
            burst,
            "Inflation started"
        );
        self.metrics.increment_counter("inflations");
        self.inflation_events.push(event.clone());
        Some(event)
    }

    /// Recomputes statistics for the current state. History is attached separately.
    pub(crate) fn refresh_snapshot(&mut self) {
        self.snapshot = compute_stats(&StatsInput {
            particles: self.store.as_slice(),
            field: &self.field,
            domain: &self.domain,
            detection: &self.detection,
            total_interactions: self.interactions_count,
            frame: self.frame,
        });
        self.attach_history();
    }

    fn attach_history(&mut self) {
        self.snapshot.anomalies = self.anomalies.iter().cloned().collect();
        self.snapshot.inflation_events = self.inflation_events.clone();
    }
}
