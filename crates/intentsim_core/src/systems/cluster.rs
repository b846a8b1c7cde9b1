//! Cluster detection, intelligence growth, narrative triggers and emergence.
//!
//! Clusters are transient: they are rebuilt from scratch every tick and only
//! survive the tick in which their stability passes the threshold.

use crate::config::{ClusterTuning, StabilityMetric};
use intentsim_data::{
    Charge, ChargeCounts, EmergentEntity, NarrativeTone, NarrativeTrigger, Particle, Position,
};
use petgraph::unionfind::UnionFind;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Position in canonical order. Only meaningful within one tick.
    pub id: u32,
    pub member_ids: Vec<Uuid>,
    /// Indices into the particle slice the detection ran on, parallel to `member_ids`.
    pub members: Vec<usize>,
    pub centroid: Position,
    pub dominant_charge: Charge,
    pub stability: f64,
    pub knowledge: f64,
    pub complexity: f64,
    pub intelligence_score: f64,
}

impl Cluster {
    #[must_use]
    pub fn size(&self) -> usize {
        self.member_ids.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterDetection {
    pub clusters: Vec<Cluster>,
    /// Ids of every particle not in a surviving cluster, sorted.
    pub unclustered: Vec<Uuid>,
}

impl ClusterDetection {
    #[must_use]
    pub fn average_size(&self) -> f64 {
        if self.clusters.is_empty() {
            return 0.0;
        }
        let total: usize = self.clusters.iter().map(Cluster::size).sum();
        total as f64 / self.clusters.len() as f64
    }
}

pub struct ClusterParams<'a> {
    pub tuning: &'a ClusterTuning,
    /// Interaction radius multiplier, shared with the interaction pass.
    pub radius_factor: f64,
    pub stability_threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterGrowth {
    pub cluster_id: u32,
    pub knowledge_gain: f64,
    pub complexity_factor: f64,
}

#[must_use]
pub fn intelligence_score(knowledge: f64, complexity: f64) -> f64 {
    knowledge.max(0.0).powf(0.7) * complexity.max(0.0).powf(0.3)
}

fn centroid(particles: &[Particle], members: &[usize]) -> Position {
    let n = members.len() as f64;
    let mut c = Position::default();
    for &i in members {
        c.x += particles[i].position.x;
        c.y += particles[i].position.y;
        c.z += particles[i].position.z;
    }
    Position::new(c.x / n, c.y / n, c.z / n)
}

fn stability(
    particles: &[Particle],
    members: &[usize],
    center: &Position,
    tuning: &ClusterTuning,
) -> f64 {
    match tuning.stability_metric {
        StabilityMetric::RelativeVelocity => {
            let mut total = 0.0;
            let mut pairs = 0usize;
            for (a, &i) in members.iter().enumerate() {
                for &j in &members[a + 1..] {
                    let vi = &particles[i].velocity;
                    let vj = &particles[j].velocity;
                    let (dx, dy, dz) = (vi.vx - vj.vx, vi.vy - vj.vy, vi.vz - vj.vz);
                    total += (dx * dx + dy * dy + dz * dz).sqrt();
                    pairs += 1;
                }
            }
            let mean = if pairs == 0 { 0.0 } else { total / pairs as f64 };
            1.0 / (1.0 + mean / tuning.velocity_scale)
        }
        StabilityMetric::Dispersion => {
            let total: f64 = members
                .iter()
                .map(|&i| particles[i].position.distance(center))
                .sum();
            let mean = total / members.len() as f64;
            1.0 / (1.0 + mean / tuning.dispersion_scale)
        }
    }
}

fn dominant_charge(particles: &[Particle], members: &[usize]) -> Charge {
    let mut counts = ChargeCounts::default();
    for &i in members {
        counts.record(particles[i].charge);
    }
    // Ties resolve in `Charge::ALL` order.
    Charge::ALL
        .into_iter()
        .fold((Charge::Neutral, 0), |(best, n), c| {
            let count = counts.get(c);
            if count > n {
                (c, count)
            } else {
                (best, n)
            }
        })
        .0
}

/// Groups close, same-charge particles and keeps the stable groups.
///
/// The partition depends only on the particle set, never on slice order:
/// members are sorted by id and clusters are ordered by their smallest member id.
pub fn detect_stable_clusters(particles: &[Particle], params: &ClusterParams) -> ClusterDetection {
    let mut order: Vec<usize> = (0..particles.len()).collect();
    order.sort_by_key(|&i| particles[i].id);

    let n = order.len();
    let mut sets = UnionFind::<usize>::new(n);
    let reach = params.radius_factor * params.tuning.proximity_factor;
    for a in 0..n {
        let pa = &particles[order[a]];
        for b in (a + 1)..n {
            let pb = &particles[order[b]];
            if pa.charge != pb.charge {
                continue;
            }
            let limit = reach * (pa.radius + pb.radius);
            if pa.position.distance_squared(&pb.position) <= limit * limit {
                sets.union(a, b);
            }
        }
    }

    // Keyed by the smallest canonical position in the group, which is also the
    // group's smallest id.
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    let mut roots: BTreeMap<usize, usize> = BTreeMap::new();
    for a in 0..n {
        let root = sets.find(a);
        let first = *roots.entry(root).or_insert(a);
        groups.entry(first).or_default().push(order[a]);
    }

    let mut detection = ClusterDetection::default();
    for members in groups.into_values() {
        if members.len() < 2 {
            detection
                .unclustered
                .extend(members.iter().map(|&i| particles[i].id));
            continue;
        }

        let center = centroid(particles, &members);
        let score = stability(particles, &members, &center, params.tuning);
        if score < params.stability_threshold {
            detection
                .unclustered
                .extend(members.iter().map(|&i| particles[i].id));
            continue;
        }

        let id = detection.clusters.len() as u32;
        detection
            .clusters
            .push(summarize(particles, id, members, center, score));
    }
    detection.unclustered.sort_unstable();
    detection
}

fn summarize(
    particles: &[Particle],
    id: u32,
    members: Vec<usize>,
    center: Position,
    score: f64,
) -> Cluster {
    let knowledge: f64 = members.iter().map(|&i| particles[i].knowledge).sum();
    let complexity = members
        .iter()
        .map(|&i| particles[i].complexity)
        .sum::<f64>()
        / members.len() as f64;

    Cluster {
        id,
        member_ids: members.iter().map(|&i| particles[i].id).collect(),
        dominant_charge: dominant_charge(particles, &members),
        members,
        centroid: center,
        stability: score,
        knowledge,
        complexity,
        intelligence_score: intelligence_score(knowledge, complexity),
    }
}

/// Rebuilds a detection from the `cluster_id` each particle already carries.
///
/// Groups keep their stored id and are not re-tested against the stability
/// threshold. A group left with fewer than two members counts as unclustered.
pub fn detection_from_assignments(particles: &[Particle], tuning: &ClusterTuning) -> ClusterDetection {
    let mut order: Vec<usize> = (0..particles.len()).collect();
    order.sort_by_key(|&i| particles[i].id);

    let mut detection = ClusterDetection::default();
    let mut groups: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for i in order {
        match particles[i].cluster_id {
            Some(id) => groups.entry(id).or_default().push(i),
            None => detection.unclustered.push(particles[i].id),
        }
    }

    for (id, members) in groups {
        if members.len() < 2 {
            detection
                .unclustered
                .extend(members.iter().map(|&i| particles[i].id));
            continue;
        }
        let center = centroid(particles, &members);
        let score = stability(particles, &members, &center, tuning);
        detection
            .clusters
            .push(summarize(particles, id, members, center, score));
    }
    detection.unclustered.sort_unstable();
    detection
}

/// Computes this tick's intelligence growth and refreshes each cluster's aggregates.
///
/// The returned growth still has to be applied to member particles, see
/// [`apply_growth`].
pub fn evolve_cluster_intelligence(
    clusters: &mut [Cluster],
    complexity_index: f64,
    learning_rate: f64,
) -> Vec<ClusterGrowth> {
    let drive = complexity_index.max(0.1);
    clusters
        .iter_mut()
        .map(|cluster| {
            let growth = ClusterGrowth {
                cluster_id: cluster.id,
                knowledge_gain: cluster.size() as f64 * learning_rate * drive,
                complexity_factor: 1.0 + 0.01 * learning_rate,
            };
            cluster.knowledge += growth.knowledge_gain;
            cluster.complexity *= growth.complexity_factor;
            cluster.intelligence_score = intelligence_score(cluster.knowledge, cluster.complexity);
            growth
        })
        .collect()
}

/// Spreads each cluster's knowledge gain evenly over its members and scales
/// their complexity.
pub fn apply_growth(
    particles: &mut [Particle],
    clusters: &[Cluster],
    growth: &[ClusterGrowth],
    max_complexity: f64,
) {
    for (cluster, g) in clusters.iter().zip(growth) {
        let share = g.knowledge_gain / cluster.size() as f64;
        for &i in &cluster.members {
            let p = &mut particles[i];
            p.knowledge += share;
            p.complexity = (p.complexity * g.complexity_factor).min(max_complexity);
        }
    }
}

/// Narrative triggers for clusters smart enough to be worth describing.
pub fn generate_cluster_narratives<R: Rng>(
    clusters: &[Cluster],
    tick: u64,
    tuning: &ClusterTuning,
    rng: &mut R,
) -> Vec<NarrativeTrigger> {
    let mut out = Vec::new();
    for cluster in clusters {
        if cluster.intelligence_score <= tuning.narrative_intelligence_bar {
            continue;
        }
        if rng.gen::<f64>() >= tuning.narrative_probability {
            continue;
        }
        out.push(NarrativeTrigger {
            cluster_id: cluster.id,
            timestamp: tick,
            tone: NarrativeTone::from(cluster.dominant_charge),
            charge: cluster.dominant_charge,
            size: cluster.size(),
            knowledge: cluster.knowledge,
            complexity: cluster.complexity,
            intelligence_score: cluster.intelligence_score,
        });
    }
    out
}

#[must_use]
pub fn intelligence_index(cluster: &Cluster) -> f64 {
    cluster.knowledge * cluster.complexity * (cluster.size() as f64).ln()
}

/// Stable entity id derived from the sorted member ids.
#[must_use]
pub fn entity_id(member_ids: &[Uuid]) -> String {
    let mut hasher = Sha256::new();
    for id in member_ids {
        hasher.update(id.as_bytes());
    }
    let digest = hex::encode(hasher.finalize());
    format!("entity-{}", &digest[..16])
}

pub fn identify_emergent_entities(clusters: &[Cluster], threshold: f64) -> Vec<EmergentEntity> {
    clusters
        .iter()
        .filter_map(|cluster| {
            let index = intelligence_index(cluster);
            (index > threshold).then(|| EmergentEntity {
                id: entity_id(&cluster.member_ids),
                intelligence_index: index,
                size: cluster.size(),
                charge: cluster.dominant_charge,
                member_ids: cluster.member_ids.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{create_from_field, SpawnOptions};
    use intentsim_data::Velocity;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn particle(value: f64, pos: Position, rng: &mut ChaCha8Rng) -> Particle {
        let mut p = create_from_field(value, pos, 0, &SpawnOptions::default(), rng);
        p.velocity = Velocity::default();
        p
    }

    fn params(tuning: &ClusterTuning) -> ClusterParams<'_> {
        ClusterParams {
            tuning,
            radius_factor: 4.0,
            stability_threshold: 0.5,
        }
    }

    fn blob(value: f64, cx: f64, n: usize, rng: &mut ChaCha8Rng) -> Vec<Particle> {
        (0..n)
            .map(|i| particle(value, Position::new(cx + i as f64, 50.0, 5.0), rng))
            .collect()
    }

    #[test]
    fn test_same_charge_neighbours_cluster() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut particles = blob(0.9, 10.0, 3, &mut rng);
        particles.extend(blob(-0.9, 300.0, 2, &mut rng));
        particles.push(particle(0.9, Position::new(550.0, 300.0, 5.0), &mut rng));

        let tuning = ClusterTuning::default();
        let detection = detect_stable_clusters(&particles, &params(&tuning));
        assert_eq!(detection.clusters.len(), 2);
        assert_eq!(detection.unclustered.len(), 1);
        let sizes: Vec<usize> = detection.clusters.iter().map(Cluster::size).collect();
        assert!(sizes.contains(&3) && sizes.contains(&2));
        assert!((detection.average_size() - 2.5).abs() < 1e-12);
        for (i, c) in detection.clusters.iter().enumerate() {
            assert_eq!(c.id, i as u32);
            assert!(c.member_ids.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_mixed_charges_never_share_a_cluster() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let particles = vec![
            particle(0.9, Position::new(10.0, 10.0, 5.0), &mut rng),
            particle(-0.9, Position::new(11.0, 10.0, 5.0), &mut rng),
        ];
        let tuning = ClusterTuning::default();
        let detection = detect_stable_clusters(&particles, &params(&tuning));
        assert!(detection.clusters.is_empty());
        assert_eq!(detection.unclustered.len(), 2);
    }

    #[test]
    fn test_fast_diverging_group_is_released() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut particles = blob(0.9, 10.0, 2, &mut rng);
        particles[0].velocity = Velocity::new(5.0, 0.0, 0.0);
        particles[1].velocity = Velocity::new(-5.0, 0.0, 0.0);
        let tuning = ClusterTuning::default();
        let detection = detect_stable_clusters(&particles, &params(&tuning));
        assert!(detection.clusters.is_empty());

        let dispersion = ClusterTuning {
            stability_metric: StabilityMetric::Dispersion,
            ..Default::default()
        };
        let detection = detect_stable_clusters(&particles, &params(&dispersion));
        assert_eq!(detection.clusters.len(), 1);
        assert!(detection.clusters[0].stability > 0.9);
    }

    #[test]
    fn test_detection_is_order_independent() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut particles = blob(0.9, 10.0, 4, &mut rng);
        particles.extend(blob(0.0, 200.0, 3, &mut rng));
        particles.extend(blob(-0.9, 400.0, 5, &mut rng));
        let tuning = ClusterTuning::default();
        let reference = detect_stable_clusters(&particles, &params(&tuning));

        for _ in 0..10 {
            particles.shuffle(&mut rng);
            let shuffled = detect_stable_clusters(&particles, &params(&tuning));
            assert_eq!(shuffled.unclustered, reference.unclustered);
            assert_eq!(shuffled.clusters.len(), reference.clusters.len());
            for (a, b) in shuffled.clusters.iter().zip(&reference.clusters) {
                assert_eq!(a.member_ids, b.member_ids);
                assert_eq!(a.centroid, b.centroid);
                assert_eq!(a.knowledge, b.knowledge);
            }
        }
    }

    #[test]
    fn test_evolution_grows_knowledge_and_members() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut particles = blob(0.9, 10.0, 4, &mut rng);
        let tuning = ClusterTuning::default();
        let mut detection = detect_stable_clusters(&particles, &params(&tuning));
        let before = detection.clusters[0].knowledge;
        let member_before: f64 = particles.iter().map(|p| p.knowledge).sum();

        let growth = evolve_cluster_intelligence(&mut detection.clusters, 0.0, 0.1);
        assert!((growth[0].knowledge_gain - 4.0 * 0.1 * 0.1).abs() < 1e-12);
        assert!((detection.clusters[0].knowledge - before - growth[0].knowledge_gain).abs() < 1e-12);

        apply_growth(&mut particles, &detection.clusters, &growth, 10.0);
        let member_after: f64 = particles.iter().map(|p| p.knowledge).sum();
        assert!((member_after - member_before - growth[0].knowledge_gain).abs() < 1e-9);
        assert!(particles.iter().all(|p| p.complexity > 1.0));
    }

    #[test]
    fn test_narratives_require_intelligence() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let particles = blob(0.9, 10.0, 3, &mut rng);
        let tuning = ClusterTuning {
            narrative_probability: 1.0,
            ..Default::default()
        };
        let mut detection = detect_stable_clusters(&particles, &params(&tuning));
        assert!(generate_cluster_narratives(&detection.clusters, 1, &tuning, &mut rng).is_empty());

        detection.clusters[0].intelligence_score = 5.0;
        let triggers = generate_cluster_narratives(&detection.clusters, 7, &tuning, &mut rng);
        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0].tone, NarrativeTone::Cooperative);
        assert_eq!(triggers[0].timestamp, 7);
        assert_eq!(triggers[0].size, 3);
    }

    #[test]
    fn test_emergence_threshold_and_stable_id() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let particles = blob(-0.9, 10.0, 3, &mut rng);
        let tuning = ClusterTuning::default();
        let mut detection = detect_stable_clusters(&particles, &params(&tuning));
        assert!(identify_emergent_entities(&detection.clusters, 25.0).is_empty());

        detection.clusters[0].knowledge = 20.0;
        detection.clusters[0].complexity = 2.0;
        let entities = identify_emergent_entities(&detection.clusters, 25.0);
        assert_eq!(entities.len(), 1);
        let e = &entities[0];
        assert_eq!(e.charge, Charge::Negative);
        assert!((e.intelligence_index - 40.0 * 3f64.ln()).abs() < 1e-9);
        assert_eq!(e.id, entity_id(&detection.clusters[0].member_ids));
        assert!(e.id.starts_with("entity-") && e.id.len() == 23);
    }

    #[test]
    fn test_assignments_rebuild_detection() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let mut particles = blob(0.9, 10.0, 4, &mut rng);
        particles.extend(blob(-0.9, 300.0, 3, &mut rng));
        particles.push(particle(0.0, Position::new(550.0, 300.0, 5.0), &mut rng));
        let tuning = ClusterTuning::default();
        let detection = detect_stable_clusters(&particles, &params(&tuning));
        assert_eq!(detection.clusters.len(), 2);

        for cluster in &detection.clusters {
            for &i in &cluster.members {
                particles[i].cluster_id = Some(cluster.id);
            }
        }
        particles.shuffle(&mut rng);
        let rebuilt = detection_from_assignments(&particles, &tuning);
        assert_eq!(rebuilt.unclustered, detection.unclustered);
        assert_eq!(rebuilt.clusters.len(), detection.clusters.len());
        for (a, b) in rebuilt.clusters.iter().zip(&detection.clusters) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.member_ids, b.member_ids);
            assert_eq!(a.centroid, b.centroid);
            assert_eq!(a.knowledge, b.knowledge);
            assert_eq!(a.stability, b.stability);
        }
    }

    #[test]
    fn test_lone_assignment_is_unclustered() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut particles = blob(0.9, 10.0, 1, &mut rng);
        particles[0].cluster_id = Some(3);
        let rebuilt = detection_from_assignments(&particles, &ClusterTuning::default());
        assert!(rebuilt.clusters.is_empty());
        assert_eq!(rebuilt.unclustered, vec![particles[0].id]);
    }
}
