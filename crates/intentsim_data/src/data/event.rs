use super::particle::Charge;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Category of an abrupt change between two metric snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    EntropySpike,
    ClusterFormation,
}

impl AnomalyKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyKind::EntropySpike => "entropy_spike",
            AnomalyKind::ClusterFormation => "cluster_formation",
        }
    }
}

/// An abrupt change flagged by the anomaly detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyEvent {
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    /// Severity in `[0, 1]`.
    pub severity: f64,
    /// Tick at which the anomaly was detected.
    pub timestamp: u64,
    /// A small sample of the particles involved.
    pub affected_particles: Vec<Uuid>,
    pub description: String,
}

/// A domain-expansion event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InflationEvent {
    pub timestamp: u64,
    pub intent_information: f64,
    pub particles_before: usize,
    pub particles_after: usize,
}

/// Narrative register of a cluster, derived from its dominant charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrativeTone {
    Cooperative,
    Isolationist,
    Selective,
}

impl From<Charge> for NarrativeTone {
    fn from(charge: Charge) -> Self {
        match charge {
            Charge::Positive => NarrativeTone::Cooperative,
            Charge::Negative => NarrativeTone::Isolationist,
            Charge::Neutral => NarrativeTone::Selective,
        }
    }
}

/// Structured trigger for a cluster narrative.
///
/// The engine only decides *that* a cluster is worth narrating; the text is
/// produced by a formatter outside the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeTrigger {
    pub cluster_id: u32,
    pub timestamp: u64,
    pub tone: NarrativeTone,
    pub charge: Charge,
    pub size: usize,
    pub knowledge: f64,
    pub complexity: f64,
    pub intelligence_score: f64,
}

/// A cluster promoted to a persistent record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergentEntity {
    /// Stable id derived from the member set.
    pub id: String,
    pub intelligence_index: f64,
    pub size: usize,
    pub charge: Charge,
    pub member_ids: Vec<Uuid>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event")]
/// Tagged union of all simulation events emitted during a tick.
///
/// Serialised with `#[serde(tag = "event")]` for streaming JSONL output.
pub enum LiveEvent {
    /// The anomaly detector flagged an abrupt change.
    Anomaly { tick: u64, anomaly: AnomalyEvent },
    /// The domain doubled and a particle burst was spawned.
    InflationStarted { tick: u64, inflation: InflationEvent },
    /// The domain reverted to its original dimensions.
    InflationEnded { tick: u64 },
    /// A cluster crossed the narrative bar and passed the random gate.
    ClusterNarrative { tick: u64, trigger: NarrativeTrigger },
    /// A cluster was promoted to an emergent entity for the first time.
    Emergence { tick: u64, entity: EmergentEntity },
    /// Particles removed by energy exhaustion, boundary policy or sanitisation.
    Culled { tick: u64, count: usize },
}

impl LiveEvent {
    #[must_use]
    pub fn tick(&self) -> u64 {
        match self {
            LiveEvent::Anomaly { tick, .. }
            | LiveEvent::InflationStarted { tick, .. }
            | LiveEvent::InflationEnded { tick }
            | LiveEvent::ClusterNarrative { tick, .. }
            | LiveEvent::Emergence { tick, .. }
            | LiveEvent::Culled { tick, .. } => *tick,
        }
    }

    /// Short machine name used by journals and narrators.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            LiveEvent::Anomaly { .. } => "Anomaly",
            LiveEvent::InflationStarted { .. } => "InflationStarted",
            LiveEvent::InflationEnded { .. } => "InflationEnded",
            LiveEvent::ClusterNarrative { .. } => "ClusterNarrative",
            LiveEvent::Emergence { .. } => "Emergence",
            LiveEvent::Culled { .. } => "Culled",
        }
    }
}
