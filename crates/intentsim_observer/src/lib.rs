//! Narrative text for simulation events.
//!
//! The engine emits structured triggers; a [`Narrator`] turns them into prose
//! and a [`Chronicle`] keeps the most recent entries.

use intentsim_data::{LiveEvent, NarrativeTone, NarrativeTrigger};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const DEFAULT_MAX_HISTORY: usize = 100;

/// Knowledge above which a cluster is described as processing information.
const KNOWLEDGE_CLAUSE: f64 = 5.0;
/// Size above which a cluster is described as unusually large.
const SIZE_CLAUSE: usize = 10;

/// A narrated cluster, as shown to readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNarrative {
    pub cluster_id: u32,
    pub narrative: String,
    pub timestamp: u64,
}

/// One line of narration for any event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Narration {
    pub tick: u64,
    pub event_type: String,
    pub text: String,
    pub severity: f32,
}

/// Formats structured events as text. Implementations must be deterministic.
pub trait Narrator: Send + Sync {
    fn narrate_cluster(&self, trigger: &NarrativeTrigger) -> String;

    /// `None` for events not worth a line.
    fn narrate_event(&self, event: &LiveEvent) -> Option<String>;
}

/// Fixed templates keyed on tone, size and knowledge.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicNarrator;

impl Narrator for HeuristicNarrator {
    fn narrate_cluster(&self, trigger: &NarrativeTrigger) -> String {
        let mut text = match trigger.tone {
            NarrativeTone::Cooperative => format!(
                "A cluster of {} positive-charged particles has developed cooperative behavior, actively seeking to exchange knowledge.",
                trigger.size
            ),
            NarrativeTone::Isolationist => format!(
                "A cluster of {} negative-charged particles has formed a protective information enclave, selectively interacting with the environment.",
                trigger.size
            ),
            NarrativeTone::Selective => format!(
                "A balanced cluster of {} neutral particles has emerged, mediating interactions between positive and negative regions.",
                trigger.size
            ),
        };
        if trigger.knowledge > KNOWLEDGE_CLAUSE {
            text.push_str(" The cluster is showing signs of information processing capabilities.");
        }
        if trigger.size > SIZE_CLAUSE {
            text.push_str(" This cluster is unusually large, suggesting emergent group behavior.");
        }
        text
    }

    fn narrate_event(&self, event: &LiveEvent) -> Option<String> {
        match event {
            LiveEvent::ClusterNarrative { trigger, .. } => Some(self.narrate_cluster(trigger)),
            LiveEvent::Anomaly { tick, anomaly } => Some(format!(
                "{} Tick {}: {}",
                severity_glyph(anomaly.severity as f32),
                tick,
                anomaly.description
            )),
            LiveEvent::InflationStarted { tick, inflation } => Some(format!(
                "◈ Inflation at tick {}: the domain doubles as {} particles burst into {}.",
                tick, inflation.particles_before, inflation.particles_after
            )),
            LiveEvent::InflationEnded { tick } => Some(format!(
                "○ Tick {}: the domain settles back to its original extent.",
                tick
            )),
            LiveEvent::Emergence { tick, entity } => Some(format!(
                "◈ Tick {}: {} emerges from {} {} particles (intelligence {:.2}).",
                tick,
                entity.id,
                entity.size,
                entity.charge.as_str(),
                entity.intelligence_index
            )),
            LiveEvent::Culled { .. } => None,
        }
    }
}

fn severity_glyph(severity: f32) -> &'static str {
    if severity > 0.8 {
        "◈"
    } else if severity > 0.5 {
        "◇"
    } else {
        "○"
    }
}

fn event_severity(event: &LiveEvent) -> f32 {
    match event {
        LiveEvent::Anomaly { anomaly, .. } => anomaly.severity as f32,
        LiveEvent::InflationStarted { .. } | LiveEvent::Emergence { .. } => 1.0,
        LiveEvent::ClusterNarrative { .. } => 0.6,
        LiveEvent::InflationEnded { .. } | LiveEvent::Culled { .. } => 0.2,
    }
}

/// Rolling record of narrated events, capped at `max_history` of each kind.
pub struct Chronicle {
    narrator: Box<dyn Narrator>,
    narrations: VecDeque<Narration>,
    cluster_narratives: VecDeque<ClusterNarrative>,
    max_history: usize,
}

impl Default for Chronicle {
    fn default() -> Self {
        Self::new(Box::new(HeuristicNarrator))
    }
}

impl std::fmt::Debug for Chronicle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chronicle")
            .field("narrations", &self.narrations.len())
            .field("cluster_narratives", &self.cluster_narratives.len())
            .field("max_history", &self.max_history)
            .finish()
    }
}

impl Chronicle {
    pub fn new(narrator: Box<dyn Narrator>) -> Self {
        Self::with_capacity(narrator, DEFAULT_MAX_HISTORY)
    }

    pub fn with_capacity(narrator: Box<dyn Narrator>, max_history: usize) -> Self {
        Self {
            narrator,
            narrations: VecDeque::with_capacity(max_history),
            cluster_narratives: VecDeque::new(),
            max_history: max_history.max(1),
        }
    }

    /// Narrates and stores one event. Returns the text, if any.
    pub fn record(&mut self, event: &LiveEvent) -> Option<&Narration> {
        let text = self.narrator.narrate_event(event)?;

        if let LiveEvent::ClusterNarrative { trigger, .. } = event {
            if self.cluster_narratives.len() >= self.max_history {
                self.cluster_narratives.pop_front();
            }
            self.cluster_narratives.push_back(ClusterNarrative {
                cluster_id: trigger.cluster_id,
                narrative: text.clone(),
                timestamp: trigger.timestamp,
            });
        }

        if self.narrations.len() >= self.max_history {
            self.narrations.pop_front();
        }
        self.narrations.push_back(Narration {
            tick: event.tick(),
            event_type: event.kind().to_string(),
            text,
            severity: event_severity(event),
        });
        self.narrations.back()
    }

    pub fn record_all(&mut self, events: &[LiveEvent]) -> usize {
        events
            .iter()
            .filter(|event| self.record(event).is_some())
            .count()
    }

    pub fn narrations(&self) -> impl Iterator<Item = &Narration> {
        self.narrations.iter()
    }

    pub fn cluster_narratives(&self) -> impl Iterator<Item = &ClusterNarrative> {
        self.cluster_narratives.iter()
    }

    /// Drains pending narrations, leaving cluster narratives in place.
    pub fn consume_narrations(&mut self) -> Vec<Narration> {
        self.narrations.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.narrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.narrations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intentsim_data::{AnomalyEvent, AnomalyKind, Charge, EmergentEntity};

    fn trigger(charge: Charge, size: usize, knowledge: f64) -> NarrativeTrigger {
        NarrativeTrigger {
            cluster_id: 4,
            timestamp: 120,
            tone: NarrativeTone::from(charge),
            charge,
            size,
            knowledge,
            complexity: 3.0,
            intelligence_score: 3.5,
        }
    }

    #[test]
    fn test_tone_selects_template() {
        let narrator = HeuristicNarrator;
        assert!(narrator
            .narrate_cluster(&trigger(Charge::Positive, 5, 1.0))
            .contains("cooperative"));
        assert!(narrator
            .narrate_cluster(&trigger(Charge::Negative, 5, 1.0))
            .contains("enclave"));
        assert!(narrator
            .narrate_cluster(&trigger(Charge::Neutral, 5, 1.0))
            .contains("mediating"));
    }

    #[test]
    fn test_extra_clauses() {
        let narrator = HeuristicNarrator;
        let plain = narrator.narrate_cluster(&trigger(Charge::Positive, 5, 1.0));
        assert!(!plain.contains("information processing"));
        assert!(!plain.contains("unusually large"));

        let rich = narrator.narrate_cluster(&trigger(Charge::Positive, 12, 6.0));
        assert!(rich.contains("information processing"));
        assert!(rich.contains("unusually large"));
    }

    #[test]
    fn test_culling_is_silent() {
        let narrator = HeuristicNarrator;
        assert!(narrator
            .narrate_event(&LiveEvent::Culled { tick: 1, count: 3 })
            .is_none());
    }

    #[test]
    fn test_chronicle_records_cluster_narratives() {
        let mut chronicle = Chronicle::default();
        let event = LiveEvent::ClusterNarrative {
            tick: 120,
            trigger: trigger(Charge::Negative, 6, 2.0),
        };
        assert!(chronicle.record(&event).is_some());

        let stored: Vec<_> = chronicle.cluster_narratives().collect();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].cluster_id, 4);
        assert_eq!(stored[0].timestamp, 120);

        let json = serde_json::to_string(stored[0]).unwrap();
        assert!(json.contains("\"clusterId\":4"));
    }

    #[test]
    fn test_chronicle_is_bounded() {
        let mut chronicle = Chronicle::with_capacity(Box::new(HeuristicNarrator), 3);
        let events: Vec<_> = (0..10)
            .map(|tick| LiveEvent::InflationEnded { tick })
            .collect();
        assert_eq!(chronicle.record_all(&events), 10);
        assert_eq!(chronicle.len(), 3);
        let ticks: Vec<u64> = chronicle.narrations().map(|n| n.tick).collect();
        assert_eq!(ticks, vec![7, 8, 9]);

        let drained = chronicle.consume_narrations();
        assert_eq!(drained.len(), 3);
        assert!(chronicle.is_empty());
    }

    #[test]
    fn test_event_lines() {
        let mut chronicle = Chronicle::default();
        let anomaly = LiveEvent::Anomaly {
            tick: 50,
            anomaly: AnomalyEvent {
                kind: AnomalyKind::EntropySpike,
                severity: 0.9,
                timestamp: 50,
                affected_particles: vec![],
                description: "Entropy jumped".to_string(),
            },
        };
        let emergence = LiveEvent::Emergence {
            tick: 51,
            entity: EmergentEntity {
                id: "entity-0123456789abcdef".to_string(),
                intelligence_index: 12.5,
                size: 8,
                charge: Charge::Positive,
                member_ids: vec![uuid::Uuid::new_v4()],
            },
        };
        chronicle.record(&anomaly);
        chronicle.record(&emergence);
        let lines: Vec<_> = chronicle.narrations().collect();
        assert_eq!(lines[0].text, "◈ Tick 50: Entropy jumped");
        assert_eq!(lines[0].event_type, "Anomaly");
        assert!(lines[1].text.contains("entity-0123456789abcdef"));
        assert_eq!(lines[1].severity, 1.0);
    }
}
