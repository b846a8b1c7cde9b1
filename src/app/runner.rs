//! Headless tick loop.
//!
//! Owns the universe and everything the engine itself never touches: the
//! state store, the event journal and the narrative chronicle. Ticks are
//! driven by a tokio interval; persistence happens between ticks.

use anyhow::{Context, Result};
use intentsim_core::Universe;
use intentsim_data::LiveEvent;
use intentsim_io::persistence::save_universe;
use intentsim_io::{load_or_initialize, EventJournal, FileStore, StateStore};
use intentsim_observer::Chronicle;
use serde::Serialize;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::config::{AppConfig, RunnerConfig};
use super::shutdown::StopSignal;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub ticks_run: u64,
    pub final_frame: u64,
    pub particle_count: usize,
    pub cluster_count: usize,
    pub total_interactions: u64,
    pub inflation_events: usize,
    pub inflations_completed: u64,
    pub journal_entries: u64,
    pub mean_tick_micros: u64,
    /// Wall time since the universe was built or restored.
    pub uptime_ms: u64,
}

pub struct Runner {
    universe: Universe,
    store: Box<dyn StateStore>,
    journal: EventJournal,
    chronicle: Chronicle,
    config: RunnerConfig,
    restore_warning: Option<String>,
}

impl Runner {
    /// Opens the file store under `state_dir` and resumes the saved universe,
    /// unless `fresh` is set.
    pub fn open(config: AppConfig, fresh: bool) -> Result<Self> {
        let store = FileStore::open(&config.runner.state_dir)
            .with_context(|| format!("opening state directory {}", config.runner.state_dir))?;
        if fresh {
            store
                .remove(&config.runner.state_key)
                .context("discarding saved state")?;
        }

        let restored = load_or_initialize(
            &store,
            &config.runner.state_key,
            config.simulation,
            config.runner.state_format,
        )
        .context("initializing universe")?;

        let journal = match &config.runner.journal_dir {
            Some(dir) => EventJournal::new_at(dir)
                .with_context(|| format!("opening event journal in {}", dir))?,
            None => EventJournal::new_dummy(),
        };

        let mut runner = Self::from_parts(restored.universe, Box::new(store), journal, config.runner);
        runner.restore_warning = restored.warning;
        Ok(runner)
    }

    pub fn from_parts(
        universe: Universe,
        store: Box<dyn StateStore>,
        journal: EventJournal,
        config: RunnerConfig,
    ) -> Self {
        Self {
            universe,
            store,
            journal,
            chronicle: Chronicle::default(),
            config,
            restore_warning: None,
        }
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn universe_mut(&mut self) -> &mut Universe {
        &mut self.universe
    }

    pub fn chronicle(&self) -> &Chronicle {
        &self.chronicle
    }

    /// Why a saved state was discarded at startup, if it was.
    pub fn restore_warning(&self) -> Option<&str> {
        self.restore_warning.as_deref()
    }

    /// One tick plus its side effects. Journal and autosave faults are logged, not returned.
    pub fn step(&mut self) -> Vec<LiveEvent> {
        let events = self.universe.tick();

        if let Err(e) = self.journal.log_all(&events) {
            warn!(error = %e, "Failed to append to event journal");
            self.universe.metrics().increment_counter("journal_failures");
        }
        for event in &events {
            if let Some(narration) = self.chronicle.record(event) {
                debug!(tick = narration.tick, kind = %narration.event_type, "{}", narration.text);
            }
        }

        let frame = self.universe.frame();
        let interval = self.config.autosave_interval;
        if interval > 0 && frame > 0 && frame % interval == 0 {
            match self.save() {
                Ok(()) => info!(frame, "Autosaved"),
                Err(e) => {
                    warn!(frame, error = %e, "Autosave failed");
                    self.universe.metrics().increment_counter("autosave_failures");
                }
            }
        }
        events
    }

    pub fn save(&self) -> Result<()> {
        save_universe(
            self.store.as_ref(),
            &self.config.state_key,
            &self.universe,
            self.config.state_format,
        )
        .with_context(|| format!("saving state {:?}", self.config.state_key))
    }

    /// Ticks on the configured interval until shutdown or `max_ticks`.
    pub async fn run(&mut self, stop: &StopSignal) -> Result<RunSummary> {
        let period = Duration::from_millis(self.config.tick_interval_ms.max(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            frame = self.universe.frame(),
            particles = self.universe.particles().len(),
            period_ms = period.as_millis() as u64,
            "Runner started"
        );

        let mut ticks = 0u64;
        while !stop.is_stopped() {
            if self.config.max_ticks.is_some_and(|max| ticks >= max) {
                break;
            }
            interval.tick().await;
            self.step();
            ticks += 1;
        }

        let summary = self.summary(ticks);
        info!(
            ticks = summary.ticks_run,
            frame = summary.final_frame,
            particles = summary.particle_count,
            "Runner stopped"
        );
        Ok(summary)
    }

    /// Final save (if configured) and pause.
    pub fn finish(&mut self) -> Result<()> {
        if self.config.save_on_exit {
            info!(frame = self.universe.frame(), "Saving state before exit");
            self.save()?;
        }
        self.universe.pause();
        Ok(())
    }

    pub fn summary(&self, ticks_run: u64) -> RunSummary {
        let snapshot = self.universe.snapshot();
        RunSummary {
            ticks_run,
            final_frame: self.universe.frame(),
            particle_count: snapshot.particle_count,
            cluster_count: snapshot.cluster_count,
            total_interactions: snapshot.total_interactions,
            inflation_events: snapshot.inflation_events.len(),
            inflations_completed: self.universe.inflations_completed(),
            journal_entries: self.journal.written(),
            mean_tick_micros: self.universe.metrics().mean_tick_micros(),
            uptime_ms: self.universe.metrics().elapsed().as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intentsim_core::SimulationConfig;
    use intentsim_io::persistence::decode_state;
    use intentsim_io::{MemoryStore, StateFormat};

    fn simulation() -> SimulationConfig {
        SimulationConfig {
            seed: Some(21),
            initial_particles: 20,
            ..Default::default()
        }
    }

    fn runner_config(autosave_interval: u64) -> RunnerConfig {
        RunnerConfig {
            tick_interval_ms: 1,
            autosave_interval,
            state_format: StateFormat::Json,
            journal_dir: None,
            ..Default::default()
        }
    }

    fn memory_runner(autosave_interval: u64) -> (Runner, MemoryStore) {
        let store = MemoryStore::new();
        let runner = Runner::from_parts(
            Universe::new(simulation()).unwrap(),
            Box::new(store.clone()),
            EventJournal::new_dummy(),
            runner_config(autosave_interval),
        );
        (runner, store)
    }

    #[test]
    fn test_autosave_on_interval() {
        let (mut runner, store) = memory_runner(3);
        runner.step();
        runner.step();
        assert!(store.get("latest").unwrap().is_none());
        runner.step();

        let bytes = store.get("latest").unwrap().expect("autosaved");
        let state = decode_state(&bytes, StateFormat::Json).unwrap();
        assert_eq!(state.frame_count, 3);
    }

    #[test]
    fn test_autosave_disabled() {
        let (mut runner, store) = memory_runner(0);
        for _ in 0..5 {
            runner.step();
        }
        assert!(store.get("latest").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_run_stops_at_max_ticks() {
        let (mut runner, _store) = memory_runner(0);
        runner.config.max_ticks = Some(4);
        let summary = runner.run(&StopSignal::new()).await.unwrap();
        assert_eq!(summary.ticks_run, 4);
        assert_eq!(summary.final_frame, 4);
        assert_eq!(summary.particle_count, runner.universe().particles().len());
        assert_eq!(summary.inflations_completed, runner.universe().inflations_completed());

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"inflationsCompleted\"") && json.contains("\"uptimeMs\""));
    }

    #[tokio::test]
    async fn test_run_honours_stop() {
        let (mut runner, _store) = memory_runner(0);
        let stop = StopSignal::new();
        stop.stop();
        let summary = runner.run(&stop).await.unwrap();
        assert_eq!(summary.ticks_run, 0);
        assert_eq!(summary.final_frame, 0);
    }

    #[test]
    fn test_finish_saves_and_pauses() {
        let (mut runner, store) = memory_runner(0);
        runner.step();
        runner.finish().unwrap();
        assert!(store.get("latest").unwrap().is_some());
        assert!(!runner.universe().is_running());

        let (mut runner, store) = memory_runner(0);
        runner.config.save_on_exit = false;
        runner.finish().unwrap();
        assert!(store.get("latest").unwrap().is_none());
    }

    #[test]
    fn test_open_resumes_saved_universe() {
        let root = std::env::temp_dir().join(format!("intentsim-runner-{}", uuid::Uuid::new_v4()));
        let config = AppConfig {
            simulation: simulation(),
            runner: RunnerConfig {
                state_dir: root.join("state").display().to_string(),
                journal_dir: Some(root.join("logs").display().to_string()),
                ..runner_config(0)
            },
        };

        let mut first = Runner::open(config.clone(), false).unwrap();
        assert!(first.restore_warning().is_none());
        for _ in 0..6 {
            first.step();
        }
        first.save().unwrap();

        let resumed = Runner::open(config.clone(), false).unwrap();
        assert_eq!(resumed.universe().frame(), 6);
        assert_eq!(
            resumed.universe().export_state(),
            first.universe().export_state()
        );

        let fresh = Runner::open(config, true).unwrap();
        assert_eq!(fresh.universe().frame(), 0);
        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_open_survives_corrupt_state() {
        let root = std::env::temp_dir().join(format!("intentsim-runner-{}", uuid::Uuid::new_v4()));
        let state_dir = root.join("state");
        let store = FileStore::open(&state_dir).unwrap();
        store.set("latest", b"not a state").unwrap();

        let config = AppConfig {
            simulation: simulation(),
            runner: RunnerConfig {
                state_dir: state_dir.display().to_string(),
                ..runner_config(0)
            },
        };
        let runner = Runner::open(config, false).unwrap();
        assert!(runner.restore_warning().is_some());
        assert_eq!(runner.universe().frame(), 0);
        std::fs::remove_dir_all(&root).ok();
    }
}
