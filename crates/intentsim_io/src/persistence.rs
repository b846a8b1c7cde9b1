//! Encoding of [`SimulationState`] and restore-or-initialize.

use crate::error::{IoError, Result};
use crate::serialization::{from_gz_json, from_json, to_gz_json, to_json};
use crate::storage::StateStore;
use intentsim_core::{SimulationConfig, Universe};
use intentsim_data::SimulationState;
use rkyv::de::deserializers::SharedDeserializeMap;
use rkyv::ser::serializers::AllocSerializer;
use rkyv::ser::Serializer;
use rkyv::{AlignedVec, Deserialize};
use serde::{Deserialize as SerdeDeserialize, Serialize};
use tracing::{info, warn};

/// On-the-wire encoding of a saved state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, SerdeDeserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StateFormat {
    /// camelCase JSON, the export contract.
    Json,
    /// The same JSON, gzip-compressed.
    #[default]
    GzJson,
    /// rkyv archive.
    Rkyv,
}

pub fn state_to_rkyv_bytes(state: &SimulationState) -> Result<AlignedVec> {
    let mut serializer = AllocSerializer::<4096>::default();
    serializer
        .serialize_value(state)
        .map_err(|e| IoError::encode("rkyv", format!("{:?}", e)))?;
    Ok(serializer.into_serializer().into_inner())
}

/// Validates and decodes an rkyv archive. The input need not be aligned.
pub fn state_from_rkyv_bytes(bytes: &[u8]) -> Result<SimulationState> {
    let mut aligned = AlignedVec::with_capacity(bytes.len());
    aligned.extend_from_slice(bytes);
    let archived = rkyv::check_archived_root::<SimulationState>(&aligned)
        .map_err(|e| IoError::decode("rkyv", format!("validation failed: {:?}", e)))?;
    let mut deserializer = SharedDeserializeMap::default();
    archived
        .deserialize(&mut deserializer)
        .map_err(|e| IoError::decode("rkyv", format!("{:?}", e)))
}

pub fn encode_state(state: &SimulationState, format: StateFormat) -> Result<Vec<u8>> {
    match format {
        StateFormat::Json => Ok(to_json(state)?.into_bytes()),
        StateFormat::GzJson => to_gz_json(state),
        StateFormat::Rkyv => Ok(state_to_rkyv_bytes(state)?.to_vec()),
    }
}

pub fn decode_state(bytes: &[u8], format: StateFormat) -> Result<SimulationState> {
    match format {
        StateFormat::Json => {
            let json = std::str::from_utf8(bytes)
                .map_err(|e| IoError::decode("json", format!("state is not UTF-8: {}", e)))?;
            from_json(json)
        }
        StateFormat::GzJson => from_gz_json(bytes),
        StateFormat::Rkyv => state_from_rkyv_bytes(bytes),
    }
}

/// Writes the universe's exported state under `key`.
pub fn save_universe(
    store: &dyn StateStore,
    key: &str,
    universe: &Universe,
    format: StateFormat,
) -> Result<()> {
    let bytes = encode_state(&universe.export_state(), format)?;
    store
        .set(key, &bytes)
        .map_err(|e| e.with_context(format!("saving state {:?}", key)))
}

/// Outcome of [`load_or_initialize`].
#[derive(Debug)]
pub struct Restored {
    pub universe: Universe,
    /// Set when a stored state existed but could not be used.
    pub warning: Option<String>,
}

/// Restores the universe saved under `key`, or builds a fresh one.
///
/// A missing key silently yields a fresh universe. A stored state that fails
/// to decode or restore also yields a fresh universe, with the reason in
/// [`Restored::warning`].
///
/// # Errors
/// Only when the store itself fails or the configuration is invalid.
pub fn load_or_initialize(
    store: &dyn StateStore,
    key: &str,
    config: SimulationConfig,
    format: StateFormat,
) -> Result<Restored> {
    let Some(bytes) = store.get(key)? else {
        info!(key, "No saved state, starting fresh");
        return Ok(Restored {
            universe: Universe::new(config)?,
            warning: None,
        });
    };

    let attempt = decode_state(&bytes, format)
        .and_then(|state| Universe::restore(config.clone(), state).map_err(IoError::from));
    match attempt {
        Ok(universe) => Ok(Restored {
            universe,
            warning: None,
        }),
        Err(e) => {
            let warning = format!("saved state {:?} unusable, starting fresh: {}", key, e);
            warn!(key, error = %e, "Saved state unusable, starting fresh");
            Ok(Restored {
                universe: Universe::new(config)?,
                warning: Some(warning),
            })
        }
    }
}
