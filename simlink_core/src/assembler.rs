// simlink_core/src/assembler.rs

use crate::collision::CollisionRule;
use crate::engine::{EntityRef, SimulationEngine};
use crate::error::ExtractionError;
use crate::registry::{FieldRegistry, QueryContext};
use crate::resolver;
use crate::types::{ObservationConfig, ObservationSpec};
use tracing::{debug, info, warn};

/// Value written into any observation slot that could not be extracted.
pub const SENTINEL: f32 = 0.0;

/// Turns the observation schema into a fixed-order numeric vector.
///
/// The output always has exactly one value per configured spec, in spec
/// order. Failures are logged and written as [`SENTINEL`].
#[derive(Debug, Clone)]
pub struct ObservationAssembler {
    config: ObservationConfig,
    registry: FieldRegistry,
    collision: CollisionRule,
}

impl ObservationAssembler {
    pub fn new(config: ObservationConfig, registry: FieldRegistry, collision: CollisionRule) -> Self {
        for spec in &config.specs {
            if !spec.is_collision() && !registry.is_known(&spec.field_key()) {
                warn!(
                    "Observation '{}' uses unknown field '{}', it will always read {}",
                    spec.output_name,
                    spec.field_key(),
                    SENTINEL
                );
            }
        }
        Self {
            config,
            registry,
            collision,
        }
    }

    pub fn config(&self) -> &ObservationConfig {
        &self.config
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn collision_rule(&self) -> &CollisionRule {
        &self.collision
    }

    pub fn len(&self) -> usize {
        self.config.len()
    }

    pub fn is_empty(&self) -> bool {
        self.config.is_empty()
    }

    /// Output names, index-aligned with [`Self::observation_vector`].
    pub fn observation_names(&self) -> Vec<&str> {
        self.config
            .specs
            .iter()
            .map(|spec| spec.output_name.as_str())
            .collect()
    }

    /// Extracts a single spec. Pure: never advances the engine.
    pub fn extract(
        &self,
        engine: &dyn SimulationEngine,
        spec: &ObservationSpec,
    ) -> Result<f64, ExtractionError> {
        let ctx = QueryContext {
            engine,
            collision: &self.collision,
        };

        if spec.is_collision() {
            return Ok(self.collision.flag(engine, &spec.entity_name));
        }

        let key = spec.field_key();
        match resolver::resolve(engine, &spec.entity_name) {
            Some(EntityRef::Robot(id)) => self.registry.extract_robot(ctx, id, &key),
            Some(EntityRef::Sensor(id)) => self.registry.extract_sensor(ctx, id, &key),
            Some(EntityRef::Actuator(id)) => self.registry.extract_actuator(ctx, id, &key),
            None => Err(ExtractionError::EntityNotFound(spec.entity_name.clone())),
        }
    }

    pub fn observation_vector(&self, engine: &dyn SimulationEngine) -> Vec<f32> {
        self.config
            .specs
            .iter()
            .map(|spec| match self.extract(engine, spec) {
                Ok(value) if value.is_finite() => value as f32,
                Ok(value) => {
                    warn!("Observation '{}' is not finite ({}), using {}", spec.output_name, value, SENTINEL);
                    SENTINEL
                }
                Err(err) => {
                    warn!("Observation '{}': {}", spec.output_name, err);
                    SENTINEL
                }
            })
            .collect()
    }

    pub fn log_specs(&self) {
        info!("Observation schema has {} entries", self.len());
        for (index, spec) in self.config.specs.iter().enumerate() {
            debug!(
                "  [{}] {} <- {}.{}",
                index,
                spec.output_name,
                spec.entity_name,
                spec.field_key()
            );
        }
    }
}
