//! Fluent builder for constructing a [`Simulation`].

use tracing::debug;

use des_core::SimConfig;
use des_model::ModelBuilder;

use crate::{NoopListener, SimListener, SimResult, Simulation};

/// Fluent builder for [`Simulation<L>`].
///
/// # Required inputs
///
/// - [`SimConfig`]: horizon, seed, worker count, ...
/// - [`ModelBuilder`]: the registered model
///
/// # Optional inputs
///
/// | Method           | Default          |
/// |------------------|------------------|
/// | `.listener(l)`   | [`NoopListener`] |
///
/// # Example
///
/// ```rust,ignore
/// let mut sim = SimulationBuilder::new(config, model)
///     .listener(CollectingListener::new())
///     .build()?;
/// let report = sim.run()?;
/// ```
pub struct SimulationBuilder<L = NoopListener> {
    config:   SimConfig,
    model:    ModelBuilder,
    listener: L,
}

impl SimulationBuilder<NoopListener> {
    pub fn new(config: SimConfig, model: ModelBuilder) -> Self {
        Self { config, model, listener: NoopListener }
    }
}

impl<L: SimListener + Send> SimulationBuilder<L> {
    /// Replace the telemetry listener.
    pub fn listener<M: SimListener + Send>(self, listener: M) -> SimulationBuilder<M> {
        SimulationBuilder { config: self.config, model: self.model, listener }
    }

    /// Validate the configuration, build and partition the model.
    pub fn build(self) -> SimResult<Simulation<L>> {
        self.config.validate()?;
        let world = self.model.build(self.config.seed)?;
        debug!(
            horizon = %self.config.horizon(),
            seed = self.config.seed,
            workers = ?self.config.num_workers,
            "simulation built"
        );
        Ok(Simulation { config: self.config, world, listener: self.listener, ran: false })
    }
}
