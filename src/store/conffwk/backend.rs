use crate::diagnostics::SharedDiagnostics;
use crate::error::Result;
use crate::store::conffwk::{ConffwkConfiguration, ConffwkDatabase, ConffwkObjectHandler};
use crate::store::{ConfigBackend, Configuration, EngineHandle};
use std::rc::Rc;

/// Data backend: a conffwk session plus its object handler.
pub struct ConffwkBackend {
    configuration: ConffwkConfiguration,
    handler: ConffwkObjectHandler,
}

impl ConffwkBackend {
    pub fn new(diagnostics: SharedDiagnostics) -> Self {
        let configuration = ConffwkConfiguration::new(Rc::clone(&diagnostics));
        let handler = ConffwkObjectHandler::new(configuration.database(), diagnostics);
        Self {
            configuration,
            handler,
        }
    }

    pub fn with_path(path: &str, diagnostics: SharedDiagnostics) -> Result<Self> {
        let mut backend = Self::new(diagnostics);
        backend.configuration.open(path)?;
        Ok(backend)
    }

    pub fn database(&self) -> EngineHandle<ConffwkDatabase> {
        self.configuration.database()
    }
}

impl ConfigBackend for ConffwkBackend {
    type Config = ConffwkConfiguration;
    type Handler = ConffwkObjectHandler;

    fn configuration(&self) -> &ConffwkConfiguration {
        &self.configuration
    }

    fn configuration_mut(&mut self) -> &mut ConffwkConfiguration {
        &mut self.configuration
    }

    fn handler(&self) -> &ConffwkObjectHandler {
        &self.handler
    }
}
