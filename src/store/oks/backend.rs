use crate::diagnostics::SharedDiagnostics;
use crate::error::Result;
use crate::store::oks::{OksClassHandler, OksConfiguration, OksKernel};
use crate::store::{ConfigBackend, Configuration, EngineHandle};
use std::rc::Rc;

/// Schema backend: an OKS session plus its class handler.
pub struct OksBackend {
    configuration: OksConfiguration,
    handler: OksClassHandler,
}

impl OksBackend {
    pub fn new(diagnostics: SharedDiagnostics) -> Self {
        let configuration = OksConfiguration::new(Rc::clone(&diagnostics));
        let handler = OksClassHandler::new(configuration.kernel(), diagnostics);
        Self {
            configuration,
            handler,
        }
    }

    /// Creates the backend and opens `path` right away.
    pub fn with_path(path: &str, diagnostics: SharedDiagnostics) -> Result<Self> {
        let mut backend = Self::new(diagnostics);
        backend.configuration.open(path)?;
        Ok(backend)
    }

    pub fn kernel(&self) -> EngineHandle<OksKernel> {
        self.configuration.kernel()
    }
}

impl ConfigBackend for OksBackend {
    type Config = OksConfiguration;
    type Handler = OksClassHandler;

    fn configuration(&self) -> &OksConfiguration {
        &self.configuration
    }

    fn configuration_mut(&mut self) -> &mut OksConfiguration {
        &mut self.configuration
    }

    fn handler(&self) -> &OksClassHandler {
        &self.handler
    }
}
