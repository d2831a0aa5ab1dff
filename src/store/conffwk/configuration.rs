use crate::diagnostics::{Finding, SharedDiagnostics};
use crate::error::{AdaptorError, Result};
use crate::model::{ConfigType, NameList, SaveRecord};
use crate::store::conffwk::ConffwkDatabase;
use crate::store::{check_configuration_name, Configuration, EngineHandle};
use std::cell::RefCell;
use std::rc::Rc;

/// Data session over a [`ConffwkDatabase`].
pub struct ConffwkConfiguration {
    database: EngineHandle<ConffwkDatabase>,
    name: Option<String>,
    diagnostics: SharedDiagnostics,
}

impl ConffwkConfiguration {
    pub fn new(diagnostics: SharedDiagnostics) -> Self {
        Self {
            database: Rc::new(RefCell::new(ConffwkDatabase::new())),
            name: None,
            diagnostics,
        }
    }

    pub fn database(&self) -> EngineHandle<ConffwkDatabase> {
        Rc::clone(&self.database)
    }

    pub fn history(&self) -> Vec<SaveRecord> {
        self.database.borrow().history().to_vec()
    }
}

impl Configuration for ConffwkConfiguration {
    fn config_type(&self) -> ConfigType {
        ConfigType::Data
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn is_open(&self) -> bool {
        self.database.borrow().is_loaded()
    }

    /// Opening replaces whatever was loaded before.
    fn open(&mut self, name: &str) -> Result<()> {
        check_configuration_name(&self.diagnostics, self.config_type(), name);
        log::info!("Opening configuration: {}", name);
        let mut database = self.database.borrow_mut();
        if database.is_loaded() {
            database.unload();
            self.name = None;
        }
        database.load(name)?;
        self.name = Some(name.to_string());
        Ok(())
    }

    /// The database unloads as a whole; a partial close is reported and
    /// treated as a full one.
    fn close(&mut self, partial: bool, _targets: NameList) -> Result<()> {
        if !self.is_open() {
            return Err(AdaptorError::ConfigurationNotLoaded);
        }
        log::info!(
            "Closing configuration: {}",
            self.name.as_deref().unwrap_or_default()
        );
        if partial {
            self.diagnostics.report(Finding::PartialCloseUnsupported);
        }
        self.database.borrow_mut().unload();
        self.name = None;
        Ok(())
    }

    fn save(&mut self, message: &str) -> Result<()> {
        if !self.is_open() {
            return Err(AdaptorError::ConfigurationNotLoaded);
        }
        self.database.borrow_mut().commit(message)?;
        Ok(())
    }
}
