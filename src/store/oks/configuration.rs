use crate::diagnostics::{Finding, SharedDiagnostics};
use crate::error::{AdaptorError, Result};
use crate::model::{ConfigType, NameList, SaveRecord};
use crate::store::oks::OksKernel;
use crate::store::{check_configuration_name, Configuration, EngineHandle};
use std::cell::RefCell;
use std::rc::Rc;

/// Schema session over an [`OksKernel`].
pub struct OksConfiguration {
    kernel: EngineHandle<OksKernel>,
    name: Option<String>,
    diagnostics: SharedDiagnostics,
}

impl OksConfiguration {
    pub fn new(diagnostics: SharedDiagnostics) -> Self {
        Self {
            kernel: Rc::new(RefCell::new(OksKernel::new())),
            name: None,
            diagnostics,
        }
    }

    pub fn kernel(&self) -> EngineHandle<OksKernel> {
        Rc::clone(&self.kernel)
    }

    pub fn diagnostics(&self) -> SharedDiagnostics {
        Rc::clone(&self.diagnostics)
    }

    pub fn history(&self) -> Vec<SaveRecord> {
        self.kernel.borrow().history().to_vec()
    }
}

impl Configuration for OksConfiguration {
    fn config_type(&self) -> ConfigType {
        ConfigType::Schema
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn is_open(&self) -> bool {
        self.kernel.borrow().is_loaded()
    }

    fn open(&mut self, name: &str) -> Result<()> {
        check_configuration_name(&self.diagnostics, self.config_type(), name);
        log::info!("Opening configuration: {}", name);
        self.kernel.borrow_mut().load_schema(name)?;
        self.name = Some(name.to_string());
        Ok(())
    }

    fn close(&mut self, partial: bool, targets: NameList) -> Result<()> {
        let mut kernel = self.kernel.borrow_mut();
        if !partial {
            kernel.close_all_schema();
        } else {
            for target in targets.unique() {
                if !kernel.close_schema(target) {
                    self.diagnostics.report(Finding::UnknownCloseTarget {
                        target: target.to_string(),
                    });
                }
            }
        }
        if !kernel.is_loaded() {
            self.name = None;
        }
        Ok(())
    }

    fn save(&mut self, message: &str) -> Result<()> {
        if !self.is_open() {
            return Err(AdaptorError::ConfigurationNotLoaded);
        }
        log::info!("Saving configuration with commit message: {}", message);
        self.kernel.borrow_mut().save_all_schema(message)?;
        Ok(())
    }
}
