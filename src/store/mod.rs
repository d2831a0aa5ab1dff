pub mod accessor;
pub mod conffwk;
pub mod oks;
pub mod traits;

pub use conffwk::*;
pub use oks::*;
pub use traits::*;

use crate::diagnostics::{Finding, SharedDiagnostics};
use crate::error::{AdaptorError, Result};
use crate::model::ConfigType;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Shared handle to an engine owned by a session.
pub type EngineHandle<E> = Rc<RefCell<E>>;

/// Soft naming rule: a configuration of kind `kind` ends with `<kind>.xml`.
pub(crate) fn check_configuration_name(
    diagnostics: &SharedDiagnostics,
    kind: ConfigType,
    name: &str,
) -> bool {
    if kind.matches_name(name) {
        return true;
    }
    diagnostics.report(Finding::NamingConvention {
        name: name.to_string(),
        expected_suffix: kind.expected_suffix(),
    });
    false
}

/// Wrappers hold weak engine handles; a dropped engine reads as "not loaded".
pub(crate) fn upgrade<E>(engine: &Weak<RefCell<E>>) -> Result<EngineHandle<E>> {
    engine.upgrade().ok_or(AdaptorError::ConfigurationNotLoaded)
}
