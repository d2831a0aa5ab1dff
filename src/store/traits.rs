use crate::error::Result;
use crate::model::{Attributes, ConfigType, NameList};
use serde_json::Value;

/// Generic attribute access on a wrapped engine object.
pub trait ObjectModifier {
    fn get_attr(&self, name: &str) -> Result<Value>;
    fn set_attr(&self, name: &str, value: Value) -> Result<()>;
}

/// Anything a consumer can list by name.
pub trait NamedObject {
    fn name(&self) -> Result<String>;
}

/// Ties a handler to the wrapper type it hands out.
pub trait ObjectHandler {
    type Object: NamedObject + ObjectModifier + Clone;
}

pub trait ObjectManager: ObjectHandler {
    /// Every object, or only those of the named classes (filter order, no duplicates).
    fn get_all_obj(&self, filter: Option<NameList>) -> Result<Vec<Self::Object>>;
}

/// Objects unique by class name alone (schema classes).
pub trait ClassObjectManager: ObjectManager {
    fn get_obj(&self, class_name: &str) -> Result<Self::Object>;
}

/// Objects addressed by class and instance name (data objects).
pub trait NamedObjectManager: ObjectManager {
    fn get_obj(&self, class_name: &str, object_name: &str) -> Result<Self::Object>;
}

pub trait ObjectLifecycle: ObjectHandler {
    fn add(&self, obj: &Self::Object) -> Result<Self::Object>;
    fn delete(&self, obj: &Self::Object) -> Result<()>;
    fn rename(&self, obj: &Self::Object, new_name: &str) -> Result<Self::Object>;
}

pub trait ClassObjectLifecycle: ObjectLifecycle {
    fn create(&self, class_name: &str, attributes: &Attributes) -> Result<Self::Object>;
}

pub trait NamedObjectLifecycle: ObjectLifecycle {
    fn create(
        &self,
        class_name: &str,
        object_name: &str,
        attributes: &Attributes,
    ) -> Result<Self::Object>;
}

/// Lifecycle of one backend connection.
pub trait Configuration {
    fn config_type(&self) -> ConfigType;
    /// Name passed to the last successful `open`.
    fn name(&self) -> Option<&str>;
    fn is_open(&self) -> bool;
    fn open(&mut self, name: &str) -> Result<()>;
    fn close(&mut self, partial: bool, targets: NameList) -> Result<()>;
    fn save(&mut self, message: &str) -> Result<()>;
}

/// A session plus the handler operating on it, behind one entry point.
pub trait ConfigBackend {
    type Config: Configuration;
    type Handler: ObjectManager;

    fn configuration(&self) -> &Self::Config;
    fn configuration_mut(&mut self) -> &mut Self::Config;
    fn handler(&self) -> &Self::Handler;

    fn open(&mut self, name: &str) -> Result<()> {
        self.configuration_mut().open(name)
    }

    fn close(&mut self, partial: bool, targets: NameList) -> Result<()> {
        self.configuration_mut().close(partial, targets)
    }

    fn save(&mut self, message: &str) -> Result<()> {
        self.configuration_mut().save(message)
    }
}
