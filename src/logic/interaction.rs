use crate::error::{AdaptorError, Result};
use crate::model::NameList;
use crate::store::{
    ClassObjectManager, ConfigBackend, ConffwkBackend, ConffwkObject, NamedObject, ObjectManager,
    OksBackend, OksClass,
};
use itertools::Itertools;

/// Joins a data backend with the schema backend describing it, so a data
/// object can be traced to its class definition and back.
pub struct SchemaDataInteraction<'a> {
    data: &'a ConffwkBackend,
    schema: &'a OksBackend,
}

impl<'a> SchemaDataInteraction<'a> {
    pub fn new(data: &'a ConffwkBackend, schema: &'a OksBackend) -> Self {
        Self { data, schema }
    }

    pub fn data(&self) -> &ConffwkBackend {
        self.data
    }

    pub fn schema(&self) -> &OksBackend {
        self.schema
    }

    /// The schema class an object was created from.
    pub fn schema_class_of(&self, object: &ConffwkObject) -> Result<OksClass> {
        let class_name = object.class_name()?;
        self.schema.handler().get_obj(&class_name)
    }

    /// Data objects of `class`, subclasses included.
    pub fn objects_of(&self, class: &OksClass) -> Result<Vec<ConffwkObject>> {
        let name = class.name()?;
        match self.data.handler().get_all_obj(Some(NameList::from(name.as_str()))) {
            Err(AdaptorError::ObjectNotFound(_)) => Ok(Vec::new()),
            result => result,
        }
    }

    /// Classes used by data objects that the schema backend does not define.
    pub fn undefined_classes(&self) -> Result<Vec<String>> {
        let used: Vec<String> = self
            .data
            .handler()
            .get_all_obj(None)?
            .iter()
            .map(ConffwkObject::class_name)
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .unique()
            .collect();

        let mut missing = Vec::new();
        for class_name in used {
            match self.schema.handler().get_obj(&class_name) {
                Ok(_) => {}
                Err(AdaptorError::ObjectNotFound(_)) => missing.push(class_name),
                Err(error) => return Err(error),
            }
        }
        Ok(missing)
    }
}
