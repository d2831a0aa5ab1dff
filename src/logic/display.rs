use crate::error::Result;
use crate::store::{NamedObject, ObjectManager};
use serde::Serialize;

pub const DEFAULT_ID_PLACEHOLDER: &str = "____";

/// What a listing shows for one object: its name and an identifier safe to
/// use as a widget id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectLabel {
    pub label: String,
    pub widget_id: String,
}

/// `btn_<name>` with every character outside `[A-Za-z0-9_-]` replaced by
/// `placeholder`.
pub fn widget_id(name: &str, placeholder: &str) -> String {
    let mut id = String::from("btn_");
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            id.push(c);
        } else {
            id.push_str(placeholder);
        }
    }
    id
}

pub fn object_labels<H: ObjectManager>(handler: &H, placeholder: &str) -> Result<Vec<ObjectLabel>> {
    handler
        .get_all_obj(None)?
        .iter()
        .map(|obj| {
            let label = obj.name()?;
            Ok(ObjectLabel {
                widget_id: widget_id(&label, placeholder),
                label,
            })
        })
        .collect()
}
