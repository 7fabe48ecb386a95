//! Scalar string attributes on groups and datasets.

use asdf_format::{AttributeMessage, LENGTH_SIZE};
use tracing::debug;

use crate::container::{Container, Dataset, Group};
use crate::error::{Error, Result};
use crate::path::reject_nul;
use crate::tree::NodeId;

mod sealed {
    pub trait Sealed {
        fn target(&self) -> (&crate::Container, usize);
    }
}

/// Objects that carry named string attributes.
///
/// Values are stored as NUL-terminated fixed-length strings, so text with
/// an embedded NUL is rejected.
pub trait AttributeTarget: sealed::Sealed {
    /// Attach a new attribute. Names must be unique per object.
    fn write_string_attribute(&self, name: &str, value: &str) -> Result<()> {
        let (container, id) = self.target();
        container.add_string_attribute(id, name, value)
    }

    /// Read an attribute back as text.
    fn read_string_attribute(&self, name: &str) -> Result<String> {
        let (container, id) = self.target();
        container.string_attribute(id, name)
    }

    /// Names of all attributes, in the order they were written.
    fn attribute_names(&self) -> Vec<String> {
        let (container, id) = self.target();
        let tree = container.tree();
        tree.node(id).attrs.iter().map(|a| a.name.clone()).collect()
    }
}

impl sealed::Sealed for Group<'_> {
    fn target(&self) -> (&Container, usize) {
        (self.container, self.id)
    }
}

impl sealed::Sealed for Dataset<'_> {
    fn target(&self) -> (&Container, usize) {
        (self.container, self.id)
    }
}

impl AttributeTarget for Group<'_> {}
impl AttributeTarget for Dataset<'_> {}

/// Build a string attribute, checking that it can be encoded.
pub(crate) fn string_attribute(name: &str, value: &str) -> Result<AttributeMessage> {
    if name.is_empty() || name.contains('\0') {
        return Err(Error::InvalidName(name.to_string()));
    }
    reject_nul(name, value)?;
    let attr = AttributeMessage::string(name, value);
    attr.serialize(LENGTH_SIZE)?;
    Ok(attr)
}

impl Container {
    pub(crate) fn add_string_attribute(&self, id: NodeId, name: &str, value: &str) -> Result<()> {
        self.ensure_writable()?;
        let attr = string_attribute(name, value)?;
        self.declare(|tree| tree.push_attribute(id, attr))?;
        debug!(object = %self.tree().path_of(id), attribute = name, "wrote string attribute");
        Ok(())
    }

    pub(crate) fn string_attribute(&self, id: NodeId, name: &str) -> Result<String> {
        let tree = self.tree();
        let attr = tree
            .attribute(id, name)
            .ok_or_else(|| Error::AttributeNotFound {
                path: tree.path_of(id),
                attr: name.to_string(),
            })?;
        Ok(attr.read_as_string()?)
    }
}
