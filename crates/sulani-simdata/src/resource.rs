//! The SimData resource: schemas plus named instances.

use std::sync::Arc;

use sulani_common::{CacheNode, Model, Tracked};

use crate::cells::{find_schema, Cell, ObjectCell};
use crate::{read, write, Error, Result, SimDataSchema};

/// SimData version that carries a trailing `unused` header word.
pub const VERSION_WITH_UNUSED: u32 = 0x101;

/// Oldest supported SimData version.
pub const VERSION_BASE: u32 = 0x100;

/// A named top-level object.
#[derive(Debug, PartialEq)]
pub struct SimDataInstance {
    name: String,
    object: ObjectCell,
}

impl SimDataInstance {
    pub fn new(name: impl Into<String>, object: ObjectCell) -> Self {
        Self {
            name: name.into(),
            object,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.object.invalidate();
    }

    #[inline]
    pub fn object(&self) -> &ObjectCell {
        &self.object
    }

    #[inline]
    pub fn object_mut(&mut self) -> &mut ObjectCell {
        &mut self.object
    }

    /// Hash of the schema the instance follows.
    #[inline]
    pub fn schema_hash(&self) -> u32 {
        self.object.schema_hash()
    }

    /// Shorthand for `object().get(column)`.
    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.object.get(column)
    }

    /// Shorthand for `object_mut().get_mut(column)`.
    pub fn get_mut(&mut self, column: &str) -> Option<&mut Cell> {
        self.object.get_mut(column)
    }
}

impl Clone for SimDataInstance {
    fn clone(&self) -> Self {
        Self::new(self.name.clone(), self.object.clone())
    }
}

impl Tracked for SimDataInstance {
    fn node(&self) -> &CacheNode {
        self.object.node()
    }
}

/// A decoded SimData resource.
///
/// Reading keeps the original bytes as the cached buffer, so an unmodified
/// resource writes back byte-for-byte. Any edit below the resource drops
/// that cache and the next [`Model::buffer`] call re-encodes.
#[derive(Debug, PartialEq)]
pub struct SimDataResource {
    node: CacheNode,
    version: u32,
    unused: u32,
    schemas: Vec<SimDataSchema>,
    instances: Vec<SimDataInstance>,
}

impl SimDataResource {
    /// Create an empty version `0x101` resource.
    pub fn create() -> Self {
        Self {
            node: CacheNode::new(),
            version: VERSION_WITH_UNUSED,
            unused: 0,
            schemas: Vec::new(),
            instances: Vec::new(),
        }
    }

    /// Assemble a resource from parts.
    pub fn from_parts(
        version: u32,
        unused: u32,
        schemas: Vec<SimDataSchema>,
        instances: Vec<SimDataInstance>,
    ) -> Self {
        let resource = Self {
            node: CacheNode::new(),
            version,
            unused,
            schemas,
            instances,
        };
        for schema in &resource.schemas {
            resource.adopt(schema);
        }
        for instance in &resource.instances {
            resource.adopt(instance);
        }
        resource
    }

    /// Decode a SimData buffer.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let resource = read::decode(data)?;
        resource.node.store(Arc::from(data));
        Ok(resource)
    }

    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Set the format version. Only `0x100` and `0x101` can be written.
    pub fn set_version(&mut self, version: u32) -> Result<()> {
        if version != VERSION_BASE && version != VERSION_WITH_UNUSED {
            return Err(Error::UnsupportedVersion(version));
        }
        self.version = version;
        self.node.invalidate();
        Ok(())
    }

    /// The trailing header word of version `0x101`.
    #[inline]
    pub fn unused(&self) -> u32 {
        self.unused
    }

    pub fn set_unused(&mut self, unused: u32) {
        self.unused = unused;
        self.node.invalidate();
    }

    #[inline]
    pub fn schemas(&self) -> &[SimDataSchema] {
        &self.schemas
    }

    /// First schema named `name`.
    pub fn schema(&self, name: &str) -> Option<&SimDataSchema> {
        self.schemas.iter().find(|schema| schema.name() == name)
    }

    /// First schema with `hash`.
    pub fn schema_by_hash(&self, hash: u32) -> Option<&SimDataSchema> {
        find_schema(&self.schemas, hash)
    }

    /// Mutable access to a schema. Invalidates the resource up front.
    pub fn schema_mut(&mut self, index: usize) -> Option<&mut SimDataSchema> {
        let schema = self.schemas.get_mut(index)?;
        schema.node().set_owner(&self.node);
        self.node.invalidate();
        Some(schema)
    }

    pub fn add_schema(&mut self, schema: SimDataSchema) {
        self.adopt(&schema);
        self.schemas.push(schema);
        self.node.invalidate();
    }

    pub fn remove_schema(&mut self, index: usize) -> Option<SimDataSchema> {
        if index >= self.schemas.len() {
            return None;
        }
        let schema = self.schemas.remove(index);
        schema.node().clear_owner();
        self.node.invalidate();
        Some(schema)
    }

    #[inline]
    pub fn instances(&self) -> &[SimDataInstance] {
        &self.instances
    }

    /// First instance named `name`.
    pub fn instance(&self, name: &str) -> Option<&SimDataInstance> {
        self.instances.iter().find(|instance| instance.name() == name)
    }

    /// Mutable access to an instance. Invalidates the resource up front.
    pub fn instance_mut(&mut self, index: usize) -> Option<&mut SimDataInstance> {
        let instance = self.instances.get_mut(index)?;
        instance.node().set_owner(&self.node);
        self.node.invalidate();
        Some(instance)
    }

    pub fn add_instance(&mut self, instance: SimDataInstance) {
        self.adopt(&instance);
        self.instances.push(instance);
        self.node.invalidate();
    }

    pub fn remove_instance(&mut self, index: usize) -> Option<SimDataInstance> {
        if index >= self.instances.len() {
            return None;
        }
        let instance = self.instances.remove(index);
        instance.node().clear_owner();
        self.node.invalidate();
        Some(instance)
    }

    /// Check every schema and every instance.
    pub fn validate(&self) -> Result<()> {
        for schema in &self.schemas {
            schema.validate()?;
        }
        for instance in &self.instances {
            let schema = self.schema_by_hash(instance.schema_hash()).ok_or_else(|| {
                Error::UnknownSchema {
                    hash: instance.schema_hash(),
                    context: format!("instance {:?}", instance.name()),
                }
            })?;
            instance.object().validate(schema)?;
            for (_, cell) in instance.object().iter() {
                cell.validate(&self.schemas)?;
            }
        }
        Ok(())
    }
}

impl Default for SimDataResource {
    fn default() -> Self {
        Self::create()
    }
}

impl Clone for SimDataResource {
    fn clone(&self) -> Self {
        let resource = Self::from_parts(
            self.version,
            self.unused,
            self.schemas.clone(),
            self.instances.clone(),
        );
        if let Some(bytes) = self.node.cached() {
            resource.node.store(bytes);
        }
        resource
    }
}

impl Tracked for SimDataResource {
    fn node(&self) -> &CacheNode {
        &self.node
    }
}

impl Model for SimDataResource {
    type Error = Error;

    fn serialize(&self) -> Result<Vec<u8>> {
        write::encode(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DataType, SimDataSchemaColumn};

    fn sample() -> SimDataResource {
        let schema = SimDataSchema::new(
            "Tuning",
            0xAABB_CCDD,
            vec![
                SimDataSchemaColumn::new("count", DataType::UInt32, 0),
                SimDataSchemaColumn::new("label", DataType::String, 0),
            ],
        );
        let object = ObjectCell::with_values(
            0xAABB_CCDD,
            [("count", Cell::uint32(3)), ("label", Cell::string("three"))],
        );
        SimDataResource::from_parts(
            VERSION_WITH_UNUSED,
            0,
            vec![schema],
            vec![SimDataInstance::new("first", object)],
        )
    }

    #[test]
    fn test_lookup() {
        let resource = sample();
        assert!(resource.schema("Tuning").is_some());
        assert!(resource.schema_by_hash(0xAABB_CCDD).is_some());
        assert!(resource.schema_by_hash(0).is_none());
        assert_eq!(
            resource.instance("first").unwrap().get("count").unwrap().as_number(),
            Some(3.0)
        );
    }

    #[test]
    fn test_validate() {
        let mut resource = sample();
        assert!(resource.validate().is_ok());

        resource
            .instance_mut(0)
            .unwrap()
            .get_mut("count")
            .unwrap()
            .as_number_mut()
            .unwrap()
            .set_value(4294967296.0);
        assert!(matches!(
            resource.validate(),
            Err(Error::InvalidValue { .. })
        ));

        let mut resource = sample();
        resource
            .instance_mut(0)
            .unwrap()
            .object_mut()
            .set_schema_hash(1);
        assert!(matches!(
            resource.validate(),
            Err(Error::UnknownSchema { hash: 1, .. })
        ));
    }

    #[test]
    fn test_nested_edit_drops_resource_cache() {
        let mut resource = sample();
        let before = resource.buffer().unwrap();
        assert!(resource.node().is_cached());

        resource
            .instance_mut(0)
            .unwrap()
            .get_mut("label")
            .unwrap()
            .as_text_mut()
            .unwrap()
            .set_value("four");
        assert!(!resource.node().is_cached());

        let after = resource.buffer().unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_setter_on_held_cell_reaches_resource() {
        let resource = sample();
        resource.buffer().unwrap();

        let label = resource.instances()[0].get("label").unwrap();
        assert!(label.node().has_owner());
        label.invalidate();
        assert!(!resource.node().is_cached());
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut resource = SimDataResource::create();
        assert!(resource.set_version(0x102).is_err());
        assert!(resource.set_version(VERSION_BASE).is_ok());
        assert_eq!(resource.version(), VERSION_BASE);
    }

    #[test]
    fn test_clone_is_independent() {
        let resource = sample();
        resource.buffer().unwrap();
        let mut copy = resource.clone();
        assert_eq!(copy, resource);
        assert!(copy.node().is_cached());

        copy.set_unused(5);
        assert!(!copy.node().is_cached());
        assert!(resource.node().is_cached());
    }
}
