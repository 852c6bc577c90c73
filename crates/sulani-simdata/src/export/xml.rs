//! XML export.
//!
//! The output lists instances first and schemas second:
//!
//! ```xml
//! <SimData version="0x101" unused="0">
//!   <Instances>
//!     <I name="first" schema="Tuning">
//!       <T name="count" type="UInt32">3</T>
//!     </I>
//!   </Instances>
//!   <Schemas>
//!     <Schema name="Tuning" hash="0xaabbccdd">
//!       <Column name="count" type="UInt32" flags="0"/>
//!     </Schema>
//!   </Schemas>
//! </SimData>
//! ```

use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::{ordered_cells, schema_label};
use crate::cells::{Cell, ObjectCell};
use crate::{Error, Result, SimDataResource, SimDataSchema};

/// XML exporter for a SimData resource.
pub struct XmlExporter<'a> {
    resource: &'a SimDataResource,
}

impl<'a> XmlExporter<'a> {
    pub fn new(resource: &'a SimDataResource) -> Self {
        Self { resource }
    }

    /// Export the resource to an XML string.
    pub fn export(&self) -> Result<String> {
        let mut output = Vec::new();
        self.write(&mut output)?;
        String::from_utf8(output).map_err(|e| Error::Export(e.to_string()))
    }

    /// Write the resource as XML to a writer.
    pub fn write<W: Write>(&self, writer: W) -> Result<()> {
        let resource = self.resource;
        let mut context = Context {
            schemas: resource.schemas(),
            writer: Writer::new_with_indent(writer, b' ', 2),
        };

        context.event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

        let mut root = BytesStart::new("SimData");
        root.push_attribute(("version", format!("{:#x}", resource.version()).as_str()));
        root.push_attribute(("unused", resource.unused().to_string().as_str()));
        context.event(Event::Start(root))?;

        context.event(Event::Start(BytesStart::new("Instances")))?;
        for instance in resource.instances() {
            let mut start = BytesStart::new("I");
            start.push_attribute(("name", instance.name()));
            let label = schema_label(context.schemas, instance.schema_hash());
            start.push_attribute(("schema", label.as_str()));
            context.event(Event::Start(start))?;
            context.write_object(instance.object())?;
            context.event(Event::End(BytesEnd::new("I")))?;
        }
        context.event(Event::End(BytesEnd::new("Instances")))?;

        context.event(Event::Start(BytesStart::new("Schemas")))?;
        for schema in resource.schemas() {
            context.write_schema(schema)?;
        }
        context.event(Event::End(BytesEnd::new("Schemas")))?;

        context.event(Event::End(BytesEnd::new("SimData")))
    }
}

impl SimDataResource {
    /// Render the resource as indented XML text.
    pub fn to_xml_string(&self) -> Result<String> {
        XmlExporter::new(self).export()
    }
}

struct Context<'a, W: Write> {
    schemas: &'a [SimDataSchema],
    writer: Writer<W>,
}

impl<W: Write> Context<'_, W> {
    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| Error::Export(e.to_string()))
    }

    fn write_schema(&mut self, schema: &SimDataSchema) -> Result<()> {
        let mut start = BytesStart::new("Schema");
        start.push_attribute(("name", schema.name()));
        start.push_attribute(("hash", format!("{:#010x}", schema.hash()).as_str()));
        self.event(Event::Start(start))?;
        for column in schema.columns() {
            let mut element = BytesStart::new("Column");
            element.push_attribute(("name", column.name()));
            element.push_attribute(("type", column.data_type().as_str()));
            element.push_attribute(("flags", column.flags().to_string().as_str()));
            self.event(Event::Empty(element))?;
        }
        self.event(Event::End(BytesEnd::new("Schema")))
    }

    fn write_object(&mut self, object: &ObjectCell) -> Result<()> {
        for (name, cell) in ordered_cells(object, self.schemas) {
            self.write_cell(Some(name), cell)?;
        }
        Ok(())
    }

    fn write_cell(&mut self, name: Option<&str>, cell: &Cell) -> Result<()> {
        let tag = match cell {
            Cell::Object(_) => "U",
            Cell::Vector(_) => "L",
            Cell::Variant(_) => "V",
            _ => "T",
        };
        let mut start = BytesStart::new(tag);
        if let Some(name) = name {
            start.push_attribute(("name", name));
        }
        start.push_attribute(("type", cell.data_type().as_str()));

        match cell {
            Cell::Object(object) => {
                let label = schema_label(self.schemas, object.schema_hash());
                start.push_attribute(("schema", label.as_str()));
                self.event(Event::Start(start))?;
                self.write_object(object)?;
            }
            Cell::Vector(vector) => {
                if vector.is_empty() {
                    return self.event(Event::Empty(start));
                }
                self.event(Event::Start(start))?;
                for child in vector {
                    self.write_cell(None, child)?;
                }
            }
            Cell::Variant(variant) => {
                start.push_attribute(("variant", format!("{:#010x}", variant.type_hash()).as_str()));
                let Some(child) = variant.child() else {
                    return self.event(Event::Empty(start));
                };
                self.event(Event::Start(start))?;
                self.write_cell(None, child)?;
            }
            leaf => {
                self.event(Event::Start(start))?;
                let text = leaf_text(leaf);
                self.event(Event::Text(BytesText::new(&text)))?;
            }
        }
        self.event(Event::End(BytesEnd::new(tag)))
    }
}

fn leaf_text(cell: &Cell) -> String {
    fn join<const N: usize>(values: [f32; N]) -> String {
        values.iter().map(f32::to_string).collect::<Vec<_>>().join(",")
    }

    match cell {
        Cell::Boolean(cell) => cell.value().to_string(),
        Cell::Text(cell) => cell.value().to_string(),
        Cell::Number(cell) => cell.value().to_string(),
        Cell::BigInt(cell) => cell.value().to_string(),
        Cell::ResourceKey(cell) => cell.key().to_string(),
        Cell::Float2(cell) => join(cell.values()),
        Cell::Float3(cell) => join(cell.values()),
        Cell::Float4(cell) => join(cell.values()),
        Cell::Object(_) | Cell::Vector(_) | Cell::Variant(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use crate::{Cell, DataType, ObjectCell, SimDataInstance, SimDataResource, SimDataSchema};
    use crate::SimDataSchemaColumn;

    #[test]
    fn test_xml_export() {
        let inner = SimDataSchema::new(
            "Inner",
            0x20,
            vec![SimDataSchemaColumn::new("flag", DataType::Boolean, 0)],
        );
        let outer = SimDataSchema::new(
            "Outer",
            0x10,
            vec![
                SimDataSchemaColumn::new("name", DataType::String, 0),
                SimDataSchemaColumn::new("child", DataType::Object, 0),
                SimDataSchemaColumn::new("empty", DataType::Vector, 0),
            ],
        );
        let object = ObjectCell::with_values(
            0x10,
            [
                ("name", Cell::string("a<b")),
                ("child", Cell::object(ObjectCell::with_values(0x20, [("flag", Cell::boolean(true))]))),
                ("empty", Cell::vector(Vec::new())),
            ],
        );
        let resource = SimDataResource::from_parts(
            0x100,
            0,
            vec![outer, inner],
            vec![SimDataInstance::new("root", object)],
        );

        let xml = resource.to_xml_string().unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains(r#"<SimData version="0x100" unused="0">"#));
        assert!(xml.contains(r#"<I name="root" schema="Outer">"#));
        assert!(xml.contains("a&lt;b"));
        assert!(xml.contains(r#"<U name="child" type="Object" schema="Inner">"#));
        assert!(xml.contains(r#"<T name="flag" type="Boolean">true</T>"#));
        assert!(xml.contains(r#"<L name="empty" type="Vector"/>"#));
        assert!(xml.contains(r#"<Column name="flag" type="Boolean" flags="0"/>"#));

        // Instances precede schemas.
        assert!(xml.find("<Instances>").unwrap() < xml.find("<Schemas>").unwrap());
    }
}
