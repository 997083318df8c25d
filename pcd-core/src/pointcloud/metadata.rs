use serde::Serialize;

// The maximum and minimum physical coordinates, i.e. with scale and offset applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BoundingVolume {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataEntry {
    pub name: String,
    pub value: MetadataValue,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<(String, String)>,
}

/// Name/value pairs a stage exposes for outside reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Metadata {
    entries: Vec<MetadataEntry>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, value: MetadataValue) -> &mut MetadataEntry {
        self.entries.push(MetadataEntry {
            name: name.to_string(),
            value,
            attributes: Vec::new(),
        });
        let last = self.entries.len() - 1;
        &mut self.entries[last]
    }

    pub fn get(&self, name: &str) -> Option<&MetadataValue> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.value)
    }

    pub fn entries(&self) -> &[MetadataEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MetadataEntry {
    pub fn attribute(&mut self, key: &str, value: impl ToString) -> &mut Self {
        self.attributes.push((key.to_string(), value.to_string()));
        self
    }
}
