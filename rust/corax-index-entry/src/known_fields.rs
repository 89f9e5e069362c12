use ahash::AHashMap;
use corax_common::{Result, error::Error};

use crate::header::MAX_KNOWN_FIELDS;

/// Name to field-id mapping shared by every entry of an index. Field ids are dense
/// and start at zero.
#[derive(Debug, Clone, Default)]
pub struct KnownFields {
    by_name: AHashMap<String, usize>,
    names: Vec<String>,
}

impl KnownFields {
    pub fn new() -> KnownFields {
        KnownFields::default()
    }

    /// Assigns ids in iteration order.
    pub fn from_names<I, S>(names: I) -> Result<KnownFields>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut fields = KnownFields::new();
        for name in names {
            fields.add(name)?;
        }
        Ok(fields)
    }

    /// Registers `name` and returns its id. Registering an existing name returns the
    /// id it already has.
    pub fn add(&mut self, name: impl Into<String>) -> Result<usize> {
        let name = name.into();
        if let Some(&id) = self.by_name.get(&name) {
            return Ok(id);
        }
        if self.names.len() >= MAX_KNOWN_FIELDS {
            return Err(Error::capacity_exceeded(
                "known fields",
                format!("at most {MAX_KNOWN_FIELDS} known fields are supported"),
            ));
        }
        let id = self.names.len();
        self.by_name.insert(name.clone(), id);
        self.names.push(name);
        Ok(id)
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, field: usize) -> Option<&str> {
        self.names.get(field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterates `(id, name)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.names.iter().enumerate().map(|(i, n)| (i, n.as_str()))
    }
}
