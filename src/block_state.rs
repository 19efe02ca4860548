use crate::error::SchematicError;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;
use std::str::FromStr;

/// A block type plus its ordered state properties.
///
/// The `Display` form (`minecraft:lever[face=wall,powered=true]`) is the
/// canonical palette key; `FromStr` parses it back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockState {
    pub name: SmolStr,
    pub properties: Vec<(SmolStr, SmolStr)>,
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.properties.is_empty() {
            write!(f, "[")?;
            for (i, (key, value)) in self.properties.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}={}", key, value)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

impl FromStr for BlockState {
    type Err = SchematicError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let key = key.trim();
        let (name, rest) = match key.find('[') {
            Some(open) => (&key[..open], Some(&key[open + 1..])),
            None => (key, None),
        };
        if name.is_empty() {
            return Err(SchematicError::CorruptDocument(format!(
                "block state key '{}' has no name",
                key
            )));
        }

        let mut state = BlockState::new(name);
        if let Some(rest) = rest {
            let body = rest.strip_suffix(']').ok_or_else(|| {
                SchematicError::CorruptDocument(format!("unterminated block state '{}'", key))
            })?;
            for pair in body.split(',').filter(|p| !p.is_empty()) {
                let (k, v) = pair.split_once('=').ok_or_else(|| {
                    SchematicError::CorruptDocument(format!(
                        "malformed property '{}' in '{}'",
                        pair, key
                    ))
                })?;
                state.set_property(k.trim(), v.trim());
            }
        }
        Ok(state)
    }
}

impl BlockState {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        BlockState {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    pub fn air() -> Self {
        BlockState::new("minecraft:air")
    }

    pub fn get_name(&self) -> &str {
        self.name.as_str()
    }

    pub fn is_air(&self) -> bool {
        matches!(
            self.name.as_str(),
            "minecraft:air" | "minecraft:cave_air" | "minecraft:void_air"
        )
    }

    pub fn with_property(mut self, key: impl Into<SmolStr>, value: impl Into<SmolStr>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn set_property(&mut self, key: impl Into<SmolStr>, value: impl Into<SmolStr>) {
        let key = key.into();
        let value = value.into();
        for (k, v) in &mut self.properties {
            if *k == key {
                *v = value;
                return;
            }
        }
        self.properties.push((key, value));
    }

    pub fn get_property(&self, key: &str) -> Option<&SmolStr> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Canonical palette key.
    pub fn key(&self) -> String {
        self.to_string()
    }
}
