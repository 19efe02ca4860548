use rustc_hash::FxHashMap;
use smol_str::SmolStr;

/// Assigns dense codes to string keys in order of first appearance.
///
/// Codes start at 0 and the first-seen order ends up in the document, so
/// identical input always produces an identical palette. Only the scanning
/// thread may touch a builder.
#[derive(Debug, Clone, Default)]
pub struct PaletteBuilder {
    entries: Vec<SmolStr>,
    index: FxHashMap<SmolStr, u32>,
}

impl PaletteBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the code for `key`, assigning the next free one if unseen.
    pub fn intern_index(&mut self, key: &str) -> u32 {
        if let Some(&code) = self.index.get(key) {
            return code;
        }
        let code = self.entries.len() as u32;
        let key = SmolStr::new(key);
        self.entries.push(key.clone());
        self.index.insert(key, code);
        code
    }

    pub fn get(&self, key: &str) -> Option<u32> {
        self.index.get(key).copied()
    }

    pub fn key(&self, code: u32) -> Option<&str> {
        self.entries.get(code as usize).map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys ordered by code.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|k| k.as_str())
    }

    pub fn into_keys(self) -> Vec<String> {
        self.entries.into_iter().map(|k| k.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::PaletteBuilder;

    #[test]
    fn test_first_seen_order() {
        let mut palette = PaletteBuilder::new();
        assert_eq!(palette.intern_index("minecraft:stone"), 0);
        assert_eq!(palette.intern_index("minecraft:dirt"), 1);
        assert_eq!(palette.intern_index("minecraft:stone"), 0);
        assert_eq!(palette.intern_index("minecraft:air"), 2);
        assert_eq!(palette.len(), 3);
        assert_eq!(
            palette.keys().collect::<Vec<_>>(),
            vec!["minecraft:stone", "minecraft:dirt", "minecraft:air"]
        );
        assert_eq!(palette.key(1), Some("minecraft:dirt"));
        assert_eq!(palette.get("minecraft:glass"), None);
    }
}
