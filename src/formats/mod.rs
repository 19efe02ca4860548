pub mod manager;
pub mod mcedit;
pub mod sponge;

pub use manager::{FormatDecoder, SchematicReader};
