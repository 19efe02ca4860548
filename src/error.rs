use thiserror::Error;

/// Everything that can go wrong while capturing, persisting, decoding or
/// replaying a schematic.
#[derive(Debug, Error)]
pub enum SchematicError {
    #[error("cannot compute a bounding box over an empty region set")]
    EmptyRegionSet,
    #[error("this schematic format is not recognised or supported")]
    UnsupportedSchematicFormat,
    #[error("varint starting at byte {offset} is truncated")]
    TruncatedVarInt { offset: usize },
    #[error("corrupt schematic document: {0}")]
    CorruptDocument(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("NBT error: {0}")]
    Nbt(String),
    #[error(
        "destination footprint {available_width}x{available_length} is smaller than clipboard {width}x{length}"
    )]
    DestinationTooSmall {
        width: i32,
        length: i32,
        available_width: i32,
        available_length: i32,
    },
    #[error("height {height} exceeds the limit of {limit}")]
    HeightExceedsLimit { height: i32, limit: i32 },
    #[error("region {width}x{height}x{length} does not fit the document's 16-bit dimensions")]
    RegionTooLarge { width: i32, height: i32, length: i32 },
    #[error("an export-all batch is already running")]
    ConcurrentExportAlreadyRunning,
    #[error("export-all was requested with no targets")]
    NothingToExport,
    #[error("export finished without producing a document")]
    ExportAbandoned,
    #[error("world read failed: {0}")]
    WorldRead(String),
    #[error("invalid settings: {0}")]
    Config(String),
}

impl From<quartz_nbt::io::NbtIoError> for SchematicError {
    fn from(err: quartz_nbt::io::NbtIoError) -> Self {
        SchematicError::Nbt(err.to_string())
    }
}

impl From<serde_json::Error> for SchematicError {
    fn from(err: serde_json::Error) -> Self {
        SchematicError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SchematicError>;
