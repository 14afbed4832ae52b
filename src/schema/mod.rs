

pub mod models;
pub mod registry;

pub use models::{FieldDef, FieldType, NamingSeriesSpec, RecordType, NAMING_SERIES_FIELD};
pub use registry::{
    is_valid_identifier, validate_identifier, MetadataProvider, SchemaError, SchemaFile, SchemaRegistry,
};
