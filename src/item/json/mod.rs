/// JSON support for reading source files.
///
/// The reader parses a whole JSON array with `serde_json` up front, then hands
/// out its elements one at a time. Parsing up front keeps a malformed file from
/// producing partial output: either every element is available or the reader
/// fails with [`crate::BatchError::Format`] before the first one.
///
/// # Examples
///
/// ```
/// use bulk_loader::core::item::ItemReader;
/// use bulk_loader::item::json::JsonItemReaderBuilder;
/// use bulk_loader::item::record::Record;
///
/// let json_data = r#"[
///   {"codigo": "GYE", "nombre": "Guayaquil"},
///   {"codigo": "UIO", "nombre": "Quito"}
/// ]"#;
///
/// let reader = JsonItemReaderBuilder::<Record>::new().from_reader(json_data.as_bytes());
///
/// let mut airports = Vec::new();
/// while let Some(airport) = reader.read().unwrap() {
///     airports.push(airport);
/// }
///
/// assert_eq!(airports.len(), 2);
/// assert_eq!(airports[1]["nombre"], "Quito");
/// ```
pub mod json_reader;

pub use json_reader::{JsonItemReader, JsonItemReaderBuilder};
