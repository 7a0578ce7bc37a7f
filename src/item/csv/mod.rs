/// CSV support for reading tabular data.
///
/// [`csv_reader::CsvItemReader`] deserializes each row into a struct with serde.
/// It reads from files, strings, or anything implementing `Read`, and is configured
/// through [`csv_reader::CsvItemReaderBuilder`].
///
/// I/O failures of the underlying source are reported as
/// [`BatchError::TransientItemReader`](crate::BatchError::TransientItemReader),
/// malformed rows as [`BatchError::ItemReader`](crate::BatchError::ItemReader).
///
/// # Examples
///
/// ```
/// use batch_core::item::csv::csv_reader::CsvItemReaderBuilder;
/// use batch_core::core::item::ItemReader;
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize, PartialEq)]
/// struct Person {
///     id: u32,
///     name: String,
///     age: String,
///     address: String,
/// }
///
/// let csv_data = "\
/// id,name,age,address
/// 1,test name0,test age,test address
/// 2,test name1,test age,test address
/// ";
///
/// let reader = CsvItemReaderBuilder::new()
///     .has_headers(true)
///     .from_reader(csv_data.as_bytes());
///
/// let first: Person = reader.read().unwrap().unwrap();
/// assert_eq!(first.id, 1);
/// assert_eq!(first.name, "test name0");
/// ```
pub mod csv_reader;
