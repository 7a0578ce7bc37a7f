//! Mock versions of the item traits.
use mockall::mock;

use batch_core::core::item::{ItemReader, ItemReaderResult, ItemWriter, ItemWriterResult};

use super::Person;

mock! {
    pub PersonWriter {}
    impl ItemWriter<Person> for PersonWriter {
        fn write(&self, items: &[Person]) -> ItemWriterResult;
        fn flush(&self) -> ItemWriterResult;
        fn open(&self) -> ItemWriterResult;
        fn close(&self) -> ItemWriterResult;
    }
}

mock! {
    pub PersonReader {}
    impl ItemReader<Person> for PersonReader {
        fn read(&self) -> ItemReaderResult<Person>;
    }
}
