use std::{cell::Cell, fmt::Debug};

use log::info;

use crate::core::item::{ItemWriter, ItemWriterResult};

/// Writer logging every item it receives at `info` level.
///
/// Useful to check what a step produces before plugging a real destination.
#[derive(Default)]
pub struct LoggerWriter {
    chunks: Cell<usize>,
}

impl LoggerWriter {
    /// Number of chunks written so far.
    pub fn chunk_count(&self) -> usize {
        self.chunks.get()
    }
}

impl<T> ItemWriter<T> for LoggerWriter
where
    T: Debug,
{
    fn write(&self, items: &[T]) -> ItemWriterResult {
        self.chunks.set(self.chunks.get() + 1);
        info!("chunk item size: {}", items.len());
        items.iter().for_each(|item| info!("Record:{:?}", item));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::LoggerWriter;
    use crate::core::item::ItemWriter;

    #[test]
    fn counts_written_chunks() {
        let writer = LoggerWriter::default();

        ItemWriter::<&str>::write(&writer, &["a", "b"]).unwrap();
        ItemWriter::<&str>::write(&writer, &["c"]).unwrap();

        assert_eq!(writer.chunk_count(), 2);
    }
}
