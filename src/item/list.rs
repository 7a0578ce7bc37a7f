use std::{cell::RefCell, collections::VecDeque};

use crate::core::item::{ItemReader, ItemReaderResult};

/// Reader handing out the items of an in-memory list, first to last.
///
/// Each read removes the item it returns; once the list is empty every read
/// returns `Ok(None)`.
///
/// # Examples
///
/// ```
/// use batch_core::core::item::ItemReader;
/// use batch_core::item::list::ListItemReader;
///
/// let reader = ListItemReader::new(vec!["0 Hello", "1 Hello"]);
///
/// assert_eq!(reader.read().unwrap(), Some("0 Hello"));
/// assert_eq!(reader.read().unwrap(), Some("1 Hello"));
/// assert_eq!(reader.read().unwrap(), None);
/// assert_eq!(reader.read().unwrap(), None);
/// ```
pub struct ListItemReader<T> {
    items: RefCell<VecDeque<T>>,
}

impl<T> ListItemReader<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: RefCell::new(items.into()),
        }
    }

    /// Number of items not read yet.
    pub fn remaining(&self) -> usize {
        self.items.borrow().len()
    }
}

impl<T> ItemReader<T> for ListItemReader<T> {
    fn read(&self) -> ItemReaderResult<T> {
        Ok(self.items.borrow_mut().pop_front())
    }
}
