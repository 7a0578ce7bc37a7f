#![allow(dead_code)]

pub mod mocks;

use std::{cell::RefCell, fmt::Debug};

use batch_core::core::item::{ItemWriter, ItemWriterResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: u32,
    pub name: String,
    pub age: String,
    pub address: String,
}

/// Ten persons numbered from 1, as produced by a list reader in the demos.
pub fn persons() -> Vec<Person> {
    (0..10)
        .map(|i| Person {
            id: i + 1,
            name: format!("test name{}", i),
            age: "test age".to_string(),
            address: "test address".to_string(),
        })
        .collect()
}

/// `"0 Hello"` to `"{count - 1} Hello"`.
pub fn hello_items(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{} Hello", i)).collect()
}

/// Writer keeping every chunk it receives.
pub struct CollectingWriter<T> {
    pub chunks: RefCell<Vec<Vec<T>>>,
}

impl<T> Default for CollectingWriter<T> {
    fn default() -> Self {
        Self {
            chunks: RefCell::new(Vec::new()),
        }
    }
}

impl<T: Clone> CollectingWriter<T> {
    pub fn items(&self) -> Vec<T> {
        self.chunks.borrow().iter().flatten().cloned().collect()
    }

    pub fn chunk_sizes(&self) -> Vec<usize> {
        self.chunks.borrow().iter().map(Vec::len).collect()
    }
}

impl<T: Clone + Debug> ItemWriter<T> for CollectingWriter<T> {
    fn write(&self, items: &[T]) -> ItemWriterResult {
        self.chunks.borrow_mut().push(items.to_vec());
        Ok(())
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
