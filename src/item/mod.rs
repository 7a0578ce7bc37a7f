/// In-memory list reader.
pub mod list;

#[cfg(feature = "logger")]
#[cfg_attr(docsrs, doc(cfg(feature = "logger")))]
/// Writer logging the items it receives.
pub mod logger;

#[cfg(feature = "csv")]
#[cfg_attr(docsrs, doc(cfg(feature = "csv")))]
/// CSV item reader.
pub mod csv;
