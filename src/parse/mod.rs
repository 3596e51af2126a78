//! Document formats.

pub mod train_xml;
