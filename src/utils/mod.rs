//! Utility functions and helpers.

pub mod http;
pub mod text;
pub mod xml;

pub use text::{format_list, format_minutes, group_thousands, parse_leading_int};
pub use xml::{XmlElement, parse_document};
