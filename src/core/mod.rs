// Column codecs, the array format policy and the shared error model.
pub mod array;
pub mod error;
pub mod json;
pub mod mapping;
pub mod tags;
