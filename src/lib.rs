#![doc = include_str!("RUSTDOC.md")]

pub mod fuse;
pub mod logger;
pub mod platform;

#[cfg(test)]
pub(crate) mod test_support;
