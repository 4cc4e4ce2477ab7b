#![doc = include_str!("RUSTDOC.md")]

pub mod logger;
pub mod platform;
pub mod tracker;

#[cfg(all(test, not(target_arch = "wasm32")))]
pub mod test_support;
