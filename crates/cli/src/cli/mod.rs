pub mod args;
pub mod op;
pub mod ops;

pub use ops::{Check, Decode, Encode, Fetch, Gateways, Init, Resolve, Version};
