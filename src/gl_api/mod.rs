#[macro_use]
pub mod error;
#[macro_use]
pub mod layout;

pub mod buffer;
pub mod context;
pub mod native;
pub mod shader;

#[cfg(test)]
pub(crate) mod recording;
