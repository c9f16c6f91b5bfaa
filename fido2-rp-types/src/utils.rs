pub(crate) mod bytes;

pub mod crypto;
pub mod encoding;
