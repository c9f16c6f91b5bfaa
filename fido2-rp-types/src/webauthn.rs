//! Types a relying party receives from the browser, modeled after [WebAuthn Level 3].
//!
//! [WebAuthn Level 3]: https://w3c.github.io/webauthn

mod client_data;
mod common;
mod response;

// re-export types
pub use self::{client_data::*, common::*, response::*};
