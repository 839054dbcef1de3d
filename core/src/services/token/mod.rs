//! Token codec module for JWT management
//!
//! Issues and verifies the signed access and refresh tokens. The codec holds
//! no state beyond its keys; revocation lives in the session state store.

mod codec;


pub use codec::TokenCodec;
