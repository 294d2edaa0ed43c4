//! # tessera-fixtures
//!
//! Fixture schemas and their canonical serialization.
//!
//! A fixture body is hashed over its canonical JSON form (keys sorted at
//! every level, compact encoding) with sha-256. Provenance goes under
//! `_info`, next to the body but outside what is hashed, so refilling an
//! unchanged scenario reproduces the same hash and the same file.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod canonical;
mod error;
mod info;
mod schema;
mod transaction;
mod writer;

pub use canonical::{canonical_json, canonical_value, integrity_hash};
pub use error::{FixtureError, FixtureResult};
pub use info::{FixtureInfo, Provenance};
pub use schema::{
    BlockchainFixture, Fixture, FixtureBlock, FixtureBlockBody, FixtureConfig, FixtureEnv,
    FixtureFormat, InvalidBlock, PostIndexes, StateFixture, StatePost, ValidBlock, SEAL_ENGINE,
};
pub use transaction::{FixtureTransaction, StateTransaction};
pub use writer::{
    render, verify_document, verify_file, FixtureWriter, RenderedFixture, WrittenFixture,
    INFO_KEY,
};
