//! Remote index service backend.
//!
//! One [`RemoteClient`] per tenant core is shared by the core's
//! [`RemoteSearch`], [`RemoteIndexer`] and [`RemoteSchema`]. Requests go to
//! `{address}/{core}/...`:
//!
//! | Component | Endpoint |
//! |-----------|----------|
//! | searcher | `GET select` |
//! | indexer | `POST update` |
//! | schema manager | `GET schema/fields`, `POST schema` |

pub mod client;
pub mod indexer;
pub mod schema;
pub mod search;

pub use client::RemoteClient;
pub use indexer::RemoteIndexer;
pub use schema::{FieldDefinition, RemoteSchema};
pub use search::RemoteSearch;
