//! DataHub addressing and REST access
//!
//! Only the pieces the readiness gate needs: name validation and the
//! ListShard call.

mod rest;
mod topic;
pub mod validate;

pub use rest::{ListShardResult, RestShardSource};
pub use topic::TopicRef;
