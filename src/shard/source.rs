//! Shard state sources
//!
//! Anything that can list a topic's shards can drive the waiter: the
//! DataHub REST client in production, scripted sources in tests.

use crate::datahub::TopicRef;
use crate::error::WaiterError;
use crate::shard::state::Shard;
use std::future::Future;
use std::sync::Arc;

/// Fetches the current shard list of a topic
///
/// Failures are expected to be transient; the waiter retries them.
pub trait ShardSource: Send + Sync {
    fn list_shards(
        &self,
        topic: &TopicRef,
    ) -> impl Future<Output = Result<Vec<Shard>, WaiterError>> + Send;
}

impl<S: ShardSource> ShardSource for Arc<S> {
    fn list_shards(
        &self,
        topic: &TopicRef,
    ) -> impl Future<Output = Result<Vec<Shard>, WaiterError>> + Send {
        (**self).list_shards(topic)
    }
}

/// Adapts a closure returning a future into a [`ShardSource`]
pub struct FnSource<F>(F);

/// Build a source from `Fn(&TopicRef) -> Future<Output = Result<Vec<Shard>, WaiterError>>`
pub fn source_fn<F, Fut>(f: F) -> FnSource<F>
where
    F: Fn(&TopicRef) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<Shard>, WaiterError>> + Send,
{
    FnSource(f)
}

impl<F, Fut> ShardSource for FnSource<F>
where
    F: Fn(&TopicRef) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<Shard>, WaiterError>> + Send,
{
    fn list_shards(
        &self,
        topic: &TopicRef,
    ) -> impl Future<Output = Result<Vec<Shard>, WaiterError>> + Send {
        (self.0)(topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shard::state::ShardState;

    #[test]
    fn closure_source_sees_topic() {
        let source = source_fn(|topic: &TopicRef| {
            let id = topic.topic().to_string();
            async move { Ok::<_, WaiterError>(vec![Shard::new(id, ShardState::Active)]) }
        });
        let topic = TopicRef::new("analytics", "t1").unwrap();

        let shards = tokio_test::block_on(source.list_shards(&topic)).unwrap();
        assert_eq!(shards.len(), 1);
        assert_eq!(shards[0].shard_id, "t1");
    }

    #[test]
    fn arc_source_delegates() {
        let source = Arc::new(source_fn(|_: &TopicRef| async {
            Err::<Vec<Shard>, _>(WaiterError::opaque("down"))
        }));
        let topic = TopicRef::new("analytics", "t1").unwrap();

        let err = tokio_test::block_on(source.list_shards(&topic)).unwrap_err();
        assert_eq!(err.error_type_label(), "source");
    }
}
