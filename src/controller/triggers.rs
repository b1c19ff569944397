//! Watch events that should trigger a reconcile
//!
//! Autoscalers are only reconciled when their generation moves, so status and
//! metadata-only updates do not cause a GitHub round trip. The periodic
//! requeue still resyncs unchanged autoscalers.

use std::collections::HashMap;
use std::sync::Arc;

use futures::{future, Stream, TryStreamExt};
use kube::api::DynamicObject;
use kube::runtime::watcher;
use tracing::trace;

use super::{Context, ObjectKey};

/// Last generation seen per autoscaler
///
/// Objects without a generation always pass.
#[derive(Debug, Default)]
pub struct GenerationFilter {
    seen: HashMap<ObjectKey, i64>,
}

impl GenerationFilter {
    /// Record `obj` and return true if its generation differs from the last one seen
    pub fn observe(&mut self, obj: &DynamicObject) -> bool {
        let Some(generation) = obj.metadata.generation else {
            return true;
        };
        self.seen.insert(ObjectKey::from_object(obj), generation) != Some(generation)
    }

    /// Drop the recorded generation for `key`
    pub fn forget(&mut self, key: &ObjectKey) {
        self.seen.remove(key);
    }

    /// Number of tracked autoscalers
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Returns true if nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Turn autoscaler watch events into reconcile triggers
///
/// Applied objects pass through a [`GenerationFilter`]. Deletions clear both
/// the filter and the autoscaler's failure backoff, since a deleted
/// autoscaler may never be reconciled again.
pub fn reconcile_triggers<S>(
    events: S,
    ctx: Arc<Context>,
) -> impl Stream<Item = Result<DynamicObject, watcher::Error>> + Send + 'static
where
    S: Stream<Item = Result<watcher::Event<DynamicObject>, watcher::Error>> + Send + 'static,
{
    let mut generations = GenerationFilter::default();
    events.try_filter_map(move |event| {
        let trigger = match event {
            watcher::Event::Apply(obj) | watcher::Event::InitApply(obj) => {
                if generations.observe(&obj) {
                    Some(obj)
                } else {
                    trace!(
                        autoscaler = %ObjectKey::from_object(&obj),
                        "generation unchanged, skipping"
                    );
                    None
                }
            }
            watcher::Event::Delete(obj) => {
                let key = ObjectKey::from_object(&obj);
                generations.forget(&key);
                ctx.backoff.reset(&key);
                None
            }
            watcher::Event::Init | watcher::Event::InitDone => None,
        };
        future::ready(Ok(trigger))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{HasApiResource, HorizontalRunnerAutoscaler};
    use crate::events::NoopEventPublisher;
    use crate::github::MockRepositoryHost;
    use crate::store::MockClusterStore;
    use futures::stream;

    fn autoscaler(name: &str, generation: Option<i64>) -> DynamicObject {
        let mut obj = DynamicObject::new(name, &HorizontalRunnerAutoscaler::api_resource())
            .within("ci");
        obj.metadata.generation = generation;
        obj
    }

    fn context() -> Arc<Context> {
        Arc::new(Context::for_testing(
            Arc::new(MockClusterStore::new()),
            Arc::new(MockRepositoryHost::new()),
            Arc::new(NoopEventPublisher),
            crate::config::WebhookConfig::new("https://hooks.example", "workflow_job").unwrap(),
        ))
    }

    fn names(objects: &[DynamicObject]) -> Vec<(String, Option<i64>)> {
        objects
            .iter()
            .map(|o| (o.metadata.name.clone().unwrap_or_default(), o.metadata.generation))
            .collect()
    }

    #[test]
    fn same_generation_is_filtered() {
        let mut filter = GenerationFilter::default();
        assert!(filter.observe(&autoscaler("a", Some(1))));
        assert!(!filter.observe(&autoscaler("a", Some(1))));
        assert!(filter.observe(&autoscaler("a", Some(2))));
        assert!(filter.observe(&autoscaler("b", Some(2))));
        assert_eq!(filter.len(), 2);
    }

    #[test]
    fn missing_generation_always_passes() {
        let mut filter = GenerationFilter::default();
        assert!(filter.observe(&autoscaler("a", None)));
        assert!(filter.observe(&autoscaler("a", None)));
        assert!(filter.is_empty());
    }

    #[test]
    fn forgotten_key_passes_again() {
        let mut filter = GenerationFilter::default();
        filter.observe(&autoscaler("a", Some(3)));
        filter.forget(&ObjectKey::new("ci", "a"));
        assert!(filter.observe(&autoscaler("a", Some(3))));
    }

    #[tokio::test]
    async fn status_only_updates_do_not_trigger() {
        let events = stream::iter(vec![
            Ok(watcher::Event::Init),
            Ok(watcher::Event::InitApply(autoscaler("a", Some(1)))),
            Ok(watcher::Event::InitDone),
            Ok(watcher::Event::Apply(autoscaler("a", Some(1)))),
            Ok(watcher::Event::Apply(autoscaler("a", Some(2)))),
        ]);

        let triggers: Vec<_> = reconcile_triggers(events, context())
            .try_collect()
            .await
            .unwrap();

        assert_eq!(
            names(&triggers),
            vec![("a".to_string(), Some(1)), ("a".to_string(), Some(2))]
        );
    }

    #[tokio::test]
    async fn deletion_clears_backoff_and_generation() {
        let ctx = context();
        let key = ObjectKey::new("ci", "a");
        ctx.backoff.next_delay(key.clone());
        ctx.backoff.next_delay(key.clone());
        assert_eq!(ctx.backoff.failures(&key), 2);

        let events = stream::iter(vec![
            Ok(watcher::Event::Apply(autoscaler("a", Some(1)))),
            Ok(watcher::Event::Delete(autoscaler("a", Some(1)))),
            Ok(watcher::Event::Apply(autoscaler("a", Some(1)))),
        ]);

        let triggers: Vec<_> = reconcile_triggers(events, ctx.clone())
            .try_collect()
            .await
            .unwrap();

        assert_eq!(ctx.backoff.failures(&key), 0);
        assert_eq!(triggers.len(), 2);
    }
}
