use super::*;
use crate::catalog::{RefDescriptor, ResourceSpec};
use crate::registry::InMemoryRegistry;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn options(registry: &dyn Registry, include: &[&str], exclude: &[&str]) -> CollectOptions {
    let include: Vec<String> = include.iter().map(ToString::to_string).collect();
    let exclude: Vec<String> = exclude.iter().map(ToString::to_string).collect();
    CollectOptions {
        selection: TypeSelection::new(&registry.resource_types(), &include, &exclude).unwrap(),
        log_permission_errors: true,
        include_dependencies: false,
        max_concurrent_operations: 10,
    }
}

fn never_cancelled() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    // Keep the sender alive for the whole test.
    std::mem::forget(tx);
    rx
}

fn queue_registry() -> InMemoryRegistry {
    let queue_spec = ResourceSpec::builder()
        .reference("division_id", RefDescriptor::to("auth_division"))
        .reference("whisper_prompt_id", RefDescriptor::to("architect_user_prompt"))
        .build()
        .unwrap();
    InMemoryRegistry::new()
        .with_type("routing_queue", queue_spec)
        .with_instance(
            "routing_queue",
            DiscoveredInstance::new("Q1", "Support").attr("division_id", "D1"),
        )
        .with_instance("auth_division", DiscoveredInstance::new("D1", "Home"))
        .with_instance("auth_division", DiscoveredInstance::new("D2", "Other"))
}

#[tokio::test]
async fn test_collects_every_registered_type_once() {
    let registry = queue_registry();
    let collector = Collector::new(&registry, options(&registry, &[], &[]));
    let corpus = collector.collect(never_cancelled()).await.unwrap();

    assert_eq!(corpus.len(), 3);
    assert_eq!(registry.enumeration_count(&ResourceType::new("routing_queue")), 1);
    assert_eq!(registry.enumeration_count(&ResourceType::new("auth_division")), 1);
    let keys: Vec<_> = corpus
        .instances
        .iter()
        .map(|i| (i.resource_type.as_str(), i.id.as_str()))
        .collect();
    assert_eq!(
        keys,
        vec![("auth_division", "D1"), ("auth_division", "D2"), ("routing_queue", "Q1")]
    );
    assert!(corpus.get(&ResourceType::new("routing_queue"), "Q1").is_some());
    assert!(corpus.get(&ResourceType::new("routing_queue"), "Q2").is_none());
}

#[tokio::test]
async fn test_duplicates_keep_first_occurrence() {
    let registry = InMemoryRegistry::new()
        .with_instance("user", DiscoveredInstance::new("U1", "Ann"))
        .with_instance("user", DiscoveredInstance::new("U1", "Ann again"));
    let collector = Collector::new(&registry, options(&registry, &[], &[]));
    let corpus = collector.collect(never_cancelled()).await.unwrap();
    assert_eq!(corpus.len(), 1);
    assert_eq!(corpus.instances[0].raw_label, "Ann");
}

#[tokio::test]
async fn test_same_name_instances_get_distinct_labels() {
    let registry = InMemoryRegistry::new()
        .with_instance("user", DiscoveredInstance::new("U2", "Ann"))
        .with_instance("user", DiscoveredInstance::new("U1", "Ann"));
    let collector = Collector::new(&registry, options(&registry, &[], &[]));
    let corpus = collector.collect(never_cancelled()).await.unwrap();

    let labels: Vec<_> = corpus
        .instances
        .iter()
        .map(|i| (i.id.as_str(), i.label.as_str()))
        .collect();
    assert_eq!(labels.len(), 2);
    assert_eq!(labels[0], ("U1", "Ann"));
    assert_ne!(labels[1].1, "Ann");
    assert_eq!(corpus.instances[1].raw_label, "Ann");
}

#[tokio::test]
async fn test_permission_failure_logged_and_skipped() {
    let registry = queue_registry().with_failure(
        "architect_user_prompt",
        EnumerateError::from_status(403, "missing permission"),
    );
    let collector = Collector::new(&registry, options(&registry, &[], &[]));
    let corpus = collector.collect(never_cancelled()).await.unwrap();

    assert_eq!(corpus.len(), 3);
    assert_eq!(corpus.permission_failures.len(), 1);
    assert!(corpus.permission_failures[&ResourceType::new("architect_user_prompt")]
        .contains("403"));
    assert!(!corpus
        .collected_types
        .contains(&ResourceType::new("architect_user_prompt")));
}

#[tokio::test]
async fn test_permission_failure_fatal_with_hint() {
    let registry = queue_registry()
        .with_failure("architect_user_prompt", EnumerateError::from_status(501, "nope"));
    let mut opts = options(&registry, &[], &[]);
    opts.log_permission_errors = false;
    let err = Collector::new(&registry, opts)
        .collect(never_cancelled())
        .await
        .unwrap_err();
    assert!(matches!(err, CollectError::PermissionDenied { .. }));
    let message = err.to_string();
    assert!(message.contains("architect_user_prompt"));
    assert!(message.contains("log_permission_errors = true"));
}

#[tokio::test]
async fn test_other_enumeration_error_is_fatal() {
    let registry = queue_registry()
        .with_failure("user", EnumerateError::Malformed("truncated body".to_string()));
    let err = Collector::new(&registry, options(&registry, &[], &[]))
        .collect(never_cancelled())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CollectError::Enumerate { ref resource_type, .. } if resource_type.as_str() == "user"
    ));
}

#[tokio::test]
async fn test_requested_subset_and_label_filter() {
    let registry = queue_registry();
    let collector = Collector::new(&registry, options(&registry, &["auth_division::^Ho"], &[]));
    let corpus = collector.collect(never_cancelled()).await.unwrap();
    assert_eq!(corpus.len(), 1);
    assert_eq!(corpus.instances[0].id, "D1");
    assert_eq!(registry.enumeration_count(&ResourceType::new("routing_queue")), 0);
}

#[tokio::test]
async fn test_excluded_type_not_enumerated() {
    let registry = queue_registry();
    let collector = Collector::new(&registry, options(&registry, &[], &["auth_division"]));
    let corpus = collector.collect(never_cancelled()).await.unwrap();
    assert_eq!(corpus.len(), 1);
    assert_eq!(registry.enumeration_count(&ResourceType::new("auth_division")), 0);
}

#[tokio::test]
async fn test_dependencies_pulled_in() {
    let registry = queue_registry();
    let mut opts = options(&registry, &["routing_queue"], &[]);
    opts.include_dependencies = true;
    let corpus = Collector::new(&registry, opts)
        .collect(never_cancelled())
        .await
        .unwrap();

    let ids: Vec<_> = corpus.instances.iter().map(|i| i.id.as_str()).collect();
    // Only the referenced division comes along.
    assert_eq!(ids, vec!["D1", "Q1"]);
    assert!(corpus
        .dependency_types
        .contains(&ResourceType::new("auth_division")));
}

#[tokio::test]
async fn test_dependencies_respect_excluded_types() {
    let registry = queue_registry();
    let mut opts = options(&registry, &["routing_queue"], &["auth_division"]);
    opts.include_dependencies = true;
    let corpus = Collector::new(&registry, opts)
        .collect(never_cancelled())
        .await
        .unwrap();
    assert_eq!(corpus.len(), 1);
    assert_eq!(registry.enumeration_count(&ResourceType::new("auth_division")), 0);
}

#[tokio::test]
async fn test_dependencies_follow_chains() {
    let registry = InMemoryRegistry::new()
        .with_type(
            "a",
            ResourceSpec::builder()
                .reference("b_id", RefDescriptor::to("b"))
                .build()
                .unwrap(),
        )
        .with_type(
            "b",
            ResourceSpec::builder()
                .reference("c_id", RefDescriptor::to("c"))
                .build()
                .unwrap(),
        )
        .with_instance("a", DiscoveredInstance::new("A1", "a").attr("b_id", "B1"))
        .with_instance("b", DiscoveredInstance::new("B1", "b").attr("c_id", "C1"))
        .with_instance("c", DiscoveredInstance::new("C1", "c"))
        .with_instance("c", DiscoveredInstance::new("C2", "c2"));
    let mut opts = options(&registry, &["a"], &[]);
    opts.include_dependencies = true;
    let corpus = Collector::new(&registry, opts)
        .collect(never_cancelled())
        .await
        .unwrap();
    let ids: Vec<_> = corpus.instances.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["A1", "B1", "C1"]);
}

#[tokio::test]
async fn test_cancellation_discards_partial_corpus() {
    let registry = queue_registry().with_stalled("user");
    let (tx, rx) = watch::channel(false);
    let collector = Collector::new(&registry, options(&registry, &[], &[]));

    let cancel = async {
        tokio::task::yield_now().await;
        tx.send(true).unwrap();
    };
    let (result, ()) = tokio::join!(collector.collect(rx), cancel);
    assert!(matches!(result, Err(CollectError::Cancelled)));
}

#[derive(Debug, Default)]
struct CountingRegistry {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl Registry for CountingRegistry {
    fn resource_types(&self) -> Vec<ResourceType> {
        (0..12).map(|i| ResourceType::new(format!("type_{i:02}"))).collect()
    }

    async fn enumerate(
        &self,
        _resource_type: &ResourceType,
    ) -> Result<Vec<DiscoveredInstance>, EnumerateError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    fn reference_catalog(&self, _resource_type: &ResourceType) -> Option<ResourceSpec> {
        None
    }

    fn allowed_cycles(&self) -> Vec<Vec<ResourceType>> {
        Vec::new()
    }
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let registry = Arc::new(CountingRegistry::default());
    let mut opts = options(registry.as_ref(), &[], &[]);
    opts.max_concurrent_operations = 3;
    Collector::new(registry.as_ref(), opts)
        .collect(never_cancelled())
        .await
        .unwrap();
    let peak = registry.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak concurrency {peak} exceeded the bound");
    assert!(peak >= 2, "enumerations never overlapped");
}
