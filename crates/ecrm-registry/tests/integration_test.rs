//! Integration tests for expiration and deletion against an in-memory
//! registry.

use std::sync::Arc;

use chrono::Duration;
use ecrm_core::{HeldSet, ImageReference, NameMatcher, Pattern, RetentionPolicy};
use ecrm_registry::{
    DeleteMode, DeletionExecutor, DeletionOutcome, ExpirationEngine, RegistryError,
    RepositorySelector,
};
use ecrm_test::{
    digest, digest_uri, fixed_now, tag_uri, InMemoryRegistry, IndexManifestBuilder, MockImage,
    ScriptedConfirm,
};
use proptest::prelude::*;

fn policy(days: i64, keep_count: u32) -> RetentionPolicy {
    RetentionPolicy::new(NameMatcher::Pattern(Pattern::new("*")), Duration::days(days))
        .with_keep_count(keep_count)
}

fn engine(registry: &Arc<InMemoryRegistry>) -> ExpirationEngine {
    ExpirationEngine::new(registry.clone()).with_now(fixed_now())
}

fn link_tag(seed: &str) -> String {
    digest(seed).replacen("sha256:", "sha256-", 1)
}

fn held(uris: &[String]) -> HeldSet {
    let mut held = HeldSet::new();
    for uri in uris {
        held.add(uri.parse::<ImageReference>().unwrap(), "test");
    }
    held
}

// =============================================================================
// Plain images
// =============================================================================

#[tokio::test]
async fn test_keep_count_protects_most_recent_tagged() {
    let registry = Arc::new(InMemoryRegistry::new().with_images(
        [0, 10, 40, 50, 60].map(|days| {
            MockImage::image("app", &format!("img-{days}"))
                .with_tags([format!("v{days}")])
                .pushed_days_ago(days)
                .build()
        }),
    ));

    let plan = engine(&registry)
        .evaluate("app", &policy(30, 2), &HeldSet::new())
        .await
        .unwrap();

    assert_eq!(plan.expired, vec![digest("img-60")]);
    assert_eq!(plan.summary.total_images, 5);
    assert_eq!(plan.summary.expired_images, 1);
}

#[tokio::test]
async fn test_untagged_images_do_not_consume_keep_count() {
    let registry = Arc::new(InMemoryRegistry::new().with_images([
        MockImage::image("app", "untagged-40").pushed_days_ago(40).build(),
        MockImage::image("app", "untagged-45").pushed_days_ago(45).build(),
        MockImage::image("app", "tagged-50")
            .with_tags(["v50"])
            .pushed_days_ago(50)
            .build(),
        MockImage::image("app", "tagged-60")
            .with_tags(["v60"])
            .pushed_days_ago(60)
            .build(),
    ]));

    let plan = engine(&registry)
        .evaluate("app", &policy(30, 1), &HeldSet::new())
        .await
        .unwrap();

    assert_eq!(
        plan.expired,
        vec![digest("untagged-40"), digest("untagged-45"), digest("tagged-60")]
    );
}

#[tokio::test]
async fn test_held_digest_is_retained() {
    let registry = Arc::new(InMemoryRegistry::new().with_images([
        MockImage::image("app", "running")
            .with_tags(["v1"])
            .pushed_days_ago(400)
            .build(),
        MockImage::image("app", "idle").pushed_days_ago(400).build(),
    ]));
    let held = held(&[digest_uri("app", &digest("running"))]);

    let plan = engine(&registry)
        .evaluate("app", &policy(30, 0), &held)
        .await
        .unwrap();

    assert_eq!(plan.expired, vec![digest("idle")]);
}

#[tokio::test]
async fn test_held_tag_and_keep_pattern_are_retained() {
    let registry = Arc::new(InMemoryRegistry::new().with_images([
        MockImage::image("app", "declared")
            .with_tags(["v7"])
            .pushed_days_ago(100)
            .build(),
        MockImage::image("app", "release")
            .with_tags(["release-2023"])
            .pushed_days_ago(200)
            .build(),
        MockImage::image("app", "stale")
            .with_tags(["v1"])
            .pushed_days_ago(300)
            .build(),
    ]));
    let held = held(&[tag_uri("app", "v7")]);
    let policy = policy(30, 0).with_keep_tag_pattern("release-*");

    let plan = engine(&registry).evaluate("app", &policy, &held).await.unwrap();

    assert_eq!(plan.expired, vec![digest("stale")]);
}

#[tokio::test]
async fn test_held_tag_on_other_repository_does_not_protect() {
    let registry = Arc::new(InMemoryRegistry::new().with_images([MockImage::image("app", "a")
        .with_tags(["v1"])
        .pushed_days_ago(100)
        .build()]));
    let held = held(&[tag_uri("other", "v1")]);

    let plan = engine(&registry)
        .evaluate("app", &policy(30, 0), &held)
        .await
        .unwrap();
    assert_eq!(plan.expired, vec![digest("a")]);
}

// =============================================================================
// Image indexes and SOCI sidecars
// =============================================================================

#[tokio::test]
async fn test_index_expires_with_linked_image() {
    let registry = Arc::new(InMemoryRegistry::new().with_images([
        MockImage::image("app", "child").pushed_days_ago(100).build(),
        MockImage::index("app", "index-of-child")
            .with_tags([link_tag("child")])
            .pushed_days_ago(100)
            .build(),
        MockImage::index("app", "unrelated-index")
            .with_tags(["sha256-ffff"])
            .pushed_days_ago(1000)
            .build(),
    ]));

    let plan = engine(&registry)
        .evaluate("app", &policy(30, 0), &HeldSet::new())
        .await
        .unwrap();

    assert_eq!(plan.expired, vec![digest("child"), digest("index-of-child")]);
    assert_eq!(plan.summary.total_images, 3);
}

#[tokio::test]
async fn test_soci_sidecar_expires_with_index() {
    let link = link_tag("child");
    let registry = Arc::new(
        InMemoryRegistry::new()
            .with_images([
                MockImage::image("app", "child").pushed_days_ago(100).build(),
                MockImage::index("app", "index")
                    .with_tags([link.clone()])
                    .pushed_days_ago(100)
                    .build(),
                MockImage::soci("app", "soci-linked").pushed_days_ago(100).build(),
                MockImage::soci("app", "soci-other").pushed_days_ago(100).build(),
            ])
            .with_manifest(
                "app",
                &link,
                IndexManifestBuilder::new()
                    .image(&digest("child"))
                    .soci(&digest("soci-linked"))
                    .to_json(),
            ),
    );

    let plan = engine(&registry)
        .evaluate("app", &policy(30, 0), &HeldSet::new())
        .await
        .unwrap();

    assert_eq!(
        plan.expired,
        vec![digest("child"), digest("index"), digest("soci-linked")]
    );
    assert_eq!(registry.manifest_requests(), vec![("app".to_string(), vec![link])]);
}

#[tokio::test]
async fn test_manifest_lookups_are_chunked() {
    let mut registry = InMemoryRegistry::new();
    for i in 0..150 {
        let child = format!("child-{i}");
        let soci = format!("soci-{i}");
        registry = registry
            .with_images([
                MockImage::image("app", &child).pushed_days_ago(100).build(),
                MockImage::index("app", &format!("index-{i}"))
                    .with_tags([link_tag(&child)])
                    .pushed_days_ago(100)
                    .build(),
                MockImage::soci("app", &soci).pushed_days_ago(100).build(),
            ])
            .with_manifest(
                "app",
                &link_tag(&child),
                IndexManifestBuilder::new()
                    .image(&digest(&child))
                    .soci(&digest(&soci))
                    .to_json(),
            );
    }
    let registry = Arc::new(registry);

    let plan = engine(&registry)
        .evaluate("app", &policy(30, 0), &HeldSet::new())
        .await
        .unwrap();

    let requests = registry.manifest_requests();
    let sizes: Vec<usize> = requests.iter().map(|(_, tags)| tags.len()).collect();
    assert_eq!(sizes, vec![100, 50]);
    let mut requested: Vec<String> = requests.into_iter().flat_map(|(_, tags)| tags).collect();
    requested.sort();
    let mut links: Vec<String> = (0..150).map(|i| link_tag(&format!("child-{i}"))).collect();
    links.sort();
    assert_eq!(requested, links);

    assert_eq!(plan.expired.len(), 450);
    assert_eq!(plan.summary.expired_images, 450);
    for i in [0, 99, 100, 149] {
        assert!(plan.expired.contains(&digest(&format!("soci-{i}"))));
    }
}

#[tokio::test]
async fn test_unparsable_manifest_keeps_sidecars() {
    let link = link_tag("child");
    let registry = Arc::new(
        InMemoryRegistry::new()
            .with_images([
                MockImage::image("app", "child").pushed_days_ago(100).build(),
                MockImage::index("app", "index")
                    .with_tags([link.clone()])
                    .pushed_days_ago(100)
                    .build(),
                MockImage::soci("app", "soci").pushed_days_ago(100).build(),
            ])
            .with_manifest("app", &link, "{ not json"),
    );

    let plan = engine(&registry)
        .evaluate("app", &policy(30, 0), &HeldSet::new())
        .await
        .unwrap();

    assert_eq!(plan.expired, vec![digest("child"), digest("index")]);
    assert_eq!(plan.summary.total_images, 3);
}

#[tokio::test]
async fn test_manifest_lookup_failure_is_fatal() {
    let registry = Arc::new(
        InMemoryRegistry::new()
            .with_images([
                MockImage::image("app", "child").pushed_days_ago(100).build(),
                MockImage::index("app", "index")
                    .with_tags([link_tag("child")])
                    .build(),
            ])
            .failing("BatchGetImage"),
    );

    let err = engine(&registry)
        .evaluate("app", &policy(30, 0), &HeldSet::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::ManifestLookupFailed { .. }));
}

#[tokio::test]
async fn test_no_link_tags_means_no_manifest_lookups() {
    let registry = Arc::new(InMemoryRegistry::new().with_images([
        MockImage::image("app", "old").pushed_days_ago(100).build(),
        MockImage::soci("app", "soci").pushed_days_ago(100).build(),
    ]));

    let plan = engine(&registry)
        .evaluate("app", &policy(30, 0), &HeldSet::new())
        .await
        .unwrap();

    assert_eq!(plan.expired, vec![digest("old")]);
    assert!(registry.manifest_requests().is_empty());
}

#[tokio::test]
async fn test_unclassified_records_are_ignored() {
    let registry = Arc::new(InMemoryRegistry::new().with_images([
        MockImage::other("app", "chart").pushed_days_ago(1000).build(),
        MockImage::image("app", "old").pushed_days_ago(100).build(),
    ]));

    let plan = engine(&registry)
        .evaluate("app", &policy(30, 0), &HeldSet::new())
        .await
        .unwrap();

    assert_eq!(plan.expired, vec![digest("old")]);
    assert_eq!(plan.summary.total_images, 1);
}

#[tokio::test]
async fn test_inventory_failure_is_fatal() {
    let registry = Arc::new(InMemoryRegistry::new().failing_describe("app"));
    let err = engine(&registry)
        .evaluate("app", &policy(30, 0), &HeldSet::new())
        .await
        .unwrap_err();
    assert_eq!(err.repository(), Some("app"));
}

// =============================================================================
// Selection
// =============================================================================

#[tokio::test]
async fn test_unmatched_repositories_are_skipped() {
    let registry = Arc::new(
        InMemoryRegistry::new()
            .with_repository("prod/api")
            .with_repository("scratch"),
    );
    let policies = vec![RetentionPolicy::new(
        NameMatcher::Pattern(Pattern::new("prod/*")),
        Duration::days(30),
    )];

    let selected = RepositorySelector::new(registry.clone())
        .select(&policies, None)
        .await
        .unwrap();

    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].name, "prod/api");
}

#[tokio::test]
async fn test_select_single_repository() {
    let registry = Arc::new(
        InMemoryRegistry::new()
            .with_repository("a")
            .with_repository("b"),
    );
    let policies = vec![policy(30, 0)];

    let selected = RepositorySelector::new(registry.clone())
        .select(&policies, Some("b"))
        .await
        .unwrap();
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].name, "b");

    let err = RepositorySelector::new(registry)
        .select(&policies, Some("missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::RepositoryListFailed { .. }));
}

// =============================================================================
// Deletion
// =============================================================================

fn many_images(count: usize) -> Vec<ecrm_core::ImageRecord> {
    (0..count)
        .map(|i| {
            MockImage::image("bulk", &format!("bulk-{i}"))
                .pushed_days_ago(100)
                .build()
        })
        .collect()
}

#[tokio::test]
async fn test_deletion_batches_of_one_hundred() {
    let registry = Arc::new(InMemoryRegistry::new().with_images(many_images(250)));
    let plan = engine(&registry)
        .evaluate("bulk", &policy(30, 0), &HeldSet::new())
        .await
        .unwrap();
    assert_eq!(plan.expired.len(), 250);

    let executor = DeletionExecutor::new(
        registry.clone(),
        Arc::new(ScriptedConfirm::yes()),
        DeleteMode::Delete { force: false },
    );
    let outcome = executor.execute(&plan).await.unwrap();

    let sizes: Vec<usize> = registry
        .delete_batches()
        .iter()
        .map(|(_, digests)| digests.len())
        .collect();
    assert_eq!(sizes, vec![100, 100, 50]);
    assert_eq!(
        outcome,
        DeletionOutcome::Deleted {
            repository: "bulk".to_string(),
            requested: 250,
            deleted: 250
        }
    );
    assert!(registry.remaining("bulk").is_empty());
}

#[tokio::test]
async fn test_deleted_count_sums_reported_ids() {
    let registry = Arc::new(InMemoryRegistry::new().with_images(many_images(150)));
    let mut plan = engine(&registry)
        .evaluate("bulk", &policy(30, 0), &HeldSet::new())
        .await
        .unwrap();
    // digests the registry no longer has are not reported as deleted
    plan.expired.push(digest("already-gone"));

    let executor = DeletionExecutor::new(
        registry.clone(),
        Arc::new(ScriptedConfirm::yes()),
        DeleteMode::Delete { force: true },
    );
    let outcome = executor.execute(&plan).await.unwrap();

    assert_eq!(
        outcome,
        DeletionOutcome::Deleted {
            repository: "bulk".to_string(),
            requested: 151,
            deleted: 150
        }
    );
}

#[tokio::test]
async fn test_batch_failure_stops_remaining_batches() {
    let registry = Arc::new(
        InMemoryRegistry::new()
            .with_images(many_images(250))
            .failing_delete_batch(1),
    );
    let plan = engine(&registry)
        .evaluate("bulk", &policy(30, 0), &HeldSet::new())
        .await
        .unwrap();

    let executor = DeletionExecutor::new(
        registry.clone(),
        Arc::new(ScriptedConfirm::yes()),
        DeleteMode::Delete { force: true },
    );
    let err = executor.execute(&plan).await.unwrap_err();

    assert!(matches!(
        err,
        RegistryError::DeleteBatchFailed {
            batch: 1,
            count: 100,
            ..
        }
    ));
    assert_eq!(registry.delete_batches().len(), 2);
    assert_eq!(registry.remaining("bulk").len(), 150);
}

// =============================================================================
// Idempotence and accounting
// =============================================================================

#[tokio::test]
async fn test_evaluation_is_idempotent() {
    let link = link_tag("img-3");
    let mut records: Vec<_> = (0..8)
        .map(|i| {
            MockImage::image("app", &format!("img-{i}"))
                .with_tags([format!("v{i}")])
                .pushed_days_ago(i64::from(i) * 20)
                .build()
        })
        .collect();
    records.push(MockImage::index("app", "idx").with_tags([link.clone()]).build());
    let registry = Arc::new(InMemoryRegistry::new().with_images(records).with_manifest(
        "app",
        &link,
        IndexManifestBuilder::new().image(&digest("img-3")).to_json(),
    ));
    let held = held(&[tag_uri("app", "v5")]);
    let engine = engine(&registry);

    let first = engine.evaluate("app", &policy(30, 1), &held).await.unwrap();
    let second = engine.evaluate("app", &policy(30, 1), &held).await.unwrap();

    assert_eq!(first, second);
    assert!(!first.expired.is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Expired and kept always add up to the total.
    #[test]
    fn summary_balances(
        images in prop::collection::vec((0i64..200, any::<bool>(), 1u64..1_000_000), 0..40),
        keep_count in 0u32..5,
    ) {
        let records: Vec<_> = images
            .iter()
            .enumerate()
            .map(|(i, (age, tagged, size))| {
                let image = MockImage::image("app", &format!("p-{i}"))
                    .pushed_days_ago(*age)
                    .with_size(*size);
                let image = if *tagged { image.with_tags([format!("t{i}")]) } else { image };
                image.build()
            })
            .collect();
        let registry = Arc::new(InMemoryRegistry::new().with_images(records));
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let plan = runtime
            .block_on(engine(&registry).evaluate("app", &policy(30, keep_count), &HeldSet::new()))
            .unwrap();

        let summary = &plan.summary;
        prop_assert_eq!(summary.expired_images + summary.kept_images(), summary.total_images);
        prop_assert_eq!(summary.expired_image_size + summary.kept_image_size(), summary.total_image_size);
        prop_assert_eq!(u64::try_from(plan.expired.len()).unwrap(), summary.expired_images);
    }
}
