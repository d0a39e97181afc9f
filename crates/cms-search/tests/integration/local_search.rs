//! End-to-end searches over an embedded index.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use cms_search::{
    ContentSearcher, Error, LocalIndexer, LocalSearch, OpenedIndex, SearchConfig, SearchQuery,
    SnapshotOpener, TaxonomyReader, TermMap, WordMode, create_backend,
};

use crate::common::{LocalFixture, cat, doc};

fn mixed_groups() -> LocalFixture {
    LocalFixture::new(&[
        doc("1", "Venice carnival", &["free"], &["/travel/italy"]),
        doc("2", "Venice biennale", &["editors"], &["/travel/italy"]),
        doc("3", "Venice lagoon", &["Free"], &["/nature"]),
        doc("4", "Amsterdam canals", &["editors"], &["/travel/netherlands"]),
    ])
}

#[tokio::test]
async fn test_default_visibility_is_free_only() {
    let fx = mixed_groups();
    let ids = fx.search().search_word("en", "venice", &[]).await.unwrap();
    assert_eq!(ids, vec!["1", "3"]);
}

#[tokio::test]
async fn test_named_group_also_sees_free() {
    let fx = mixed_groups();
    let mut ids = fx
        .search()
        .search_word("en", "venice", &["editors".to_string()])
        .await
        .unwrap();
    ids.sort();
    assert_eq!(ids, vec!["1", "2", "3"]);
}

#[tokio::test]
async fn test_administrators_bypass_visibility() {
    let fx = mixed_groups();
    let query = SearchQuery::default().with_group("administrators");
    let mut ids = fx.search().search_contents_id(&query).await.unwrap();
    ids.sort();
    assert_eq!(ids, vec!["1", "2", "3", "4"]);
}

#[tokio::test]
async fn test_group_case_insensitive() {
    let fx = LocalFixture::new(&[doc("1", "Venice", &["Free"], &[])]);
    let ids = fx
        .search()
        .search_word("en", "venice", &["FREE".to_string()])
        .await
        .unwrap();
    assert_eq!(ids, vec!["1"]);
}

#[tokio::test]
async fn test_multi_word_is_conjunction() {
    let fx = LocalFixture::new(&[
        doc("1", "Venice", &["free"], &[]),
        doc("2", "Venice and Amsterdam", &["free"], &[]),
    ]);
    let ids = fx
        .search()
        .search_word("en", "Venice Amsterdam", &[])
        .await
        .unwrap();
    assert_eq!(ids, vec!["2"]);
}

#[tokio::test]
async fn test_multi_word_any_mode() {
    let fx = LocalFixture::new(&[
        doc("1", "Venice", &["free"], &[]),
        doc("2", "Amsterdam", &["free"], &[]),
        doc("3", "Paris", &["free"], &[]),
    ]);
    let config = SearchConfig {
        word_mode: WordMode::Any,
        ..fx.config()
    };
    let backend = create_backend(&config).await.unwrap();
    let mut ids = backend
        .search_word("en", "Venice Amsterdam", &[])
        .await
        .unwrap();
    ids.sort();
    assert_eq!(ids, vec!["1", "2"]);
}

#[tokio::test]
async fn test_facets_for_requested_category() {
    let fx = mixed_groups();
    let query = SearchQuery::default()
        .with_group("administrators")
        .with_term("en", "venice")
        .with_category(cat("/travel"));
    let outcome = fx.search().search(&query).await.unwrap();

    assert_eq!(outcome.facets.get(&cat("/travel")), Some(2));
    assert_eq!(outcome.facets.get(&cat("/travel/italy")), Some(2));
    assert_eq!(outcome.facets.get(&cat("/travel/netherlands")), Some(0));
    assert_eq!(outcome.facets.get(&cat("/nature")), None);
}

#[tokio::test]
async fn test_facets_default_to_top_level() {
    let fx = mixed_groups();
    let query = SearchQuery::default().with_group("administrators");
    let outcome = fx.search().search(&query).await.unwrap();

    assert_eq!(outcome.facets.get(&cat("/travel")), Some(3));
    assert_eq!(outcome.facets.get(&cat("/nature")), Some(1));
    assert_eq!(outcome.facets.len(), 2);
}

#[tokio::test]
async fn test_facet_counts_respect_visibility() {
    let fx = mixed_groups();
    let query = SearchQuery::default().with_category(cat("/travel"));
    let outcome = fx.search().search(&query).await.unwrap();
    assert_eq!(outcome.ids, vec!["1", "3"]);
    assert_eq!(outcome.facets.get(&cat("/travel")), Some(1));
    assert_eq!(outcome.facets.get(&cat("/travel/italy")), Some(1));
}

#[tokio::test]
async fn test_facet_cap() {
    let index_dir = tempfile::tempdir().unwrap();
    let taxonomy_dir = tempfile::tempdir().unwrap();
    let mut indexer = LocalIndexer::open(index_dir.path(), taxonomy_dir.path(), &["en"]).unwrap();
    for i in 0..1500 {
        indexer
            .add_document(&doc(&format!("{i:04}"), "bulk", &["free"], &["/big"]))
            .unwrap();
    }
    indexer.commit().unwrap();
    drop(indexer);

    let search = LocalSearch::init(index_dir.path(), taxonomy_dir.path()).unwrap();
    let query = SearchQuery::word("en", "bulk", ["free"]).with_category(cat("/big"));
    let outcome = search.search(&query).await.unwrap();

    assert_eq!(outcome.ids.len(), 1000);
    assert_eq!(outcome.facets.get(&cat("/big")), Some(1000));
}

#[tokio::test]
async fn test_equal_scores_past_cap_ordered_by_id() {
    let index_dir = tempfile::tempdir().unwrap();
    let taxonomy_dir = tempfile::tempdir().unwrap();
    let mut indexer = LocalIndexer::open(index_dir.path(), taxonomy_dir.path(), &["en"]).unwrap();
    for i in (0..1500).rev() {
        indexer
            .add_document(&doc(&format!("{i:04}"), "bulk", &["free"], &[]))
            .unwrap();
    }
    indexer.commit().unwrap();
    drop(indexer);

    let search = LocalSearch::init(index_dir.path(), taxonomy_dir.path()).unwrap();
    let ids = search.search_word("en", "bulk", &[]).await.unwrap();

    assert_eq!(ids.len(), 1000);
    assert_eq!(ids.first().map(String::as_str), Some("0000"));
    assert_eq!(ids.last().map(String::as_str), Some("0999"));
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_empty_term_map_lists_visible_documents() {
    let fx = mixed_groups();
    let query = SearchQuery {
        terms: TermMap::new(),
        ..Default::default()
    };
    let ids = fx.search().search_contents_id(&query).await.unwrap();
    assert_eq!(ids, vec!["1", "3"]);
}

#[tokio::test]
async fn test_no_match_is_empty() {
    let fx = mixed_groups();
    let outcome = fx
        .search()
        .search(&SearchQuery::word("en", "tokyo", ["administrators"]))
        .await
        .unwrap();
    assert!(outcome.ids.is_empty());
    assert!(outcome.facets.iter().all(|(_, n)| n == 0));
}

struct FailingTaxonomy {
    index_releases: Arc<AtomicUsize>,
}

impl SnapshotOpener for FailingTaxonomy {
    fn open_index(&self, dir: &Path) -> cms_search::Result<OpenedIndex> {
        OpenedIndex::open(dir)
    }

    fn open_taxonomy(&self, _dir: &Path) -> cms_search::Result<TaxonomyReader> {
        Err(Error::search("taxonomy store unreadable"))
    }

    fn release_index(&self, index: OpenedIndex) -> cms_search::Result<()> {
        self.index_releases.fetch_add(1, Ordering::SeqCst);
        index.close()
    }
}

#[tokio::test]
async fn test_taxonomy_failure_releases_index_reader() {
    let fx = mixed_groups();
    let releases = Arc::new(AtomicUsize::new(0));
    let search = LocalSearch::init_with(
        fx.index_dir.path(),
        fx.taxonomy_dir.path(),
        &SearchConfig::default(),
        Box::new(FailingTaxonomy {
            index_releases: Arc::clone(&releases),
        }),
    )
    .unwrap();

    let err = search.search_word("en", "venice", &[]).await.unwrap_err();
    assert!(matches!(err, Error::Search { .. }));
    assert!(err.to_string().contains("taxonomy store unreadable"));
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_searches() {
    let fx = mixed_groups();
    let search = fx.search();
    let mut handles = Vec::new();
    for _ in 0..8 {
        let search = search.clone();
        handles.push(tokio::spawn(async move {
            search.search_word("en", "venice", &[]).await.unwrap()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), vec!["1", "3"]);
    }
}
