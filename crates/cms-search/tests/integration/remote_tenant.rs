//! Tenant resources against a mocked remote index service.

use std::sync::Arc;

use cms_search::{
    ContentSearcher, Error, LockOwner, RemoteConfig, SearchConfig, SearchQuery, StaticLanguages,
    TaxonomyTree, TenantManager, TenantStatus,
};
use tokio::sync::oneshot;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{cat, doc, select_response};

fn manager() -> TenantManager {
    TenantManager::new(
        SearchConfig::default(),
        Arc::new(StaticLanguages::new(["en"])),
        Arc::new(TaxonomyTree::from(vec![cat("/travel/italy"), cat("/travel/france")])),
    )
}

#[tokio::test]
async fn test_index_then_search_through_tenant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/acme/update"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/acme/select"))
        .and(query_param("q", "(en:venice AND (group:editors OR group:free))"))
        .and(query_param("rows", "1000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(select_response(
            &["7", "3"],
            &[("/travel", 2), ("/travel/italy", 2)],
        )))
        .mount(&server)
        .await;

    let manager = manager();
    let tenant = manager
        .create("acme", &RemoteConfig::new(server.uri(), "acme"))
        .unwrap();

    tenant
        .indexer()
        .add_document(&doc("3", "Venice", &["editors"], &["/travel/italy"]))
        .await
        .unwrap();
    tenant.indexer().commit().await.unwrap();

    let query = SearchQuery::word("en", "Venice", ["Editors"]).with_category(cat("/travel"));
    let outcome = tenant.searcher().search(&query).await.unwrap();
    assert_eq!(outcome.ids, vec!["3", "7"]);
    assert_eq!(outcome.facets.get(&cat("/travel")), Some(2));
    assert_eq!(outcome.facets.get(&cat("/travel/italy")), Some(2));
    assert_eq!(outcome.facets.get(&cat("/travel/france")), Some(0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_search_does_not_take_tenant_lock() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(select_response(&["1"], &[])))
        .mount(&server)
        .await;

    let manager = Arc::new(manager());
    manager
        .create("acme", &RemoteConfig::new(server.uri(), "acme"))
        .unwrap();

    // An administrative task holds the lock for the whole search.
    let (locked_tx, locked_rx) = oneshot::channel();
    let (done_tx, done_rx) = oneshot::channel::<()>();
    let holder = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move {
            let admin = LockOwner::new();
            manager.lock("acme", admin).await.unwrap();
            locked_tx.send(()).unwrap();
            done_rx.await.unwrap();
            manager.unlock("acme", admin).unwrap();
        })
    };
    locked_rx.await.unwrap();

    assert!(manager.is_locked("acme").unwrap());
    let ids = manager
        .get("acme")
        .unwrap()
        .searcher()
        .search_word("en", "x", &[])
        .await
        .unwrap();
    assert_eq!(ids, vec!["1"]);

    done_tx.send(()).unwrap();
    holder.await.unwrap();
    assert!(!manager.is_locked("acme").unwrap());
}

#[tokio::test]
async fn test_closed_tenant_rejects_requests() {
    let server = MockServer::start().await;
    let manager = manager();
    let tenant = manager
        .create("acme", &RemoteConfig::new(server.uri(), "acme"))
        .unwrap();
    manager.close("acme").await.unwrap();

    assert_eq!(tenant.status().get(), TenantStatus::Closed);
    let err = tenant.indexer().commit().await.unwrap_err();
    assert!(matches!(err, Error::Closed { .. }));
    assert!(server.received_requests().await.unwrap().is_empty());
}
