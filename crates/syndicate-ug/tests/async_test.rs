//! AsyncClient runs the blocking calls on tokio's pool.

use syndicate_ug::testing::MockUg;
use syndicate_ug::{AsyncClient, Client, InitOptions, SyndicateError};

fn async_client(mock: &MockUg) -> AsyncClient<MockUg> {
    AsyncClient::new(Client::init(mock.clone(), &InitOptions::new("alice", "v1", "g1")).unwrap())
}

#[tokio::test]
async fn test_async_namespace_roundtrip() {
    let mock = MockUg::new();
    let client = async_client(&mock);

    client.mkdir("/d", Some(0o755)).await.unwrap();
    client.mkdir("/d/e", None).await.unwrap();
    let entries = client.list_dir("/d").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_dir());

    client.rename("/d/e", "/d/f").await.unwrap();
    assert!(client.stat_raw("/d/f").await.unwrap().is_dir());
    client.rmdir("/d/f").await.unwrap();
    client.rmdir("/d").await.unwrap();

    client.shutdown().unwrap();
    assert_eq!(mock.live_states(), 0);
}

/// Errors resolve the future instead of leaving it pending
#[tokio::test]
async fn test_async_errors_complete() {
    let mock = MockUg::new();
    let client = async_client(&mock);

    assert!(client.unlink("/missing").await.unwrap_err().is_not_found());
    assert!(matches!(
        client.stat_raw("").await,
        Err(SyndicateError::InvalidArgument(_))
    ));

    let live = client.call_raw(|_, state| !state.is_null()).await.unwrap();
    assert!(live);
}

#[tokio::test]
async fn test_async_read_file_and_xattrs() {
    let body = vec![7u8; 3000];
    let mock = MockUg::new()
        .with_file("/blob", &body)
        .with_xattr("/blob", "user.k", b"v");
    let client = async_client(&mock);

    assert_eq!(client.read_file("/blob", 1024).await.unwrap(), body);
    assert_eq!(client.get_xattr("/blob", "user.k").await.unwrap(), b"v");
    assert_eq!(client.list_xattr("/blob").await.unwrap(), vec!["user.k"]);
    assert_eq!(client.statvfs().await.unwrap().bsize, 4096);
    assert_eq!(mock.live_handles(), 0);
}

#[tokio::test]
async fn test_shutdown_refused_while_shared() {
    let mock = MockUg::new();
    let client = async_client(&mock);
    let other = client.clone();

    assert!(matches!(client.shutdown(), Err(SyndicateError::InvalidArgument(_))));
    assert_eq!(mock.count("UG_shutdown"), 0);
    drop(other);
    assert_eq!(mock.count("UG_shutdown"), 1);
}
