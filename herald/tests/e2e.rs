//! End-to-end tests for the herald publisher.
//!
//! These exercise the full publication path: catalog in, entry chunks and
//! signed advertisement out, head pointer advanced, everything observable
//! both through the embedding API and over live HTTP. Each test stands
//! alone with its own datastore and, where HTTP is involved, its own
//! listener on an OS-assigned port. No shared state, no ordering
//! dependencies.

use std::sync::Arc;

use multihash_codetable::{Code, MultihashDigest};

use herald::schema::{self, Advertisement, EntryChunk, Multihash, SignedHead};
use herald::{
    Cid, Error, Herald, MemoryDatastore, Publisher, SledDatastore, VecCatalog,
};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn mh(i: u8) -> Multihash {
    Code::Sha2_256.digest(&[i])
}

/// A herald with metadata 0x01, one provider address, and the given chunk
/// size, over a fresh in-memory datastore.
fn build_herald(chunk_size: usize) -> Herald {
    Herald::builder()
        .metadata(vec![0x01])
        .provider_address("/ip4/127.0.0.1/tcp/40080")
        .ad_entries_chunk_size(chunk_size)
        .build()
        .expect("valid config should build")
}

/// Same, but started on an OS-assigned port. Returns the base URL.
async fn start_herald(chunk_size: usize) -> (Herald, String) {
    let mut herald = Herald::builder()
        .metadata(vec![0x01])
        .provider_address("/ip4/127.0.0.1/tcp/40080")
        .ad_entries_chunk_size(chunk_size)
        .listen_addr("127.0.0.1:0")
        .build()
        .expect("valid config should build");
    herald.start().await.expect("listener should bind");
    let addr = herald.http_addr().expect("started herald has an address");
    (herald, format!("http://{addr}"))
}

fn fetch_ad(herald: &Herald, cid: &Cid) -> Advertisement {
    schema::decode(&herald.get_content(cid).expect("ad block should exist"))
        .expect("ad block should decode")
}

fn fetch_chunk(herald: &Herald, cid: &Cid) -> EntryChunk {
    schema::decode(&herald.get_content(cid).expect("chunk block should exist"))
        .expect("chunk block should decode")
}

/// Walk the entry-chunk list from an advertisement's entries link,
/// returning each chunk's multihashes newest-first.
fn walk_chunks(herald: &Herald, ad: &Advertisement) -> Vec<Vec<Multihash>> {
    let mut chunks = Vec::new();
    if ad.entries == schema::no_entries() {
        return chunks;
    }
    let mut next = Some(ad.entries);
    while let Some(cid) = next {
        let chunk = fetch_chunk(herald, &cid);
        chunks.push(chunk.entries);
        next = chunk.next;
    }
    chunks
}

// ---------------------------------------------------------------------------
// 1. Single Small Catalog
// ---------------------------------------------------------------------------

#[test]
fn single_small_catalog() {
    let herald = build_herald(4);
    let head = herald
        .publish(&mut VecCatalog::new(
            b"ctx-A".to_vec(),
            vec![mh(1), mh(2), mh(3)],
        ))
        .unwrap();

    assert_eq!(herald.get_head().unwrap(), Some(head));

    let ad = fetch_ad(&herald, &head);
    assert!(ad.previous_id.is_none());
    assert_eq!(ad.context_id, b"ctx-A");
    assert_eq!(ad.metadata, vec![0x01]);
    assert!(!ad.is_rm);

    let chunks = walk_chunks(&herald, &ad);
    assert_eq!(chunks, vec![vec![mh(1), mh(2), mh(3)]]);
}

// ---------------------------------------------------------------------------
// 2. Multi-Chunk Catalog
// ---------------------------------------------------------------------------

#[test]
fn multi_chunk_catalog_traverses_newest_first() {
    let herald = build_herald(2);
    let head = herald
        .publish(&mut VecCatalog::new(
            b"ctx-A".to_vec(),
            vec![mh(1), mh(2), mh(3), mh(4), mh(5)],
        ))
        .unwrap();

    let ad = fetch_ad(&herald, &head);
    let chunks = walk_chunks(&herald, &ad);

    // Chunks fill front to back and link newest to oldest, so the walk
    // sees the trailing remainder first. Only the last-emitted (first
    // visited) chunk may be short.
    assert_eq!(
        chunks,
        vec![vec![mh(5)], vec![mh(3), mh(4)], vec![mh(1), mh(2)]]
    );

    // Multiset coverage: every multihash exactly once.
    let mut flat: Vec<Multihash> = chunks.into_iter().flatten().collect();
    flat.sort_unstable();
    let mut expected = vec![mh(1), mh(2), mh(3), mh(4), mh(5)];
    expected.sort_unstable();
    assert_eq!(flat, expected);
}

// ---------------------------------------------------------------------------
// 3. Chain of Two
// ---------------------------------------------------------------------------

#[test]
fn chain_of_two_links_backwards() {
    let herald = build_herald(4);
    let c1 = herald
        .publish(&mut VecCatalog::new(
            b"ctx-A".to_vec(),
            vec![mh(1), mh(2), mh(3)],
        ))
        .unwrap();
    let c2 = herald
        .publish(&mut VecCatalog::new(b"ctx-B".to_vec(), vec![mh(9)]))
        .unwrap();

    assert_eq!(herald.get_head().unwrap(), Some(c2));
    let ad2 = fetch_ad(&herald, &c2);
    assert_eq!(ad2.previous_id, Some(c1));
    assert_eq!(ad2.context_id, b"ctx-B");
}

// ---------------------------------------------------------------------------
// 4. Retraction
// ---------------------------------------------------------------------------

#[test]
fn retract_after_chain_of_two() {
    let herald = build_herald(4);
    let c1 = herald
        .publish(&mut VecCatalog::new(b"ctx-A".to_vec(), vec![mh(1)]))
        .unwrap();
    let c2 = herald
        .publish(&mut VecCatalog::new(b"ctx-B".to_vec(), vec![mh(9)]))
        .unwrap();

    let c3 = herald.retract(b"ctx-A").unwrap();
    assert_eq!(herald.get_head().unwrap(), Some(c3));

    let ad3 = fetch_ad(&herald, &c3);
    assert!(ad3.is_rm);
    assert_eq!(ad3.context_id, b"ctx-A");
    assert_eq!(ad3.entries, schema::no_entries());
    assert_eq!(ad3.previous_id, Some(c2));

    // Prior advertisements remain readable and valid.
    assert!(fetch_ad(&herald, &c1).verify());
    assert!(fetch_ad(&herald, &c2).verify());
}

// ---------------------------------------------------------------------------
// Chain Properties
// ---------------------------------------------------------------------------

#[test]
fn chain_linearity_and_head_monotonicity() {
    let herald = build_herald(4);
    let mut cids = Vec::new();
    for i in 0..5u8 {
        let cid = if i % 2 == 0 {
            herald
                .publish(&mut VecCatalog::new(vec![b'c', i], vec![mh(i)]))
                .unwrap()
        } else {
            herald.retract(&[b'c', i - 1]).unwrap()
        };
        // Head monotonicity: every successful call installs its result.
        assert_eq!(herald.get_head().unwrap(), Some(cid));
        cids.push(cid);
    }

    // Chain linearity: each advertisement points at its predecessor.
    for pair in cids.windows(2) {
        let ad = fetch_ad(&herald, &pair[1]);
        assert_eq!(ad.previous_id, Some(pair[0]));
    }
    assert!(fetch_ad(&herald, &cids[0]).previous_id.is_none());
}

#[test]
fn every_advertisement_signature_verifies() {
    let herald = build_herald(4);
    let c1 = herald
        .publish(&mut VecCatalog::new(b"ctx-A".to_vec(), vec![mh(1), mh(2)]))
        .unwrap();
    let c2 = herald.retract(b"ctx-A").unwrap();

    for cid in [c1, c2] {
        let ad = fetch_ad(&herald, &cid);
        assert!(ad.verify(), "signature must verify for {cid}");
    }
}

#[test]
fn block_fetch_is_idempotent() {
    let herald = build_herald(4);
    let head = herald
        .publish(&mut VecCatalog::new(b"ctx-A".to_vec(), vec![mh(1)]))
        .unwrap();

    let first = herald.get_content(&head).unwrap();
    for _ in 0..3 {
        assert_eq!(herald.get_content(&head).unwrap(), first);
    }
}

#[test]
fn fresh_system_has_absent_head() {
    let herald = build_herald(4);
    assert!(herald.get_head().unwrap().is_none());
    let absent = schema::link_cid(b"nothing here");
    assert!(matches!(
        herald.get_content(&absent),
        Err(Error::ContentNotFound)
    ));
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[test]
fn head_survives_datastore_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");

    let head = {
        let ds = Arc::new(SledDatastore::open(dir.path()).unwrap());
        let herald = Herald::builder()
            .metadata(vec![0x01])
            .provider_address("/ip4/127.0.0.1/tcp/40080")
            .datastore(ds.clone())
            .build()
            .unwrap();
        let head = herald
            .publish(&mut VecCatalog::new(b"ctx-A".to_vec(), vec![mh(1)]))
            .unwrap();
        ds.flush().unwrap();
        head
    };

    // A new herald over the same datastore picks up the same chain.
    let herald = Herald::builder()
        .metadata(vec![0x01])
        .provider_address("/ip4/127.0.0.1/tcp/40080")
        .datastore(Arc::new(SledDatastore::open(dir.path()).unwrap()))
        .build()
        .unwrap();
    assert_eq!(herald.get_head().unwrap(), Some(head));
    assert!(fetch_ad(&herald, &head).verify());
}

#[test]
fn shared_datastore_is_visible_to_embedder() {
    // The datastore handle stays usable by the embedder; herald's keys are
    // the head pointer plus one key per block.
    let ds = Arc::new(MemoryDatastore::new());
    let herald = Herald::builder()
        .metadata(vec![0x01])
        .provider_address("/ip4/127.0.0.1/tcp/40080")
        .datastore(ds.clone())
        .build()
        .unwrap();

    herald
        .publish(&mut VecCatalog::new(b"ctx-A".to_vec(), vec![mh(1)]))
        .unwrap();
    // One advertisement block, one chunk block, one head key.
    assert_eq!(ds.len(), 3);
}

// ---------------------------------------------------------------------------
// 5 & 6. HTTP Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn http_head_is_no_content_before_first_publish() {
    let (mut herald, base_url) = start_herald(4).await;

    let resp = reqwest::get(format!("{base_url}/head")).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NO_CONTENT);

    herald.shutdown().await.unwrap();
}

#[tokio::test]
async fn http_head_serves_verifiable_signed_head() {
    let (mut herald, base_url) = start_herald(4).await;
    let head = herald
        .publish(&mut VecCatalog::new(
            b"ctx-A".to_vec(),
            vec![mh(1), mh(2), mh(3)],
        ))
        .unwrap();

    let resp = reqwest::get(format!("{base_url}/head")).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/json"
    );

    let signed: SignedHead = resp.json().await.unwrap();
    assert_eq!(signed.topic, "/indexer/ingest/mainnet");
    assert_eq!(signed.verify().unwrap(), head);

    herald.shutdown().await.unwrap();
}

#[tokio::test]
async fn http_serves_blocks_with_codec_content_type() {
    let (mut herald, base_url) = start_herald(4).await;
    let head = herald
        .publish(&mut VecCatalog::new(b"ctx-A".to_vec(), vec![mh(1)]))
        .unwrap();

    // The advertisement block comes back byte-identical, typed dag-json.
    let resp = reqwest::get(format!("{base_url}/{head}")).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/json"
    );
    let body = resp.bytes().await.unwrap();
    assert_eq!(body.as_ref(), herald.get_content(&head).unwrap());

    // And so does the entry chunk it links to.
    let ad = fetch_ad(&herald, &head);
    let resp = reqwest::get(format!("{base_url}/{}", ad.entries))
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    herald.shutdown().await.unwrap();
}

#[tokio::test]
async fn http_missing_block_is_not_found() {
    let (mut herald, base_url) = start_herald(4).await;

    let absent = schema::link_cid(b"valid but never stored");
    let resp = reqwest::get(format!("{base_url}/{absent}")).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

    herald.shutdown().await.unwrap();
}

#[tokio::test]
async fn http_malformed_cid_is_bad_request() {
    let (mut herald, base_url) = start_herald(4).await;

    let resp = reqwest::get(format!("{base_url}/not-a-cid"))
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    let body = resp.text().await.unwrap();
    assert!(body.contains("not-a-cid"));

    herald.shutdown().await.unwrap();
}

#[tokio::test]
async fn http_non_get_is_method_not_allowed() {
    let (mut herald, base_url) = start_herald(4).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{base_url}/head"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::METHOD_NOT_ALLOWED);

    herald.shutdown().await.unwrap();
}

#[tokio::test]
async fn http_shutdown_stops_serving() {
    let (mut herald, base_url) = start_herald(4).await;
    herald.shutdown().await.unwrap();

    let result = reqwest::get(format!("{base_url}/head")).await;
    assert!(result.is_err(), "listener should be closed after shutdown");
}

#[tokio::test]
async fn publishes_are_visible_over_http_immediately() {
    let (mut herald, base_url) = start_herald(4).await;

    for i in 0..3u8 {
        let head = herald
            .publish(&mut VecCatalog::new(vec![b'c', i], vec![mh(i)]))
            .unwrap();
        let signed: SignedHead = reqwest::get(format!("{base_url}/head"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(signed.verify().unwrap(), head);
    }

    herald.shutdown().await.unwrap();
}
