use delver_dns_domain::wire;
use delver_dns_infrastructure::dns::RecursiveResolver;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

mod helpers;
use helpers::{
    a_query, answer_reply, rcode_reply, referral_reply, resolver_config, soa_negative_reply,
    spawn_mock_nameserver,
};

#[tokio::test]
async fn follows_glued_referral_to_authoritative_answer() {
    // One mock plays every server in the chain: it answers the first query
    // with a glued referral pointing back at itself, the second with the
    // authoritative answer.
    let mut hits = 0;
    let mock = spawn_mock_nameserver(move |query| {
        hits += 1;
        if hits == 1 {
            Some(referral_reply(
                query,
                "test",
                &[("ns1.test", Some(Ipv4Addr::LOCALHOST))],
            ))
        } else {
            Some(answer_reply(query, Ipv4Addr::new(93, 184, 216, 34)))
        }
    })
    .await;

    let resolver = RecursiveResolver::new(&resolver_config(mock, 8)).unwrap();
    let raw_query = wire::encode(&a_query(0x1111, "www.test")).unwrap();

    let raw = resolver.resolve(&raw_query).await.unwrap();
    let reply = wire::decode(&raw).unwrap();

    assert_eq!(reply.header.id, 0x1111);
    assert_eq!(reply.answers.len(), 1);
    assert_eq!(
        reply.answers[0].ipv4_address(),
        Some(Ipv4Addr::new(93, 184, 216, 34))
    );
}

#[tokio::test]
async fn resolves_unglued_nameserver_via_fresh_lookup() {
    // Referral carries an NS target but no glue. The engine must ask the
    // root for the nameserver's address, then retry the original query.
    let mut www_hits = 0;
    let mock = spawn_mock_nameserver(move |query| {
        let name = query.questions[0].name.as_str();
        if name == "ns1.test" {
            return Some(answer_reply(query, Ipv4Addr::LOCALHOST));
        }
        www_hits += 1;
        if www_hits == 1 {
            Some(referral_reply(query, "test", &[("ns1.test", None)]))
        } else {
            Some(answer_reply(query, Ipv4Addr::new(192, 0, 2, 7)))
        }
    })
    .await;

    let resolver = RecursiveResolver::new(&resolver_config(mock, 8)).unwrap();
    let raw_query = wire::encode(&a_query(0x2222, "www.test")).unwrap();

    let raw = resolver.resolve(&raw_query).await.unwrap();
    let reply = wire::decode(&raw).unwrap();

    assert_eq!(reply.header.id, 0x2222);
    assert_eq!(
        reply.answers[0].ipv4_address(),
        Some(Ipv4Addr::new(192, 0, 2, 7))
    );
}

#[tokio::test]
async fn soa_negative_answer_is_terminal() {
    let mock =
        spawn_mock_nameserver(move |query| Some(soa_negative_reply(query))).await;

    let resolver = RecursiveResolver::new(&resolver_config(mock, 8)).unwrap();
    let raw_query = wire::encode(&a_query(0x3333, "missing.test")).unwrap();

    let raw = resolver.resolve(&raw_query).await.unwrap();
    let reply = wire::decode(&raw).unwrap();

    assert_eq!(reply.header.id, 0x3333);
    assert!(reply.answers.is_empty());
    assert!(reply.is_error_response());
    assert_eq!(reply.authorities.len(), 1);
}

#[tokio::test]
async fn failure_rcode_is_returned_unchanged() {
    let mock = spawn_mock_nameserver(move |query| Some(rcode_reply(query, 3))).await;

    let resolver = RecursiveResolver::new(&resolver_config(mock, 8)).unwrap();
    let raw_query = wire::encode(&a_query(0x4444, "nope.test")).unwrap();

    let raw = resolver.resolve(&raw_query).await.unwrap();
    let reply = wire::decode(&raw).unwrap();

    assert_eq!(reply.header.id, 0x4444);
    assert_eq!(reply.header.rcode(), 3);
    assert!(reply.answers.is_empty());
}

#[tokio::test]
async fn delegation_loop_terminates_at_depth_guard() {
    // Every hop refers back to the same server: without the depth guard
    // this walk would never end.
    let hits = Arc::new(AtomicUsize::new(0));
    let handler_hits = hits.clone();
    let mock = spawn_mock_nameserver(move |query| {
        handler_hits.fetch_add(1, Ordering::SeqCst);
        Some(referral_reply(
            query,
            "test",
            &[("ns1.test", Some(Ipv4Addr::LOCALHOST))],
        ))
    })
    .await;

    let max_depth = 4;
    let resolver = RecursiveResolver::new(&resolver_config(mock, max_depth)).unwrap();
    let raw_query = wire::encode(&a_query(0x5555, "loop.test")).unwrap();

    let raw = resolver.resolve(&raw_query).await.unwrap();
    let reply = wire::decode(&raw).unwrap();

    // Best-effort fallback: the referral itself comes back, and the chain
    // stopped at the guard instead of looping.
    assert!(reply.answers.is_empty());
    assert!(!reply.authorities.is_empty());
    assert_eq!(hits.load(Ordering::SeqCst), max_depth);
}
