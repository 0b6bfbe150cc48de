mod support;

// std
use std::{sync::Arc, time::Duration as StdDuration};
// self
use session_broker::{
	error::{Error, ValidationError},
	http::Method,
};
use support::*;

#[tokio::test]
async fn concurrent_callers_share_one_refresh() {
	let (client, transport) = build_scripted_client();

	transport.always(
		Method::Post,
		REFRESH,
		Reply::delayed(200, GRANT_BODY, StdDuration::from_millis(50)),
	);

	let refresh = &client.refresh;
	let (a, b, c, d) = tokio::join!(
		refresh.ensure_refreshed_once(),
		refresh.ensure_refreshed_once(),
		refresh.ensure_refreshed_once(),
		refresh.ensure_refreshed_once(),
	);
	let a = a.expect("Leader should observe a successful refresh.");

	for other in [b, c, d] {
		let other = other.expect("Followers should observe the same successful refresh.");

		assert!(Arc::ptr_eq(&a, &other));
	}

	assert_eq!(transport.calls(Method::Post, REFRESH), 1);
	assert_eq!(client.refresh.metrics().attempts(), 1);
	assert_eq!(client.refresh.metrics().coalesced(), 3);
	assert_eq!(client.refresh.metrics().successes(), 1);
	assert_eq!(client.store.get().as_ref().map(|token| token.expose()), Some("access-1"));
	assert!(!client.refresh.is_refreshing());
}

#[tokio::test]
async fn concurrent_callers_share_one_failure() {
	let (client, transport) = build_scripted_client();

	client.store.set("stale", None);
	transport.always(
		Method::Post,
		REFRESH,
		Reply::delayed(401, r#"{"detail":"no session"}"#, StdDuration::from_millis(50)),
	);

	let refresh = &client.refresh;
	let (a, b, c) = tokio::join!(
		refresh.ensure_refreshed_once(),
		refresh.ensure_refreshed_once(),
		refresh.ensure_refreshed_once(),
	);
	let a = a.expect_err("Refresh should fail without a session.");
	let b = b.expect_err("Followers should observe the same failure.");
	let c = c.expect_err("Followers should observe the same failure.");

	assert!(Arc::ptr_eq(&a, &b));
	assert!(Arc::ptr_eq(&a, &c));
	assert!(matches!(a.as_ref(), Error::Http { status: 401, .. }));
	assert_eq!(transport.calls(Method::Post, REFRESH), 1);
	assert_eq!(client.refresh.metrics().failures(), 1);
	// A failed refresh leaves no usable credential behind.
	assert!(client.store.is_expired());
	assert!(client.store.get().is_none());
}

#[tokio::test]
async fn settled_refresh_is_not_reused() {
	let (client, transport) = build_scripted_client();

	transport
		.enqueue(Method::Post, REFRESH, Reply::status(200, GRANT_BODY))
		.enqueue(Method::Post, REFRESH, Reply::status(200, ROTATED_GRANT_BODY));

	let first = client.refresh.ensure_refreshed_once().await.expect("First refresh should succeed.");
	let second =
		client.refresh.ensure_refreshed_once().await.expect("Second refresh should succeed.");

	assert!(!Arc::ptr_eq(&first, &second));
	assert_eq!(transport.calls(Method::Post, REFRESH), 2);
	assert_eq!(client.store.get().as_ref().map(|token| token.expose()), Some("access-2"));
	assert_eq!(client.refresh.metrics().coalesced(), 0);
}

#[tokio::test]
async fn failure_is_followed_by_a_fresh_attempt() {
	let (client, transport) = build_scripted_client();

	transport
		.enqueue(Method::Post, REFRESH, Reply::Fail)
		.enqueue(Method::Post, REFRESH, Reply::status(200, GRANT_BODY));

	let err = client.refresh.ensure_refreshed_once().await.expect_err("Transport failure expected.");

	assert!(matches!(err.as_ref(), Error::Transport(_)));

	client.refresh.ensure_refreshed_once().await.expect("Retry by a new caller should succeed.");

	assert_eq!(transport.calls(Method::Post, REFRESH), 2);
	assert_eq!(client.refresh.metrics().failures(), 1);
	assert_eq!(client.refresh.metrics().successes(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn spawned_tasks_share_one_refresh() {
	let (client, transport) = build_scripted_client();

	transport.always(
		Method::Post,
		REFRESH,
		Reply::delayed(200, GRANT_BODY, StdDuration::from_millis(300)),
	);

	let handles = (0..8)
		.map(|_| {
			let refresh = client.refresh.clone();

			tokio::spawn(async move { refresh.ensure_refreshed_once().await })
		})
		.collect::<Vec<_>>();
	let mut grants = Vec::new();

	for handle in handles {
		grants.push(
			handle
				.await
				.expect("Refresh task should not panic.")
				.expect("Refresh should succeed."),
		);
	}

	assert!(grants.iter().all(|grant| Arc::ptr_eq(grant, &grants[0])));
	assert_eq!(transport.calls(Method::Post, REFRESH), 1);
}

#[tokio::test]
async fn grant_without_token_leaves_store_untouched() {
	let (client, transport) = build_scripted_client();

	transport.always(
		Method::Post,
		REFRESH,
		Reply::status(
			200,
			r#"{"user":{"id":"user-1","email":"ada@example.com","created_at":"x"},"token_type":"bearer"}"#,
		),
	);

	let grant = client.refresh.ensure_refreshed_once().await.expect("Cookie-only grant is valid.");

	assert!(grant.access_token.is_none());
	assert!(client.store.get().is_none());
}

#[tokio::test]
async fn unrepresentable_lifetime_fails_validation() {
	let (client, transport) = build_scripted_client();

	client.store.set("stale", None);
	transport.always(
		Method::Post,
		REFRESH,
		Reply::status(
			200,
			r#"{"user":{"id":"user-1","email":"ada@example.com","created_at":"x"},"access_token":"t","token_type":"bearer","expires_in":9223372036854775807}"#,
		),
	);

	let err = client.refresh.ensure_refreshed_once().await.expect_err("Lifetime is out of range.");

	assert!(matches!(
		err.as_ref(),
		Error::Validation(ValidationError::ExpiresInOutOfRange { expires_in: i64::MAX })
	));
	assert!(client.store.get().is_none());
	assert!(!client.refresh.is_refreshing());
}

#[tokio::test]
async fn dropped_refresh_releases_the_slot() {
	let (client, transport) = build_scripted_client();

	transport.always(
		Method::Post,
		REFRESH,
		Reply::delayed(200, GRANT_BODY, StdDuration::from_millis(200)),
	);

	let abandoned = tokio::time::timeout(
		StdDuration::from_millis(20),
		client.refresh.ensure_refreshed_once(),
	)
	.await;

	assert!(abandoned.is_err());
	assert!(!client.refresh.is_refreshing());

	client.refresh.ensure_refreshed_once().await.expect("A new caller should refresh again.");

	assert_eq!(transport.calls(Method::Post, REFRESH), 2);
	assert_eq!(client.refresh.metrics().coalesced(), 0);
}
