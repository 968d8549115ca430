#![cfg(feature = "reqwest")]

mod common;

// self
use common::*;

async fn mock_join<'a>(server: &'a MockServer, id: &str, status: u16) -> httpmock::Mock<'a> {
	let path = member_path(id);

	server
		.mock_async(|when, then| {
			when.method(PUT).path(path).header("authorization", "Bot bot-token");
			then.status(status);
		})
		.await
}

async fn mock_roster<'a>(server: &'a MockServer, ids: &[&str]) -> httpmock::Mock<'a> {
	let page = ids
		.iter()
		.map(|id| json!({ "user": { "id": id, "username": format!("user-{id}") }, "roles": [] }))
		.collect::<Vec<_>>();

	server
		.mock_async(|when, then| {
			when.method(GET).path(members_path()).query_param("limit", "1000");
			then.status(200).json_body(json!(page));
		})
		.await
}

#[tokio::test]
async fn join_is_idempotent_for_present_members() {
	let server = MockServer::start_async().await;
	let (broker, store) = build_broker(descriptor(&server));

	seed(&store, "100").await;

	let mock = server
		.mock_async(|when, then| {
			when.method(PUT)
				.path(member_path("100"))
				.json_body(json!({ "access_token": "access-100" }));
			then.status(204);
		})
		.await;

	for _ in 0..2 {
		let outcome = broker.join(&user("100")).await.expect("Join should succeed.");

		assert_eq!(outcome, JoinOutcome::AlreadyMember);
	}

	mock.assert_calls_async(2).await;
}

#[tokio::test]
async fn join_maps_provider_statuses() {
	let server = MockServer::start_async().await;
	let (broker, store) = build_broker(descriptor(&server));

	for (id, status, expected) in [
		("100", 201, JoinOutcome::Joined),
		("200", 403, JoinOutcome::AccessTokenExpired),
		("300", 404, JoinOutcome::UnknownUser),
	] {
		seed(&store, id).await;
		mock_join(&server, id, status).await;

		assert_eq!(broker.join(&user(id)).await.expect("Join should classify."), expected);
	}

	mock_join(&server, "400", 500).await;
	seed(&store, "400").await;

	assert!(matches!(
		broker.join(&user("400")).await,
		Err(Error::UnexpectedResponse { status: 500, .. })
	));
}

#[tokio::test]
async fn join_without_record_skips_the_provider() {
	let server = MockServer::start_async().await;
	let (broker, _store) = build_broker(descriptor(&server));
	let mock = mock_join(&server, "100", 201).await;

	assert_eq!(
		broker.join(&user("100")).await.expect("Missing record is an outcome."),
		JoinOutcome::MissingRecord
	);

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn reconcile_joins_purges_and_skips_present_members() {
	let server = MockServer::start_async().await;
	let (broker, store) = build_broker(descriptor(&server));

	for id in ["100", "200", "300"] {
		seed(&store, id).await;
	}

	let join_a = mock_join(&server, "100", 201).await;
	let join_b = mock_join(&server, "200", 403).await;
	let join_c = mock_join(&server, "300", 201).await;
	let refresh_b = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth2/token")
				.form_urlencoded_tuple("refresh_token", "refresh-200");
			then.status(400).json_body(json!({ "error": "invalid_grant" }));
		})
		.await;
	let roster = [user("300")].into_iter().collect::<HashSet<_>>();
	let report = broker
		.reconcile(&roster, [user("100"), user("200"), user("300")], &NoopProgress)
		.await;

	join_a.assert_async().await;
	join_b.assert_async().await;
	refresh_b.assert_async().await;
	join_c.assert_calls_async(0).await;

	assert_eq!(report.progress.joined(), &[user("100")]);
	assert_eq!(report.attempted, 2);
	assert_eq!(report.joined, 1);
	assert_eq!(report.skipped, 1);
	assert_eq!(report.purged, 1);
	assert!(store.contains(&user("100")));
	assert!(!store.contains(&user("200")));
	assert!(store.contains(&user("300")));
}

#[tokio::test]
async fn provider_failures_skip_the_member_and_the_run_continues() {
	let server = MockServer::start_async().await;
	let (broker, store) = build_broker(descriptor(&server));

	for id in ["100", "200", "300"] {
		seed(&store, id).await;
	}

	let broken = mock_join(&server, "100", 500).await;
	let throttled = server
		.mock_async(|when, then| {
			when.method(PUT).path(member_path("200"));
			then.status(429).header("retry-after", "99999999999999999999");
		})
		.await;
	let healthy = mock_join(&server, "300", 201).await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(500);
		})
		.await;
	let report = broker
		.reconcile(&HashSet::new(), [user("100"), user("200"), user("300")], &NoopProgress)
		.await;

	broken.assert_async().await;
	throttled.assert_async().await;
	healthy.assert_async().await;
	refresh.assert_calls_async(0).await;

	assert_eq!(report.progress.joined(), &[user("300")]);
	assert_eq!(report.attempted, 3);
	assert_eq!(report.joined, 1);
	assert_eq!(report.skipped, 2);
	assert_eq!(report.purged, 0);
	assert!(store.contains(&user("100")));
	assert!(store.contains(&user("200")));
}

#[tokio::test]
async fn second_rejection_after_refresh_deletes_the_record() {
	let server = MockServer::start_async().await;
	let (broker, store) = build_broker(descriptor(&server));

	seed(&store, "100").await;

	let join = mock_join(&server, "100", 403).await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("access-100-new", "refresh-100-new", "identify guilds.join"));
		})
		.await;
	let report = broker.reconcile(&HashSet::new(), [user("100")], &NoopProgress).await;

	join.assert_calls_async(2).await;
	refresh.assert_calls_async(1).await;

	assert!(report.progress.is_empty());
	assert_eq!(report.skipped, 1);
	assert_eq!(report.purged, 1);
	assert!(store.is_empty());
}

#[tokio::test]
async fn stale_access_token_is_refreshed_and_retried_once() {
	let server = MockServer::start_async().await;
	let (broker, store) = build_broker(descriptor(&server));

	seed(&store, "100").await;

	let stale = server
		.mock_async(|when, then| {
			when.method(PUT)
				.path(member_path("100"))
				.json_body(json!({ "access_token": "access-100" }));
			then.status(403);
		})
		.await;
	let fresh = server
		.mock_async(|when, then| {
			when.method(PUT)
				.path(member_path("100"))
				.json_body(json!({ "access_token": "access-100-new" }));
			then.status(201);
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("access-100-new", "refresh-100-new", "identify guilds.join"));
		})
		.await;

	let report = broker.reconcile(&HashSet::new(), [user("100")], &NoopProgress).await;

	stale.assert_async().await;
	fresh.assert_async().await;

	assert_eq!(report.progress.joined(), &[user("100")]);

	let stored = store
		.get(&user("100"))
		.await
		.expect("Store read should succeed.")
		.expect("Refreshed record should remain.");

	assert_eq!(stored.access_token.expose(), "access-100-new");
}

#[tokio::test]
async fn join_all_reads_every_roster_page() {
	let server = MockServer::start_async().await;
	let (broker, store) = build_broker(descriptor_with_page_limit(&server, 2));

	for id in ["100", "200", "300", "400"] {
		seed(&store, id).await;
	}

	let first_page = server
		.mock_async(|when, then| {
			when.method(GET)
				.path(members_path())
				.query_param("limit", "2")
				.query_param_missing("after");
			then.status(200).json_body(json!([
				{ "user": { "id": "100", "username": "a" } },
				{ "user": { "id": "200", "username": "b" } },
			]));
		})
		.await;
	let second_page = server
		.mock_async(|when, then| {
			when.method(GET)
				.path(members_path())
				.query_param("limit", "2")
				.query_param("after", "200");
			then.status(200).json_body(json!([{ "user": { "id": "300", "username": "c" } }]));
		})
		.await;
	let join = mock_join(&server, "400", 201).await;
	let plan = broker.plan_join_all().await.expect("Planning should succeed.");

	assert_eq!(plan.guild_members, 3);
	assert_eq!(plan.stored_members, 4);
	assert_eq!(plan.plan.candidates(), &[user("400")]);

	let report = broker.join_all(&NoopProgress).await.expect("Join run should succeed.");

	first_page.assert_calls_async(2).await;
	second_page.assert_calls_async(2).await;
	join.assert_async().await;

	assert_eq!(report.progress.joined(), &[user("400")]);
}

#[tokio::test]
async fn join_all_fails_when_the_roster_is_unreadable() {
	let server = MockServer::start_async().await;
	let (broker, store) = build_broker(descriptor(&server));

	seed(&store, "100").await;
	server
		.mock_async(|when, then| {
			when.method(GET).path(members_path());
			then.status(401).json_body(json!({ "message": "401: Unauthorized", "code": 0 }));
		})
		.await;

	let join = mock_join(&server, "100", 201).await;
	let err = broker.join_all(&NoopProgress).await.expect_err("Roster failure must abort.");

	join.assert_calls_async(0).await;

	assert!(matches!(err, Error::Unauthorized { .. }));
}

#[tokio::test]
async fn empty_roster_difference_makes_no_calls() {
	let server = MockServer::start_async().await;
	let (broker, store) = build_broker(descriptor(&server));

	seed(&store, "100").await;
	mock_roster(&server, &["100"]).await;

	let join = mock_join(&server, "100", 201).await;
	let report = broker.join_all(&NoopProgress).await.expect("Join run should succeed.");

	join.assert_calls_async(0).await;

	assert_eq!(report, ReconcileReport::default());
}
