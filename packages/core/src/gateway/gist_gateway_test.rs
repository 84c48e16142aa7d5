//! Tests for GistGateway
//!
//! Tests cover:
//! - Endpoint shapes and request bodies
//! - Authentication, connectivity and validation pre-checks
//! - Transport rebuild on token change
//! - Rate-limit state transitions and fail-fast behavior
//! - Status code mapping

#[cfg(test)]
mod tests {
    use crate::config::GatewayConfig;
    use crate::error::GistError;
    use crate::gateway::{
        FakeGitHub, GistGateway, HttpMethod, ManualClock, ManualConnectivity, RateLimitHeaders,
        RateLimitState, ScriptedFailure, SharedToken,
    };
    use crate::models::GistPatch;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use indexmap::IndexMap;
    use serde_json::json;
    use std::sync::Arc;

    struct TestEnv {
        server: FakeGitHub,
        tokens: Arc<SharedToken>,
        connectivity: Arc<ManualConnectivity>,
        clock: Arc<ManualClock>,
        gateway: GistGateway,
    }

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    /// Helper to create a gateway wired to a fake server, signed in as "gho_one"
    fn create_test_env() -> TestEnv {
        let server = FakeGitHub::new();
        let tokens = Arc::new(SharedToken::new());
        tokens.sign_in("gho_one");
        let connectivity = Arc::new(ManualConnectivity::new(true));
        let clock = Arc::new(ManualClock::new(t0()));

        let gateway = GistGateway::new(
            GatewayConfig::default(),
            tokens.clone(),
            Arc::new(server.clone()),
        )
        .with_connectivity(connectivity.clone())
        .with_clock(clock.clone());

        TestEnv {
            server,
            tokens,
            connectivity,
            clock,
            gateway,
        }
    }

    fn files(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    // =========================================================================
    // Endpoints
    // =========================================================================

    #[tokio::test]
    async fn test_get_user_gists_requests_100_per_page() {
        let env = create_test_env();
        env.server.seed_gist(Some("one"), &[("a.md", "A")]);
        env.server.seed_gist(Some("two"), &[("b.md", "B")]);

        let gists = env.gateway.get_user_gists().await.unwrap();
        assert_eq!(gists.len(), 2);

        let requests = env.server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, HttpMethod::Get);
        assert_eq!(requests[0].path, "/gists");
        assert_eq!(
            requests[0].query,
            vec![("per_page".to_string(), "100".to_string())]
        );
        assert_eq!(requests[0].token, "gho_one");
    }

    #[tokio::test]
    async fn test_create_gist_body_shape() {
        let env = create_test_env();

        let gist = env
            .gateway
            .create_gist("Groceries", files(&[("Groceries.md", "- milk")]), false)
            .await
            .unwrap();

        assert_eq!(gist.description.as_deref(), Some("Groceries"));
        assert!(!gist.public);
        assert_eq!(
            gist.files["Groceries.md"].content.as_deref(),
            Some("- milk")
        );

        let request = &env.server.requests()[0];
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.path, "/gists");
        assert_eq!(
            request.body,
            Some(json!({
                "description": "Groceries",
                "public": false,
                "files": { "Groceries.md": { "content": "- milk" } }
            }))
        );
    }

    #[tokio::test]
    async fn test_create_gist_with_no_files_fails_before_any_io() {
        let env = create_test_env();
        env.tokens.sign_out();

        let err = env
            .gateway
            .create_gist("Empty", IndexMap::new(), false)
            .await
            .unwrap_err();

        assert!(matches!(err, GistError::ValidationError(_)));
        assert_eq!(env.server.request_count(), 0);
    }

    #[tokio::test]
    async fn test_update_gist_sends_null_for_deleted_file_and_omits_unset_fields() {
        let env = create_test_env();
        let gist = env
            .server
            .seed_gist(Some("Desc"), &[("Old.md", "old"), ("Keep.md", "k")]);

        let patch = GistPatch::new().delete("Old.md").keep("New.md", "new");
        let updated = env.gateway.update_gist(&gist.id, &patch).await.unwrap();

        assert!(!updated.files.contains_key("Old.md"));
        assert_eq!(updated.files["New.md"].content.as_deref(), Some("new"));
        assert_eq!(updated.description.as_deref(), Some("Desc"));

        let request = &env.server.requests()[0];
        assert_eq!(request.method, HttpMethod::Patch);
        assert_eq!(request.path, format!("/gists/{}", gist.id));
        assert_eq!(
            request.body,
            Some(json!({
                "files": { "Old.md": null, "New.md": { "content": "new" } }
            }))
        );
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let env = create_test_env();
        let gist = env.server.seed_gist(None, &[("a.md", "A")]);

        env.gateway.delete_gist(&gist.id).await.unwrap();
        let err = env.gateway.get_gist(&gist.id).await.unwrap_err();

        assert_eq!(err, GistError::not_found(&gist.id));
        assert_eq!(env.server.gist_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_gist_id_rejected() {
        let env = create_test_env();
        assert!(matches!(
            env.gateway.get_gist("  ").await,
            Err(GistError::ValidationError(_))
        ));
        assert!(matches!(
            env.gateway.get_gist("a/b").await,
            Err(GistError::ValidationError(_))
        ));
        assert_eq!(env.server.request_count(), 0);
    }

    // =========================================================================
    // Pre-checks
    // =========================================================================

    #[tokio::test]
    async fn test_no_token_is_not_authenticated() {
        let env = create_test_env();
        env.tokens.sign_out();

        let err = env.gateway.get_user_gists().await.unwrap_err();

        assert_eq!(err, GistError::NotAuthenticated);
        assert_eq!(env.server.request_count(), 0);
        assert_eq!(env.server.transports_built(), 0);
    }

    #[tokio::test]
    async fn test_blank_token_is_not_authenticated() {
        let env = create_test_env();
        env.tokens.sign_in("   ");

        assert_eq!(
            env.gateway.get_user_gists().await.unwrap_err(),
            GistError::NotAuthenticated
        );
    }

    #[tokio::test]
    async fn test_offline_fails_without_request() {
        let env = create_test_env();
        env.connectivity.set_online(false);

        let err = env.gateway.get_user_gists().await.unwrap_err();
        assert_eq!(err, GistError::Offline);
        assert_eq!(env.server.request_count(), 0);

        env.connectivity.set_online(true);
        assert!(env.gateway.get_user_gists().await.is_ok());
    }

    // =========================================================================
    // Token changes
    // =========================================================================

    #[tokio::test]
    async fn test_same_token_reuses_transport() {
        let env = create_test_env();

        env.gateway.get_user_gists().await.unwrap();
        env.gateway.get_user_gists().await.unwrap();

        assert_eq!(env.server.transports_built(), 1);
    }

    #[tokio::test]
    async fn test_token_change_rebuilds_transport() {
        let env = create_test_env();

        env.gateway.get_user_gists().await.unwrap();
        env.tokens.sign_in("gho_two");
        env.gateway.get_user_gists().await.unwrap();
        env.gateway.get_user_gists().await.unwrap();

        assert_eq!(env.server.transports_built(), 2);
        let tokens: Vec<String> = env.server.requests().into_iter().map(|r| r.token).collect();
        assert_eq!(tokens, vec!["gho_one", "gho_two", "gho_two"]);
    }

    #[tokio::test]
    async fn test_concurrent_first_calls_build_one_transport() {
        let env = create_test_env();
        let gateway = Arc::new(env.gateway);

        let (a, b, c) = tokio::join!(
            gateway.get_user_gists(),
            gateway.get_user_gists(),
            gateway.get_user_gists()
        );

        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(env.server.transports_built(), 1);
        assert_eq!(env.server.request_count(), 3);
    }

    // =========================================================================
    // Rate limiting
    // =========================================================================

    #[tokio::test]
    async fn test_exhausted_quota_blocks_until_reset() {
        let env = create_test_env();
        let reset = t0() + Duration::seconds(60);
        env.server.set_quota(5000, 1, reset);

        // Last request of the window succeeds and reports remaining = 0
        env.gateway.get_user_gists().await.unwrap();
        assert_eq!(
            env.gateway.rate_limit_state(),
            RateLimitState::Limited { reset_at: reset }
        );

        let sent = env.server.request_count();
        env.clock.advance(Duration::seconds(15));
        let err = env.gateway.get_user_gists().await.unwrap_err();
        assert_eq!(
            err,
            GistError::RateLimited {
                retry_after_secs: 45
            }
        );
        assert!(env.gateway.get_gist("anything").await.is_err());
        assert!(env
            .gateway
            .create_gist("x", files(&[("x.md", "x")]), false)
            .await
            .is_err());
        assert_eq!(env.server.request_count(), sent);

        // Window reopens
        env.clock.set(reset + Duration::seconds(1));
        env.server
            .set_quota(5000, 5000, reset + Duration::hours(1));
        assert!(env.gateway.get_user_gists().await.is_ok());
        assert_eq!(env.gateway.rate_limit_state(), RateLimitState::Normal);
    }

    #[tokio::test]
    async fn test_rate_limit_status_available_while_limited() {
        let env = create_test_env();
        let reset = t0() + Duration::seconds(60);
        env.server.set_quota(5000, 1, reset);
        env.gateway.get_user_gists().await.unwrap();
        assert!(env.gateway.rate_limit_state().is_limited());

        let status = env.gateway.get_rate_limit_status().await.unwrap();

        assert_eq!(status.remaining, 0);
        assert_eq!(status.limit, 5000);
        assert_eq!(status.reset, reset);
        assert_eq!(env.server.requests().last().unwrap().path, "/rate_limit");
    }

    #[tokio::test]
    async fn test_rate_limit_status_with_zero_remaining_enters_limited() {
        let env = create_test_env();
        let reset = t0() + Duration::seconds(300);
        env.server.set_quota(60, 0, reset);

        env.gateway.get_rate_limit_status().await.unwrap();

        assert_eq!(
            env.gateway.rate_limit_state(),
            RateLimitState::Limited { reset_at: reset }
        );
    }

    #[tokio::test]
    async fn test_429_with_retry_after() {
        let env = create_test_env();
        env.server.fail_next(ScriptedFailure {
            status: 429,
            message: "You have exceeded a secondary rate limit".to_string(),
            rate_limit: RateLimitHeaders {
                retry_after: Some(30),
                ..Default::default()
            },
        });

        let err = env.gateway.get_user_gists().await.unwrap_err();
        assert_eq!(
            err,
            GistError::RateLimited {
                retry_after_secs: 30
            }
        );

        let sent = env.server.request_count();
        assert!(matches!(
            env.gateway.get_user_gists().await,
            Err(GistError::RateLimited { .. })
        ));
        assert_eq!(env.server.request_count(), sent);
    }

    #[tokio::test]
    async fn test_403_on_exhausted_quota() {
        let env = create_test_env();
        let reset = t0() + Duration::seconds(120);
        env.server.set_quota(5000, 0, reset);

        let err = env.gateway.get_user_gists().await.unwrap_err();

        assert_eq!(
            err,
            GistError::RateLimited {
                retry_after_secs: 120
            }
        );
        assert!(env.gateway.rate_limit_state().is_limited());
    }

    #[tokio::test]
    async fn test_403_without_rate_limit_signal_is_remote_error() {
        let env = create_test_env();
        env.server.fail_next(ScriptedFailure {
            status: 403,
            message: "Resource not accessible by integration".to_string(),
            rate_limit: RateLimitHeaders::default(),
        });

        let err = env.gateway.get_user_gists().await.unwrap_err();

        assert_eq!(
            err,
            GistError::remote(403, "Resource not accessible by integration")
        );
        assert_eq!(env.gateway.rate_limit_state(), RateLimitState::Normal);
    }

    // =========================================================================
    // Status mapping
    // =========================================================================

    #[tokio::test]
    async fn test_401_maps_to_not_authenticated() {
        let env = create_test_env();
        env.server.accept_only_token("gho_other");

        assert_eq!(
            env.gateway.get_user_gists().await.unwrap_err(),
            GistError::NotAuthenticated
        );
    }

    #[tokio::test]
    async fn test_server_error_carries_status_and_message() {
        let env = create_test_env();
        env.server.fail_next(ScriptedFailure {
            status: 502,
            message: "Server Error".to_string(),
            rate_limit: RateLimitHeaders::default(),
        });

        assert_eq!(
            env.gateway.get_user_gists().await.unwrap_err(),
            GistError::remote(502, "Server Error")
        );
    }

    #[tokio::test]
    async fn test_404_on_listing_is_remote_error_not_gist_not_found() {
        let env = create_test_env();
        env.server.fail_next(ScriptedFailure {
            status: 404,
            message: "Not Found".to_string(),
            rate_limit: RateLimitHeaders::default(),
        });

        assert_eq!(
            env.gateway.get_user_gists().await.unwrap_err(),
            GistError::remote(404, "Not Found")
        );
    }

    #[tokio::test]
    async fn test_huge_retry_after_limits_without_panicking() {
        let env = create_test_env();
        env.server.fail_next(ScriptedFailure {
            status: 429,
            message: "slow down".to_string(),
            rate_limit: RateLimitHeaders {
                retry_after: Some(10_000_000_000_000),
                ..RateLimitHeaders::default()
            },
        });

        let err = env.gateway.get_user_gists().await.unwrap_err();

        assert!(matches!(err, GistError::RateLimited { .. }));
        assert!(env.gateway.rate_limit_state().is_limited());
    }

    #[tokio::test]
    async fn test_422_maps_to_validation_error() {
        let env = create_test_env();
        let gist = env.server.seed_gist(None, &[("only.md", "x")]);

        let err = env
            .gateway
            .update_gist(&gist.id, &GistPatch::new().delete("only.md"))
            .await
            .unwrap_err();

        assert!(matches!(err, GistError::ValidationError(_)));
    }
}
