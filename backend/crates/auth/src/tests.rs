//! Crate-level tests
//!
//! Exercise the login state machine, two-factor enrollment and the request
//! gate end to end against an in-memory credential directory.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use axum::routing::get;
use axum::{Extension, Router};
use tower::ServiceExt;

use platform::password::ClearTextPassword;

use crate::application::{AuthConfig, AuthenticateInput, AuthenticateUseCase, TokenService, TwoFactorEnrollment};
use crate::domain::directory::CredentialDirectory;
use crate::domain::entity::credential::Credential;
use crate::domain::value_object::{role::Role, totp_secret::TotpSecret, user_name::UserName};
use crate::error::{AuthError, AuthResult};
use crate::presentation::middleware::{AuthenticatedUser, GateState, request_gate};
use crate::presentation::policy::{Access, RoutePolicy, RouteRule};

// ============================================================================
// In-memory credential directory
// ============================================================================

#[derive(Clone, Default)]
struct MemoryDirectory {
    records: Arc<Mutex<HashMap<String, Credential>>>,
}

impl MemoryDirectory {
    fn insert(&self, credential: Credential) {
        self.records
            .lock()
            .unwrap()
            .insert(credential.username.canonical().to_string(), credential);
    }

    fn get(&self, username: &str) -> Option<Credential> {
        self.records.lock().unwrap().get(username).cloned()
    }
}

impl CredentialDirectory for MemoryDirectory {
    async fn find_by_username(&self, username: &UserName) -> AuthResult<Option<Credential>> {
        Ok(self.get(username.canonical()))
    }

    async fn save_totp_secret(&self, username: &UserName, secret: &TotpSecret) -> AuthResult<()> {
        let mut records = self.records.lock().unwrap();
        let credential = records
            .get_mut(username.canonical())
            .ok_or(AuthError::InvalidCredentials)?;
        credential.totp_secret = Some(secret.clone());
        credential.two_factor_enabled = false;
        Ok(())
    }

    async fn set_two_factor_enabled(&self, username: &UserName, enabled: bool) -> AuthResult<()> {
        let mut records = self.records.lock().unwrap();
        let credential = records
            .get_mut(username.canonical())
            .ok_or(AuthError::InvalidCredentials)?;
        if credential.totp_secret.is_none() {
            return Err(AuthError::TwoFactorNotEnrolled);
        }
        credential.two_factor_enabled = enabled;
        Ok(())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

const PASSWORD: &str = "CorrectHorse9!";

fn credential(username: &str, roles: Vec<Role>) -> Credential {
    let hash = ClearTextPassword::new(PASSWORD.to_string())
        .unwrap()
        .hash(None)
        .unwrap();
    Credential::new(UserName::new(username).unwrap(), hash, roles)
}

struct Harness {
    directory: Arc<MemoryDirectory>,
    tokens: TokenService,
    config: Arc<AuthConfig>,
}

impl Harness {
    fn new() -> Self {
        let config = Arc::new(AuthConfig::with_random_key());
        Self {
            directory: Arc::new(MemoryDirectory::default()),
            tokens: TokenService::new(config.clone()),
            config,
        }
    }

    fn authenticate_use_case(&self) -> AuthenticateUseCase<MemoryDirectory> {
        AuthenticateUseCase::new(self.directory.clone(), self.tokens.clone(), self.config.clone())
    }

    fn enrollment(&self) -> TwoFactorEnrollment<MemoryDirectory> {
        TwoFactorEnrollment::new(self.directory.clone())
    }

    async fn login(&self, username: &str, password: &str, code: Option<&str>) -> AuthResult<String> {
        self.authenticate_use_case()
            .execute(AuthenticateInput {
                username: username.to_string(),
                password: password.to_string(),
                two_factor_code: code.map(str::to_string),
            })
            .await
    }
}

// ============================================================================
// Login state machine
// ============================================================================

mod authenticate_tests {
    use super::*;

    #[tokio::test]
    async fn test_login_issues_valid_token() {
        let h = Harness::new();
        h.directory.insert(credential("alice", vec![Role::User]));

        let jwt = h.login("alice", PASSWORD, None).await.unwrap();

        let claims = h.tokens.validate(&jwt).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.roles, vec![Role::User]);
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn test_login_is_case_insensitive_on_username() {
        let h = Harness::new();
        h.directory.insert(credential("Alice", vec![Role::User]));

        let jwt = h.login("ALICE", PASSWORD, None).await.unwrap();
        let claims = h.tokens.validate(&jwt).unwrap();
        assert_eq!(claims.sub, "alice");
    }

    #[tokio::test]
    async fn test_credential_failures_are_indistinguishable() {
        let h = Harness::new();
        h.directory.insert(credential("alice", vec![Role::User]));

        let mut inactive = credential("bob", vec![Role::User]);
        inactive.is_active = false;
        h.directory.insert(inactive);

        let unknown_user = h.login("mallory", PASSWORD, None).await.unwrap_err();
        let wrong_password = h.login("alice", "WrongPassword1!", None).await.unwrap_err();
        let inactive_account = h.login("bob", PASSWORD, None).await.unwrap_err();
        let unparseable = h.login("!!", PASSWORD, None).await.unwrap_err();

        for err in [unknown_user, wrong_password, inactive_account, unparseable] {
            assert!(matches!(err, AuthError::InvalidCredentials));
            assert_eq!(err.to_string(), "Invalid username or password");
        }
    }

    #[tokio::test]
    async fn test_unknown_user_pays_a_hash_verification() {
        // Latency must not reveal whether a username exists: the lookup
        // miss runs a dummy Argon2 verification, so an unknown user costs
        // roughly the same as a known user with a wrong password.
        let h = Harness::new();
        h.directory.insert(credential("alice", vec![Role::User]));

        // Warm up the lazily built dummy hash
        let _ = h.login("mallory", PASSWORD, None).await;

        let start = std::time::Instant::now();
        for _ in 0..3 {
            let _ = h.login("alice", "WrongPassword1!", None).await;
        }
        let known_user = start.elapsed();

        let start = std::time::Instant::now();
        for _ in 0..3 {
            let _ = h.login("mallory", PASSWORD, None).await;
        }
        let unknown_user = start.elapsed();

        // Generous bound: without the dummy verification the unknown-user
        // path is orders of magnitude faster and fails this easily
        assert!(
            unknown_user * 5 > known_user,
            "unknown-user path returned too quickly (known={known_user:?}, unknown={unknown_user:?})"
        );
    }

    #[tokio::test]
    async fn test_account_without_roles_cannot_login() {
        let h = Harness::new();
        h.directory.insert(credential("alice", vec![]));

        let err = h.login("alice", PASSWORD, None).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_two_factor_gate() {
        let h = Harness::new();
        let mut cred = credential("alice", vec![Role::User]);
        let secret = cred.enroll_totp();
        cred.enable_two_factor();
        h.directory.insert(cred);

        // Correct password, no code: the caller must be told to prompt
        let err = h.login("alice", PASSWORD, None).await.unwrap_err();
        assert!(matches!(err, AuthError::TwoFactorRequired));

        // Empty code counts as absent
        let err = h.login("alice", PASSWORD, Some("")).await.unwrap_err();
        assert!(matches!(err, AuthError::TwoFactorRequired));

        // A wrong code is a distinct failure
        let err = h.login("alice", PASSWORD, Some("000000")).await.unwrap_err();
        assert!(matches!(err, AuthError::TwoFactorInvalid));

        // The current code succeeds
        let code = secret.generate_current("alice").unwrap();
        let jwt = h.login("alice", PASSWORD, Some(&code)).await.unwrap();
        assert!(h.tokens.validate(&jwt).is_ok());
    }

    #[tokio::test]
    async fn test_wrong_password_beats_two_factor_check() {
        // The password is checked before the 2FA gate, so a wrong password
        // with a valid code still reads as bad credentials.
        let h = Harness::new();
        let mut cred = credential("alice", vec![Role::User]);
        let secret = cred.enroll_totp();
        cred.enable_two_factor();
        h.directory.insert(cred);

        let code = secret.generate_current("alice").unwrap();
        let err = h
            .login("alice", "WrongPassword1!", Some(&code))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_unconfirmed_enrollment_does_not_gate_login() {
        let h = Harness::new();
        h.directory.insert(credential("alice", vec![Role::User]));

        h.enrollment()
            .enroll(&UserName::new("alice").unwrap())
            .await
            .unwrap();

        // Secret stored but not confirmed: password alone still works
        assert!(h.login("alice", PASSWORD, None).await.is_ok());
    }
}

// ============================================================================
// Two-factor enrollment
// ============================================================================

mod enrollment_tests {
    use super::*;

    #[tokio::test]
    async fn test_enroll_then_confirm_enables_two_factor() {
        let h = Harness::new();
        h.directory.insert(credential("alice", vec![Role::User]));
        let alice = UserName::new("alice").unwrap();

        let output = h.enrollment().enroll(&alice).await.unwrap();
        assert!(output.otpauth_url.starts_with("otpauth://totp/"));
        assert!(output.otpauth_url.contains(&output.secret_base32));

        let secret = TotpSecret::from_base32(output.secret_base32).unwrap();
        let code = secret.generate_current("alice").unwrap();
        h.enrollment().confirm(&alice, &code).await.unwrap();

        let stored = h.directory.get("alice").unwrap();
        assert!(stored.requires_two_factor());
    }

    #[tokio::test]
    async fn test_confirm_with_wrong_code_leaves_two_factor_off() {
        let h = Harness::new();
        h.directory.insert(credential("alice", vec![Role::User]));
        let alice = UserName::new("alice").unwrap();

        h.enrollment().enroll(&alice).await.unwrap();
        let err = h.enrollment().confirm(&alice, "000000").await.unwrap_err();
        assert!(matches!(err, AuthError::TwoFactorInvalid));

        assert!(!h.directory.get("alice").unwrap().requires_two_factor());
    }

    #[tokio::test]
    async fn test_is_enrolled_tracks_confirmation() {
        let h = Harness::new();
        h.directory.insert(credential("alice", vec![Role::User]));
        let alice = UserName::new("alice").unwrap();

        assert!(!h.enrollment().is_enrolled(&alice).await.unwrap());

        let output = h.enrollment().enroll(&alice).await.unwrap();
        assert!(!h.enrollment().is_enrolled(&alice).await.unwrap());

        let secret = TotpSecret::from_base32(output.secret_base32).unwrap();
        let code = secret.generate_current("alice").unwrap();
        h.enrollment().confirm(&alice, &code).await.unwrap();
        assert!(h.enrollment().is_enrolled(&alice).await.unwrap());
    }

    #[tokio::test]
    async fn test_confirm_without_enrollment() {
        let h = Harness::new();
        h.directory.insert(credential("alice", vec![Role::User]));

        let err = h
            .enrollment()
            .confirm(&UserName::new("alice").unwrap(), "123456")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TwoFactorNotEnrolled));
    }

    #[tokio::test]
    async fn test_reenrollment_disables_until_reconfirmed() {
        let h = Harness::new();
        let mut cred = credential("alice", vec![Role::User]);
        cred.enroll_totp();
        cred.enable_two_factor();
        h.directory.insert(cred);
        let alice = UserName::new("alice").unwrap();

        let output = h.enrollment().enroll(&alice).await.unwrap();

        let stored = h.directory.get("alice").unwrap();
        assert!(!stored.requires_two_factor());
        assert_eq!(
            stored.totp_secret.unwrap().as_base32(),
            TotpSecret::from_base32(output.secret_base32)
                .unwrap()
                .as_base32()
        );
    }
}

// ============================================================================
// Request gate
// ============================================================================

mod gate_tests {
    use super::*;

    fn policy() -> RoutePolicy {
        RoutePolicy::new(Access::Authenticated)
            .rule(RouteRule::new("/authenticate", Access::Public).with_method(Method::POST))
            .rule(RouteRule::new("/courses/*", Access::Public).with_method(Method::GET))
            .rule(RouteRule::new("/admin/*", Access::Role(Role::Admin)))
            .rule(RouteRule::new("/", Access::Public))
    }

    fn app(h: &Harness) -> Router {
        let state = GateState {
            directory: h.directory.clone(),
            tokens: h.tokens.clone(),
            policy: Arc::new(policy()),
        };

        async fn whoami(user: Option<Extension<AuthenticatedUser>>) -> String {
            match user {
                Some(Extension(user)) => user.username.canonical().to_string(),
                None => "anonymous".to_string(),
            }
        }

        Router::new()
            .route("/", get(|| async { "ok" }))
            .route("/courses", get(whoami))
            .route("/profile", get(whoami))
            .route("/admin/users", get(whoami))
            .layer(axum::middleware::from_fn(move |req, next| {
                let state = state.clone();
                async move { request_gate(state, req, next).await }
            }))
    }

    async fn send(app: Router, path: &str, bearer: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_public_routes_pass_without_token() {
        let h = Harness::new();
        let (status, _) = send(app(&h), "/", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(app(&h), "/courses", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let h = Harness::new();
        let (status, _) = send(app(&h), "/profile", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_token_attaches_identity() {
        let h = Harness::new();
        h.directory.insert(credential("alice", vec![Role::User]));
        let jwt = h.login("alice", PASSWORD, None).await.unwrap();

        let (status, body) = send(app(&h), "/profile", Some(&jwt)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "alice");

        // Identity also rides along on public routes
        let (status, body) = send(app(&h), "/courses", Some(&jwt)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "alice");
    }

    #[tokio::test]
    async fn test_tampered_token_is_rejected() {
        let h = Harness::new();
        h.directory.insert(credential("alice", vec![Role::User]));
        let jwt = h.login("alice", PASSWORD, None).await.unwrap();
        let flipped = if jwt.ends_with('x') { "y" } else { "x" };
        let tampered = format!("{}{}", &jwt[..jwt.len() - 1], flipped);

        let (status, _) = send(app(&h), "/profile", Some(&tampered)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // A bad token never downgrades to anonymous, even on a public route
        let (status, _) = send(app(&h), "/courses", Some(&tampered)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_route_enforces_role() {
        let h = Harness::new();
        h.directory.insert(credential("alice", vec![Role::User]));
        h.directory
            .insert(credential("root", vec![Role::User, Role::Admin]));

        let user_jwt = h.login("alice", PASSWORD, None).await.unwrap();
        let admin_jwt = h.login("root", PASSWORD, None).await.unwrap();

        let (status, _) = send(app(&h), "/admin/users", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(app(&h), "/admin/users", Some(&user_jwt)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(app(&h), "/admin/users", Some(&admin_jwt)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "root");
    }

    #[tokio::test]
    async fn test_deactivated_subject_loses_access_immediately() {
        let h = Harness::new();
        h.directory.insert(credential("alice", vec![Role::User]));
        let jwt = h.login("alice", PASSWORD, None).await.unwrap();

        let mut cred = h.directory.get("alice").unwrap();
        cred.is_active = false;
        h.directory.insert(cred);

        // The token is still validly signed and unexpired, but the subject
        // no longer resolves to a usable account.
        let (status, _) = send(app(&h), "/profile", Some(&jwt)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_role_change_reflected_without_reissuing_token() {
        let h = Harness::new();
        h.directory.insert(credential("alice", vec![Role::User]));
        let jwt = h.login("alice", PASSWORD, None).await.unwrap();

        let (status, _) = send(app(&h), "/admin/users", Some(&jwt)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let mut cred = h.directory.get("alice").unwrap();
        cred.roles.push(Role::Admin);
        h.directory.insert(cred);

        let (status, _) = send(app(&h), "/admin/users", Some(&jwt)).await;
        assert_eq!(status, StatusCode::OK);
    }
}

// ============================================================================
// HTTP surface
// ============================================================================

mod router_tests {
    use super::*;
    use crate::presentation::router::auth_router_generic;

    fn router(h: &Harness) -> Router {
        // Gate layered over the auth routes, as the application wires it
        let state = GateState {
            directory: h.directory.clone(),
            tokens: h.tokens.clone(),
            policy: Arc::new(
                RoutePolicy::new(Access::Authenticated)
                    .rule(RouteRule::new("/authenticate", Access::Public)),
            ),
        };

        auth_router_generic((*h.directory).clone(), h.tokens.clone(), h.config.clone()).layer(
            axum::middleware::from_fn(move |req, next| {
                let state = state.clone();
                async move { request_gate(state, req, next).await }
            }),
        )
    }

    async fn post_json(
        app: Router,
        path: &str,
        bearer: Option<&str>,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = app
            .oneshot(builder.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_authenticate_endpoint() {
        let h = Harness::new();
        h.directory.insert(credential("alice", vec![Role::User]));

        let (status, body) = post_json(
            router(&h),
            "/authenticate",
            None,
            serde_json::json!({"username": "alice", "password": PASSWORD}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let jwt = body["jwt"].as_str().unwrap();
        assert_eq!(h.tokens.validate(jwt).unwrap().sub, "alice");
    }

    #[tokio::test]
    async fn test_authenticate_rejects_bad_credentials_with_401() {
        let h = Harness::new();
        h.directory.insert(credential("alice", vec![Role::User]));

        let (status, body) = post_json(
            router(&h),
            "/authenticate",
            None,
            serde_json::json!({"username": "alice", "password": "WrongPassword1!"}),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid username or password");
    }

    #[tokio::test]
    async fn test_two_factor_round_trip_over_http() {
        let h = Harness::new();
        h.directory.insert(credential("alice", vec![Role::User]));
        let jwt = h.login("alice", PASSWORD, None).await.unwrap();

        // Setup requires authentication
        let (status, _) =
            post_json(router(&h), "/setup-2fa", None, serde_json::Value::Null).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = post_json(
            router(&h),
            "/setup-2fa",
            Some(&jwt),
            serde_json::Value::Null,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let secret = TotpSecret::from_base32(body["secret"].as_str().unwrap()).unwrap();
        assert!(
            body["otpauthUrl"]
                .as_str()
                .unwrap()
                .starts_with("otpauth://totp/")
        );

        // Wrong code does not enable 2FA
        let (status, _) = post_json(
            router(&h),
            "/verify-2fa",
            Some(&jwt),
            serde_json::json!({"token": "000000"}),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(!h.directory.get("alice").unwrap().requires_two_factor());

        // Correct code flips the flag
        let code = secret.generate_current("alice").unwrap();
        let (status, _) = post_json(
            router(&h),
            "/verify-2fa",
            Some(&jwt),
            serde_json::json!({"token": code}),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(h.directory.get("alice").unwrap().requires_two_factor());

        // Subsequent logins now demand a code
        let err = h.login("alice", PASSWORD, None).await.unwrap_err();
        assert!(matches!(err, AuthError::TwoFactorRequired));
    }
}
