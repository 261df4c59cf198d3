use lazy_static::lazy_static;
use rand::{rngs::OsRng, RngCore};
use regex::Regex;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        claims::Identity,
        dto::{ForgotPasswordRequest, LoginRequest, RegisterRequest},
        jwt::JwtKeys,
        password::{hash_secret, verify_secret},
        repo_types::{NewUser, Role, User},
    },
    error::{ensure_valid, AppError, AppResult, FieldError},
    mail::reset_email,
    state::AppState,
};

pub const MIN_PASSWORD_LEN: usize = 8;
const RESET_TOKEN_BYTES: usize = 32;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref PHONE_RE: Regex = Regex::new(r"^\d{10}$").unwrap();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn check_name(field: &str, label: &str, value: &str, errors: &mut Vec<FieldError>) {
    let len = value.chars().count();
    if len == 0 {
        errors.push(FieldError::new(field, format!("{label} is required")));
    } else if len < 2 {
        errors.push(FieldError::new(field, format!("{label} must be at least 2 characters")));
    } else if len > 30 {
        errors.push(FieldError::new(field, format!("{label} cannot exceed 30 characters")));
    }
}

fn check_password(password: &str, errors: &mut Vec<FieldError>) {
    if password.is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
}

/// Creates a user with hashed password and answer.
pub async fn register(st: &AppState, req: RegisterRequest) -> AppResult<User> {
    let first_name = req.first_name.trim().to_string();
    let last_name = req.last_name.trim().to_string();
    let email = normalize_email(&req.email);
    let phone = req.phone.trim().to_string();

    let mut errors = Vec::new();
    check_name("firstName", "First name", &first_name, &mut errors);
    check_name("lastName", "Last name", &last_name, &mut errors);
    if email.is_empty() {
        errors.push(FieldError::new("email", "Email is required"));
    } else if !is_valid_email(&email) {
        errors.push(FieldError::new("email", "Please provide a valid email address"));
    }
    check_password(&req.password, &mut errors);
    if !PHONE_RE.is_match(&phone) {
        errors.push(FieldError::new("phone", "Phone number must be exactly 10 digits"));
    }
    let role = match req.role.as_deref().map(str::trim) {
        None | Some("") => Some(Role::default()),
        Some(raw) => Role::parse(raw),
    };
    if role.is_none() {
        errors.push(FieldError::new("role", "Role must be user, content_creator or admin"));
    }
    if req.answer.trim().is_empty() {
        errors.push(FieldError::new("answer", "Security answer is required"));
    }
    ensure_valid(errors)?;

    let new = NewUser {
        first_name,
        last_name,
        email,
        password_hash: hash_secret(&req.password)?,
        phone,
        role: role.unwrap_or_default(),
        answer_hash: hash_secret(&req.answer)?,
    };
    let user = st.users.create(new).await.map_err(|e| {
        if matches!(e, AppError::DuplicateIdentity) {
            warn!("email already registered");
        }
        e
    })?;
    info!(user_id = %user.id, "user registered");
    Ok(user)
}

/// Unknown email and wrong password are indistinguishable to the caller.
pub async fn verify_credentials(st: &AppState, email: &str, password: &str) -> AppResult<User> {
    let email = normalize_email(email);
    let Some(user) = st.users.find_by_email(&email).await? else {
        warn!("login for unknown email");
        return Err(AppError::InvalidCredentials);
    };
    if !verify_secret(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with invalid password");
        return Err(AppError::InvalidCredentials);
    }
    Ok(user)
}

/// Verifies credentials and issues a session token.
pub async fn login(st: &AppState, req: LoginRequest) -> AppResult<(String, User)> {
    let user = verify_credentials(st, &req.email, &req.password).await?;
    let token = JwtKeys::from(&st.config.jwt).sign_session(&Identity::from(&user))?;
    info!(user_id = %user.id, "user logged in");
    Ok((token, user))
}

/// Rehashes the password; any pending reset token is dropped with it.
pub async fn set_password(st: &AppState, user_id: Uuid, plain: &str) -> AppResult<()> {
    let mut errors = Vec::new();
    check_password(plain, &mut errors);
    ensure_valid(errors)?;
    let hash = hash_secret(plain)?;
    st.users.update_password(user_id, &hash).await
}

fn random_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Stores a fresh reset token on the user and returns it.
pub async fn issue_reset_token(st: &AppState, user: &User, now: OffsetDateTime) -> AppResult<String> {
    let token = random_token();
    let expires_at = now + TimeDuration::minutes(st.config.reset_ttl_minutes);
    st.users.set_reset_token(user.id, &token, expires_at).await?;
    Ok(token)
}

pub async fn verify_reset_token(st: &AppState, token: &str, now: OffsetDateTime) -> AppResult<User> {
    if token.is_empty() {
        return Err(AppError::InvalidOrExpiredToken);
    }
    let user = st
        .users
        .find_by_reset_token(token)
        .await?
        .ok_or(AppError::InvalidOrExpiredToken)?;
    match user.reset_token_expires_at {
        Some(expires_at) if expires_at > now => Ok(user),
        _ => {
            warn!(user_id = %user.id, "expired reset token presented; clearing it");
            st.users.clear_reset_token(user.id).await?;
            Err(AppError::InvalidOrExpiredToken)
        }
    }
}

/// Issues a reset token when email and answer match, then mails the link.
/// Mail failures are logged only; the token stays valid either way.
pub async fn request_password_reset(
    st: &AppState,
    req: ForgotPasswordRequest,
    now: OffsetDateTime,
) -> AppResult<()> {
    let email = normalize_email(&req.email);
    let not_found = || AppError::NotFound("User not found".into());

    let user = st.users.find_by_email(&email).await?.ok_or_else(not_found)?;
    if req.answer.is_empty() || !verify_secret(&req.answer, &user.answer_hash)? {
        warn!(user_id = %user.id, "reset requested with wrong answer");
        return Err(not_found());
    }

    let token = issue_reset_token(st, &user, now).await?;
    let mail = reset_email(&st.config.mail, &user.email, &token, st.config.reset_ttl_minutes);
    match st.mailer.send(mail).await {
        Ok(()) => info!(user_id = %user.id, "reset link sent"),
        Err(e) => error!(error = ?e, user_id = %user.id, "reset mail dispatch failed"),
    }
    Ok(())
}

pub async fn reset_password(
    st: &AppState,
    token: &str,
    new_password: &str,
    now: OffsetDateTime,
) -> AppResult<()> {
    let mut errors = Vec::new();
    check_password(new_password, &mut errors);
    ensure_valid(errors)?;

    let user = verify_reset_token(st, token, now).await?;
    // claim the token before writing; a concurrent reset with it loses here
    let Some(user_id) = st.users.take_reset_token(token, now).await? else {
        warn!(user_id = %user.id, "reset token taken by a concurrent request");
        return Err(AppError::InvalidOrExpiredToken);
    };
    set_password(st, user_id, new_password).await?;
    info!(%user_id, "password reset");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::UserRepository;
    use crate::testing::{register_request, test_app};

    fn now() -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    #[tokio::test]
    async fn stored_password_is_hashed_and_login_succeeds() {
        let app = test_app();
        let user = register(&app.state, register_request("Ana@Example.com", None))
            .await
            .unwrap();
        assert_eq!(user.email, "ana@example.com");
        assert_ne!(user.password_hash, "supersecret1");
        assert_ne!(user.answer_hash, "blue");

        let (token, logged_in) = login(
            &app.state,
            LoginRequest {
                email: "ana@example.com".into(),
                password: "supersecret1".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(logged_in.id, user.id);
        let who = JwtKeys::from(&app.state.config.jwt).verify(&token).unwrap();
        assert_eq!(who.user_id, user.id);
        assert_eq!(who.role, Role::User);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_once_stored() {
        let app = test_app();
        register(&app.state, register_request("dup@example.com", None))
            .await
            .unwrap();
        let err = register(&app.state, register_request("DUP@example.com", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateIdentity));
        assert_eq!(app.users.len(), 1);
    }

    #[tokio::test]
    async fn bad_credentials_share_one_error() {
        let app = test_app();
        register(&app.state, register_request("ana@example.com", None))
            .await
            .unwrap();
        let wrong_password = verify_credentials(&app.state, "ana@example.com", "nope-nope")
            .await
            .unwrap_err();
        let unknown = verify_credentials(&app.state, "bob@example.com", "supersecret1")
            .await
            .unwrap_err();
        assert!(matches!(wrong_password, AppError::InvalidCredentials));
        assert!(matches!(unknown, AppError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn registration_reports_each_bad_field() {
        let app = test_app();
        let req = RegisterRequest {
            first_name: "A".into(),
            last_name: "Lopez".into(),
            email: "not-an-email".into(),
            password: "short".into(),
            phone: "12345".into(),
            role: Some("wizard".into()),
            answer: "".into(),
        };
        let Err(AppError::Validation(errors)) = register(&app.state, req).await else {
            panic!("expected validation error");
        };
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["firstName", "email", "password", "phone", "role", "answer"]);
        assert_eq!(app.users.len(), 0);
    }

    #[tokio::test]
    async fn reset_token_expires_after_an_hour() {
        let app = test_app();
        let user = register(&app.state, register_request("ana@example.com", None))
            .await
            .unwrap();
        let issued = now();
        let token = issue_reset_token(&app.state, &user, issued).await.unwrap();
        assert_eq!(token.len(), 64);

        let ok = verify_reset_token(&app.state, &token, issued + TimeDuration::minutes(30))
            .await
            .unwrap();
        assert_eq!(ok.id, user.id);

        let err = verify_reset_token(&app.state, &token, issued + TimeDuration::minutes(61))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOrExpiredToken));
        // the stale token was cleared on detection
        let stored = app.users.get(user.id).unwrap();
        assert!(stored.reset_token.is_none());
    }

    #[tokio::test]
    async fn reset_token_is_single_use() {
        let app = test_app();
        let user = register(&app.state, register_request("ana@example.com", None))
            .await
            .unwrap();
        let issued = now();
        let token = issue_reset_token(&app.state, &user, issued).await.unwrap();

        reset_password(&app.state, &token, "brand-new-pass", issued + TimeDuration::minutes(5))
            .await
            .unwrap();
        let again = reset_password(&app.state, &token, "another-pass", issued + TimeDuration::minutes(6))
            .await
            .unwrap_err();
        assert!(matches!(again, AppError::InvalidOrExpiredToken));

        assert!(verify_credentials(&app.state, "ana@example.com", "brand-new-pass")
            .await
            .is_ok());
        assert!(verify_credentials(&app.state, "ana@example.com", "supersecret1")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn concurrent_resets_with_one_token_succeed_once() {
        let app = test_app();
        let user = register(&app.state, register_request("ana@example.com", None))
            .await
            .unwrap();
        let issued = now();
        let token = issue_reset_token(&app.state, &user, issued).await.unwrap();
        let at = issued + TimeDuration::minutes(5);

        let (first, second) = tokio::join!(
            reset_password(&app.state, &token, "first-new-pass", at),
            reset_password(&app.state, &token, "second-new-pass", at),
        );
        assert_eq!([first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(), 1);
        let loser = if first.is_ok() { second } else { first };
        assert!(matches!(loser, Err(AppError::InvalidOrExpiredToken)));
    }

    #[tokio::test]
    async fn reset_token_can_be_taken_once_while_live() {
        let app = test_app();
        let user = register(&app.state, register_request("ana@example.com", None))
            .await
            .unwrap();
        let issued = now();
        let token = issue_reset_token(&app.state, &user, issued).await.unwrap();

        let stale = app
            .users
            .take_reset_token(&token, issued + TimeDuration::minutes(61))
            .await
            .unwrap();
        assert_eq!(stale, None);

        let at = issued + TimeDuration::minutes(1);
        assert_eq!(app.users.take_reset_token(&token, at).await.unwrap(), Some(user.id));
        assert_eq!(app.users.take_reset_token(&token, at).await.unwrap(), None);
    }

    #[tokio::test]
    async fn forgot_password_mails_link_with_stored_token() {
        let app = test_app();
        let user = register(&app.state, register_request("ana@example.com", None))
            .await
            .unwrap();
        request_password_reset(
            &app.state,
            ForgotPasswordRequest {
                email: "ana@example.com".into(),
                answer: "blue".into(),
            },
            now(),
        )
        .await
        .unwrap();

        let stored = app.users.get(user.id).unwrap();
        let token = stored.reset_token.expect("token stored");
        let sent = app.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ana@example.com");
        assert!(sent[0].html_body.contains(&format!("/reset-password/{token}")));
    }

    #[tokio::test]
    async fn forgot_password_with_wrong_answer_is_not_found() {
        let app = test_app();
        register(&app.state, register_request("ana@example.com", None))
            .await
            .unwrap();
        let err = request_password_reset(
            &app.state,
            ForgotPasswordRequest {
                email: "ana@example.com".into(),
                answer: "green".into(),
            },
            now(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(app.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn mail_failure_does_not_fail_the_request() {
        let app = test_app();
        let user = register(&app.state, register_request("ana@example.com", None))
            .await
            .unwrap();
        app.mailer.fail_next();
        request_password_reset(
            &app.state,
            ForgotPasswordRequest {
                email: "ana@example.com".into(),
                answer: "blue".into(),
            },
            now(),
        )
        .await
        .unwrap();
        assert!(app.users.get(user.id).unwrap().reset_token.is_some());
    }

    #[tokio::test]
    async fn set_password_clears_pending_reset() {
        let app = test_app();
        let user = register(&app.state, register_request("ana@example.com", None))
            .await
            .unwrap();
        issue_reset_token(&app.state, &user, now()).await.unwrap();
        set_password(&app.state, user.id, "changed-by-user").await.unwrap();
        let stored = app.users.get(user.id).unwrap();
        assert!(stored.reset_token.is_none());
        assert!(stored.reset_token_expires_at.is_none());
    }
}
