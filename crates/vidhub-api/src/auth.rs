use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, extract::State};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{info, warn};
use uuid::Uuid;

use vidhub_types::api::{
    ChangePasswordRequest, Claims, LoginRequest, LoginResponse, RefreshRequest, RegisterRequest,
    TokenPair,
};
use vidhub_types::models::User;

use crate::convert;
use crate::error::{ApiError, required};
use crate::extract::{ApiJson, OptionalJson};
use crate::response::{ApiResponse, Empty};
use crate::state::{AppState, Settings, with_db};

const MIN_PASSWORD_LEN: usize = 8;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<ApiResponse<User>, ApiError> {
    const ALL_REQUIRED: &str = "All fields are required";
    let full_name = required(&req.full_name, ALL_REQUIRED)?.to_string();
    let email = required(&req.email, ALL_REQUIRED)?.to_lowercase();
    let username = required(&req.username, ALL_REQUIRED)?.to_lowercase();
    let avatar = required(&req.avatar, "Avatar required")?.to_string();
    let cover_image = req.cover_image.as_deref().map(str::trim).unwrap_or_default().to_string();

    if !email.contains('@') {
        return Err(ApiError::Validation("Enter a valid email address".into()));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4().to_string();

    let row = with_db(&state, move |db| {
        db.create_user(
            &user_id,
            &username,
            &email,
            &full_name,
            &avatar,
            &cover_image,
            &password_hash,
        )
    })
    .await?
    .ok_or_else(|| {
        ApiError::AlreadyExists("User with same email or username already exists".into())
    })?;

    info!("Registered user {}", row.username);
    Ok(ApiResponse::created(convert::user(row), "User registered successfully"))
}

/// Issues a token pair, both in the body and as httpOnly cookies.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<(CookieJar, ApiResponse<LoginResponse>), ApiError> {
    let username = req
        .username
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    let email = req
        .email
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    if username.is_none() && email.is_none() {
        return Err(ApiError::Validation("Username or email is required".into()));
    }

    let user = with_db(&state, move |db| {
        db.find_user_for_login(username.as_deref(), email.as_deref())
    })
    .await?
    .ok_or_else(|| ApiError::UserNotFound("User does not exist".into()))?;

    verify_password(&req.password, &user.password)
        .map_err(|_| ApiError::Unauthorized("Password is invalid".into()))?;

    let user_id = parse_user_id(&user.id)?;
    let tokens = issue_tokens(&state.settings, user_id, &user.username)?;

    let refresh = tokens.refresh_token.clone();
    let id = user.id.clone();
    with_db(&state, move |db| db.set_refresh_token(&id, Some(&refresh))).await?;

    info!("User {} logged in", user.username);
    let jar = with_token_cookies(jar, &tokens);
    Ok((
        jar,
        ApiResponse::ok(
            LoginResponse {
                user: convert::user(user),
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
            },
            "User logged in successfully",
        ),
    ))
}

/// Clears the stored refresh token and expires both token cookies.
pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<Empty>), ApiError> {
    let id = claims.sub.to_string();
    with_db(&state, move |db| db.set_refresh_token(&id, None)).await?;

    let jar = [ACCESS_COOKIE, REFRESH_COOKIE].into_iter().fold(jar, |jar, name| {
        let mut cookie = token_cookie(name, String::new());
        cookie.make_removal();
        jar.add(cookie)
    });
    Ok((jar, ApiResponse::ok(Empty {}, "User logged out successfully")))
}

/// Rotates the refresh token. The `refreshToken` cookie wins over the body.
pub async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
    OptionalJson(req): OptionalJson<RefreshRequest>,
) -> Result<(CookieJar, ApiResponse<TokenPair>), ApiError> {
    let incoming = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().trim().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| {
            req.refresh_token
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
        })
        .ok_or_else(|| ApiError::Unauthorized("Unauthorized request".into()))?;

    let claims = decode_token(&state.settings.refresh_token_secret, &incoming)
        .map_err(|_| ApiError::Unauthorized("Invalid refresh token".into()))?;

    let tokens = issue_tokens(&state.settings, claims.sub, &claims.username)?;

    let id = claims.sub.to_string();
    let next = tokens.refresh_token.clone();
    let rotated = with_db(&state, move |db| db.rotate_refresh_token(&id, &incoming, &next)).await?;
    if !rotated {
        warn!("Rejected stale refresh token for user {}", claims.sub);
        return Err(ApiError::Unauthorized("Refresh token is expired or used".into()));
    }

    let jar = with_token_cookies(jar, &tokens);
    Ok((jar, ApiResponse::ok(tokens, "Access token refreshed")))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> Result<ApiResponse<Empty>, ApiError> {
    if req.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let id = claims.sub.to_string();
    let user = with_db(&state, move |db| db.get_user_by_id(&id))
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid access token".into()))?;

    verify_password(&req.old_password, &user.password)
        .map_err(|_| ApiError::Validation("Old password is incorrect".into()))?;

    let password_hash = hash_password(&req.new_password)?;
    with_db(&state, move |db| db.update_password(&user.id, &password_hash)).await?;

    Ok(ApiResponse::ok(Empty {}, "Password changed successfully"))
}

// -- Cookies --

fn token_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

fn with_token_cookies(jar: CookieJar, tokens: &TokenPair) -> CookieJar {
    jar.add(token_cookie(ACCESS_COOKIE, tokens.access_token.clone()))
        .add(token_cookie(REFRESH_COOKIE, tokens.refresh_token.clone()))
}

// -- Passwords --

/// Hash password with Argon2id
fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, hash: &str) -> Result<(), ApiError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| ApiError::Internal(format!("stored password hash unreadable: {e}")))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized("Password is invalid".into()))
}

fn parse_user_id(raw: &str) -> Result<Uuid, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::Internal(format!("corrupt user id '{raw}': {e}")))
}

// -- Tokens --

fn issue_tokens(settings: &Settings, user_id: Uuid, username: &str) -> Result<TokenPair, ApiError> {
    let access_token = create_token(
        &settings.access_token_secret,
        settings.access_token_ttl,
        user_id,
        username,
    )?;
    let refresh_token = create_token(
        &settings.refresh_token_secret,
        settings.refresh_token_ttl,
        user_id,
        username,
    )?;
    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

pub fn create_token(
    secret: &str,
    ttl: chrono::Duration,
    user_id: Uuid,
    username: &str,
) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
        jti: Uuid::new_v4(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("battery staple", &hash),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn tokens_are_bound_to_their_secret() {
        let user_id = Uuid::new_v4();
        let token = create_token("access", chrono::Duration::minutes(5), user_id, "eve").unwrap();

        let claims = decode_token("access", &token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.username, "eve");
        assert!(decode_token("refresh", &token).is_err());
    }

    #[test]
    fn token_cookies_are_http_only() {
        let tokens = TokenPair {
            access_token: "a".into(),
            refresh_token: "r".into(),
        };
        let jar = with_token_cookies(CookieJar::new(), &tokens);

        let access = jar.get(ACCESS_COOKIE).unwrap();
        assert_eq!(access.value(), "a");
        assert_eq!(access.http_only(), Some(true));
        assert_eq!(access.path(), Some("/"));
        assert_eq!(jar.get(REFRESH_COOKIE).unwrap().value(), "r");
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let token = create_token("s", chrono::Duration::hours(-2), Uuid::new_v4(), "old").unwrap();
        assert!(decode_token("s", &token).is_err());
    }
}
