use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest, UpdateProfileRequest},
    jwt::JwtKeys,
    password,
    repo::{CreateUserError, UserRepo},
    repo_types::{NewUser, User},
};
use crate::{
    error::{AppError, AppResult},
    validation::{char_len, is_valid_email, Validator},
};

const NAME_MIN: usize = 3;
const PASSWORD_MIN: usize = 6;

#[derive(Debug)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

fn normalize_email(raw: Option<String>) -> String {
    raw.unwrap_or_default().trim().to_lowercase()
}

pub fn validate_registration(req: RegisterRequest) -> AppResult<Registration> {
    let name = req.name.unwrap_or_default().trim().to_string();
    let email = normalize_email(req.email);
    let password = req.password.unwrap_or_default();
    let confirm = req.password_confirm.unwrap_or_default();

    let mut v = Validator::new();
    v.field("name")
        .rule(!name.is_empty(), "Name is required")
        .rule(char_len(&name) >= NAME_MIN, "Name must be at least 3 characters");
    v.field("email")
        .rule(!email.is_empty(), "Email is required")
        .rule(is_valid_email(&email), "Invalid email format");
    v.field("password")
        .rule(!password.is_empty(), "Password is required")
        .rule(
            char_len(&password) >= PASSWORD_MIN,
            "Password must be at least 6 characters",
        );
    v.field("passwordConfirm")
        .rule(!confirm.is_empty(), "Confirm password is required")
        .rule(confirm == password, "Passwords do not match");
    v.finish()?;

    Ok(Registration {
        name,
        email,
        password,
    })
}

pub fn validate_login(req: LoginRequest) -> AppResult<Credentials> {
    let email = normalize_email(req.email);
    let password = req.password.unwrap_or_default();

    let mut v = Validator::new();
    v.field("email")
        .rule(!email.is_empty(), "Email is required")
        .rule(is_valid_email(&email), "Invalid email format");
    v.field("password")
        .rule(!password.is_empty(), "Password is required");
    v.finish()?;

    Ok(Credentials { email, password })
}

/// `None` means the name is left as it is.
pub fn validate_profile_update(req: UpdateProfileRequest) -> AppResult<Option<String>> {
    let Some(name) = req.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };
    let mut v = Validator::new();
    v.field("name")
        .rule(char_len(&name) >= NAME_MIN, "Name must be at least 3 characters");
    v.finish()?;
    Ok(Some(name))
}

fn auth_response(keys: &JwtKeys, user: User) -> AppResult<AuthResponse> {
    let token = keys.issue(user.id, &user.email)?;
    Ok(AuthResponse {
        token,
        user: user.into(),
    })
}

pub async fn register(
    users: &dyn UserRepo,
    keys: &JwtKeys,
    reg: Registration,
) -> AppResult<AuthResponse> {
    if users.find_by_email(&reg.email).await?.is_some() {
        warn!(email = %reg.email, "email already registered");
        return Err(AppError::Conflict);
    }

    let password_hash = password::hash(reg.password).await?;
    let user = users
        .create(NewUser {
            name: reg.name,
            email: reg.email,
            password_hash,
        })
        .await
        .map_err(|e| match e {
            CreateUserError::DuplicateEmail => AppError::Conflict,
            CreateUserError::Store(e) => AppError::Internal(e),
        })?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    auth_response(keys, user)
}

pub async fn login(
    users: &dyn UserRepo,
    keys: &JwtKeys,
    creds: Credentials,
) -> AppResult<AuthResponse> {
    let Some(user) = users.find_by_email(&creds.email).await? else {
        warn!(email = %creds.email, "login unknown email");
        return Err(AppError::AccountNotFound);
    };

    if !password::verify(creds.password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredential);
    }

    info!(user_id = %user.id, email = %user.email, "user logged in");
    auth_response(keys, user)
}

pub async fn profile(users: &dyn UserRepo, user_id: Uuid) -> AppResult<User> {
    users
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::NotFound("User not found"))
}

pub async fn update_profile(
    users: &dyn UserRepo,
    user_id: Uuid,
    name: Option<String>,
) -> AppResult<PublicUser> {
    let user = match name {
        Some(name) => users.update_name(user_id, &name).await?,
        None => users.find_by_id(user_id).await?,
    };
    user.map(PublicUser::from)
        .ok_or(AppError::NotFound("User not found"))
}
