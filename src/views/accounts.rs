//! Login, logout and signup. Successful logins and signups start a session and
//! redirect; failures re-render the form with the reason.

use super::{flash::FlashMessage, pending, redirect_with, render};
use crate::{
    auth::{
        client_ip, hash_password, removed_session_cookie, session_cookie, session_id, verify_password,
        CurrentUser,
    },
    config::Config,
    db::user::NewUser,
    error::ServerError,
    store::PollStore,
};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

const MAX_USERNAME_LENGTH: usize = 150;

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

#[derive(Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

#[derive(Serialize)]
struct LoginContext {
    next: Option<String>,
}

#[derive(Serialize, Default)]
struct SignupContext {
    username: String,
    email: Option<String>,
    errors: BTreeMap<&'static str, Vec<String>>,
}

/// Only same-site absolute paths are followed.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(next) if next.starts_with('/') && !next.starts_with("//") => next,
        _ => "/",
    }
}

pub async fn login_form(req: HttpRequest, query: web::Query<NextQuery>) -> HttpResponse {
    let context = LoginContext {
        next: query.into_inner().next,
    };
    render(&req, "login", context, Vec::new())
}

pub async fn login(
    req: HttpRequest,
    form: web::Form<LoginForm>,
    store: web::Data<dyn PollStore>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ServerError> {
    let LoginForm {
        username,
        password,
        next,
    } = form.into_inner();
    let ip = client_ip(&req);

    let user = store
        .user_by_username(&username)
        .await?
        .filter(|user| verify_password(&password, &user.password_hash));
    let user = match user {
        Some(user) => user,
        None => {
            warn!("User failed login to {} (IP: {})", username, ip);
            let message = FlashMessage::error("Invalid username or password.");
            return Ok(render(&req, "login", LoginContext { next }, vec![message]));
        }
    };

    let session = store.save_session(user.id).await?;
    info!("User {} has logged in (IP: {})", user.username, ip);
    Ok(redirect_with(
        &req,
        safe_next(next.as_deref()),
        Vec::new(),
        vec![session_cookie(&session, config.secure_cookies)],
    ))
}

pub async fn logout(
    req: HttpRequest,
    store: web::Data<dyn PollStore>,
    user: CurrentUser,
) -> Result<HttpResponse, ServerError> {
    let ip = client_ip(&req);
    if let Some(session_id) = session_id(&req) {
        store.delete_session(session_id).await?;
    }
    match user.user() {
        Some(user) => info!("User {} has logged out (IP: {})", user.username, ip),
        None => warn!("Logout without a logged in user (IP: {})", ip),
    }
    Ok(redirect_with(
        &req,
        "/",
        Vec::new(),
        vec![removed_session_cookie(), pending::removal()],
    ))
}

pub async fn signup_form(req: HttpRequest) -> HttpResponse {
    render(&req, "signup", SignupContext::default(), Vec::new())
}

fn validate(form: &SignupForm) -> BTreeMap<&'static str, Vec<String>> {
    let mut errors: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
    let username = form.username.as_str();
    if username.is_empty() {
        errors.entry("username").or_default().push("This field is required.".to_owned());
    } else if username.chars().count() > MAX_USERNAME_LENGTH {
        errors.entry("username").or_default().push(format!(
            "Ensure this value has at most {} characters.",
            MAX_USERNAME_LENGTH
        ));
    } else if !username
        .chars()
        .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
    {
        errors.entry("username").or_default().push(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .to_owned(),
        );
    }

    if let Some(email) = form.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
        let valid = match email.split_once('@') {
            Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
            None => false,
        };
        if !valid {
            errors.entry("email").or_default().push("Enter a valid email address.".to_owned());
        }
    }

    if form.password1.is_empty() {
        errors.entry("password1").or_default().push("This field is required.".to_owned());
    }
    if form.password1 != form.password2 {
        errors
            .entry("password2")
            .or_default()
            .push("The two password fields didn't match.".to_owned());
    }
    errors
}

pub async fn signup(
    req: HttpRequest,
    form: web::Form<SignupForm>,
    store: web::Data<dyn PollStore>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ServerError> {
    let form = form.into_inner();
    let mut errors = validate(&form);
    let email = form
        .email
        .as_deref()
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .map(str::to_owned);

    if errors.is_empty() {
        let new_user = NewUser {
            username: form.username.clone(),
            email: email.clone(),
            password_hash: hash_password(&form.password1)?,
        };
        match store.add_user(new_user).await? {
            Some(user) => {
                let session = store.save_session(user.id).await?;
                info!("User {} has signed up (IP: {})", user.username, client_ip(&req));
                return Ok(redirect_with(
                    &req,
                    "/",
                    Vec::new(),
                    vec![session_cookie(&session, config.secure_cookies)],
                ));
            }
            None => errors
                .entry("username")
                .or_default()
                .push("A user with that username already exists.".to_owned()),
        }
    }

    let context = SignupContext {
        username: form.username,
        email,
        errors,
    };
    Ok(render(&req, "signup", context, vec![FlashMessage::error("Invalid form.")]))
}
