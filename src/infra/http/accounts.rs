//! Sign-up, login and logout handlers.

use axum::{
    Form,
    extract::{Query, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    application::{
        accounts::{AccountError, AccountFormErrors, IssuedSession, SignupInput},
        error::HttpError,
    },
    domain::types::Viewer,
    presentation::views::{
        LayoutChrome, LayoutContext, LoggedOutTemplate, LoginTemplate, LoginView,
        SignupTemplate, SignupView, render_template_response,
    },
};

use super::HttpState;

const LOGIN_FAILED: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct NextQuery {
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct SignupForm {
    pub username: String,
    pub password: String,
    pub password_confirm: String,
}

pub(super) async fn signup_form(viewer: Viewer, uri: Uri) -> Response {
    render_signup(&viewer, &uri, String::new(), AccountFormErrors::default())
}

pub(super) async fn signup_submit(
    State(state): State<HttpState>,
    viewer: Viewer,
    uri: Uri,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> Response {
    let username = form.username.clone();
    let input = SignupInput {
        username: form.username,
        password: form.password,
        password_confirm: form.password_confirm,
    };

    match state.accounts.signup(input).await {
        Ok(session) => {
            let jar = jar.add(session_cookie(&state, &session));
            (jar, Redirect::to("/")).into_response()
        }
        Err(AccountError::Invalid(errors)) => render_signup(&viewer, &uri, username, *errors),
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn login_form(
    viewer: Viewer,
    uri: Uri,
    Query(query): Query<NextQuery>,
) -> Response {
    let view = LoginView {
        username: String::new(),
        next: query.next.unwrap_or_default(),
        error: None,
    };
    render_login(&viewer, &uri, view)
}

pub(super) async fn login_submit(
    State(state): State<HttpState>,
    viewer: Viewer,
    uri: Uri,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    match state.accounts.login(&form.username, &form.password).await {
        Ok(session) => {
            info!(user = %session.member.username, "logged in");
            let jar = jar.add(session_cookie(&state, &session));
            (jar, Redirect::to(safe_next(&form.next))).into_response()
        }
        Err(AccountError::InvalidCredentials) => {
            warn!(user = %form.username, "login failed");
            let view = LoginView {
                username: form.username,
                next: form.next,
                error: Some(LOGIN_FAILED.to_string()),
            };
            render_login(&viewer, &uri, view)
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

pub(super) async fn logout(
    State(state): State<HttpState>,
    viewer: Viewer,
    uri: Uri,
    jar: CookieJar,
) -> Response {
    if let Some(cookie) = jar.get(&state.session.cookie_name)
        && let Err(err) = state.accounts.logout(cookie.value()).await
    {
        return HttpError::from(err).into_response();
    }

    let jar = jar.remove(Cookie::build(state.session.cookie_name.clone()).path("/"));
    let view = LayoutContext::new(LayoutChrome::new(&Viewer::Anonymous, uri.path()), ())
        .with_title("Logged out");
    if let Some(username) = viewer.username() {
        info!(user = %username, "logged out");
    }
    (
        jar,
        render_template_response(LoggedOutTemplate { view }, StatusCode::OK),
    )
        .into_response()
}

fn session_cookie(state: &HttpState, session: &IssuedSession) -> Cookie<'static> {
    Cookie::build((state.session.cookie_name.clone(), session.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.session.secure_cookie)
        .max_age(state.accounts.session_ttl())
        .build()
}

/// Only same-site absolute paths are followed after login.
fn safe_next(next: &str) -> &str {
    let next = next.trim();
    if next.starts_with('/') && !next.starts_with("//") && !next.contains('\\') {
        next
    } else {
        "/"
    }
}

fn render_login(viewer: &Viewer, uri: &Uri, view: LoginView) -> Response {
    let view = LayoutContext::new(LayoutChrome::new(viewer, uri.path()), view).with_title("Log in");
    render_template_response(LoginTemplate { view }, StatusCode::OK)
}

fn render_signup(
    viewer: &Viewer,
    uri: &Uri,
    username: String,
    errors: AccountFormErrors,
) -> Response {
    let view = LayoutContext::new(
        LayoutChrome::new(viewer, uri.path()),
        SignupView { username, errors },
    )
    .with_title("Sign up");
    render_template_response(SignupTemplate { view }, StatusCode::OK)
}
