use serde::Serialize;
use tower_cookies::Cookies;

use crate::{
    handlers::AppState,
    models::{Actor, TeamMember, TEAM_MEMBER},
    utils::verify_token,
};

pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
    pub display_name: String,
}

impl CurrentUser {
    pub fn actor(&self) -> Actor {
        Actor::user(self.display_name.clone())
    }
}

/// Resolves the signed-in team member from the identity cookie.
///
/// The token is issued by the external auth provider. When it carries no
/// display name the member document is consulted, then the email address.
pub async fn get_current_user(cookies: &Cookies, state: &AppState) -> Option<CurrentUser> {
    let token = cookies.get(AUTH_COOKIE)?.value().to_string();

    let claims = match verify_token(&state.jwt_secret, &token) {
        Ok(claims) => claims,
        Err(e) => {
            log::debug!("ignoring invalid identity token: {}", e);
            return None;
        }
    };

    let has_name = claims
        .name
        .as_deref()
        .map_or(false, |n| !n.trim().is_empty());
    let display_name = if has_name {
        claims.display_name()
    } else {
        match member_name(state, &claims.sub).await {
            Some(name) => name,
            None => claims.display_name(),
        }
    };

    Some(CurrentUser {
        id: claims.sub,
        email: claims.email,
        display_name,
    })
}

async fn member_name(state: &AppState, member_id: &str) -> Option<String> {
    let doc = state.store.get(member_id).await.ok()??;
    if doc.doc_type != TEAM_MEMBER {
        return None;
    }
    TeamMember::from_document(&doc)
        .ok()
        .map(|m| m.name)
        .filter(|n| !n.trim().is_empty())
}

/// Acting identity for the audit trail; unauthenticated callers act anonymously.
pub async fn current_actor(cookies: &Cookies, state: &AppState) -> Actor {
    match get_current_user(cookies, state).await {
        Some(user) => user.actor(),
        None => Actor::Anonymous,
    }
}
