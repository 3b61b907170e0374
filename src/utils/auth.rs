use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use chrono::{Duration, Utc};

/// Claims carried by the identity token the auth provider sets in the `auth_token` cookie.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // team member id
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(member_id: &str, email: String, name: Option<String>) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(24); // Token expires in 24 hours

        Self {
            sub: member_id.to_string(),
            email,
            name,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Display name, falling back to the mailbox part of the email address.
    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self
                .email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }
}

pub fn create_token(
    secret: &str,
    member_id: &str,
    email: String,
    name: Option<String>,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims::new(member_id, email, name);

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_with_same_secret() {
        let token =
            create_token("s3cret", "member-1", "dana@lab.org".into(), Some("Dana Reyes".into()))
                .unwrap();
        let claims = verify_token("s3cret", &token).unwrap();
        assert_eq!(claims.sub, "member-1");
        assert_eq!(claims.display_name(), "Dana Reyes");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = create_token("s3cret", "member-1", "dana@lab.org".into(), None).unwrap();
        assert!(verify_token("other", &token).is_err());
    }

    #[test]
    fn display_name_falls_back_to_email_mailbox() {
        let claims = Claims::new("m", "sam.k@lab.org".into(), Some(" ".into()));
        assert_eq!(claims.display_name(), "sam.k");
    }
}
