//! [`Command`] for authorizing a user [`Session`].

use derive_more::{Display, Error, From};
use jsonwebtoken::Validation;
use serde::Deserialize;
use tracerr::Traced;

use crate::{
    domain::user::{self, session, Session},
    Service,
};

use super::Command;

/// [`Command`] for authorizing a user [`Session`] issued by the identity
/// provider.
#[derive(Clone, Debug, From)]
pub struct AuthorizeUserSession {
    /// [`Session`] token to authorize.
    pub token: session::Token,
}

/// Claims of a [`session::Token`].
#[derive(Debug, Deserialize)]
struct Claims {
    /// ID of the user.
    sub: user::Id,

    /// [`user::Role`] of the user.
    role: user::Role,

    /// Expiration as a Unix timestamp.
    exp: i64,
}

impl<Db> Command<AuthorizeUserSession> for Service<Db> {
    type Ok = Session;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AuthorizeUserSession { token } = cmd;

        let claims = jsonwebtoken::decode::<Claims>(
            token.as_ref(),
            &self.config().jwt_decoding_key,
            &Validation::default(),
        )
        .map_err(tracerr::from_and_wrap!(=> E))?
        .claims;

        let expires_at =
            session::ExpirationDateTime::from_unix_timestamp(claims.exp)
                .ok_or(E::InvalidExpiration(claims.exp))
                .map_err(tracerr::wrap!())?;

        Ok(Session {
            user_id: claims.sub,
            role: claims.role,
            expires_at,
        })
    }
}

/// Error of [`AuthorizeUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Session`] expiration is out of range.
    #[display("`Session` expiration `{_0}` is out of range")]
    #[from(ignore)]
    InvalidExpiration(#[error(not(source))] i64),

    /// [`jsonwebtoken`] decoding error.
    #[display("Failed to decode a JSON Web Token: {_0}")]
    JsonWebTokenDecodeError(jsonwebtoken::errors::Error),
}

#[cfg(test)]
mod spec {
    use common::DateTime;
    use jsonwebtoken::{EncodingKey, Header};
    use serde_json::json;

    use crate::{
        domain::user::{self, session},
        spec::{service, JWT_SECRET},
        Command as _,
    };

    use super::{AuthorizeUserSession, ExecutionError};

    fn token(claims: &serde_json::Value) -> session::Token {
        let token = jsonwebtoken::encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(JWT_SECRET),
        )
        .unwrap();
        #[expect(unsafe_code, reason = "valid token")]
        unsafe {
            session::Token::new_unchecked(token)
        }
    }

    #[tokio::test]
    async fn decodes_session() {
        let svc = service();
        let id = user::Id::new();
        let exp = DateTime::now().unix_timestamp() + 3600;

        let session = svc
            .execute(AuthorizeUserSession {
                token: token(&json!({
                    "sub": id,
                    "role": "OPERATOR",
                    "exp": exp,
                })),
            })
            .await
            .unwrap();

        assert_eq!(session.user_id, id);
        assert_eq!(session.role, user::Role::Operator);
        assert_eq!(session.expires_at.unix_timestamp(), exp);
        assert!(session.actor().is_operator());
    }

    #[tokio::test]
    async fn rejects_expired_or_forged_tokens() {
        let svc = service();
        let claims = json!({
            "sub": user::Id::new(),
            "role": "DRIVER",
            "exp": DateTime::now().unix_timestamp() - 3600,
        });

        let err = svc
            .execute(AuthorizeUserSession {
                token: token(&claims),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::JsonWebTokenDecodeError(_),
        ));

        #[expect(unsafe_code, reason = "malformed on purpose")]
        let forged = unsafe { session::Token::new_unchecked("a.b.c".into()) };
        let err = svc
            .execute(AuthorizeUserSession { token: forged })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::JsonWebTokenDecodeError(_),
        ));
    }
}
