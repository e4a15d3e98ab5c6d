use std::collections::HashMap;

use aws_sdk_cognitoidentityprovider::Client;
use aws_sdk_cognitoidentityprovider::types::AuthFlowType;
use bloom_core::ids::OwnerId;
use tracing::info;

use crate::error::AuthError;
use crate::provider::{BoxFuture, Credentials, IdentityProvider, Session};

const SUB_ATTRIBUTE: &str = "sub";
const EMAIL_ATTRIBUTE: &str = "email";

struct Tokens {
    access_token: String,
    refresh_token: Option<String>,
}

/// Cognito user pool as identity provider.
///
/// The owner id of a session is the user's `sub` attribute.
pub struct CognitoIdentityProvider {
    client: Client,
    user_pool_client_id: String,
}

impl CognitoIdentityProvider {
    pub fn new(client: Client, user_pool_client_id: impl Into<String>) -> Self {
        Self {
            client,
            user_pool_client_id: user_pool_client_id.into(),
        }
    }

    async fn initiate(
        &self,
        flow: AuthFlowType,
        params: HashMap<String, String>,
    ) -> Result<Tokens, AuthError> {
        let resp = self
            .client
            .initiate_auth()
            .auth_flow(flow)
            .client_id(&self.user_pool_client_id)
            .set_auth_parameters(Some(params))
            .send()
            .await
            .map_err(|e| {
                let err = e.into_service_error();
                if err.is_not_authorized_exception() || err.is_user_not_found_exception() {
                    AuthError::AuthFailed("incorrect email or password".to_string())
                } else {
                    AuthError::Cognito(err.to_string())
                }
            })?;

        if let Some(result) = resp.authentication_result() {
            Ok(Tokens {
                access_token: result.access_token().unwrap_or_default().to_string(),
                refresh_token: result.refresh_token().map(str::to_string),
            })
        } else if let Some(challenge) = resp.challenge_name() {
            Err(AuthError::AuthFailed(format!(
                "additional verification required ({})",
                challenge.as_str()
            )))
        } else {
            Err(AuthError::AuthFailed("unexpected response".to_string()))
        }
    }

    /// Look up the owner id and email behind an access token.
    async fn describe_user(&self, access_token: &str) -> Result<(OwnerId, Option<String>), AuthError> {
        let resp = self
            .client
            .get_user()
            .access_token(access_token)
            .send()
            .await
            .map_err(|e| AuthError::Cognito(e.into_service_error().to_string()))?;

        let attribute = |name: &str| {
            resp.user_attributes()
                .iter()
                .find(|attr| attr.name() == name)
                .and_then(|attr| attr.value())
                .map(str::to_string)
        };

        let sub = attribute(SUB_ATTRIBUTE)
            .ok_or_else(|| AuthError::MissingAttribute(SUB_ATTRIBUTE.to_string()))?;
        Ok((OwnerId::new(sub), attribute(EMAIL_ATTRIBUTE)))
    }
}

impl IdentityProvider for CognitoIdentityProvider {
    fn sign_in(&self, credentials: &Credentials) -> BoxFuture<'_, Result<Session, AuthError>> {
        let credentials = credentials.clone();
        Box::pin(async move {
            let (email, password) = match credentials {
                Credentials::Password { email, password } => (email, password),
                Credentials::Federated { provider, .. } => {
                    return Err(AuthError::Unsupported(format!(
                        "signing in with {provider} is not enabled for this app"
                    )));
                }
            };

            info!(email = %email, "initiating auth");

            let mut params = HashMap::new();
            params.insert("USERNAME".to_string(), email.clone());
            params.insert("PASSWORD".to_string(), password);

            let tokens = self.initiate(AuthFlowType::UserPasswordAuth, params).await?;
            let (owner, attribute_email) = self.describe_user(&tokens.access_token).await?;

            Ok(Session {
                owner,
                email: attribute_email.or(Some(email)),
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token.unwrap_or_default(),
            })
        })
    }

    fn refresh(&self, session: &Session) -> BoxFuture<'_, Result<Session, AuthError>> {
        let session = session.clone();
        Box::pin(async move {
            if session.refresh_token.is_empty() {
                return Err(AuthError::SessionExpired);
            }

            let mut params = HashMap::new();
            params.insert("REFRESH_TOKEN".to_string(), session.refresh_token.clone());

            let tokens = self.initiate(AuthFlowType::RefreshTokenAuth, params).await?;

            Ok(Session {
                access_token: tokens.access_token,
                // Cognito does not always rotate the refresh token
                refresh_token: tokens.refresh_token.unwrap_or(session.refresh_token),
                ..session
            })
        })
    }

    fn sign_out(&self, session: &Session) -> BoxFuture<'_, Result<(), AuthError>> {
        let access_token = session.access_token.clone();
        Box::pin(async move {
            self.client
                .global_sign_out()
                .access_token(access_token)
                .send()
                .await
                .map_err(|e| AuthError::Cognito(e.into_service_error().to_string()))?;
            Ok(())
        })
    }
}
