use std::sync::Arc;

use bloom_auth::cognito::CognitoIdentityProvider;
use bloom_auth::session::SessionManager;
use bloom_storage::s3::S3DocumentStore;

use crate::config::{BloomConfig, CredentialSource};

/// Build an `SdkConfig` from a region and credential source.
pub async fn build_aws_config(region: &str, creds: &CredentialSource) -> aws_config::SdkConfig {
    let mut builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()));

    match creds {
        CredentialSource::Inline {
            access_key_id,
            secret_access_key,
            session_token,
        } => {
            builder = builder.credentials_provider(aws_sdk_s3::config::Credentials::new(
                access_key_id,
                secret_access_key,
                session_token.clone(),
                None,
                "nutribloom-config",
            ));
        }
        CredentialSource::Profile { profile_name } => {
            builder = builder.profile_name(profile_name);
        }
        CredentialSource::DefaultChain => {}
    }

    builder.load().await
}

/// The AWS-backed services a [`crate::client::BloomClient`] runs on.
pub struct Backend {
    pub store: Arc<S3DocumentStore>,
    pub sessions: SessionManager,
}

pub async fn connect(config: &BloomConfig) -> Backend {
    let sdk = build_aws_config(&config.region, &config.credentials).await;

    let store = S3DocumentStore::new(
        aws_sdk_s3::Client::new(&sdk),
        &config.bucket,
        config.poll_interval(),
    );
    let identity = CognitoIdentityProvider::new(
        aws_sdk_cognitoidentityprovider::Client::new(&sdk),
        &config.user_pool_client_id,
    );

    tracing::debug!(region = %config.region, bucket = %config.bucket, "aws backend configured");

    Backend {
        store: Arc::new(store),
        sessions: SessionManager::new(Arc::new(identity)),
    }
}
