use std::sync::Arc;

use tracing::{debug, info};

use crate::gateway::{ApiResponse, Gateway};
use crate::models::courier::{Courier, LoginRequest, RegisterRequest};
use crate::token::TokenStore;

/// Façade over the auth resource family. Couples to the token store on
/// purpose: a successful login/register persists the credential here, so no
/// caller ever has to remember to.
#[derive(Clone)]
pub struct AuthService {
    gateway: Arc<Gateway>,
    tokens: Arc<TokenStore>,
}

impl AuthService {
    pub fn new(gateway: Arc<Gateway>, tokens: Arc<TokenStore>) -> Self {
        Self { gateway, tokens }
    }

    pub async fn register(&self, data: &RegisterRequest) -> ApiResponse<Courier> {
        let response = self.gateway.post_public("/register", data).await;
        self.persist_token(&response).await;
        response
    }

    pub async fn login(&self, credentials: &LoginRequest) -> ApiResponse<Courier> {
        let response = self.gateway.post_public("/login", credentials).await;
        self.persist_token(&response).await;
        response
    }

    /// Server-side logout. Clears the stored credential on success; the
    /// session store clears unconditionally on top of this.
    pub async fn logout(&self) -> ApiResponse<()> {
        let response = self.gateway.post_empty("/logout").await;
        if response.is_success() {
            self.tokens.clear().await;
            debug!("credential cleared after logout");
        }
        response
    }

    async fn persist_token(&self, response: &ApiResponse<Courier>) {
        if let ApiResponse::Success {
            data: Some(_),
            token: Some(token),
            ..
        } = response
        {
            self.tokens.save(token).await;
            info!("credential saved");
        }
    }
}
