use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use crate::gateway::ApiResponse;
use crate::models::courier::{Availability, Courier, CourierProfile, LoginRequest, RegisterRequest};
use crate::services::{AuthService, ProfileService};
use crate::store::or_fallback;
use crate::token::TokenStore;

#[derive(Default)]
struct SessionState {
    user: Option<Courier>,
    profile: Option<CourierProfile>,
    loading: bool,
    error: Option<String>,
}

/// Owns the session and exposes the only legal ways to mutate it.
///
/// `authenticated` is derived (user present AND credential present), never
/// stored, so the gateway's 401 eviction flips it without this store doing
/// anything.
pub struct SessionStore {
    auth: AuthService,
    profiles: ProfileService,
    tokens: Arc<TokenStore>,
    state: RwLock<SessionState>,
}

impl SessionStore {
    pub fn new(auth: AuthService, profiles: ProfileService, tokens: Arc<TokenStore>) -> Self {
        Self {
            auth,
            profiles,
            tokens,
            state: RwLock::new(SessionState::default()),
        }
    }

    /// Replays a persisted credential on startup. A rejected token (expired,
    /// revoked) falls back to logged-out without surfacing an error; only this
    /// startup path is silent like that.
    pub async fn initialize(&self) {
        self.tokens.initialize().await;

        if self.tokens.current().is_none() {
            debug!("no stored credential; starting logged out");
            return;
        }

        {
            self.write().loading = true;
        }
        let response = self.profiles.profile().await;

        let mut state = self.write();
        state.loading = false;
        match response {
            ApiResponse::Success {
                data: Some(profile),
                ..
            } => {
                info!(courier_id = %profile.courier.id, "session restored");
                state.user = Some(profile.courier.clone());
                state.profile = Some(profile);
            }
            _ => {
                debug!("stored credential rejected; starting logged out");
            }
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> bool {
        self.begin_attempt();

        let credentials = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self.auth.login(&credentials).await;
        self.finish_attempt(response, "Login failed")
    }

    pub async fn register(&self, data: &RegisterRequest) -> bool {
        self.begin_attempt();

        let response = self.auth.register(data).await;
        self.finish_attempt(response, "Registration failed")
    }

    /// Always ends logged out. A failed server-side logout is logged, never
    /// surfaced; a network blip must not leave the user stuck authenticated.
    pub async fn logout(&self) {
        if let ApiResponse::Failure { message, .. } = self.auth.logout().await {
            warn!(error = %message, "server logout failed; clearing local session anyway");
        }

        self.tokens.clear().await;

        let mut state = self.write();
        state.user = None;
        state.profile = None;
        info!("session cleared");
    }

    pub async fn fetch_profile(&self) {
        if let ApiResponse::Success {
            data: Some(profile),
            ..
        } = self.profiles.profile().await
        {
            let mut state = self.write();
            state.user = Some(profile.courier.clone());
            state.profile = Some(profile);
        }
    }

    pub async fn update_availability(&self, availability: Availability) -> bool {
        match self.profiles.update_availability(availability).await {
            ApiResponse::Success {
                data: Some(user), ..
            } => {
                // The server copy replaces the local user wholesale; merging
                // fields locally would drift from server truth.
                self.write().user = Some(user);
                true
            }
            ApiResponse::Success { message, .. } | ApiResponse::Failure { message, .. } => {
                warn!(availability = %availability, error = %message, "availability update failed");
                false
            }
        }
    }

    pub async fn update_location(&self, latitude: f64, longitude: f64) -> bool {
        self.profiles
            .update_location(latitude, longitude)
            .await
            .is_success()
    }

    pub fn user(&self) -> Option<Courier> {
        self.read().user.clone()
    }

    pub fn profile(&self) -> Option<CourierProfile> {
        self.read().profile.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().user.is_some() && self.tokens.current().is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.read().loading
    }

    pub fn error(&self) -> Option<String> {
        self.read().error.clone()
    }

    pub fn clear_error(&self) {
        self.write().error = None;
    }

    fn begin_attempt(&self) {
        let mut state = self.write();
        state.error = None;
        state.loading = true;
    }

    fn finish_attempt(&self, response: ApiResponse<Courier>, fallback: &str) -> bool {
        let mut state = self.write();
        state.loading = false;
        match response {
            ApiResponse::Success {
                data: Some(user), ..
            } => {
                info!(courier_id = %user.id, "session authenticated");
                state.user = Some(user);
                true
            }
            ApiResponse::Success { message, .. } | ApiResponse::Failure { message, .. } => {
                state.error = Some(or_fallback(message, fallback));
                false
            }
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        self.state.read().expect("session lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, SessionState> {
        self.state.write().expect("session lock poisoned")
    }
}
