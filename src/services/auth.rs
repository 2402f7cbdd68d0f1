use std::collections::HashMap;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Credentials, Session, SignUpForm, User},
};

const EVENT_CAPACITY: usize = 64;

/// Authentication state changes, delivered to every subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedUp(User),
    SignedIn(User),
    SignedOut(Uuid),
}

/// Account and session provider
#[async_trait::async_trait]
pub trait AuthProvider: Send + Sync {
    /// User owning a session token, if the session is live
    async fn current_user(&self, token: Uuid) -> Option<User>;

    async fn sign_up(&self, form: SignUpForm) -> AppResult<User>;

    async fn sign_in(&self, credentials: Credentials) -> AppResult<Session>;

    /// Ends a session. Unknown tokens are ignored.
    async fn sign_out(&self, token: Uuid) -> AppResult<()>;

    /// Stream of auth state changes from now on
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

struct Account {
    user: User,
    salt: String,
    password_digest: String,
}

#[derive(Default)]
struct AuthState {
    /// Keyed by lower-cased email
    accounts: HashMap<String, Account>,
    sessions: HashMap<Uuid, Uuid>,
}

/// In-process accounts with salted SHA-256 password digests
#[derive(Clone)]
pub struct MemoryAuthProvider {
    state: Arc<RwLock<AuthState>>,
    events: broadcast::Sender<AuthEvent>,
}

impl Default for MemoryAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAuthProvider {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(RwLock::new(AuthState::default())),
            events,
        }
    }

    fn digest(salt: &str, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(password.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn publish(&self, event: AuthEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

#[async_trait::async_trait]
impl AuthProvider for MemoryAuthProvider {
    async fn current_user(&self, token: Uuid) -> Option<User> {
        let state = self.state.read().await;
        let user_id = state.sessions.get(&token)?;
        state
            .accounts
            .values()
            .find(|a| a.user.id == *user_id)
            .map(|a| a.user.clone())
    }

    async fn sign_up(&self, form: SignUpForm) -> AppResult<User> {
        form.validate()?;

        let email_key = form.email.to_lowercase();
        let mut state = self.state.write().await;
        if state.accounts.contains_key(&email_key) {
            return Err(AppError::Conflict(format!(
                "{} is already registered",
                form.email
            )));
        }

        let user = User::new(form.name, form.email);
        let salt = Uuid::new_v4().to_string();
        let password_digest = Self::digest(&salt, &form.password);
        state.accounts.insert(
            email_key,
            Account {
                user: user.clone(),
                salt,
                password_digest,
            },
        );
        drop(state);

        tracing::info!(user_id = %user.id, "Account created");
        self.publish(AuthEvent::SignedUp(user.clone()));
        Ok(user)
    }

    async fn sign_in(&self, credentials: Credentials) -> AppResult<Session> {
        credentials.validate()?;

        let mut state = self.state.write().await;
        let user = match state.accounts.get(&credentials.email.to_lowercase()) {
            Some(account)
                if Self::digest(&account.salt, &credentials.password)
                    == account.password_digest =>
            {
                account.user.clone()
            }
            _ => {
                tracing::info!("Sign-in rejected");
                return Err(AppError::InvalidCredentials);
            }
        };

        let token = Uuid::new_v4();
        state.sessions.insert(token, user.id);
        drop(state);

        tracing::info!(user_id = %user.id, "Signed in");
        self.publish(AuthEvent::SignedIn(user.clone()));
        Ok(Session { token, user })
    }

    async fn sign_out(&self, token: Uuid) -> AppResult<()> {
        let removed = self.state.write().await.sessions.remove(&token);
        if let Some(user_id) = removed {
            tracing::info!(user_id = %user_id, "Signed out");
            self.publish(AuthEvent::SignedOut(user_id));
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(email: &str) -> SignUpForm {
        SignUpForm {
            name: "지은".to_string(),
            email: email.to_string(),
            password: "movie1234".to_string(),
            confirm_password: "movie1234".to_string(),
        }
    }

    fn login(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let auth = MemoryAuthProvider::new();
        let user = auth.sign_up(signup("jieun@example.com")).await.unwrap();

        let session = auth
            .sign_in(login("JIEUN@example.com", "movie1234"))
            .await
            .unwrap();
        assert_eq!(session.user, user);
        assert_eq!(auth.current_user(session.token).await, Some(user));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email() {
        let auth = MemoryAuthProvider::new();
        auth.sign_up(signup("jieun@example.com")).await.unwrap();

        let wrong = auth.sign_in(login("jieun@example.com", "movie9999")).await;
        assert!(matches!(wrong, Err(AppError::InvalidCredentials)));

        let unknown = auth.sign_in(login("nobody@example.com", "movie1234")).await;
        assert!(matches!(unknown, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let auth = MemoryAuthProvider::new();
        auth.sign_up(signup("jieun@example.com")).await.unwrap();
        let again = auth.sign_up(signup("Jieun@Example.com")).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_invalid_form_rejected() {
        let auth = MemoryAuthProvider::new();
        let mut form = signup("jieun@example.com");
        form.password = "short".to_string();
        form.confirm_password = "short".to_string();
        assert!(matches!(auth.sign_up(form).await, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_sign_out_ends_session() {
        let auth = MemoryAuthProvider::new();
        auth.sign_up(signup("jieun@example.com")).await.unwrap();
        let session = auth
            .sign_in(login("jieun@example.com", "movie1234"))
            .await
            .unwrap();

        auth.sign_out(session.token).await.unwrap();
        assert_eq!(auth.current_user(session.token).await, None);

        // Second sign-out is a no-op
        assert!(auth.sign_out(session.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_auth_state_events() {
        let auth = MemoryAuthProvider::new();
        let mut events = auth.subscribe();

        let user = auth.sign_up(signup("jieun@example.com")).await.unwrap();
        let session = auth
            .sign_in(login("jieun@example.com", "movie1234"))
            .await
            .unwrap();
        auth.sign_out(session.token).await.unwrap();

        assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedUp(user.clone()));
        assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedIn(user.clone()));
        assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedOut(user.id));
    }

    #[test]
    fn test_digest_depends_on_salt() {
        let a = MemoryAuthProvider::digest("salt-a", "movie1234");
        let b = MemoryAuthProvider::digest("salt-b", "movie1234");
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }
}
