use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::repo::UserStore;
use super::repo_types::{NewUser, StoreError, TokenRedemption, User};
use crate::verification::token::VerificationToken;

/// In-process `UserStore` used by the test suite. Uniqueness mirrors the
/// Postgres schema: email, google_id and verify_token.
#[derive(Default)]
pub struct MemoryUserStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    oauth_states: HashMap<String, (String, OffsetDateTime)>,
}

impl Inner {
    fn taken(&self, except: Option<Uuid>, pred: impl Fn(&User) -> bool) -> bool {
        self.users
            .values()
            .any(|u| Some(u.id) != except && pred(u))
    }
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.inner.lock().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_google_id(&self, google_id: &str) -> anyhow::Result<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .users
            .values()
            .find(|u| u.google_id.as_deref() == Some(google_id))
            .cloned())
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.taken(None, |u| {
            u.email == new.email || (new.google_id.is_some() && u.google_id == new.google_id)
        }) {
            return Err(StoreError::Duplicate);
        }
        let now = OffsetDateTime::now_utc();
        let (verify_token, verify_token_expiry) = match new.verify_token {
            Some(t) => (Some(t.value), Some(t.expires_at)),
            None => (None, None),
        };
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            name: new.name,
            password_hash: new.password_hash,
            google_id: new.google_id,
            email_verified: new.email_verified,
            verify_token,
            verify_token_expiry,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn link_google(
        &self,
        id: Uuid,
        google_id: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<User> {
        let mut inner = self.inner.lock().await;
        let user = inner
            .users
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("user {id} not found"))?;
        user.google_id = Some(google_id.to_string());
        user.email_verified = user.email_verified.or(Some(now));
        user.verify_token = None;
        user.verify_token_expiry = None;
        user.updated_at = now;
        Ok(user.clone())
    }

    async fn set_pending_email(
        &self,
        id: Uuid,
        email: &str,
        token: &VerificationToken,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.taken(Some(id), |u| u.email == email) {
            return Err(StoreError::Duplicate);
        }
        let user = inner
            .users
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("user {id} not found"))?;
        user.email = email.to_string();
        user.email_verified = None;
        user.verify_token = Some(token.value.clone());
        user.verify_token_expiry = Some(token.expires_at);
        user.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().await;
        let user = inner
            .users
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("user {id} not found"))?;
        user.password_hash = Some(password_hash.to_string());
        user.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }

    async fn redeem_verify_token(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<TokenRedemption> {
        let mut inner = self.inner.lock().await;
        let Some(user) = inner
            .users
            .values_mut()
            .find(|u| u.verify_token.as_deref() == Some(token))
        else {
            return Ok(TokenRedemption::Unknown);
        };
        if user.verify_token_expiry.is_some_and(|exp| exp < now) {
            return Ok(TokenRedemption::Expired);
        }
        user.email_verified = Some(now);
        user.verify_token = None;
        user.verify_token_expiry = None;
        user.updated_at = now;
        Ok(TokenRedemption::Verified(user.id))
    }

    async fn save_oauth_state(
        &self,
        state: &str,
        pkce_verifier: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        self.inner
            .lock()
            .await
            .oauth_states
            .insert(state.to_string(), (pkce_verifier.to_string(), expires_at));
        Ok(())
    }

    async fn take_oauth_state(
        &self,
        state: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<String>> {
        let mut inner = self.inner.lock().await;
        inner.oauth_states.retain(|_, (_, expires_at)| *expires_at > now);
        Ok(inner
            .oauth_states
            .remove(state)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(verifier, _)| verifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn token(value: &str, ttl: Duration) -> VerificationToken {
        VerificationToken {
            value: value.into(),
            expires_at: OffsetDateTime::now_utc() + ttl,
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_email() {
        let store = MemoryUserStore::new();
        let new = NewUser {
            email: "a@x.com".into(),
            ..Default::default()
        };
        store.create(new.clone()).await.expect("first insert");
        let err = store.create(new).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
    }

    #[tokio::test]
    async fn redeem_clears_token_once() {
        let store = MemoryUserStore::new();
        store
            .create(NewUser {
                email: "a@x.com".into(),
                verify_token: Some(token("tok", Duration::hours(1))),
                ..Default::default()
            })
            .await
            .unwrap();

        let now = OffsetDateTime::now_utc();
        assert!(matches!(
            store.redeem_verify_token("tok", now).await.unwrap(),
            TokenRedemption::Verified(_)
        ));
        assert_eq!(
            store.redeem_verify_token("tok", now).await.unwrap(),
            TokenRedemption::Unknown
        );
    }

    #[tokio::test]
    async fn oauth_state_is_single_use_and_expires() {
        let store = MemoryUserStore::new();
        let now = OffsetDateTime::now_utc();
        store
            .save_oauth_state("s1", "v1", now + Duration::minutes(10))
            .await
            .unwrap();
        store
            .save_oauth_state("s2", "v2", now - Duration::minutes(1))
            .await
            .unwrap();

        assert_eq!(store.take_oauth_state("s1", now).await.unwrap().as_deref(), Some("v1"));
        assert_eq!(store.take_oauth_state("s1", now).await.unwrap(), None);
        assert_eq!(store.take_oauth_state("s2", now).await.unwrap(), None);
    }

    #[tokio::test]
    async fn taking_a_state_sweeps_abandoned_ones() {
        let store = MemoryUserStore::new();
        let now = OffsetDateTime::now_utc();
        store
            .save_oauth_state("stale", "v0", now - Duration::minutes(5))
            .await
            .unwrap();
        store
            .save_oauth_state("live", "v1", now + Duration::minutes(10))
            .await
            .unwrap();

        assert_eq!(store.take_oauth_state("other", now).await.unwrap(), None);
        let inner = store.inner.lock().await;
        assert!(!inner.oauth_states.contains_key("stale"));
        assert!(inner.oauth_states.contains_key("live"));
    }

    #[tokio::test]
    async fn updates_for_missing_user_fail() {
        let store = MemoryUserStore::new();
        let id = Uuid::new_v4();
        let err = store
            .set_pending_email(id, "a@x.com", &token("tok", Duration::hours(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Other(_)));
        assert!(store.set_password_hash(id, "hash").await.is_err());
    }
}
