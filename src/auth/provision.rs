//! Find-or-create of local users for every login source.

use rand::{
    distr::{Alphanumeric, SampleString},
    seq::IndexedRandom,
};

use super::github::ProviderProfile;
use crate::{
    db::models::{NewUser, User, ROLE_USER},
    store::{Store, StoreError, StoreResult},
};

const GUEST_SURNAMES: &[&str] = &[
    "Otter", "Falcon", "Badger", "Heron", "Lynx", "Marten", "Puffin", "Raven", "Stoat", "Wren",
];

/// A login source's view of a person, before it is tied to a local user.
#[derive(Debug, Clone)]
pub struct ProviderIdentity {
    pub provider_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub is_guest: bool,
}

impl ProviderIdentity {
    pub fn from_github(profile: ProviderProfile) -> Self {
        Self {
            provider_id: profile.id,
            first_name: profile
                .username
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            last_name: String::new(),
            email: profile.email.filter(|e| !e.is_empty()),
            avatar: profile.avatar,
            bio: profile.bio,
            is_guest: false,
        }
    }

    /// A throwaway identity with random display data.
    pub fn guest() -> Self {
        let mut rng = rand::rng();
        let suffix = Alphanumeric.sample_string(&mut rng, 4);
        let surname = GUEST_SURNAMES.choose(&mut rng).copied().unwrap_or("Visitor");

        Self {
            provider_id: format!("guest-{}", Alphanumeric.sample_string(&mut rng, 16)),
            first_name: format!("Guest{suffix}"),
            last_name: surname.to_string(),
            email: None,
            avatar: None,
            bio: None,
            is_guest: true,
        }
    }
}

/// Return the local user for `identity`, creating it on first login.
///
/// A concurrent first login for the same provider id loses the insert race
/// and re-reads the winner's row.
pub async fn provision_identity(store: &dyn Store, identity: ProviderIdentity) -> StoreResult<User> {
    if let Some(user) = store.find_user_by_github_id(&identity.provider_id).await? {
        return Ok(user);
    }

    let provider_id = identity.provider_id.clone();
    let new_user = NewUser {
        github_id: identity.provider_id,
        first_name: identity.first_name,
        last_name: identity.last_name,
        email: identity.email,
        profile_picture: identity.avatar,
        bio: identity.bio,
        role: ROLE_USER.to_string(),
        is_guest: identity.is_guest,
    };

    match store.create_user(new_user).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, guest = user.is_guest, "Provisioned new user");
            Ok(user)
        }
        Err(StoreError::Conflict(what)) => store
            .find_user_by_github_id(&provider_id)
            .await?
            .ok_or(StoreError::Conflict(what)),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn github_profile(id: &str, username: Option<&str>) -> ProviderProfile {
        ProviderProfile {
            id: id.to_string(),
            username: username.map(str::to_string),
            email: Some(format!("{id}@users.example")),
            avatar: Some("https://avatars/1.png".to_string()),
            bio: Some("hi".to_string()),
        }
    }

    #[tokio::test]
    async fn test_first_login_creates_user() {
        let store = MemoryStore::new();
        let user = provision_identity(
            &store,
            ProviderIdentity::from_github(github_profile("7", Some("octocat"))),
        )
        .await
        .unwrap();

        assert_eq!(user.github_id, "7");
        assert_eq!(user.first_name, "octocat");
        assert_eq!(user.last_name, "");
        assert_eq!(user.role, ROLE_USER);
        assert_eq!(user.profile_picture.as_deref(), Some("https://avatars/1.png"));
        assert!(!user.is_guest);
    }

    #[tokio::test]
    async fn test_second_login_returns_same_user() {
        let store = MemoryStore::new();
        let first = provision_identity(
            &store,
            ProviderIdentity::from_github(github_profile("7", Some("octocat"))),
        )
        .await
        .unwrap();
        let second = provision_identity(
            &store,
            ProviderIdentity::from_github(github_profile("7", Some("renamed"))),
        )
        .await
        .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.first_name, "octocat");
    }

    #[tokio::test]
    async fn test_missing_username_falls_back() {
        let identity = ProviderIdentity::from_github(github_profile("8", None));
        assert_eq!(identity.first_name, "Unknown");
    }

    #[tokio::test]
    async fn test_guests_are_distinct() {
        let store = MemoryStore::new();
        let a = provision_identity(&store, ProviderIdentity::guest()).await.unwrap();
        let b = provision_identity(&store, ProviderIdentity::guest()).await.unwrap();

        assert_ne!(a.id, b.id);
        assert!(a.is_guest);
        assert!(a.github_id.starts_with("guest-"));
        assert!(a.first_name.starts_with("Guest"));
    }
}
