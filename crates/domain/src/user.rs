//! User model and the user directory.
//!
//! The directory resolves identity-provider subjects to internal users
//! and carries the admin-gated rider management operations. Token and
//! session mechanics live with the identity provider, not here.

use chrono::{DateTime, Utc};
use common::UserId;
use serde::{Deserialize, Serialize};

use crate::access::{Actor, Role, authorize};
use crate::error::{DomainError, Resource};
use crate::store::Store;

/// A rider's vehicle category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleType {
    Bike,
    Car,
    Van,
}

/// Delivery metadata carried only by rider accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiderDetails {
    #[serde(default)]
    pub vehicle_type: Option<VehicleType>,
    #[serde(default)]
    pub license_number: Option<String>,
}

/// A user document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Identity-provider subject this user is mapped from.
    pub subject_id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub rider_details: Option<RiderDetails>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a rider account.
    pub fn rider(
        subject_id: String,
        name: String,
        email: String,
        phone: Option<String>,
        rider_details: Option<RiderDetails>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            subject_id,
            name,
            email,
            phone,
            address: None,
            role: Role::Rider,
            rider_details: Some(rider_details.unwrap_or_default()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the actor view of this user.
    pub fn actor(&self) -> Actor {
        Actor::new(self.id, self.role)
    }
}

/// Request to register a new rider account.
///
/// The subject id comes from the identity provider, where the rider is
/// registered out of band.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRider {
    pub subject_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub vehicle_type: Option<VehicleType>,
    #[serde(default)]
    pub license_number: Option<String>,
}

/// Partial update to a rider account; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RiderUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub vehicle_type: Option<VehicleType>,
    pub license_number: Option<String>,
}

/// A rider together with their assigned-order workload.
#[derive(Debug, Clone, Serialize)]
pub struct RiderOverview {
    pub user: User,
    pub assigned_orders: u64,
}

/// Identity resolution and rider management over the user collection.
pub struct UserDirectory<S: Store> {
    store: S,
}

impl<S: Store> UserDirectory<S> {
    /// Creates a new directory over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Resolves an identity-provider subject to its user.
    #[tracing::instrument(skip(self))]
    pub async fn lookup(&self, subject_id: &str) -> Result<User, DomainError> {
        self.store
            .get_user_by_subject(subject_id)
            .await?
            .ok_or(DomainError::NotFound(Resource::User))
    }

    /// Registers a new rider account (admin only).
    #[tracing::instrument(skip(self, actor, new_rider))]
    pub async fn create_rider(
        &self,
        actor: &Actor,
        new_rider: NewRider,
    ) -> Result<User, DomainError> {
        authorize(actor.role, Role::Admin)?;

        for (field, value) in [
            ("subject_id", &new_rider.subject_id),
            ("name", &new_rider.name),
            ("email", &new_rider.email),
            ("phone", &new_rider.phone),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::Validation(format!(
                    "rider {field} must not be blank"
                )));
            }
        }

        if self
            .store
            .get_user_by_email(&new_rider.email)
            .await?
            .is_some()
        {
            return Err(DomainError::Validation(format!(
                "a user with email {} already exists",
                new_rider.email
            )));
        }
        if self
            .store
            .get_user_by_subject(&new_rider.subject_id)
            .await?
            .is_some()
        {
            return Err(DomainError::Validation(
                "subject is already mapped to a user".to_string(),
            ));
        }

        let user = User::rider(
            new_rider.subject_id,
            new_rider.name,
            new_rider.email,
            Some(new_rider.phone),
            Some(RiderDetails {
                vehicle_type: new_rider.vehicle_type,
                license_number: new_rider.license_number,
            }),
        );
        self.store.put_user(&user).await?;

        tracing::info!(rider_id = %user.id, "rider created");
        Ok(user)
    }

    /// Updates a rider account (admin only).
    #[tracing::instrument(skip(self, actor, update))]
    pub async fn update_rider(
        &self,
        actor: &Actor,
        rider_id: UserId,
        update: RiderUpdate,
    ) -> Result<User, DomainError> {
        authorize(actor.role, Role::Admin)?;

        let mut user = self.require_rider(rider_id).await?;

        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(phone) = update.phone {
            user.phone = Some(phone);
        }
        if let Some(address) = update.address {
            user.address = Some(address);
        }
        let details = user.rider_details.get_or_insert_with(RiderDetails::default);
        if let Some(vehicle_type) = update.vehicle_type {
            details.vehicle_type = Some(vehicle_type);
        }
        if let Some(license_number) = update.license_number {
            details.license_number = Some(license_number);
        }
        user.updated_at = Utc::now();

        self.store.put_user(&user).await?;
        Ok(user)
    }

    /// Deletes a rider account (admin only).
    #[tracing::instrument(skip(self, actor))]
    pub async fn delete_rider(&self, actor: &Actor, rider_id: UserId) -> Result<(), DomainError> {
        authorize(actor.role, Role::Admin)?;
        self.require_rider(rider_id).await?;
        self.store.delete_user(rider_id).await?;
        Ok(())
    }

    /// Lists riders with their assigned-order counts (admin only),
    /// sorted by name.
    #[tracing::instrument(skip(self, actor))]
    pub async fn list_riders(&self, actor: &Actor) -> Result<Vec<RiderOverview>, DomainError> {
        authorize(actor.role, Role::Admin)?;

        let mut riders = self.store.list_users_by_role(Role::Rider).await?;
        riders.sort_by(|a, b| a.name.cmp(&b.name));

        let mut overviews = Vec::with_capacity(riders.len());
        for user in riders {
            let assigned_orders = self.store.count_orders_for_rider(user.id).await?;
            overviews.push(RiderOverview {
                user,
                assigned_orders,
            });
        }
        Ok(overviews)
    }

    /// Lists the orders assigned to a specific rider (admin only).
    #[tracing::instrument(skip(self, actor))]
    pub async fn rider_orders(
        &self,
        actor: &Actor,
        rider_id: UserId,
    ) -> Result<Vec<crate::order::Order>, DomainError> {
        authorize(actor.role, Role::Admin)?;
        self.require_rider(rider_id).await?;
        Ok(self.store.list_orders_for_rider(rider_id).await?)
    }

    /// Changes another user's role (admin only).
    ///
    /// A role is never changeable by its holder, so an admin cannot
    /// rewrite their own.
    #[tracing::instrument(skip(self, actor))]
    pub async fn set_role(
        &self,
        actor: &Actor,
        user_id: UserId,
        role: Role,
    ) -> Result<User, DomainError> {
        authorize(actor.role, Role::Admin)?;
        if actor.id == user_id {
            return Err(DomainError::Forbidden("cannot change your own role"));
        }

        let mut user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(DomainError::NotFound(Resource::User))?;

        user.role = role;
        if role == Role::Rider && user.rider_details.is_none() {
            user.rider_details = Some(RiderDetails::default());
        }
        user.updated_at = Utc::now();

        self.store.put_user(&user).await?;
        Ok(user)
    }

    async fn require_rider(&self, rider_id: UserId) -> Result<User, DomainError> {
        match self.store.get_user(rider_id).await? {
            Some(user) if user.role == Role::Rider => Ok(user),
            _ => Err(DomainError::NotFound(Resource::Rider)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_store::MemoryStore;

    fn new_rider(tag: &str) -> NewRider {
        NewRider {
            subject_id: format!("sub-{tag}"),
            name: format!("Rider {tag}"),
            email: format!("{tag}@example.com"),
            phone: "555-0100".to_string(),
            vehicle_type: Some(VehicleType::Bike),
            license_number: Some("LIC-7".to_string()),
        }
    }

    fn setup() -> (UserDirectory<MemoryStore>, MemoryStore, Actor) {
        let store = MemoryStore::new();
        (
            UserDirectory::new(store.clone()),
            store,
            Actor::new(UserId::new(), Role::Admin),
        )
    }

    #[tokio::test]
    async fn lookup_resolves_subject_to_user() {
        let (directory, _, admin) = setup();
        let created = directory.create_rider(&admin, new_rider("kim")).await.unwrap();

        let found = directory.lookup("sub-kim").await.unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.role, Role::Rider);

        let missing = directory.lookup("sub-nobody").await;
        assert!(matches!(missing, Err(DomainError::NotFound(Resource::User))));
    }

    #[tokio::test]
    async fn create_rider_requires_admin() {
        let (directory, _, _) = setup();
        let customer = Actor::new(UserId::new(), Role::Customer);
        let result = directory.create_rider(&customer, new_rider("kim")).await;
        assert!(matches!(result, Err(DomainError::Forbidden(_))));
    }

    #[tokio::test]
    async fn create_rider_rejects_blank_and_duplicate_fields() {
        let (directory, _, admin) = setup();

        let mut blank = new_rider("kim");
        blank.phone = "  ".to_string();
        assert!(matches!(
            directory.create_rider(&admin, blank).await,
            Err(DomainError::Validation(_))
        ));

        directory.create_rider(&admin, new_rider("kim")).await.unwrap();
        let mut dup = new_rider("other");
        dup.email = "kim@example.com".to_string();
        assert!(matches!(
            directory.create_rider(&admin, dup).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn update_rider_applies_partial_changes() {
        let (directory, _, admin) = setup();
        let rider = directory.create_rider(&admin, new_rider("kim")).await.unwrap();

        let updated = directory
            .update_rider(
                &admin,
                rider.id,
                RiderUpdate {
                    phone: Some("555-0199".to_string()),
                    vehicle_type: Some(VehicleType::Van),
                    ..RiderUpdate::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Rider kim");
        assert_eq!(updated.phone.as_deref(), Some("555-0199"));
        assert_eq!(
            updated.rider_details.as_ref().unwrap().vehicle_type,
            Some(VehicleType::Van)
        );
        assert_eq!(
            updated.rider_details.as_ref().unwrap().license_number.as_deref(),
            Some("LIC-7")
        );
    }

    #[tokio::test]
    async fn update_rider_rejects_non_riders() {
        let (directory, store, admin) = setup();
        let mut user = User::rider(
            "sub-x".to_string(),
            "X".to_string(),
            "x@example.com".to_string(),
            None,
            None,
        );
        user.role = Role::Customer;
        store.put_user(&user).await.unwrap();

        let result = directory
            .update_rider(&admin, user.id, RiderUpdate::default())
            .await;
        assert!(matches!(result, Err(DomainError::NotFound(Resource::Rider))));
    }

    #[tokio::test]
    async fn delete_rider_removes_the_account() {
        let (directory, store, admin) = setup();
        let rider = directory.create_rider(&admin, new_rider("kim")).await.unwrap();

        directory.delete_rider(&admin, rider.id).await.unwrap();
        assert!(store.get_user(rider.id).await.unwrap().is_none());

        let again = directory.delete_rider(&admin, rider.id).await;
        assert!(matches!(again, Err(DomainError::NotFound(Resource::Rider))));
    }

    #[tokio::test]
    async fn list_riders_is_sorted_and_counts_assignments() {
        let (directory, _, admin) = setup();
        directory.create_rider(&admin, new_rider("zoe")).await.unwrap();
        directory.create_rider(&admin, new_rider("abe")).await.unwrap();

        let riders = directory.list_riders(&admin).await.unwrap();
        assert_eq!(riders.len(), 2);
        assert_eq!(riders[0].user.name, "Rider abe");
        assert_eq!(riders[1].user.name, "Rider zoe");
        assert_eq!(riders[0].assigned_orders, 0);
    }

    #[tokio::test]
    async fn set_role_cannot_target_self() {
        let (directory, store, admin) = setup();
        let mut admin_user = User::rider(
            "sub-admin".to_string(),
            "Admin".to_string(),
            "admin@example.com".to_string(),
            None,
            None,
        );
        admin_user.id = admin.id;
        admin_user.role = Role::Admin;
        store.put_user(&admin_user).await.unwrap();

        let result = directory.set_role(&admin, admin.id, Role::Customer).await;
        assert!(matches!(result, Err(DomainError::Forbidden(_))));
    }

    #[tokio::test]
    async fn set_role_promotes_customer_to_rider() {
        let (directory, store, admin) = setup();
        let mut user = User::rider(
            "sub-y".to_string(),
            "Y".to_string(),
            "y@example.com".to_string(),
            None,
            None,
        );
        user.role = Role::Customer;
        user.rider_details = None;
        store.put_user(&user).await.unwrap();

        let updated = directory.set_role(&admin, user.id, Role::Rider).await.unwrap();
        assert_eq!(updated.role, Role::Rider);
        assert!(updated.rider_details.is_some());
    }
}
