//! Business Service
//! Mission: Business lifecycle, gated on the owner's live role set and on
//! ownership for changes

use crate::auth::models::UserRole;
use crate::auth::rbac::RoleHolder;
use crate::auth::user_store::UserRepository;
use crate::business::models::{Business, CreateBusinessRequest, UpdateBusinessRequest};
use crate::business::store::BusinessRepository;
use crate::db::StoreError;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BusinessError {
    #[error("{0}")]
    Invalid(&'static str),
    #[error("owner user not found")]
    OwnerNotFound,
    #[error("user must have Business Owner role to create a business")]
    NotBusinessOwner,
    #[error("you are not the owner of this business")]
    NotOwner,
    #[error("business not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct BusinessService {
    businesses: Arc<dyn BusinessRepository>,
    users: Arc<dyn UserRepository>,
}

impl BusinessService {
    pub fn new(businesses: Arc<dyn BusinessRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { businesses, users }
    }

    /// The token already passed the route-level role gate; the stored user is
    /// checked again so a role revoked since issuance blocks creation.
    #[instrument(skip(self, req), fields(owner_id = %owner_id, name = %req.name))]
    pub async fn create(
        &self,
        owner_id: Uuid,
        req: CreateBusinessRequest,
    ) -> Result<Business, BusinessError> {
        req.validate().map_err(BusinessError::Invalid)?;

        let owner = self
            .users
            .find_by_id(owner_id)
            .await?
            .ok_or(BusinessError::OwnerNotFound)?;

        if !owner.has_role(UserRole::BusinessOwner) {
            warn!(roles = ?owner.roles, "User does not have Business Owner role");
            return Err(BusinessError::NotBusinessOwner);
        }

        let business = req.into_business(owner_id);
        self.businesses.create(&business).await?;

        info!(business_id = %business.id, "Business created");
        Ok(business)
    }

    pub async fn get(&self, id: Uuid) -> Result<Business, BusinessError> {
        self.businesses
            .find_by_id(id)
            .await?
            .ok_or(BusinessError::NotFound)
    }

    pub async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Business>, BusinessError> {
        let businesses = self.businesses.find_by_owner(owner_id).await?;
        info!(owner_id = %owner_id, count = businesses.len(), "Retrieved businesses by owner");
        Ok(businesses)
    }

    pub async fn list_all(&self) -> Result<Vec<Business>, BusinessError> {
        Ok(self.businesses.list().await?)
    }

    #[instrument(skip(self, req), fields(business_id = %id, caller_id = %caller_id))]
    pub async fn update(
        &self,
        id: Uuid,
        caller_id: Uuid,
        req: UpdateBusinessRequest,
    ) -> Result<Business, BusinessError> {
        req.validate().map_err(BusinessError::Invalid)?;

        let mut business = self.owned_by(id, caller_id).await?;
        req.apply_to(&mut business);
        self.businesses
            .update(&business)
            .await
            .map_err(not_found_as_business)?;

        info!("Business updated");
        Ok(business)
    }

    #[instrument(skip(self), fields(business_id = %id, caller_id = %caller_id))]
    pub async fn delete(&self, id: Uuid, caller_id: Uuid) -> Result<(), BusinessError> {
        self.owned_by(id, caller_id).await?;
        self.businesses
            .delete(id)
            .await
            .map_err(not_found_as_business)?;

        info!("Business deleted");
        Ok(())
    }

    async fn owned_by(&self, id: Uuid, caller_id: Uuid) -> Result<Business, BusinessError> {
        let business = self.get(id).await?;
        if business.owner_id != caller_id {
            warn!(actual_owner_id = %business.owner_id, "Caller does not own this business");
            return Err(BusinessError::NotOwner);
        }
        Ok(business)
    }
}

// The row can vanish between the ownership read and the write
fn not_found_as_business(err: StoreError) -> BusinessError {
    match err {
        StoreError::NotFound => BusinessError::NotFound,
        other => BusinessError::Store(other),
    }
}
