//! Business Models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Business {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBusinessRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub address: String,
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

impl CreateBusinessRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        check_name(&self.name)?;
        check_description(&self.description)?;
        check_address(&self.address)?;
        check_phone(&self.phone)?;
        check_email(&self.email)
    }

    pub fn into_business(self, owner_id: Uuid) -> Business {
        let now = Utc::now();
        Business {
            id: Uuid::new_v4(),
            owner_id,
            name: self.name.trim().to_string(),
            description: self.description,
            address: self.address,
            phone: self.phone.trim().to_string(),
            email: self.email.trim().to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update; absent fields are left as they are
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBusinessRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateBusinessRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if let Some(name) = &self.name {
            check_name(name)?;
        }
        if let Some(description) = &self.description {
            check_description(description)?;
        }
        if let Some(address) = &self.address {
            check_address(address)?;
        }
        if let Some(phone) = &self.phone {
            check_phone(phone)?;
        }
        if let Some(email) = &self.email {
            check_email(email)?;
        }
        Ok(())
    }

    pub fn apply_to(self, business: &mut Business) {
        if let Some(name) = self.name {
            business.name = name.trim().to_string();
        }
        if let Some(description) = self.description {
            business.description = description;
        }
        if let Some(address) = self.address {
            business.address = address;
        }
        if let Some(phone) = self.phone {
            business.phone = phone.trim().to_string();
        }
        if let Some(email) = self.email {
            business.email = email.trim().to_string();
        }
        if let Some(is_active) = self.is_active {
            business.is_active = is_active;
        }
        business.updated_at = Utc::now();
    }
}

fn check_name(name: &str) -> Result<(), &'static str> {
    if !(3..=255).contains(&name.trim().chars().count()) {
        return Err("name must be between 3 and 255 characters");
    }
    Ok(())
}

fn check_description(description: &str) -> Result<(), &'static str> {
    if description.chars().count() > 1000 {
        return Err("description must be at most 1000 characters");
    }
    Ok(())
}

fn check_address(address: &str) -> Result<(), &'static str> {
    if address.chars().count() > 500 {
        return Err("address must be at most 500 characters");
    }
    Ok(())
}

fn check_phone(phone: &str) -> Result<(), &'static str> {
    if !(10..=50).contains(&phone.trim().chars().count()) {
        return Err("phone must be between 10 and 50 characters");
    }
    Ok(())
}

// Empty means "no email"
fn check_email(email: &str) -> Result<(), &'static str> {
    let email = email.trim();
    if email.is_empty() {
        return Ok(());
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err("email must be a valid address"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateBusinessRequest {
        CreateBusinessRequest {
            name: "Barber Shop".to_string(),
            description: String::new(),
            address: "Rua A, 10".to_string(),
            phone: "+5511999990000".to_string(),
            email: String::new(),
        }
    }

    #[test]
    fn test_valid_request() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_field_limits() {
        let mut req = request();
        req.name = "ab".to_string();
        assert!(req.validate().is_err());

        let mut req = request();
        req.phone = "12345".to_string();
        assert!(req.validate().is_err());

        let mut req = request();
        req.email = "nope".to_string();
        assert!(req.validate().is_err());

        let mut req = request();
        req.description = "x".repeat(1001);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_update_only_touches_given_fields() {
        let mut business = request().into_business(Uuid::new_v4());
        let before = business.clone();

        let update = UpdateBusinessRequest {
            name: Some("  Barber Shop & Spa ".to_string()),
            is_active: Some(false),
            ..Default::default()
        };
        assert!(update.validate().is_ok());
        update.apply_to(&mut business);

        assert_eq!(business.name, "Barber Shop & Spa");
        assert!(!business.is_active);
        assert_eq!(business.phone, before.phone);
        assert_eq!(business.address, before.address);
        assert!(business.updated_at >= before.updated_at);
    }

    #[test]
    fn test_update_validation() {
        assert!(UpdateBusinessRequest::default().validate().is_ok());

        let update = UpdateBusinessRequest {
            phone: Some("123".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_err());

        let update = UpdateBusinessRequest {
            email: Some("nope".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_into_business_is_active() {
        let owner = Uuid::new_v4();
        let business = request().into_business(owner);
        assert_eq!(business.owner_id, owner);
        assert!(business.is_active);
        assert_eq!(business.name, "Barber Shop");
    }
}
