//! Customer profiles, wishlist and the contact form.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{Notice, Storefront};
use crate::domain::aggregates::account::normalize_email;
use crate::domain::aggregates::{ContactMessage, Order, User, WishlistEntry};
use crate::{Result, ShopError};

/// Registration and profile updates share one shape. Credentials live with the identity provider.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ProfileForm {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 1, max = 150, message = "Full name is required."))]
    pub full_name: String,
    #[validate(length(max = 20, message = "Phone number is too long."))]
    pub phone: String,
}

impl ProfileForm {
    fn trimmed(self) -> Self {
        Self { email: self.email.trim().to_string(), full_name: self.full_name.trim().to_string(), phone: self.phone.trim().to_string() }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ContactForm {
    #[validate(length(min = 1, message = "All fields are required."))]
    pub name: String,
    #[validate(length(min = 1, message = "All fields are required."))]
    pub email: String,
    #[validate(length(min = 1, message = "All fields are required."))]
    pub subject: String,
    #[validate(length(min = 1, message = "All fields are required."))]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct Profile {
    pub user: User,
    pub orders: Vec<Order>,
}

impl Storefront {
    pub async fn register(&self, form: ProfileForm) -> Result<(User, Notice)> {
        let form = form.trimmed();
        form.validate()?;
        if self.store.user_by_email(&form.email).await?.is_some() {
            return Err(ShopError::DuplicateEmail);
        }
        let user = User::register(&form.email, form.full_name, form.phone);
        self.store.insert_user(&user).await?;
        tracing::info!(user_id = %user.id, "customer registered");
        let notice = Notice::success(format!("Welcome, {}! Your account has been created.", user.full_name));
        Ok((user, notice))
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<Profile> {
        let user = self.store.user(user_id).await?.ok_or(ShopError::NotFound("User"))?;
        Ok(Profile { user, orders: self.store.orders_for_user(user_id).await? })
    }

    pub async fn update_profile(&self, user_id: Uuid, form: ProfileForm) -> Result<(User, Notice)> {
        let form = form.trimmed();
        form.validate()?;
        let mut user = self.store.user(user_id).await?.ok_or(ShopError::NotFound("User"))?;
        if self.store.user_by_email(&form.email).await?.is_some_and(|other| other.id != user_id) {
            return Err(ShopError::DuplicateEmail);
        }
        user.email = normalize_email(&form.email);
        user.full_name = form.full_name;
        user.phone = form.phone;
        self.store.update_user(&user).await?;
        Ok((user, Notice::success("Your profile has been updated!")))
    }

    pub async fn wishlist(&self, user_id: Uuid) -> Result<Vec<WishlistEntry>> { self.store.wishlist(user_id).await }

    pub async fn add_to_wishlist(&self, user_id: Uuid, product_id: Uuid) -> Result<Notice> {
        let product = self.store.product(product_id).await?.ok_or(ShopError::NotFound("Product"))?;
        self.store.add_to_wishlist(user_id, product_id).await?;
        Ok(Notice::success(format!("'{}' has been added to your wishlist.", product.name)))
    }

    pub async fn remove_from_wishlist(&self, user_id: Uuid, product_id: Uuid) -> Result<Notice> {
        let product = self.store.product(product_id).await?.ok_or(ShopError::NotFound("Product"))?;
        self.store.remove_from_wishlist(user_id, product_id).await?;
        Ok(Notice::success(format!("'{}' has been removed from your wishlist.", product.name)))
    }

    pub async fn send_contact(&self, form: ContactForm) -> Result<Notice> {
        let t = |s: String| s.trim().to_string();
        let form = ContactForm { name: t(form.name), email: t(form.email), subject: t(form.subject), message: t(form.message) };
        if form.validate().is_err() {
            return Err(ShopError::Validation("All fields are required.".into()));
        }
        let message = ContactMessage {
            id: Uuid::now_v7(), name: form.name, email: form.email, subject: form.subject, message: form.message, created_at: Utc::now(),
        };
        self.store.insert_contact(&message).await?;
        tracing::info!(contact_id = %message.id, "contact message received");
        Ok(Notice::success("Thank you for your message!"))
    }
}
