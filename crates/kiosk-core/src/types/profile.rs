//! Registration profile submitted when a user walks up to the kiosk.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;

/// Gender options offered by the registration form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    /// Male.
    Male,
    /// Female.
    Female,
}

/// User profile fields sent to `POST register`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Given name.
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    /// Family name.
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    /// Contact email.
    #[validate(email)]
    pub email: String,
    /// Age in years.
    #[validate(range(max = 120))]
    pub age: u32,
    /// Contact phone number.
    #[validate(length(min = 1, max = 32))]
    pub contact_number: String,
    /// Gender.
    pub gender: Gender,
}

impl Profile {
    /// Run local validation, mapping failures to a `Validation` error.
    pub fn check(&self) -> Result<(), AppError> {
        self.validate().map_err(AppError::from)
    }
}
