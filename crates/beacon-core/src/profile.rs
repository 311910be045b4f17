//! User identity and the emergency-contact profile.
//!
//! A profile is keyed by the identity-provider user id; there is no separate
//! surrogate key. Profiles are created at registration with minimal fields
//! and completed by their owner later.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::Error;

// ─── Identity ────────────────────────────────────────────────────────────────

/// Stable, opaque user identifier issued by the identity provider.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  /// Mint a fresh random identifier.
  pub fn generate() -> Self { Self(Uuid::new_v4().to_string()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for UserId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

// ─── Role ────────────────────────────────────────────────────────────────────

/// Role flag assigned at registration. Not editable through profile updates.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
  #[default]
  Student,
  Admin,
}

impl UserType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Student => "student",
      Self::Admin => "admin",
    }
  }
}

impl FromStr for UserType {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "student" => Ok(Self::Student),
      "admin" => Ok(Self::Admin),
      other => Err(Error::UnknownUserType(other.to_owned())),
    }
  }
}

// ─── Profile ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
  /// Doubles as the record key.
  pub user_id:                        UserId,
  pub contact_name:                   String,
  pub contact_phone_number:           String,
  pub emergency_contact_name:         String,
  pub emergency_contact_phone_number: String,
  pub medical_information:            Option<String>,
  pub student_number:                 Option<String>,
  pub user_type:                      UserType,
}

impl UserProfile {
  /// The profile written at registration: name and role only, contact
  /// fields left empty for the owner to complete. A student number is only
  /// kept for students.
  pub fn minimal(
    user_id: UserId,
    contact_name: impl Into<String>,
    user_type: UserType,
    student_number: Option<String>,
  ) -> Self {
    let student_number = match user_type {
      UserType::Student => student_number.filter(|n| !n.trim().is_empty()),
      UserType::Admin => None,
    };
    Self {
      user_id,
      contact_name: contact_name.into(),
      contact_phone_number: String::new(),
      emergency_contact_name: String::new(),
      emergency_contact_phone_number: String::new(),
      medical_information: None,
      student_number,
      user_type,
    }
  }

  pub fn is_admin(&self) -> bool { self.user_type == UserType::Admin }

  /// A profile without a contact phone number still needs its owner to
  /// finish setup.
  pub fn setup_required(&self) -> bool {
    self.contact_phone_number.trim().is_empty()
  }

  /// Merge `update` onto this profile. Fields absent from the update are
  /// left as they are.
  pub fn apply(&mut self, update: &ProfileUpdate) {
    if let Some(v) = &update.contact_name {
      self.contact_name = v.clone();
    }
    if let Some(v) = &update.contact_phone_number {
      self.contact_phone_number = v.clone();
    }
    if let Some(v) = &update.emergency_contact_name {
      self.emergency_contact_name = v.clone();
    }
    if let Some(v) = &update.emergency_contact_phone_number {
      self.emergency_contact_phone_number = v.clone();
    }
    if let Some(v) = &update.medical_information {
      self.medical_information = Some(v.clone());
    }
  }
}

// ─── Updates ─────────────────────────────────────────────────────────────────

/// Partial profile update. Only the fields that are present are validated
/// and written. `userType` and `studentNumber` are deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
  #[validate(length(min = 2, message = "Full name must be at least 2 characters."))]
  pub contact_name:                   Option<String>,
  #[validate(length(min = 10, message = "Please enter a valid phone number."))]
  pub contact_phone_number:           Option<String>,
  #[validate(length(min = 2, message = "Contact name must be at least 2 characters."))]
  pub emergency_contact_name:         Option<String>,
  #[validate(length(min = 10, message = "Please enter a valid phone number."))]
  pub emergency_contact_phone_number: Option<String>,
  pub medical_information:            Option<String>,
}

impl ProfileUpdate {
  pub fn is_empty(&self) -> bool { *self == Self::default() }
}

/// Input to account registration.
#[derive(Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
  #[validate(email(message = "Please enter a valid email address."))]
  pub email:          String,
  #[validate(length(min = 6, message = "The password is too weak."))]
  pub password:       String,
  #[validate(length(min = 2, message = "Full name must be at least 2 characters."))]
  pub full_name:      String,
  #[serde(default)]
  pub user_type:      UserType,
  pub student_number: Option<String>,
}
