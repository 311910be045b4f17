//! Role checks applied at the operation boundary.
//!
//! The store holds the role as a plain profile field and enforces nothing;
//! every status mutation, all-reports read and directory read goes through
//! [`authorize`] first.

use crate::{
  Error, Result,
  profile::{UserId, UserProfile, UserType},
};

/// An authenticated user together with the role read from their profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
  pub user_id: UserId,
  pub role:    UserType,
}

impl Actor {
  pub fn from_profile(profile: &UserProfile) -> Self {
    Self { user_id: profile.user_id.clone(), role: profile.user_type }
  }

  pub fn is_admin(&self) -> bool { self.role == UserType::Admin }
}

/// Something an actor wants to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission<'a> {
  ChangeStatus,
  ListAllReports,
  ListUsers,
  /// Read reports belonging to the given user.
  ReadReportsOf(&'a UserId),
}

pub fn authorize(actor: &Actor, permission: Permission<'_>) -> Result<()> {
  match permission {
    Permission::ChangeStatus if !actor.is_admin() => {
      Err(Error::Forbidden("only administrators may change report status"))
    }
    Permission::ListAllReports if !actor.is_admin() => {
      Err(Error::Forbidden("only administrators may list all reports"))
    }
    Permission::ListUsers if !actor.is_admin() => {
      Err(Error::Forbidden("only administrators may list users"))
    }
    Permission::ReadReportsOf(owner)
      if !actor.is_admin() && *owner != actor.user_id =>
    {
      Err(Error::Forbidden("reports belong to another user"))
    }
    _ => Ok(()),
  }
}
