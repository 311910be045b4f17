//! The `IdentityProvider` trait.
//!
//! The rest of the system only consumes a stable [`UserId`] and whether a
//! caller is authenticated. Email/password accounts and bearer sessions are
//! the provider's business.

use std::future::Future;

use crate::profile::UserId;

pub trait IdentityProvider: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create an email/password account. Returns `None` if the email is
  /// already registered.
  fn register_account(
    &self,
    email: String,
    password: String,
  ) -> impl Future<Output = Result<Option<UserId>, Self::Error>> + Send + '_;

  /// Remove an account and its sessions. Returns `false` if it was unknown.
  fn delete_account(
    &self,
    user_id: UserId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Check credentials. Returns `None` on an unknown email or wrong password.
  fn authenticate(
    &self,
    email: String,
    password: String,
  ) -> impl Future<Output = Result<Option<UserId>, Self::Error>> + Send + '_;

  /// Issue a bearer token for `user_id`.
  fn open_session(
    &self,
    user_id: UserId,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;

  /// Resolve a bearer token. Returns `None` for unknown or revoked tokens.
  fn resolve_session(
    &self,
    token: String,
  ) -> impl Future<Output = Result<Option<UserId>, Self::Error>> + Send + '_;

  /// Revoke a bearer token (sign-out). Returns `false` if it was unknown.
  fn close_session(
    &self,
    token: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
