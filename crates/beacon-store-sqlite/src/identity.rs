//! Email/password accounts and bearer sessions.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use beacon_core::{UserId, identity::IdentityProvider};
use chrono::Utc;
use rand_core::{OsRng, RngCore};
use rusqlite::OptionalExtension as _;
use sha2::{Digest, Sha256};

use crate::{Error, Result, SqliteStore, encode::encode_dt};

fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| Error::PasswordHash(e.to_string()))?
      .to_string(),
  )
}

fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
    .is_ok()
}

/// A fresh bearer token: 32 random bytes, hex encoded.
fn new_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

fn token_digest(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

impl IdentityProvider for SqliteStore {
  type Error = Error;

  async fn register_account(&self, email: String, password: String) -> Result<Option<UserId>> {
    let email   = normalize_email(&email);
    let hash    = hash_password(&password)?;
    let user_id = UserId::generate();
    let id_str  = user_id.as_str().to_owned();
    let at_str  = encode_dt(Utc::now());

    let created = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT OR IGNORE INTO accounts (user_id, email, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, email, hash, at_str],
        )?;
        Ok(n == 1)
      })
      .await?;

    if created {
      tracing::debug!(user_id = %user_id, "account registered");
    }
    Ok(created.then_some(user_id))
  }

  async fn delete_account(&self, user_id: UserId) -> Result<bool> {
    let id_str = user_id.as_str().to_owned();

    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM sessions WHERE user_id = ?1", rusqlite::params![id_str])?;
        let n = tx.execute("DELETE FROM accounts WHERE user_id = ?1", rusqlite::params![id_str])?;
        tx.commit()?;
        Ok(n > 0)
      })
      .await?;

    if removed {
      tracing::debug!(user_id = %user_id, "account removed");
    }
    Ok(removed)
  }

  async fn authenticate(&self, email: String, password: String) -> Result<Option<UserId>> {
    let email = normalize_email(&email);

    let row: Option<(String, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, password_hash FROM accounts WHERE email = ?1",
              rusqlite::params![email],
              |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?,
        )
      })
      .await?;

    Ok(
      row
        .filter(|(_, phc)| verify_password(&password, phc))
        .map(|(user_id, _)| UserId::new(user_id)),
    )
  }

  async fn open_session(&self, user_id: UserId) -> Result<String> {
    let token  = new_token();
    let digest = token_digest(&token);
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token_digest, user_id, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![digest, user_id.as_str(), at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(token)
  }

  async fn resolve_session(&self, token: String) -> Result<Option<UserId>> {
    let digest = token_digest(&token);

    let user_id: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id FROM sessions WHERE token_digest = ?1",
              rusqlite::params![digest],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    Ok(user_id.map(UserId::new))
  }

  async fn close_session(&self, token: String) -> Result<bool> {
    let digest = token_digest(&token);

    let removed = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM sessions WHERE token_digest = ?1",
          rusqlite::params![digest],
        )?;
        Ok(n > 0)
      })
      .await?;

    Ok(removed)
  }
}
