//! User registration and authentication.
//!
//! Credentials are stored as `sha256$<rounds>$<salt>$<digest>`, the digest
//! being `rounds` iterations of SHA-256 over the salt and password.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{User, UserId};
use crate::store::SqliteStore;

const SCHEME: &str = "sha256";
const ROUNDS: u32 = 10_000;

pub fn hash_credential(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    let digest = digest(&salt, password, ROUNDS);
    format!("{SCHEME}${ROUNDS}${salt}${digest}")
}

pub fn verify_credential(stored: &str, password: &str) -> bool {
    let mut parts = stored.splitn(4, '$');
    let (Some(SCHEME), Some(rounds), Some(salt), Some(expected)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let Ok(rounds) = rounds.parse::<u32>() else {
        return false;
    };
    constant_time_eq(digest(salt, password, rounds).as_bytes(), expected.as_bytes())
}

fn digest(salt: &str, password: &str, rounds: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    let mut out = hasher.finalize();
    for _ in 1..rounds {
        let mut hasher = Sha256::new();
        hasher.update(out);
        hasher.update(salt.as_bytes());
        out = hasher.finalize();
    }
    hex::encode(out)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub fn register(store: &SqliteStore, name: &str, email: &str, password: &str) -> Result<UserId> {
    if password.is_empty() {
        return Err(Error::InvalidArgument("password cannot be empty".to_string()));
    }
    if !email.contains('@') {
        return Err(Error::InvalidArgument(format!(
            "'{email}' is not an email address"
        )));
    }
    store.insert_user(name, email, &hash_credential(password))
}

/// The user named `name` if `password` matches. Unknown users and wrong
/// passwords are indistinguishable.
pub fn authenticate(store: &SqliteStore, name: &str, password: &str) -> Result<User> {
    let Some(user) = store.find_user_by_name(name)? else {
        tracing::debug!(user = name, "login for unknown user");
        return Err(Error::InvalidCredentials);
    };
    if !verify_credential(&user.credential_hash, password) {
        tracing::debug!(user = name, "login with wrong password");
        return Err(Error::InvalidCredentials);
    }
    Ok(user)
}

/// Lookup by id; [`Error::NoRecord`] when the user is gone.
pub fn get(store: &SqliteStore, id: UserId) -> Result<User> {
    store.get_user(id)?.ok_or(Error::NoRecord)
}
