use crate::{FolioError, FolioResult};
use argon2::{
    password_hash::{rand_core::OsRng, Output, PasswordHasher, SaltString},
    Argon2,
};
use subtle::ConstantTimeEq;

/// Hash and salt as they are stored on a `User`, both B64 encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordDigest {
    pub hash: String,
    pub salt: String,
}

pub fn hash_password(password: &str) -> FolioResult<PasswordDigest> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = compute(password, &salt)?;
    Ok(PasswordDigest {
        hash: hash.to_string(),
        salt: salt.as_str().to_string(),
    })
}

pub fn verify_password(password: &str, hash: &str, salt: &str) -> FolioResult<bool> {
    let salt = SaltString::from_b64(salt)?;
    let expected = Output::b64_decode(hash)?;
    let actual = compute(password, &salt)?;
    Ok(actual.as_bytes().ct_eq(expected.as_bytes()).into())
}

fn compute(password: &str, salt: &SaltString) -> FolioResult<Output> {
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), salt)?
        .hash
        .ok_or_else(|| FolioError::HashingError("argon2 produced no output".to_string()))
}
