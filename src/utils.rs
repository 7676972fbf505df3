use argon2::{
    password_hash::{
        Error, PasswordHasher, SaltString
    }, Argon2, PasswordHash, PasswordVerifier
};
use rand_core::OsRng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub fn hash_password(password:&str)->Result<String, Error>{

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2.hash_password(password.as_bytes(), &salt)?.to_string();
    Ok(password_hash)
}

pub fn verify_password(password:&str, hash:&str)->Result<(), Error>{

    let argon2 = Argon2::default();
    let parsed_hash = PasswordHash::new(hash)?;
    argon2.verify_password(password.as_bytes(), &parsed_hash)?;

    Ok(())
}

/// Short digest of a stored password hash, used to tie reset tokens to the current password.
pub fn password_fingerprint(password_hash: &str) -> String {
    let digest = Sha256::digest(password_hash.as_bytes());
    format!("{:x}", digest)[..16].to_string()
}

/// Lowercase ASCII slug: alphanumerics kept, every other run collapsed into one `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        return "course".to_string();
    }
    slug
}

pub fn new_certificate_code() -> String {
    let raw = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("CERT-{}", &raw[..12])
}
