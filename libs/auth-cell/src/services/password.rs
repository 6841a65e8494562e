use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use argon2::password_hash::{rand_core::OsRng, SaltString};
use rand::Rng;
use tracing::instrument;

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

const COMMON_PASSWORDS: [&str; 12] = [
    "password", "12345678", "123456789", "password1", "password123", "qwerty123",
    "letmein1", "welcome1", "admin123", "abc12345", "iloveyou1", "dentist1",
];

pub struct PasswordService;

impl PasswordService {
    #[instrument(skip(password))]
    pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let password_hash = argon2.hash_password(password.as_bytes(), &salt)?;
        Ok(password_hash.to_string())
    }

    #[instrument(skip(password, hash))]
    pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
        let parsed_hash = PasswordHash::new(hash)?;
        let argon2 = Argon2::default();

        match argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Minimum policy for staff accounts. Returns the first unmet rule.
    pub fn check_policy(password: &str) -> Result<(), String> {
        let length = password.chars().count();
        if length < MIN_PASSWORD_LENGTH {
            return Err(format!("must be at least {} characters long", MIN_PASSWORD_LENGTH));
        }
        if length > MAX_PASSWORD_LENGTH {
            return Err(format!("must be at most {} characters long", MAX_PASSWORD_LENGTH));
        }
        if !password.chars().any(|c| c.is_alphabetic()) {
            return Err("must contain at least one letter".to_string());
        }
        if !password.chars().any(|c| c.is_ascii_digit()) {
            return Err("must contain at least one digit".to_string());
        }
        if COMMON_PASSWORDS.contains(&password.to_lowercase().as_str()) {
            return Err("is too common".to_string());
        }
        Ok(())
    }

    /// Random password handed to staff created from the team console.
    /// Always satisfies [`PasswordService::check_policy`].
    pub fn generate_temporary_password(length: usize) -> String {
        let lowercase = b"abcdefghijkmnopqrstuvwxyz";
        let uppercase = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
        let digits = b"23456789";
        let symbols = b"!@#$%*-_";
        let length = length.max(MIN_PASSWORD_LENGTH);

        let mut rng = rand::thread_rng();
        let all: Vec<u8> = [&lowercase[..], &uppercase[..], &digits[..], &symbols[..]].concat();

        let mut chars: Vec<u8> = vec![
            lowercase[rng.gen_range(0..lowercase.len())],
            uppercase[rng.gen_range(0..uppercase.len())],
            digits[rng.gen_range(0..digits.len())],
            symbols[rng.gen_range(0..symbols.len())],
        ];
        while chars.len() < length {
            chars.push(all[rng.gen_range(0..all.len())]);
        }

        for i in (1..chars.len()).rev() {
            let j = rng.gen_range(0..=i);
            chars.swap(i, j);
        }

        chars.into_iter().map(char::from).collect()
    }
}
