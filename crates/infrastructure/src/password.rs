//! 密码派生
//!
//! Argon2id 从明文和新鲜随机盐值派生32字节密钥，存储格式为
//! `base64(盐值)$base64(派生密钥)`。验证用存储的盐值重新派生，
//! 再做恒定时间比较，绝不直接比较字节。

use argon2::Argon2;
use async_trait::async_trait;
use data_encoding::BASE64;
use rand::RngCore;

use application::password::{PasswordHasher, PasswordHasherError};
use domain::PasswordHash;

const DERIVED_KEY_LENGTH: usize = 32;
const SEPARATOR: char = '$';

#[derive(Clone)]
pub struct Argon2PasswordHasher {
    salt_length: usize,
}

impl Argon2PasswordHasher {
    pub fn new(salt_length: usize) -> Self {
        Self { salt_length }
    }

    fn derive(password: &[u8], salt: &[u8]) -> Result<[u8; DERIVED_KEY_LENGTH], String> {
        let mut key = [0u8; DERIVED_KEY_LENGTH];
        Argon2::default()
            .hash_password_into(password, salt, &mut key)
            .map_err(|err| err.to_string())?;
        Ok(key)
    }
}

impl Default for Argon2PasswordHasher {
    fn default() -> Self {
        Self::new(16)
    }
}

#[async_trait]
impl PasswordHasher for Argon2PasswordHasher {
    async fn hash(&self, plaintext: &str) -> Result<PasswordHash, PasswordHasherError> {
        let mut salt = vec![0u8; self.salt_length];
        rand::rng().fill_bytes(&mut salt);

        let plaintext = plaintext.to_owned();
        // KDF 是刻意慢的，放到阻塞线程池里跑
        let encoded = tokio::task::spawn_blocking(move || {
            let key = Self::derive(plaintext.as_bytes(), &salt)?;
            Ok::<String, String>(format!(
                "{}{}{}",
                BASE64.encode(&salt),
                SEPARATOR,
                BASE64.encode(&key)
            ))
        })
        .await
        .map_err(|err| PasswordHasherError::hash_error(err.to_string()))?
        .map_err(PasswordHasherError::hash_error)?;

        PasswordHash::new(encoded).map_err(|err| PasswordHasherError::hash_error(err.to_string()))
    }

    async fn verify(
        &self,
        plaintext: &str,
        hashed: &PasswordHash,
    ) -> Result<bool, PasswordHasherError> {
        let stored = hashed.as_str().to_owned();
        let plaintext = plaintext.to_owned();

        tokio::task::spawn_blocking(move || {
            let (salt_b64, key_b64) = stored
                .split_once(SEPARATOR)
                .ok_or_else(|| "stored hash is missing the separator".to_string())?;
            let salt = BASE64
                .decode(salt_b64.as_bytes())
                .map_err(|err| err.to_string())?;
            let stored_key = BASE64
                .decode(key_b64.as_bytes())
                .map_err(|err| err.to_string())?;

            let derived = Self::derive(plaintext.as_bytes(), &salt)?;

            // 恒定时间比较，抵御计时侧信道
            Ok::<bool, String>(
                ring::constant_time::verify_slices_are_equal(&derived, &stored_key).is_ok(),
            )
        })
        .await
        .map_err(|err| PasswordHasherError::verify_error(err.to_string()))?
        .map_err(PasswordHasherError::verify_error)
    }
}
