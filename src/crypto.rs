//! Encryption of the `products[1][data]` checkout parameter.
//!
//! The provider treats this blob, not the visible query string, as the source
//! of truth for the price. It is AES-256-CBC with PKCS#7 padding under a static
//! key and IV shared with the provider, then Base64 encoded.

use crate::errors::{PayProError, Result};
use aes::Aes256;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rust_decimal::Decimal;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Builds the form-encoded product parameter plaintext for a price.
///
/// # Examples
///
/// ```
/// use payproglobal_rs::crypto::product_params_plaintext;
/// use rust_decimal::Decimal;
///
/// let plaintext = product_params_plaintext("EUR", Decimal::new(1999, 2));
/// assert_eq!(plaintext, "price%5BEUR%5D%5BAmount%5D=19.99");
/// ```
pub fn product_params_plaintext(currency: &str, amount: Decimal) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair(&format!("price[{}][Amount]", currency), &amount.to_string())
        .finish()
}

/// Encrypts `plaintext` and returns it Base64 encoded.
///
/// # Examples
///
/// ```
/// use payproglobal_rs::crypto::{decrypt_product_params, encrypt_product_params};
///
/// let key = "0123456789abcdef0123456789abcdef";
/// let iv = "abcdef9876543210";
///
/// let blob = encrypt_product_params("price%5BUSD%5D%5BAmount%5D=5", key, iv).unwrap();
/// assert_eq!(decrypt_product_params(&blob, key, iv).unwrap(), "price%5BUSD%5D%5BAmount%5D=5");
/// ```
pub fn encrypt_product_params(plaintext: &str, key: &str, iv: &str) -> Result<String> {
    let cipher = Aes256CbcEnc::new_from_slices(key.as_bytes(), iv.as_bytes())
        .map_err(|e| PayProError::CryptoError(format!("invalid key or IV: {}", e)))?;

    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
    Ok(BASE64.encode(ciphertext))
}

/// Reverses [`encrypt_product_params`].
pub fn decrypt_product_params(blob: &str, key: &str, iv: &str) -> Result<String> {
    let ciphertext = BASE64.decode(blob.as_bytes())?;

    let cipher = Aes256CbcDec::new_from_slices(key.as_bytes(), iv.as_bytes())
        .map_err(|e| PayProError::CryptoError(format!("invalid key or IV: {}", e)))?;

    let plaintext = cipher
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|_| PayProError::CryptoError("bad padding".to_string()))?;

    String::from_utf8(plaintext)
        .map_err(|e| PayProError::CryptoError(format!("Invalid UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const KEY: &str = "0123456789abcdef0123456789abcdef";
    const IV: &str = "abcdef9876543210";

    #[test]
    fn test_plaintext_encodes_brackets() {
        let plaintext = product_params_plaintext("USD", Decimal::new(4200, 2));
        assert_eq!(plaintext, "price%5BUSD%5D%5BAmount%5D=42.00");
    }

    #[test]
    fn test_ciphertext_is_block_aligned() {
        let blob = encrypt_product_params("price%5BUSD%5D%5BAmount%5D=1", KEY, IV).unwrap();
        let raw = BASE64.decode(blob).unwrap();
        assert_eq!(raw.len() % 16, 0);
        assert!(!raw.is_empty());
    }

    #[test]
    fn test_encryption_is_deterministic() {
        let a = encrypt_product_params("same input", KEY, IV).unwrap();
        let b = encrypt_product_params("same input", KEY, IV).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_wrong_key_length() {
        let err = encrypt_product_params("x", "short", IV).unwrap_err();
        assert!(matches!(err, PayProError::CryptoError(_)));
    }

    #[test]
    fn test_decrypt_with_other_key_fails_or_differs() {
        let blob = encrypt_product_params("price%5BEUR%5D%5BAmount%5D=10", KEY, IV).unwrap();
        let other_key = "ffffffffffffffffffffffffffffffff";
        match decrypt_product_params(&blob, other_key, IV) {
            Ok(text) => assert_ne!(text, "price%5BEUR%5D%5BAmount%5D=10"),
            Err(e) => assert!(matches!(e, PayProError::CryptoError(_))),
        }
    }

    #[test]
    fn test_decrypt_rejects_invalid_base64() {
        let err = decrypt_product_params("not base64!!", KEY, IV).unwrap_err();
        assert!(matches!(err, PayProError::Base64Error(_)));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_encrypt_decrypt_roundtrip(
            currency in "[ -~]{1,8}",
            amount in "[ -~]{0,24}",
        ) {
            let plaintext = url::form_urlencoded::Serializer::new(String::new())
                .append_pair(&format!("price[{}][Amount]", currency), &amount)
                .finish();

            let blob = encrypt_product_params(&plaintext, KEY, IV).unwrap();
            let decrypted = decrypt_product_params(&blob, KEY, IV).unwrap();

            prop_assert_eq!(decrypted, plaintext);
        }
    }
}
