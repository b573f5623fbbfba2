use crate::{CodecError, SecretCipher};

#[test]
fn test_encrypted_value_has_three_hex_parts_and_decrypts() {
    let cipher = SecretCipher::new("at-rest-secret").unwrap();
    let encoded = cipher.encrypt("1//refresh-token").unwrap();

    let parts: Vec<&str> = encoded.split(':').collect();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0].len(), 24); // 12-byte iv
    assert_eq!(parts[1].len(), 32); // 16-byte tag
    assert!(parts.iter().all(|p| p.chars().all(|c| c.is_ascii_hexdigit())));

    assert_eq!(cipher.decrypt(&encoded).unwrap(), "1//refresh-token");
}

#[test]
fn test_same_plaintext_gets_fresh_iv() {
    let cipher = SecretCipher::new("at-rest-secret").unwrap();
    let a = cipher.encrypt("same").unwrap();
    let b = cipher.encrypt("same").unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_wrong_key_fails_authentication() {
    let encoded = SecretCipher::new("one").unwrap().encrypt("secret").unwrap();
    let result = SecretCipher::new("two").unwrap().decrypt(&encoded);
    assert!(matches!(result, Err(CodecError::Decryption(_))));
}

#[test]
fn test_tampered_ciphertext_is_rejected() {
    let cipher = SecretCipher::new("k").unwrap();
    let encoded = cipher.encrypt("secret-value").unwrap();
    let mut parts: Vec<String> = encoded.split(':').map(str::to_string).collect();
    let flipped = if parts[2].starts_with('0') { "1" } else { "0" };
    parts[2].replace_range(0..1, flipped);
    assert!(cipher.decrypt(&parts.join(":")).is_err());
}

#[test]
fn test_malformed_input_is_rejected() {
    let cipher = SecretCipher::new("k").unwrap();
    assert!(cipher.decrypt("not-encrypted").is_err());
    assert!(cipher.decrypt("aa:bb").is_err());
    assert!(cipher.decrypt("zz:yy:xx").is_err());
}
