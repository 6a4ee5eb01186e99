//! Cryptographic conformance tests against published vectors.

#[cfg(test)]
mod x25519_tests {
    use selink_crypto::kex::X25519KeyPair;

    /// RFC 7748 §6.1.
    #[test]
    fn test_rfc7748_vectors() {
        let alice_private: [u8; 32] =
            hex::decode("77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a")
                .unwrap()
                .try_into()
                .unwrap();
        let bob_public: [u8; 32] =
            hex::decode("de9edb7d7b7dc1b4d35b61c2ece435373f8343c85b78674dadfc7e146f882b4f")
                .unwrap()
                .try_into()
                .unwrap();
        let expected_shared =
            hex::decode("4a5d9d5ba4ce2de1728e3bf480350f25e07e21c947d19e3376f09b3c1e161742")
                .unwrap();

        let alice = X25519KeyPair::from_private(alice_private).unwrap();
        assert_eq!(
            hex::encode(alice.public_key()),
            "8520f0098930a754748b7ddcb43ef75a0dbf3a0d26381af4eba4a98eaa9b4e6a"
        );

        let shared = alice.exchange(&bob_public).unwrap();
        assert_eq!(&*shared, expected_shared.as_slice());
    }
}

#[cfg(test)]
mod aes_gcm_tests {
    use selink_crypto::aead::{aes256gcm_decrypt, aes256gcm_encrypt, construct_nonce, open_in_place, seal_in_place};

    /// McGrew-Viega GCM test case 13: zero key, zero IV, empty message.
    #[test]
    fn test_gcm_case_13() {
        let sealed = aes256gcm_encrypt(&[0u8; 32], &[0u8; 12], &[], &[]).unwrap();
        assert_eq!(hex::encode(sealed), "530f8afbc74536b9a963b4f1c4cb738b");
    }

    /// McGrew-Viega GCM test case 14: one zero block.
    #[test]
    fn test_gcm_case_14() {
        let sealed = aes256gcm_encrypt(&[0u8; 32], &[0u8; 12], &[0u8; 16], &[]).unwrap();
        assert_eq!(
            hex::encode(&sealed),
            "cea7403d4d606b6e074ec5d3baf39d18d0d1c8a799996bf0265b98b5d48ab919"
        );

        let opened = aes256gcm_decrypt(&[0u8; 32], &[0u8; 12], &sealed, &[]).unwrap();
        assert_eq!(&*opened, &[0u8; 16]);
    }

    /// Detached sealing produces the same bytes as the combined form.
    #[test]
    fn test_detached_matches_combined() {
        let key = [0x11u8; 32];
        let nonce = construct_nonce(7);
        let combined = aes256gcm_encrypt(&key, &nonce, b"\x01payload", &[]).unwrap();

        let mut buffer = b"\x01payload".to_vec();
        let tag = seal_in_place(&key, &nonce, &[], &mut buffer).unwrap();

        assert_eq!(&combined[..buffer.len()], buffer.as_slice());
        assert_eq!(&combined[buffer.len()..], &tag);

        open_in_place(&key, &nonce, &[], &mut buffer, &tag).unwrap();
        assert_eq!(buffer, b"\x01payload");
    }

    /// The counter sits little-endian in the first four nonce bytes.
    #[test]
    fn test_nonce_layout() {
        assert_eq!(hex::encode(construct_nonce(1)), "010000000000000000000000");
        assert_eq!(hex::encode(construct_nonce(u32::MAX)), "ffffffff0000000000000000");
    }
}

#[cfg(test)]
mod kdf_tests {
    use selink_crypto::kdf::{hkdf_sha256, hmac_sha256, noise_hkdf, TranscriptHash, PROTOCOL_NAME};
    use sha2::{Digest, Sha256};

    /// RFC 4231 test case 2.
    #[test]
    fn test_hmac_rfc4231_case_2() {
        let mac = hmac_sha256(b"Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(
            hex::encode(&*mac),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    /// RFC 5869 test case 1.
    #[test]
    fn test_hkdf_rfc5869_case_1() {
        let okm = hkdf_sha256(
            &[0x0b; 22],
            &hex::decode("000102030405060708090a0b0c").unwrap(),
            &hex::decode("f0f1f2f3f4f5f6f7f8f9").unwrap(),
            42,
        )
        .unwrap();
        assert_eq!(
            hex::encode(&*okm),
            "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf34007208d5b887185865"
        );
    }

    /// The chaining step equals the explicit HMAC construction.
    #[test]
    fn test_noise_hkdf_construction() {
        let ck = [0x5Au8; 32];
        let input = b"shared secret";

        let (first, second) = noise_hkdf(&ck, input).unwrap();

        let temp = hmac_sha256(&ck, input).unwrap();
        let expected_first = hmac_sha256(&*temp, &[0x01]).unwrap();
        let mut second_input = expected_first.to_vec();
        second_input.push(0x02);
        let expected_second = hmac_sha256(&*temp, &second_input).unwrap();

        assert_eq!(*first, *expected_first);
        assert_eq!(*second, *expected_second);
    }

    #[test]
    fn test_transcript_chain() {
        let mut transcript = TranscriptHash::new();
        transcript.mix(b"abc");

        let h0 = Sha256::digest(PROTOCOL_NAME);
        let mut hasher = Sha256::new();
        hasher.update(h0);
        hasher.update(b"abc");

        assert_eq!(transcript.value().as_slice(), hasher.finalize().as_slice());
    }

    #[test]
    fn test_protocol_name() {
        assert_eq!(&PROTOCOL_NAME[..29], b"Noise_KK1_25519_AESGCM_SHA256");
        assert_eq!(&PROTOCOL_NAME[29..], &[0, 0, 0]);
    }
}
