//! End-to-end attestation scenarios across the public API: register a
//! signer, sign target data, move the OWID through its wire forms, and
//! verify it back.

use bytes::Bytes;
use owid_core::{Keys, Owid, OwidSignature, Signer, SIGNATURE_LENGTH};

fn register(domain: &str, name: &str) -> Signer {
    Signer::new(
        domain,
        name,
        format!("https://{domain}/terms"),
        Keys::generate().unwrap(),
    )
    .unwrap()
}

#[test]
fn sign_serialize_decode_verify() {
    let signer = register("swan.community", "SWAN Community");
    let owid = signer.create_and_sign("hello").unwrap();

    assert!(signer.verify(&owid).unwrap());
    assert_eq!(owid.signature.unwrap().as_bytes().len(), SIGNATURE_LENGTH);

    let mut decoded = Owid::from_byte_array(&owid.as_byte_array().unwrap()).unwrap();
    assert_eq!(decoded.domain, owid.domain);
    assert_eq!(decoded.timestamp, owid.timestamp);
    assert_eq!(decoded.signature, owid.signature);

    decoded.target = Some(Bytes::from_static(b"hello"));
    assert!(signer.verify(&decoded).unwrap());
}

#[test]
fn flipped_signature_byte_verifies_false() {
    let signer = register("swan.community", "SWAN Community");
    let mut owid = signer.create_and_sign("hello").unwrap();

    let mut raw = *owid.signature.unwrap().as_bytes();
    raw[0] ^= 0x01;
    owid.signature = Some(OwidSignature::from_bytes(raw));

    assert!(!signer.verify(&owid).unwrap());
}

#[test]
fn wrong_signer_is_a_domain_mismatch() {
    let a = register("a.test", "Signer Alpha");
    let b = register("b.test", "Signer Bravo");

    let owid = a.create_and_sign("x").unwrap();
    assert!(b.verify(&owid).is_err());
}

#[test]
fn base64_form_recovers_all_fields() {
    let signer = register("swan.community", "SWAN Community");
    let owid = signer.create_and_sign("hello").unwrap();

    let encoded = owid.as_base64().unwrap();
    let mut decoded = Owid::from_base64(&encoded).unwrap();
    assert_eq!(decoded.version, owid.version);
    assert_eq!(decoded.domain, owid.domain);
    assert_eq!(decoded.timestamp, owid.timestamp);
    assert_eq!(decoded.signature, owid.signature);

    decoded.target = Some(Bytes::from_static(b"hello"));
    assert!(signer.verify(&decoded).unwrap());
}

#[test]
fn every_flipped_bit_in_the_wire_form_fails_closed() {
    let signer = register("swan.community", "SWAN Community");
    let owid = signer.create_and_sign("hello").unwrap();
    let bytes = owid.as_byte_array().unwrap();

    // Sample a byte from each region of the layout: version, domain,
    // timestamp and signature.
    for index in [0, 2, bytes.len() - 70, bytes.len() - 1] {
        let mut tampered = bytes.clone();
        tampered[index] ^= 0x01;
        match Owid::from_byte_array(&tampered) {
            Err(_) => {}
            Ok(mut decoded) => {
                decoded.target = Some(Bytes::from_static(b"hello"));
                match signer.verify(&decoded) {
                    Ok(valid) => assert!(!valid),
                    // A corrupted domain byte fails the domain gate.
                    Err(_) => {}
                }
            }
        }
    }
}
