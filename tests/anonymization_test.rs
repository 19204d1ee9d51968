//! Masking strategies through the public anonymization API

mod common;

use common::{test_config, ENCRYPTION_KEY};
use test_case::test_case;
use vigil::anonymization::{
    mask_contact, Anonymizer, MaskStrategy, MaskedValue, SealedStrategy, SensitiveField,
};
use vigil::domain::{AnonymizationError, RawFields, VigilError};

fn anonymizer() -> Anonymizer {
    Anonymizer::from_config(&test_config().anonymization).unwrap()
}

#[test]
fn test_irreversible_mask_is_deterministic() {
    let anonymizer = anonymizer();
    let first = anonymizer
        .mask(SensitiveField::Name, "John Doe", MaskStrategy::Irreversible)
        .unwrap();
    let second = anonymizer
        .mask(SensitiveField::Name, "John Doe", MaskStrategy::Irreversible)
        .unwrap();

    assert_eq!(first, second);
    assert!(matches!(first, MaskedValue::Pseudonym(_)));
    assert!(first.as_str().starts_with("ANON_"));
    assert!(!first.as_str().contains("John"));

    let other = anonymizer
        .mask(SensitiveField::Name, "Jane Doe", MaskStrategy::Irreversible)
        .unwrap();
    assert_ne!(first, other);
}

#[test]
fn test_pseudonym_depends_on_field() {
    let anonymizer = anonymizer();
    let as_name = anonymizer
        .mask(SensitiveField::Name, "5551114592", MaskStrategy::Irreversible)
        .unwrap();
    let as_contact = anonymizer
        .mask(SensitiveField::Contact, "5551114592", MaskStrategy::Irreversible)
        .unwrap();
    assert_ne!(as_name, as_contact);
}

#[test]
fn test_reversible_mask_round_trips_with_key() {
    let anonymizer = anonymizer();
    let sealed = anonymizer
        .mask(SensitiveField::Contact, "555-111-4592", MaskStrategy::Reversible)
        .unwrap();
    assert!(matches!(sealed, MaskedValue::Sealed(_)));
    assert!(!sealed.as_str().contains("4592"));

    let strategy = SealedStrategy::from_base64(ENCRYPTION_KEY).unwrap();
    let opened = strategy
        .open(SensitiveField::Contact, sealed.as_str())
        .unwrap();
    assert_eq!(opened, "555-111-4592");

    // Field label is bound into the seal
    let wrong_field = strategy.open(SensitiveField::Name, sealed.as_str());
    assert!(matches!(
        wrong_field,
        Err(VigilError::Anonymization(AnonymizationError::UnmaskFailed(_)))
    ));
}

#[test]
fn test_sealed_value_rejects_other_key() {
    let sealed = SealedStrategy::from_base64(ENCRYPTION_KEY)
        .unwrap()
        .seal(SensitiveField::Name, "John Doe")
        .unwrap();
    let other = SealedStrategy::from_base64(&SealedStrategy::generate_key()).unwrap();
    assert!(other.open(SensitiveField::Name, &sealed).is_err());
}

#[test]
fn test_derive_produces_full_projection() {
    let anonymizer = anonymizer();
    let raw = RawFields::new("John Doe", "555-111-4592", "Seasonal influenza");
    let derived = anonymizer.derive(&raw).unwrap();

    assert!(derived.name.starts_with("ANON_"));
    assert_eq!(derived.contact, "XXX-XXX-4592");
    assert!(derived.sealed_contact.starts_with("v1:"));
    assert_eq!(anonymizer.derive(&raw).unwrap().name, derived.name);
}

#[test]
fn test_empty_contact_stays_empty() {
    let anonymizer = anonymizer();
    let raw = RawFields::new("John Doe", "", "Seasonal influenza");
    assert_eq!(anonymizer.derive(&raw).unwrap().contact, "");
}

#[test_case("555-111-4592", "XXX-XXX-4592" ; "north american")]
#[test_case("5551114592", "XXXXXX4592" ; "digits only")]
#[test_case("+44 7911 123456", "+XX XXXX XX3456" ; "international with spaces")]
#[test_case("4592", "4592" ; "exactly visible")]
fn test_contact_display_mask(input: &str, expected: &str) {
    assert_eq!(mask_contact(input), expected);
}

#[test]
fn test_fingerprint_tracks_keys() {
    let first = anonymizer();
    let mut config = test_config();
    config.anonymization.pseudonym_key =
        vigil::config::secret_string("another-pseudonym-key".to_string());
    let second = Anonymizer::from_config(&config.anonymization).unwrap();

    assert_eq!(first.fingerprint(), anonymizer().fingerprint());
    assert_ne!(first.fingerprint(), second.fingerprint());
}
