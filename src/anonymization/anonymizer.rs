//! Anonymizer combining the pseudonym, sealing and masking strategies
//!
//! The [`Anonymizer`] is built once from configuration and shared behind an
//! `Arc`. It derives the anonymized projection of a record and recovers sealed
//! values for callers holding an [`UnmaskGrant`].

use super::pseudonym::PseudonymStrategy;
use super::redaction::mask_contact_with;
use super::sealed::SealedStrategy;
use super::{MaskStrategy, MaskedValue, MaskingStrategy, SensitiveField};
use crate::access::UnmaskGrant;
use crate::config::{AnonymizationConfig, NameStrategy};
use crate::domain::{AnonymizationError, AnonymizedFields, RawFields, Result};
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};

const FINGERPRINT_VERSION: &str = "vigil-anonymizer/v1";

/// Derives and reverses anonymized field values
pub struct Anonymizer {
    pseudonym: PseudonymStrategy,
    sealed: SealedStrategy,
    name_strategy: NameStrategy,
    mask_char: char,
    visible_digits: usize,
    fingerprint: String,
}

impl Anonymizer {
    /// Builds the anonymizer from configuration
    ///
    /// # Errors
    ///
    /// Returns [`AnonymizationError::InvalidKey`] if either key is unusable.
    pub fn from_config(config: &AnonymizationConfig) -> Result<Self> {
        let pseudonym = PseudonymStrategy::new(config.pseudonym_key.expose_secret().as_bytes())?;
        let sealed = SealedStrategy::from_base64(config.encryption_key.expose_secret().as_str())?;
        Ok(Self::new(
            pseudonym,
            sealed,
            config.name_strategy,
            config.mask_char,
            config.visible_digits,
        ))
    }

    pub fn new(
        pseudonym: PseudonymStrategy,
        sealed: SealedStrategy,
        name_strategy: NameStrategy,
        mask_char: char,
        visible_digits: usize,
    ) -> Self {
        let fingerprint = compute_fingerprint(
            &pseudonym,
            &sealed,
            name_strategy,
            mask_char,
            visible_digits,
        );
        Self {
            pseudonym,
            sealed,
            name_strategy,
            mask_char,
            visible_digits,
            fingerprint,
        }
    }

    /// Masks a single value with the requested strategy
    pub fn mask(
        &self,
        field: SensitiveField,
        value: &str,
        strategy: MaskStrategy,
    ) -> Result<MaskedValue> {
        match strategy {
            MaskStrategy::Irreversible => self.pseudonym.mask(field, value),
            MaskStrategy::Reversible => self.sealed.mask(field, value),
        }
    }

    /// Recovers the original value of a sealed field
    ///
    /// # Errors
    ///
    /// [`AnonymizationError::Irreversible`] for pseudonyms and
    /// [`AnonymizationError::UnmaskFailed`] for values that do not open.
    pub fn unmask(
        &self,
        field: SensitiveField,
        masked: &MaskedValue,
        grant: &UnmaskGrant,
    ) -> Result<String> {
        match masked {
            MaskedValue::Pseudonym(_) => Err(AnonymizationError::Irreversible.into()),
            MaskedValue::Sealed(sealed) => {
                let value = self.sealed.open(field, sealed)?;
                tracing::debug!(
                    field = field.label(),
                    holder = %grant.holder(),
                    "Sealed value opened"
                );
                Ok(value)
            }
        }
    }

    /// Display mask for a contact under the configured settings
    pub fn mask_contact(&self, contact: &str) -> String {
        mask_contact_with(contact, self.mask_char, self.visible_digits)
    }

    /// Derives the full anonymized projection of `raw`
    pub fn derive(&self, raw: &RawFields) -> Result<AnonymizedFields> {
        let name = match self.name_strategy {
            NameStrategy::Pseudonym => self.pseudonym.pseudonym(SensitiveField::Name, &raw.name),
            NameStrategy::Sealed => self.sealed.seal(SensitiveField::Name, &raw.name)?,
        };
        Ok(AnonymizedFields {
            name,
            contact: self.mask_contact(&raw.contact),
            sealed_contact: self.sealed.seal(SensitiveField::Contact, &raw.contact)?,
        })
    }

    /// The stored anonymized name as a [`MaskedValue`]
    pub fn name_value(&self, anonymized: &AnonymizedFields) -> MaskedValue {
        match self.name_strategy {
            NameStrategy::Pseudonym => MaskedValue::Pseudonym(anonymized.name.clone()),
            NameStrategy::Sealed => MaskedValue::Sealed(anonymized.name.clone()),
        }
    }

    /// Identifies the active strategy and key set
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn name_strategy(&self) -> NameStrategy {
        self.name_strategy
    }
}

fn compute_fingerprint(
    pseudonym: &PseudonymStrategy,
    sealed: &SealedStrategy,
    name_strategy: NameStrategy,
    mask_char: char,
    visible_digits: usize,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(FINGERPRINT_VERSION.as_bytes());
    hasher.update(format!("\nname_strategy={}", name_strategy.as_str()).as_bytes());
    hasher.update(format!("\npseudonym_key={}", pseudonym.key_id()).as_bytes());
    hasher.update(format!("\nsealed_key={}", sealed.key_id()).as_bytes());
    hasher.update(format!("\ncontact_mask={mask_char}:{visible_digits}").as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::test_config;
    use crate::config::secret_string;
    use crate::domain::{Role, UserId, VigilError};

    fn anonymizer() -> Anonymizer {
        Anonymizer::from_config(&test_config().anonymization).unwrap()
    }

    fn grant() -> UnmaskGrant {
        UnmaskGrant::issue(Role::Admin, UserId::new()).unwrap()
    }

    #[test]
    fn test_derive_scenario_record() {
        let anonymizer = anonymizer();
        let raw = RawFields::new("John Doe", "555-111-4592", "Seasonal influenza");
        let derived = anonymizer.derive(&raw).unwrap();

        assert!(derived.name.starts_with("ANON_"));
        assert_eq!(derived.contact, "XXX-XXX-4592");
        let recovered = anonymizer
            .unmask(
                SensitiveField::Contact,
                &MaskedValue::Sealed(derived.sealed_contact.clone()),
                &grant(),
            )
            .unwrap();
        assert_eq!(recovered, "555-111-4592");
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
    }

    #[test]
    fn test_reversible_mask_roundtrip() {
        let anonymizer = anonymizer();
        let masked = anonymizer
            .mask(SensitiveField::Name, "John Doe", MaskStrategy::Reversible)
            .unwrap();
        let value = anonymizer
            .unmask(SensitiveField::Name, &masked, &grant())
            .unwrap();
        assert_eq!(value, "John Doe");
    }

    #[test]
    fn test_unmask_pseudonym_is_irreversible() {
        let anonymizer = anonymizer();
        let masked = anonymizer
            .mask(SensitiveField::Name, "John Doe", MaskStrategy::Irreversible)
            .unwrap();
        let result = anonymizer.unmask(SensitiveField::Name, &masked, &grant());
        assert!(matches!(
            result,
            Err(VigilError::Anonymization(AnonymizationError::Irreversible))
        ));
    }

    #[test]
    fn test_sealed_name_strategy() {
        let mut config = test_config().anonymization;
        config.name_strategy = NameStrategy::Sealed;
        let anonymizer = Anonymizer::from_config(&config).unwrap();

        let raw = RawFields::new("John Doe", "555-111-4592", "Seasonal influenza");
        let derived = anonymizer.derive(&raw).unwrap();
        assert!(derived.name.starts_with("v1:"));
        let name = anonymizer
            .unmask(
                SensitiveField::Name,
                &anonymizer.name_value(&derived),
                &grant(),
            )
            .unwrap();
        assert_eq!(name, "John Doe");
    }

    #[test]
    fn test_fingerprint_tracks_keys_and_strategy() {
        let base = anonymizer();
        assert_eq!(base.fingerprint(), anonymizer().fingerprint());

        let mut config = test_config().anonymization;
        config.pseudonym_key = secret_string("rotated-pseudonym-key".to_string());
        assert_ne!(
            base.fingerprint(),
            Anonymizer::from_config(&config).unwrap().fingerprint()
        );

        let mut config = test_config().anonymization;
        config.name_strategy = NameStrategy::Sealed;
        assert_ne!(
            base.fingerprint(),
            Anonymizer::from_config(&config).unwrap().fingerprint()
        );
    }

    #[test]
    fn test_fingerprint_does_not_contain_key_material() {
        let anonymizer = anonymizer();
        assert!(!anonymizer.fingerprint().contains("unit-test"));
        assert_eq!(anonymizer.fingerprint().len(), 64);
    }
}
