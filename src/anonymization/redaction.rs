//! Display masking for contact numbers

/// Masks a contact for display with the default settings
///
/// Keeps the last 4 digits, replaces every other digit with `X` and leaves
/// separators in place.
///
/// ```
/// use vigil::anonymization::redaction::mask_contact;
///
/// assert_eq!(mask_contact("555-111-4592"), "XXX-XXX-4592");
/// assert_eq!(mask_contact(""), "");
/// ```
pub fn mask_contact(contact: &str) -> String {
    mask_contact_with(contact, 'X', 4)
}

/// Masks a contact keeping the last `visible` digits
pub fn mask_contact_with(contact: &str, mask_char: char, visible: usize) -> String {
    let mut kept = 0;
    let mut masked: Vec<char> = contact
        .chars()
        .rev()
        .map(|c| {
            if !c.is_ascii_digit() {
                c
            } else if kept < visible {
                kept += 1;
                c
            } else {
                mask_char
            }
        })
        .collect();
    masked.reverse();
    masked.into_iter().collect()
}
