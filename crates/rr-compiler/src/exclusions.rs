use rr_core::classify::is_pattern;
use rr_core::Exclusions;

/// Split configured exclusions into literal paths and anchored patterns.
/// Pattern order is kept; literal duplicates collapse.
pub fn build_exclusions<S: AsRef<str>>(entries: &[S]) -> Exclusions {
    let mut exclusions = Exclusions::default();
    for entry in entries {
        let entry = entry.as_ref();
        if is_pattern(entry) {
            exclusions.patterns.push(entry.to_string());
        } else {
            exclusions.punctual.insert(entry.to_string());
        }
    }
    exclusions
}
