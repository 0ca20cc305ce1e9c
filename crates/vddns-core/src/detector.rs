//! Change detection between the registered record value and the observed IP

/// Whether the observed value calls for an update
///
/// Plain string inequality: the registered value is whatever the zone holds,
/// the observed value is the dotted-quad form of the current address.
pub fn should_update(last_known: &str, observed: &str) -> bool {
    last_known != observed
}
