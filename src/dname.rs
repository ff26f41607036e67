//! Domain name helpers on top of [`trust_dns_proto::rr::Name`].
//!
//! Configured names are either fully qualified (`www.example.net.`) or partial (`www`). A partial
//! name only becomes usable once it is completed with the origin of the record that uses it.
use trust_dns_proto::rr::Name;

/// Longest legal domain name in wire format, including the root label.
pub const MAX_WIRE_LEN: usize = 255;

/// Parse a configured name. Returns `None` unless `text` is a legal (possibly partial) name.
#[must_use]
pub fn parse(text: &str) -> Option<Name> {
    if text.is_empty() || text.chars().any(char::is_whitespace) {
        return None;
    }
    let name = Name::from_ascii(text).ok()?;
    is_legal(&name).then_some(name)
}

/// Complete `name` with `origin` if it is partial. Fully qualified names are returned unchanged.
/// Returns `None` if the completed name is too long.
#[must_use]
pub fn complete(name: &Name, origin: &Name) -> Option<Name> {
    if name.is_fqdn() {
        return Some(name.clone());
    }
    let completed = name.clone().append_domain(origin).ok()?;
    (completed.is_fqdn() && is_legal(&completed)).then_some(completed)
}

/// The length of `name` in wire format: a length byte per label plus the root label.
#[must_use]
pub fn wire_len(name: &Name) -> usize {
    name.iter().map(|label| label.len() + 1).sum::<usize>() + 1
}

fn is_legal(name: &Name) -> bool {
    wire_len(name) <= MAX_WIRE_LEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_names_complete_with_origin() {
        let name = parse("www").unwrap();
        assert!(!name.is_fqdn());
        let origin = parse("example.com.").unwrap();
        assert_eq!(
            complete(&name, &origin).unwrap().to_string(),
            "www.example.com."
        );
    }

    #[test]
    fn fqdn_ignores_origin() {
        let name = parse("cdn.example.net.").unwrap();
        let origin = parse("example.com.").unwrap();
        assert_eq!(complete(&name, &origin).unwrap(), name);
    }

    #[test]
    fn illegal_names() {
        assert!(parse("").is_none());
        assert!(parse("has space.example.").is_none());
        assert!(parse(&format!("{}.example.", "a".repeat(64))).is_none());
    }

    #[test]
    fn completion_can_overflow() {
        let label = "a".repeat(63);
        let name = parse(&format!("{label}.{label}.{label}")).unwrap();
        let origin = parse(&format!("{label}.example.")).unwrap();
        assert!(complete(&name, &origin).is_none());
    }
}
