//! Shared quick-xml helpers for WSDL and envelope parsing.
//!
//! quick-xml does not expand entities, and DOCTYPE declarations are rejected
//! before parsing starts.

use quick_xml::events::BytesStart;

/// Element name split into prefix and local part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ElementName {
    pub prefix: Option<String>,
    pub local: String,
}

pub(crate) fn element_name(e: &BytesStart) -> ElementName {
    split_qname(e.name().as_ref())
}

pub(crate) fn split_qname(raw: &[u8]) -> ElementName {
    let name = String::from_utf8_lossy(raw);
    match name.split_once(':') {
        Some((prefix, local)) => ElementName {
            prefix: Some(prefix.to_string()),
            local: local.to_string(),
        },
        None => ElementName {
            prefix: None,
            local: name.to_string(),
        },
    }
}

/// Value of an attribute by local name, ignoring any prefix.
pub(crate) fn attribute(e: &BytesStart, local_name: &str) -> Option<String> {
    for attr in e.attributes().flatten() {
        let key = split_qname(attr.key.as_ref());
        if key.prefix.as_deref() != Some("xmlns") && key.local == local_name {
            return attr.unescape_value().ok().map(|v| v.into_owned());
        }
    }
    None
}

/// Scoped prefix → namespace URI bindings.
#[derive(Debug, Default)]
pub(crate) struct NamespaceStack {
    scopes: Vec<Vec<(String, String)>>,
}

impl NamespaceStack {
    /// Open a scope with the declarations found on `e`.
    pub fn push(&mut self, e: &BytesStart) {
        let mut scope = Vec::new();
        for attr in e.attributes().flatten() {
            let key = attr.key.as_ref();
            let prefix = if key == b"xmlns" {
                Some(String::new())
            } else {
                key.strip_prefix(b"xmlns:")
                    .map(|p| String::from_utf8_lossy(p).into_owned())
            };
            if let Some(prefix) = prefix {
                let uri = attr
                    .unescape_value()
                    .map(|v| v.into_owned())
                    .unwrap_or_default();
                scope.push((prefix, uri));
            }
        }
        self.scopes.push(scope);
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    /// Resolve a prefix; `None` looks up the default namespace.
    pub fn resolve(&self, prefix: Option<&str>) -> Option<&str> {
        let prefix = prefix.unwrap_or("");
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
            .filter(|uri| !uri.is_empty())
    }

    pub fn namespace_of(&self, name: &ElementName) -> Option<&str> {
        self.resolve(name.prefix.as_deref())
    }
}

/// Reject DOCTYPE and entity declarations.
pub(crate) fn check_xxe_patterns(xml: &str) -> Result<(), String> {
    if xml.contains("<!DOCTYPE") || xml.contains("<!doctype") {
        return Err("DOCTYPE declarations are not allowed".to_string());
    }

    if xml.contains("<!ENTITY") || xml.contains("<!entity") {
        return Err("Entity declarations are not allowed".to_string());
    }

    Ok(())
}

/// Escape text for element content or attribute values.
pub(crate) fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Whether `name` can be used as an unprefixed element name (an NCName).
pub(crate) fn is_ncname(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::events::Event;
    use quick_xml::Reader;

    #[test]
    fn test_split_qname() {
        assert_eq!(
            split_qname(b"soap:Body"),
            ElementName {
                prefix: Some("soap".to_string()),
                local: "Body".to_string()
            }
        );
        assert_eq!(split_qname(b"Body").prefix, None);
    }

    #[test]
    fn test_namespace_scoping() {
        let xml = r#"<a xmlns="urn:default" xmlns:x="urn:x"><b xmlns:x="urn:inner"/></a>"#;
        let mut reader = Reader::from_str(xml);
        let mut stack = NamespaceStack::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf).unwrap() {
                Event::Start(ref e) => {
                    stack.push(e);
                    assert_eq!(stack.resolve(Some("x")), Some("urn:x"));
                }
                Event::Empty(ref e) => {
                    stack.push(e);
                    assert_eq!(stack.resolve(Some("x")), Some("urn:inner"));
                    assert_eq!(stack.resolve(None), Some("urn:default"));
                    stack.pop();
                    assert_eq!(stack.resolve(Some("x")), Some("urn:x"));
                }
                Event::End(_) => stack.pop(),
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        assert_eq!(stack.resolve(Some("x")), None);
    }

    #[test]
    fn test_xxe_detection() {
        assert!(check_xxe_patterns("<!DOCTYPE foo [<!ENTITY x SYSTEM \"file:///etc/passwd\">]><a/>").is_err());
        assert!(check_xxe_patterns("<a>ok</a>").is_ok());
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("a<b & 'c'"), "a&lt;b &amp; &apos;c&apos;");
    }

    #[test]
    fn test_is_ncname() {
        for name in ["GetUser", "newQuantity", "_id", "item-2", "v1.0", "código"] {
            assert!(is_ncname(name), "{}", name);
        }
        for name in ["", "1st", "-x", "a b", "a>b", "ns:name", "a></Op><Evil>"] {
            assert!(!is_ncname(name), "{}", name);
        }
    }
}
