//! SOAP envelope encoding and decoding.
//!
//! Requests are document/literal wrapped: the operation element carries the
//! target namespace as its default namespace and each argument becomes a
//! child element. Responses are decoded into `serde_json::Value`.

use crate::error::{CallFailure, SoapFault};
use crate::handle::OperationArgs;
use crate::wsdl::SoapVersion;
use crate::xml::{check_xxe_patterns, element_name, is_ncname, xml_escape, NamespaceStack};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};

/// SOAP namespace URIs.
pub const SOAP_11_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const SOAP_12_NS: &str = "http://www.w3.org/2003/05/soap-envelope";

impl SoapVersion {
    pub fn envelope_namespace(&self) -> &'static str {
        match self {
            Self::Soap11 => SOAP_11_NS,
            Self::Soap12 => SOAP_12_NS,
        }
    }
}

/// Build a request envelope for `operation`.
///
/// The operation name, argument names and nested object keys must all be
/// valid XML names; otherwise [`CallFailure::InvalidName`] is returned.
pub fn build_request(
    version: SoapVersion,
    namespace: Option<&str>,
    operation: &str,
    args: &OperationArgs,
) -> Result<String, CallFailure> {
    check_name(operation)?;
    for (name, value) in args.iter() {
        check_name(name)?;
        check_value_names(value)?;
    }

    let mut body = String::new();
    match namespace {
        Some(ns) => body.push_str(&format!("<{} xmlns=\"{}\">", operation, xml_escape(ns))),
        None => body.push_str(&format!("<{}>", operation)),
    }
    for (name, value) in args.iter() {
        write_value(&mut body, name, value);
    }
    body.push_str(&format!("</{}>", operation));

    Ok(format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="{}">
  <soap:Body>{}</soap:Body>
</soap:Envelope>"#,
        version.envelope_namespace(),
        body
    ))
}

fn check_name(name: &str) -> Result<(), CallFailure> {
    if is_ncname(name) {
        Ok(())
    } else {
        Err(CallFailure::InvalidName(name.to_string()))
    }
}

fn check_value_names(value: &Value) -> Result<(), CallFailure> {
    match value {
        Value::Array(items) => items.iter().try_for_each(check_value_names),
        Value::Object(fields) => fields.iter().try_for_each(|(key, field)| {
            check_name(key)?;
            check_value_names(field)
        }),
        _ => Ok(()),
    }
}

fn write_value(out: &mut String, name: &str, value: &Value) {
    match value {
        Value::Null => out.push_str(&format!("<{}/>", name)),
        Value::Array(items) => {
            for item in items {
                write_value(out, name, item);
            }
        }
        Value::Object(fields) => {
            out.push_str(&format!("<{}>", name));
            for (key, field) in fields {
                write_value(out, key, field);
            }
            out.push_str(&format!("</{}>", name));
        }
        Value::String(s) => out.push_str(&format!("<{0}>{1}</{0}>", name, xml_escape(s))),
        Value::Bool(b) => out.push_str(&format!("<{0}>{1}</{0}>", name, b)),
        Value::Number(n) => out.push_str(&format!("<{0}>{1}</{0}>", name, n)),
    }
}

/// Element tree used while decoding responses.
#[derive(Debug, Default)]
struct Node {
    local: String,
    namespace: Option<String>,
    text: String,
    children: Vec<Node>,
}

impl Node {
    fn open(e: &BytesStart, ns: &NamespaceStack) -> Self {
        let name = element_name(e);
        Self {
            namespace: ns.namespace_of(&name).map(str::to_string),
            local: name.local,
            ..Default::default()
        }
    }

    fn child(&self, local: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.local == local)
    }

    fn child_text(&self, local: &str) -> Option<String> {
        self.child(local)
            .map(|c| c.text.trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// All descendant text joined by spaces.
    fn flatten_text(&self) -> String {
        let mut parts = Vec::new();
        self.collect_text(&mut parts);
        parts.join(" ")
    }

    fn collect_text<'a>(&'a self, parts: &mut Vec<&'a str>) {
        let text = self.text.trim();
        if !text.is_empty() {
            parts.push(text);
        }
        for child in &self.children {
            child.collect_text(parts);
        }
    }

    fn into_value(self) -> Value {
        if self.children.is_empty() {
            return if self.text.is_empty() {
                Value::Null
            } else {
                Value::String(self.text)
            };
        }

        let mut map = Map::new();
        for child in self.children {
            let key = child.local.clone();
            let value = child.into_value();
            match map.get_mut(&key) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    map.insert(key, value);
                }
            }
        }
        Value::Object(map)
    }
}

fn attach(stack: &mut [Node], root: &mut Option<Node>, node: Node) -> Result<(), CallFailure> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_some() => {
            return Err(CallFailure::XmlSyntax(format!(
                "unexpected element <{}> after document root",
                node.local
            )))
        }
        None => *root = Some(node),
    }
    Ok(())
}

fn parse_tree(xml: &str) -> Result<Node, CallFailure> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut ns = NamespaceStack::default();
    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                if stack.is_empty() && root.is_some() {
                    return Err(CallFailure::XmlSyntax(
                        "unexpected element after document root".to_string(),
                    ));
                }
                ns.push(e);
                stack.push(Node::open(e, &ns));
            }
            Ok(Event::Empty(ref e)) => {
                ns.push(e);
                let node = Node::open(e, &ns);
                ns.pop();
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::End(_)) => {
                ns.pop();
                if let Some(node) = stack.pop() {
                    attach(&mut stack, &mut root, node)?;
                }
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| CallFailure::XmlSyntax(err.to_string()))?;
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&text);
                }
            }
            Ok(Event::CData(ref e)) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&String::from_utf8_lossy(e));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(CallFailure::XmlSyntax(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(CallFailure::XmlSyntax("unexpected end of document".to_string()));
    }
    root.ok_or_else(|| CallFailure::XmlSyntax("document has no root element".to_string()))
}

/// Decode a response envelope.
///
/// A SOAP Fault in the body is returned as [`CallFailure::Fault`]; anything
/// that is not a well-formed envelope is [`CallFailure::XmlSyntax`].
pub fn parse_response(xml: &str) -> Result<Value, CallFailure> {
    if xml.trim().is_empty() {
        return Err(CallFailure::XmlSyntax("empty response body".to_string()));
    }
    check_xxe_patterns(xml).map_err(CallFailure::XmlSyntax)?;

    let root = parse_tree(xml)?;
    let version = match (root.local.as_str(), root.namespace.as_deref()) {
        ("Envelope", Some(SOAP_11_NS)) => SoapVersion::Soap11,
        ("Envelope", Some(SOAP_12_NS)) => SoapVersion::Soap12,
        _ => {
            return Err(CallFailure::XmlSyntax(format!(
                "expected SOAP Envelope, found <{}>",
                root.local
            )))
        }
    };

    let body = root
        .children
        .into_iter()
        .find(|c| c.local == "Body")
        .ok_or_else(|| CallFailure::XmlSyntax("SOAP envelope has no Body".to_string()))?;

    let Some(payload) = body.children.into_iter().next() else {
        return Ok(Value::Null);
    };

    if payload.local == "Fault" && payload.namespace.as_deref() == Some(version.envelope_namespace()) {
        return Err(CallFailure::Fault(decode_fault(&payload, version)));
    }

    // Wrapped responses with a single result element return that element.
    let mut value = payload.into_value();
    if let Value::Object(map) = &mut value {
        if map.len() == 1 {
            if let Some(key) = map.keys().next().cloned() {
                return Ok(map.remove(&key).unwrap_or(Value::Null));
            }
        }
    }
    Ok(value)
}

fn decode_fault(fault: &Node, version: SoapVersion) -> SoapFault {
    match version {
        SoapVersion::Soap11 => SoapFault {
            code: fault.child_text("faultcode").unwrap_or_default(),
            message: fault
                .child_text("faultstring")
                .unwrap_or_else(|| "unknown fault".to_string()),
            actor: fault.child_text("faultactor"),
            detail: fault.child("detail").map(Node::flatten_text).filter(|d| !d.is_empty()),
        },
        SoapVersion::Soap12 => SoapFault {
            code: fault
                .child("Code")
                .and_then(|c| c.child_text("Value"))
                .unwrap_or_default(),
            message: fault
                .child("Reason")
                .and_then(|r| r.child_text("Text"))
                .unwrap_or_else(|| "unknown fault".to_string()),
            actor: fault.child_text("Role"),
            detail: fault.child("Detail").map(Node::flatten_text).filter(|d| !d.is_empty()),
        },
    }
}
