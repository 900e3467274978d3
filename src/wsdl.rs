//! WSDL 1.1 operation discovery.
//!
//! Only what is needed to call document/literal operations is extracted:
//! operation names, their `soapAction`, the service address and the SOAP
//! version of the binding. Message and schema types are not interpreted.

use crate::error::ResolveError;
use crate::xml::{attribute, check_xxe_patterns, element_name, split_qname, NamespaceStack};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// WSDL namespace URIs.
pub const WSDL_NS: &str = "http://schemas.xmlsoap.org/wsdl/";
pub const WSDL_SOAP11_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap/";
pub const WSDL_SOAP12_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap12/";

/// SOAP versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SoapVersion {
    /// SOAP 1.1 (namespace: http://schemas.xmlsoap.org/soap/envelope/)
    #[default]
    #[serde(rename = "1.1")]
    Soap11,
    /// SOAP 1.2 (namespace: http://www.w3.org/2003/05/soap-envelope)
    #[serde(rename = "1.2")]
    Soap12,
}

/// An operation exposed by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsdlOperation {
    pub name: String,
    /// `soapAction` from the binding, if any
    pub soap_action: Option<String>,
}

/// Parsed WSDL contract.
#[derive(Debug, Clone, Default)]
pub struct WsdlDocument {
    /// `targetNamespace` of the definitions
    pub target_namespace: Option<String>,
    /// Name of the first `service` element
    pub service_name: Option<String>,
    /// `location` of the first SOAP `address`
    pub address: Option<String>,
    /// SOAP version of the binding used
    pub version: SoapVersion,
    pub operations: BTreeMap<String, WsdlOperation>,
}

impl WsdlDocument {
    pub fn operation(&self, name: &str) -> Option<&WsdlOperation> {
        self.operations.get(name)
    }

    pub fn operation_names(&self) -> Vec<String> {
        self.operations.keys().cloned().collect()
    }
}

#[derive(Default)]
struct ParseState {
    doc: WsdlDocument,
    root_seen: bool,
    in_port_type: bool,
    in_binding: bool,
    in_service: bool,
    binding_operation: Option<String>,
    binding_version: Option<SoapVersion>,
    address_version: Option<SoapVersion>,
}

impl ParseState {
    fn add_operation(&mut self, name: &str) {
        self.doc
            .operations
            .entry(name.to_string())
            .or_insert_with(|| WsdlOperation {
                name: name.to_string(),
                soap_action: None,
            });
    }

    fn open(&mut self, e: &BytesStart, ns: &NamespaceStack, is_empty: bool) -> Result<(), ResolveError> {
        let name = element_name(e);
        let uri = ns.namespace_of(&name);

        if !self.root_seen {
            self.root_seen = true;
            if name.local != "definitions" || uri != Some(WSDL_NS) {
                return Err(ResolveError::InvalidWsdl(format!(
                    "root element <{}> is not a WSDL 1.1 definitions element",
                    name.local
                )));
            }
            self.doc.target_namespace = attribute(e, "targetNamespace");
            return Ok(());
        }

        let binding_version = match uri {
            Some(WSDL_SOAP11_NS) => Some(SoapVersion::Soap11),
            Some(WSDL_SOAP12_NS) => Some(SoapVersion::Soap12),
            _ => None,
        };

        if uri == Some(WSDL_NS) {
            match name.local.as_str() {
                "portType" if !is_empty => self.in_port_type = true,
                "binding" if !is_empty => self.in_binding = true,
                "service" => {
                    if self.doc.service_name.is_none() {
                        self.doc.service_name = attribute(e, "name");
                    }
                    self.in_service = !is_empty;
                }
                "operation" => {
                    if let Some(op_name) = attribute(e, "name") {
                        if self.in_port_type || self.in_binding {
                            self.add_operation(&op_name);
                        }
                        if self.in_binding && !is_empty {
                            self.binding_operation = Some(op_name);
                        }
                    }
                }
                _ => {}
            }
        } else if let Some(version) = binding_version {
            match name.local.as_str() {
                "binding" if self.in_binding => {
                    self.binding_version.get_or_insert(version);
                }
                "operation" => {
                    if let Some(op_name) = self.binding_operation.clone() {
                        self.binding_version.get_or_insert(version);
                        let action = attribute(e, "soapAction").filter(|a| !a.is_empty());
                        if let Some(op) = self.doc.operations.get_mut(&op_name) {
                            if op.soap_action.is_none() {
                                op.soap_action = action;
                            }
                        }
                    }
                }
                "address" if self.in_service && self.doc.address.is_none() => {
                    self.doc.address = attribute(e, "location");
                    self.address_version = Some(version);
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn close(&mut self, local: &str, uri: Option<&str>) {
        if uri != Some(WSDL_NS) {
            return;
        }
        match local {
            "portType" => self.in_port_type = false,
            "binding" => self.in_binding = false,
            "service" => self.in_service = false,
            "operation" => self.binding_operation = None,
            _ => {}
        }
    }
}

/// Parse a WSDL 1.1 document.
pub fn parse_wsdl(xml: &str) -> Result<WsdlDocument, ResolveError> {
    check_xxe_patterns(xml).map_err(ResolveError::InvalidWsdl)?;

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut ns = NamespaceStack::default();
    let mut state = ParseState::default();
    let mut depth = 0u32;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                depth += 1;
                ns.push(e);
                state.open(e, &ns, false)?;
            }
            Ok(Event::Empty(ref e)) => {
                ns.push(e);
                state.open(e, &ns, true)?;
                ns.pop();
            }
            Ok(Event::End(ref e)) => {
                depth = depth.saturating_sub(1);
                let name = split_qname(e.name().as_ref());
                let uri = ns.namespace_of(&name).map(str::to_string);
                state.close(&name.local, uri.as_deref());
                ns.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ResolveError::InvalidWsdl(format!("XML parse error: {}", e)));
            }
            _ => {}
        }
        buf.clear();
    }

    if !state.root_seen {
        return Err(ResolveError::InvalidWsdl("document is empty".to_string()));
    }
    if depth != 0 {
        return Err(ResolveError::InvalidWsdl("unexpected end of document".to_string()));
    }
    if state.doc.operations.is_empty() {
        return Err(ResolveError::InvalidWsdl("no operations declared".to_string()));
    }

    state.doc.version = state
        .address_version
        .or(state.binding_version)
        .unwrap_or_default();

    Ok(state.doc)
}
