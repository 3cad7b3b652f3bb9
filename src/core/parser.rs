use crate::core::interface_parser::parse_interface;
use crate::core::xml::{
    child, child_text, children, collect_namespaces, descendant, descendant_ending_with,
    detect_autosar_version, element_children, element_xpath, is_autosar_document, local_name,
    path_text, source_line, text_of,
};
use crate::domain::interface::Interface;
use crate::domain::model::{
    last_segment, new_uuid, path_ends_with, ArxmlModel, Component, ComponentPrototype,
    ComponentType, Connection, ConnectionEndpoint, ConnectionType, Package, ParseMetadata,
    ParseStatistics, Port, PortType,
};
use crate::utils::error::{Result, ViewerError};
use chrono::Utc;
use roxmltree::Node;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub struct ParserOptions {
    pub max_file_size_mb: u64,
    pub resolve_references: bool,
    pub require_autosar_root: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            max_file_size_mb: 500,
            resolve_references: true,
            require_autosar_root: false,
        }
    }
}

/// Hands out element UUIDs, keeping the file's own `UUID` attribute unless it was already used.
#[derive(Debug, Default)]
pub struct UuidRegistry {
    used: HashSet<String>,
}

impl UuidRegistry {
    pub fn assign(&mut self, node: Node<'_, '_>) -> String {
        if let Some(uuid) = node.attribute("UUID").map(str::trim) {
            if !uuid.is_empty() && self.used.insert(uuid.to_string()) {
                return uuid.to_string();
            }
            tracing::debug!("Duplicate UUID '{}' replaced with a generated one", uuid);
        }
        self.fresh()
    }

    pub fn fresh(&mut self) -> String {
        loop {
            let uuid = new_uuid();
            if self.used.insert(uuid.clone()) {
                return uuid;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}

#[derive(Default)]
struct ParseState {
    uuids: UuidRegistry,
    stats: ParseStatistics,
    interfaces: Vec<Interface>,
    connections: Vec<Connection>,
}

pub struct ArxmlParser {
    options: ParserOptions,
    state: ParseState,
}

impl ArxmlParser {
    pub fn new(options: ParserOptions) -> Self {
        Self {
            options,
            state: ParseState::default(),
        }
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Statistics of the most recent parse.
    pub fn statistics(&self) -> &ParseStatistics {
        &self.state.stats
    }

    pub fn clear_cache(&mut self) {
        self.state = ParseState::default();
    }

    pub fn parse_file(&mut self, path: impl AsRef<Path>) -> Result<ArxmlModel> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        if !path.is_file() {
            return Err(ViewerError::FileNotFound { path: path_str });
        }

        let size = std::fs::metadata(path)?.len();
        self.check_size(&path_str, size)?;

        tracing::info!("📁 Parsing ARXML file: {}", path_str);
        let bytes = std::fs::read(path)?;
        self.parse_bytes(&bytes, &path_str)
    }

    pub fn parse_bytes(&mut self, bytes: &[u8], name: &str) -> Result<ArxmlModel> {
        self.check_size(name, bytes.len() as u64)?;
        let text = std::str::from_utf8(bytes).map_err(|e| {
            ViewerError::parsing(format!("{} is not valid UTF-8: {}", name, e))
        })?;
        self.parse_str(text, name)
    }

    fn check_size(&self, name: &str, size: u64) -> Result<()> {
        let limit_bytes = self.options.max_file_size_mb.saturating_mul(1024 * 1024);
        if size > limit_bytes {
            return Err(ViewerError::FileTooLarge {
                path: name.to_string(),
                size_mb: size as f64 / (1024.0 * 1024.0),
                limit_mb: self.options.max_file_size_mb,
            });
        }
        Ok(())
    }

    /// Parses an in-memory ARXML document. `name` only ends up in metadata and messages.
    pub fn parse_str(&mut self, text: &str, name: &str) -> Result<ArxmlModel> {
        let started = Instant::now();
        self.state = ParseState::default();
        self.state.stats.file_size = text.len() as u64;

        let doc = roxmltree::Document::parse(text)?;
        let root = doc.root_element();
        let root_name = local_name(root).to_string();

        if !is_autosar_document(root) {
            if self.options.require_autosar_root {
                return Err(ViewerError::NotAutosar { root: root_name });
            }
            tracing::warn!(
                "⚠️ Root element <{}> does not look like AUTOSAR, parsing anyway",
                root_name
            );
        }

        let mut packages = Vec::new();
        for container in children(root, "AR-PACKAGES") {
            for pkg_node in children(container, "AR-PACKAGE") {
                if let Some(package) = self.parse_package(pkg_node, None) {
                    packages.push(package);
                }
            }
        }

        let mut model = ArxmlModel {
            packages,
            interfaces: std::mem::take(&mut self.state.interfaces),
            connections: std::mem::take(&mut self.state.connections),
            metadata: ParseMetadata::default(),
        };

        if self.options.resolve_references {
            self.state.stats.unresolved_references = resolve_references(&mut model);
        }

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.state.stats.parse_time_ms = elapsed_ms;

        model.metadata = ParseMetadata {
            file_path: name.to_string(),
            file_size: text.len() as u64,
            parse_time_ms: elapsed_ms,
            statistics: self.state.stats.clone(),
            namespaces: collect_namespaces(root),
            root_element: root_name,
            autosar_version: detect_autosar_version(root),
            parsed_at: Utc::now(),
        };

        let stats = &self.state.stats;
        tracing::info!(
            "✅ Parsed {} packages, {} components, {} ports, {} interfaces, {} connections in {:.1}ms",
            stats.packages_parsed,
            stats.components_parsed,
            stats.ports_parsed,
            stats.interfaces_parsed,
            stats.connections_parsed,
            elapsed_ms
        );
        if stats.unresolved_references > 0 {
            tracing::warn!(
                "⚠️ {} references could not be resolved",
                stats.unresolved_references
            );
        }

        Ok(model)
    }

    fn parse_package(&mut self, node: Node<'_, '_>, parent_path: Option<&str>) -> Option<Package> {
        let Some(short_name) = child_text(node, "SHORT-NAME") else {
            tracing::warn!("Skipping AR-PACKAGE without SHORT-NAME at {}", element_xpath(node));
            return None;
        };

        let mut package = Package::new(short_name, parent_path);
        package.uuid = self.state.uuids.assign(node);
        package.desc = path_text(node, "DESC/L-2");
        package.category = child_text(node, "CATEGORY");
        package.xml_path = Some(element_xpath(node));
        package.source_line = Some(source_line(node));
        self.state.stats.packages_parsed += 1;

        if let Some(elements) = child(node, "ELEMENTS") {
            for element in element_children(elements) {
                let tag = local_name(element);
                if tag.contains("SW-COMPONENT-TYPE") {
                    if let Some(component) = self.parse_component(element) {
                        package.add_component(component);
                    }
                } else if tag.ends_with("-INTERFACE") {
                    if let Some(interface) =
                        parse_interface(element, &package.full_path, &mut self.state.uuids)
                    {
                        self.state.stats.interfaces_parsed += 1;
                        self.state.stats.methods_parsed += interface.method_count();
                        self.state.stats.data_elements_parsed += interface.data_element_count();
                        package.interfaces.push(interface.uuid.clone());
                        self.state.interfaces.push(interface);
                    }
                }
            }
        }

        if let Some(sub_packages) = child(node, "SUB-PACKAGES") {
            let full_path = package.full_path.clone();
            for sub in children(sub_packages, "AR-PACKAGE") {
                if let Some(sub_package) = self.parse_package(sub, Some(&full_path)) {
                    package.sub_packages.push(sub_package);
                }
            }
        }

        tracing::debug!(
            "Parsed package {} ({} components)",
            package.full_path,
            package.components.len()
        );
        Some(package)
    }

    fn parse_component(&mut self, node: Node<'_, '_>) -> Option<Component> {
        let tag = local_name(node);
        let Some(short_name) = child_text(node, "SHORT-NAME") else {
            tracing::warn!("Skipping {} without SHORT-NAME at {}", tag, element_xpath(node));
            return None;
        };

        let mut component = Component::new(short_name, ComponentType::from_tag(tag));
        component.uuid = self.state.uuids.assign(node);
        component.desc = path_text(node, "DESC/L-2");
        component.category = child_text(node, "CATEGORY");
        component.xml_path = Some(element_xpath(node));
        component.source_line = Some(source_line(node));

        if let Some(ports) = child(node, "PORTS") {
            for port_node in element_children(ports) {
                if !local_name(port_node).contains("PORT-PROTOTYPE") {
                    continue;
                }
                if let Some(port) = self.parse_port(port_node) {
                    component.add_port(port);
                }
            }
        }

        if component.is_composition() {
            self.parse_composition(node, &mut component);
        }

        self.state.stats.components_parsed += 1;
        Some(component)
    }

    fn parse_port(&mut self, node: Node<'_, '_>) -> Option<Port> {
        let tag = local_name(node);
        let Some(short_name) = child_text(node, "SHORT-NAME") else {
            tracing::warn!("Skipping {} without SHORT-NAME at {}", tag, element_xpath(node));
            return None;
        };

        let mut port = Port::new(short_name, PortType::from_tag(tag));
        port.uuid = self.state.uuids.assign(node);
        port.desc = path_text(node, "DESC/L-2");
        port.category = child_text(node, "CATEGORY");
        port.interface_ref = descendant_ending_with(node, "INTERFACE-TREF").and_then(text_of);
        port.xml_path = Some(element_xpath(node));
        port.source_line = Some(source_line(node));

        self.state.stats.ports_parsed += 1;
        Some(port)
    }

    fn parse_composition(&mut self, node: Node<'_, '_>, composition: &mut Component) {
        if let Some(components) = child(node, "COMPONENTS") {
            for proto in children(components, "SW-COMPONENT-PROTOTYPE") {
                let Some(short_name) = child_text(proto, "SHORT-NAME") else {
                    continue;
                };
                composition.prototypes.push(ComponentPrototype {
                    uuid: self.state.uuids.assign(proto),
                    short_name,
                    type_ref: child_text(proto, "TYPE-TREF"),
                    component_uuid: None,
                });
                self.state.stats.prototypes_parsed += 1;
            }
        }

        if let Some(connectors) = child(node, "CONNECTORS") {
            for connector in element_children(connectors) {
                let Some(connection_type) = ConnectionType::from_tag(local_name(connector)) else {
                    tracing::debug!("Ignoring connector <{}>", local_name(connector));
                    continue;
                };
                if let Some(mut connection) = self.parse_connector(connector, connection_type) {
                    connection.composition_uuid = Some(composition.uuid.clone());
                    composition.connections.push(connection.uuid.clone());
                    self.state.connections.push(connection);
                    self.state.stats.connections_parsed += 1;
                }
            }
        }
    }

    fn parse_connector(
        &mut self,
        node: Node<'_, '_>,
        connection_type: ConnectionType,
    ) -> Option<Connection> {
        let Some(short_name) = child_text(node, "SHORT-NAME") else {
            tracing::warn!(
                "Skipping {} without SHORT-NAME at {}",
                connection_type,
                element_xpath(node)
            );
            return None;
        };

        let (provider, requester) = match connection_type {
            ConnectionType::Assembly => (
                instance_ref_endpoint(child(node, "PROVIDER-IREF"), "TARGET-P-PORT-REF"),
                instance_ref_endpoint(child(node, "REQUESTER-IREF"), "TARGET-R-PORT-REF"),
            ),
            ConnectionType::Delegation => {
                let inner = child(node, "INNER-PORT-IREF");
                let outer = ConnectionEndpoint::new(None, child_text(node, "OUTER-PORT-REF"));
                let inner_is_provider = inner
                    .and_then(|n| descendant(n, "TARGET-P-PORT-REF"))
                    .is_some();
                if inner_is_provider {
                    (instance_ref_endpoint(inner, "TARGET-P-PORT-REF"), outer)
                } else {
                    (outer, instance_ref_endpoint(inner, "TARGET-R-PORT-REF"))
                }
            }
            ConnectionType::PassThrough => (
                ConnectionEndpoint::new(None, child_text(node, "PROVIDED-OUTER-PORT-REF")),
                ConnectionEndpoint::new(None, child_text(node, "REQUIRED-OUTER-PORT-REF")),
            ),
        };

        let mut connection = Connection::new(short_name, connection_type, provider, requester);
        connection.uuid = self.state.uuids.assign(node);
        connection.desc = path_text(node, "DESC/L-2");
        connection.category = child_text(node, "CATEGORY");
        connection.xml_path = Some(element_xpath(node));
        connection.source_line = Some(source_line(node));
        Some(connection)
    }
}

impl Default for ArxmlParser {
    fn default() -> Self {
        Self::new(ParserOptions::default())
    }
}

fn instance_ref_endpoint(iref: Option<Node<'_, '_>>, target: &str) -> ConnectionEndpoint {
    let Some(iref) = iref else {
        return ConnectionEndpoint::default();
    };
    let component_ref = descendant(iref, "CONTEXT-COMPONENT-REF").and_then(text_of);
    let port_ref = descendant(iref, target)
        .or_else(|| descendant_ending_with(iref, "PORT-REF"))
        .and_then(text_of);
    ConnectionEndpoint::new(component_ref, port_ref)
}

fn collect_components_mut<'a>(packages: &'a mut [Package], out: &mut Vec<&'a mut Component>) {
    for package in packages {
        out.extend(package.components.iter_mut());
        collect_components_mut(&mut package.sub_packages, out);
    }
}

/// Exact path, then path suffix, then short name.
/// Suffix and short-name lookups take the first element in document order.
#[derive(Default)]
struct RefIndex {
    by_path: HashMap<String, String>,
    by_name: HashMap<String, String>,
    ordered: Vec<(String, String)>,
}

impl RefIndex {
    fn insert(&mut self, path: String, short_name: &str, uuid: &str) {
        self.by_path.insert(path.clone(), uuid.to_string());
        self.by_name
            .entry(short_name.to_string())
            .or_insert_with(|| uuid.to_string());
        self.ordered.push((path, uuid.to_string()));
    }

    fn resolve_path(&self, reference: &str) -> Option<&String> {
        self.by_path.get(reference).or_else(|| {
            self.ordered
                .iter()
                .find(|(path, _)| path_ends_with(path, reference))
                .map(|(_, uuid)| uuid)
        })
    }

    fn resolve_name(&self, reference: &str) -> Option<&String> {
        self.by_name.get(last_segment(reference))
    }

    fn resolve(&self, reference: &str) -> Option<String> {
        self.resolve_path(reference)
            .or_else(|| self.resolve_name(reference))
            .cloned()
    }
}

/// Fills in the UUID fields behind port, prototype and connector references.
/// Returns the number of references that stayed unresolved.
pub fn resolve_references(model: &mut ArxmlModel) -> usize {
    let mut unresolved = 0;

    let mut interfaces = RefIndex::default();
    for interface in &model.interfaces {
        interfaces.insert(interface.full_path(), &interface.short_name, &interface.uuid);
    }

    let mut components_index = RefIndex::default();
    // component uuid -> port short name -> port uuid
    let mut ports_by_component: HashMap<String, HashMap<String, String>> = HashMap::new();
    // "/Pkg/Comp/Port" -> (component uuid, port uuid)
    let mut ports_by_path: HashMap<String, (String, String)> = HashMap::new();

    for component in model.all_components() {
        let path = component.full_path();
        components_index.insert(path.clone(), &component.short_name, &component.uuid);
        let ports = ports_by_component.entry(component.uuid.clone()).or_default();
        for port in component.all_ports() {
            ports.insert(port.short_name.clone(), port.uuid.clone());
            ports_by_path.insert(
                format!("{}/{}", path, port.short_name),
                (component.uuid.clone(), port.uuid.clone()),
            );
        }
    }

    let mut components = Vec::new();
    collect_components_mut(&mut model.packages, &mut components);

    // composition uuid -> prototype path/name -> component type uuid, in document order
    let mut prototypes: Vec<(String, RefIndex)> = Vec::new();

    for component in components.iter_mut() {
        for port in component.provided_ports.iter_mut().chain(component.required_ports.iter_mut()) {
            let Some(reference) = port.interface_ref.as_deref() else {
                continue;
            };
            port.interface_uuid = interfaces.resolve(reference);
            if port.interface_uuid.is_none() {
                tracing::debug!("Unresolved interface reference {} on port {}", reference, port.short_name);
                unresolved += 1;
            }
        }

        let composition_path = component.full_path();
        let mut index = RefIndex::default();
        for proto in component.prototypes.iter_mut() {
            if let Some(reference) = proto.type_ref.as_deref() {
                proto.component_uuid = components_index.resolve(reference);
                if proto.component_uuid.is_none() {
                    tracing::debug!("Unresolved component type reference {}", reference);
                    unresolved += 1;
                }
            }
            if let Some(component_uuid) = &proto.component_uuid {
                index.insert(
                    format!("{}/{}", composition_path, proto.short_name),
                    &proto.short_name,
                    component_uuid,
                );
            }
        }
        if !index.ordered.is_empty() {
            prototypes.push((component.uuid.clone(), index));
        }
    }

    for connection in model.connections.iter_mut() {
        let composition_uuid = connection.composition_uuid.clone();
        let scope = composition_uuid.as_ref().and_then(|uuid| {
            prototypes
                .iter()
                .find(|(owner, _)| owner == uuid)
                .map(|(_, index)| index)
        });

        let endpoints = std::iter::once(&mut connection.provider)
            .chain(std::iter::once(&mut connection.requester))
            .chain(connection.additional_endpoints.iter_mut());

        for endpoint in endpoints {
            endpoint.component_uuid = match endpoint.component_ref.as_deref() {
                Some(reference) => scope
                    .and_then(|index| index.resolve(reference))
                    .or_else(|| {
                        // 其他 composition 的 prototype：先比路徑再比名稱
                        prototypes
                            .iter()
                            .find_map(|(_, index)| index.resolve_path(reference))
                            .or_else(|| {
                                prototypes
                                    .iter()
                                    .find_map(|(_, index)| index.resolve_name(reference))
                            })
                            .cloned()
                    }),
                // outer composition port
                None => composition_uuid.clone(),
            };

            endpoint.port_uuid = endpoint.port_ref.as_deref().and_then(|reference| {
                let by_component = endpoint.component_uuid.as_ref().and_then(|uuid| {
                    ports_by_component
                        .get(uuid)
                        .and_then(|ports| ports.get(last_segment(reference)))
                        .cloned()
                });
                by_component.or_else(|| ports_by_path.get(reference).map(|(_, port)| port.clone()))
            });

            if !endpoint.is_resolved() {
                tracing::debug!(
                    "Unresolved connector endpoint {:?} / {:?} in {}",
                    endpoint.component_ref,
                    endpoint.port_ref,
                    connection.short_name
                );
                unresolved += 1;
            }
        }
    }

    unresolved
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<AUTOSAR xmlns="http://autosar.org/schema/r4.0">
  <AR-PACKAGES>
    <AR-PACKAGE UUID="pkg-1">
      <SHORT-NAME>Demo</SHORT-NAME>
      <ELEMENTS>
        <APPLICATION-SW-COMPONENT-TYPE UUID="pkg-1">
          <SHORT-NAME>Ctrl</SHORT-NAME>
          <PORTS>
            <R-PORT-PROTOTYPE><SHORT-NAME>In</SHORT-NAME></R-PORT-PROTOTYPE>
          </PORTS>
        </APPLICATION-SW-COMPONENT-TYPE>
      </ELEMENTS>
      <SUB-PACKAGES>
        <AR-PACKAGE><SHORT-NAME>Inner</SHORT-NAME></AR-PACKAGE>
        <AR-PACKAGE><CATEGORY>NO-NAME</CATEGORY></AR-PACKAGE>
      </SUB-PACKAGES>
    </AR-PACKAGE>
  </AR-PACKAGES>
</AUTOSAR>"#;

    #[test]
    fn test_parse_minimal_document() {
        let mut parser = ArxmlParser::default();
        let model = parser.parse_str(MINIMAL, "minimal.arxml").unwrap();

        assert_eq!(model.packages.len(), 1);
        let demo = &model.packages[0];
        assert_eq!(demo.full_path, "/Demo");
        assert_eq!(demo.sub_packages.len(), 1);
        assert_eq!(demo.sub_packages[0].full_path, "/Demo/Inner");
        assert_eq!(parser.statistics().packages_parsed, 2);
        assert_eq!(model.metadata.namespaces.get("ar").map(String::as_str), Some("http://autosar.org/schema/r4.0"));
    }

    #[test]
    fn test_duplicate_uuid_attribute_is_replaced() {
        let mut parser = ArxmlParser::default();
        let model = parser.parse_str(MINIMAL, "minimal.arxml").unwrap();

        let component = &model.packages[0].components[0];
        assert_eq!(model.packages[0].uuid, "pkg-1");
        assert_ne!(component.uuid, "pkg-1");
        assert_eq!(
            component.required_ports[0].component_uuid.as_deref(),
            Some(component.uuid.as_str())
        );
    }

    #[test]
    fn test_non_autosar_root() {
        let mut lenient = ArxmlParser::default();
        let model = lenient.parse_str("<project/>", "other.xml").unwrap();
        assert!(model.packages.is_empty());
        assert_eq!(model.metadata.root_element, "project");

        let mut strict = ArxmlParser::new(ParserOptions {
            require_autosar_root: true,
            ..ParserOptions::default()
        });
        assert!(matches!(
            strict.parse_str("<project/>", "other.xml"),
            Err(ViewerError::NotAutosar { .. })
        ));
    }

    #[test]
    fn test_malformed_xml_and_size_limit() {
        let mut parser = ArxmlParser::default();
        assert!(matches!(
            parser.parse_str("<AUTOSAR><AR-PACKAGES>", "broken.arxml"),
            Err(ViewerError::XmlError(_))
        ));

        let mut tiny = ArxmlParser::new(ParserOptions {
            max_file_size_mb: 0,
            ..ParserOptions::default()
        });
        assert!(matches!(
            tiny.parse_bytes(MINIMAL.as_bytes(), "minimal.arxml"),
            Err(ViewerError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let mut parser = ArxmlParser::default();
        assert!(matches!(
            parser.parse_file("/definitely/not/here.arxml"),
            Err(ViewerError::FileNotFound { .. })
        ));
    }

    const DUPLICATE_NAMES: &str = r#"<AUTOSAR xmlns="http://autosar.org/schema/r4.0">
  <AR-PACKAGES>
    <AR-PACKAGE>
      <SHORT-NAME>A</SHORT-NAME>
      <ELEMENTS>
        <SENDER-RECEIVER-INTERFACE UUID="if-a"><SHORT-NAME>Ifc</SHORT-NAME></SENDER-RECEIVER-INTERFACE>
      </ELEMENTS>
    </AR-PACKAGE>
    <AR-PACKAGE>
      <SHORT-NAME>B</SHORT-NAME>
      <ELEMENTS>
        <SENDER-RECEIVER-INTERFACE UUID="if-b"><SHORT-NAME>Ifc</SHORT-NAME></SENDER-RECEIVER-INTERFACE>
      </ELEMENTS>
    </AR-PACKAGE>
    <AR-PACKAGE>
      <SHORT-NAME>C</SHORT-NAME>
      <ELEMENTS>
        <APPLICATION-SW-COMPONENT-TYPE UUID="swc-ctrl">
          <SHORT-NAME>Ctrl</SHORT-NAME>
          <PORTS>
            <R-PORT-PROTOTYPE><SHORT-NAME>Relative</SHORT-NAME><REQUIRED-INTERFACE-TREF>B/Ifc</REQUIRED-INTERFACE-TREF></R-PORT-PROTOTYPE>
            <R-PORT-PROTOTYPE><SHORT-NAME>Absolute</SHORT-NAME><REQUIRED-INTERFACE-TREF>/B/Ifc</REQUIRED-INTERFACE-TREF></R-PORT-PROTOTYPE>
            <R-PORT-PROTOTYPE><SHORT-NAME>Bare</SHORT-NAME><REQUIRED-INTERFACE-TREF>Ifc</REQUIRED-INTERFACE-TREF></R-PORT-PROTOTYPE>
          </PORTS>
        </APPLICATION-SW-COMPONENT-TYPE>
      </ELEMENTS>
    </AR-PACKAGE>
  </AR-PACKAGES>
</AUTOSAR>"#;

    #[test]
    fn test_interface_reference_resolution_order() {
        let mut parser = ArxmlParser::default();
        let model = parser.parse_str(DUPLICATE_NAMES, "dup.arxml").unwrap();
        let ctrl = model.find_component("swc-ctrl").unwrap();

        let resolved = |port: &str| {
            ctrl.port_by_name(port)
                .and_then(|p| p.interface_uuid.clone())
                .unwrap_or_default()
        };
        assert_eq!(resolved("Relative"), "if-b");
        assert_eq!(resolved("Absolute"), "if-b");
        assert_eq!(resolved("Bare"), "if-a");
        assert_eq!(parser.statistics().unresolved_references, 0);

        assert_eq!(model.find_interface_by_ref("B/Ifc").unwrap().uuid, "if-b");
        assert_eq!(model.find_interface_by_ref("/A/Ifc").unwrap().uuid, "if-a");
        assert_eq!(model.find_interface_by_ref("Ifc").unwrap().uuid, "if-a");
        assert!(model.find_interface_by_ref("Missing").is_none());
    }

    const SHARED_PROTOTYPE_NAMES: &str = r#"<AUTOSAR xmlns="http://autosar.org/schema/r4.0">
  <AR-PACKAGES>
    <AR-PACKAGE>
      <SHORT-NAME>P</SHORT-NAME>
      <ELEMENTS>
        <APPLICATION-SW-COMPONENT-TYPE UUID="swc-x">
          <SHORT-NAME>X</SHORT-NAME>
          <PORTS><R-PORT-PROTOTYPE UUID="port-x-in"><SHORT-NAME>In</SHORT-NAME></R-PORT-PROTOTYPE></PORTS>
        </APPLICATION-SW-COMPONENT-TYPE>
        <APPLICATION-SW-COMPONENT-TYPE UUID="swc-y">
          <SHORT-NAME>Y</SHORT-NAME>
          <PORTS><P-PORT-PROTOTYPE UUID="port-y-out"><SHORT-NAME>Out</SHORT-NAME></P-PORT-PROTOTYPE></PORTS>
        </APPLICATION-SW-COMPONENT-TYPE>
        <COMPOSITION-SW-COMPONENT-TYPE UUID="comp-a">
          <SHORT-NAME>CompA</SHORT-NAME>
          <COMPONENTS>
            <SW-COMPONENT-PROTOTYPE><SHORT-NAME>Inst</SHORT-NAME><TYPE-TREF>/P/X</TYPE-TREF></SW-COMPONENT-PROTOTYPE>
          </COMPONENTS>
        </COMPOSITION-SW-COMPONENT-TYPE>
        <COMPOSITION-SW-COMPONENT-TYPE UUID="comp-b">
          <SHORT-NAME>CompB</SHORT-NAME>
          <COMPONENTS>
            <SW-COMPONENT-PROTOTYPE><SHORT-NAME>Inst</SHORT-NAME><TYPE-TREF>/P/Y</TYPE-TREF></SW-COMPONENT-PROTOTYPE>
          </COMPONENTS>
        </COMPOSITION-SW-COMPONENT-TYPE>
        <COMPOSITION-SW-COMPONENT-TYPE UUID="comp-c">
          <SHORT-NAME>CompC</SHORT-NAME>
          <CONNECTORS>
            <ASSEMBLY-SW-CONNECTOR>
              <SHORT-NAME>Cross</SHORT-NAME>
              <PROVIDER-IREF>
                <CONTEXT-COMPONENT-REF>/P/CompB/Inst</CONTEXT-COMPONENT-REF>
                <TARGET-P-PORT-REF>/P/Y/Out</TARGET-P-PORT-REF>
              </PROVIDER-IREF>
              <REQUESTER-IREF>
                <CONTEXT-COMPONENT-REF>Inst</CONTEXT-COMPONENT-REF>
                <TARGET-R-PORT-REF>/P/X/In</TARGET-R-PORT-REF>
              </REQUESTER-IREF>
            </ASSEMBLY-SW-CONNECTOR>
          </CONNECTORS>
        </COMPOSITION-SW-COMPONENT-TYPE>
      </ELEMENTS>
    </AR-PACKAGE>
  </AR-PACKAGES>
</AUTOSAR>"#;

    #[test]
    fn test_prototypes_from_other_compositions_resolve_in_document_order() {
        let mut parser = ArxmlParser::default();
        let model = parser.parse_str(SHARED_PROTOTYPE_NAMES, "shared.arxml").unwrap();

        let cross = &model.connections[0];
        assert_eq!(cross.composition_uuid.as_deref(), Some("comp-c"));
        // full path picks CompB even though CompA's prototype has the same name
        assert_eq!(cross.provider.component_uuid.as_deref(), Some("swc-y"));
        assert_eq!(cross.provider.port_uuid.as_deref(), Some("port-y-out"));
        // bare name falls back to the first composition in the document
        assert_eq!(cross.requester.component_uuid.as_deref(), Some("swc-x"));
        assert_eq!(cross.requester.port_uuid.as_deref(), Some("port-x-in"));
    }

    #[test]
    fn test_dtd_is_rejected() {
        let doc = r#"<?xml version="1.0"?>
<!DOCTYPE AUTOSAR [<!ENTITY name "Injected">]>
<AUTOSAR><AR-PACKAGES><AR-PACKAGE><SHORT-NAME>&name;</SHORT-NAME></AR-PACKAGE></AR-PACKAGES></AUTOSAR>"#;

        let mut parser = ArxmlParser::default();
        assert!(matches!(
            parser.parse_str(doc, "dtd.arxml"),
            Err(ViewerError::XmlError(_))
        ));
    }
}
