use crate::domain::interface::{Interface, InterfaceType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub fn new_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 以 "/" 分隔的參照路徑取最後一段 (例如 "/Pkg/Comp/Port" -> "Port")
pub fn last_segment(reference: &str) -> &str {
    reference
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(reference)
}

/// True when `path` ends with the segments of `reference`, e.g. `/A/B/Ifc` and `B/Ifc`.
pub fn path_ends_with(path: &str, reference: &str) -> bool {
    let suffix = reference.trim_matches('/');
    if suffix.is_empty() {
        return false;
    }
    path.trim_end_matches('/')
        .strip_suffix(suffix)
        .is_some_and(|head| head.is_empty() || head.ends_with('/'))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentType {
    #[serde(rename = "APPLICATION-SW-COMPONENT-TYPE")]
    Application,
    #[serde(rename = "COMPOSITION-SW-COMPONENT-TYPE")]
    Composition,
    #[serde(rename = "SERVICE-SW-COMPONENT-TYPE")]
    Service,
    #[serde(rename = "SENSOR-ACTUATOR-SW-COMPONENT-TYPE")]
    SensorActuator,
    #[serde(rename = "COMPLEX-DEVICE-DRIVER-SW-COMPONENT-TYPE")]
    ComplexDeviceDriver,
}

impl ComponentType {
    pub const ALL: [ComponentType; 5] = [
        ComponentType::Application,
        ComponentType::Composition,
        ComponentType::Service,
        ComponentType::SensorActuator,
        ComponentType::ComplexDeviceDriver,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            ComponentType::Application => "APPLICATION-SW-COMPONENT-TYPE",
            ComponentType::Composition => "COMPOSITION-SW-COMPONENT-TYPE",
            ComponentType::Service => "SERVICE-SW-COMPONENT-TYPE",
            ComponentType::SensorActuator => "SENSOR-ACTUATOR-SW-COMPONENT-TYPE",
            ComponentType::ComplexDeviceDriver => "COMPLEX-DEVICE-DRIVER-SW-COMPONENT-TYPE",
        }
    }

    /// Unknown `*-SW-COMPONENT-TYPE` tags are treated as application components.
    pub fn from_tag(tag: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|t| t.tag() == tag)
            .unwrap_or(ComponentType::Application)
    }

    /// Ordering used by the grid and hierarchical layouts.
    pub fn layout_priority(&self) -> u8 {
        match self {
            ComponentType::Composition => 0,
            ComponentType::Service => 1,
            ComponentType::Application => 2,
            ComponentType::SensorActuator => 3,
            ComponentType::ComplexDeviceDriver => 4,
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ComponentBehavior {
    Atomic,
    Composite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortType {
    #[serde(rename = "P-PORT-PROTOTYPE")]
    Provided,
    #[serde(rename = "R-PORT-PROTOTYPE")]
    Required,
    #[serde(rename = "PR-PORT-PROTOTYPE")]
    ProvidedRequired,
}

impl PortType {
    pub fn tag(&self) -> &'static str {
        match self {
            PortType::Provided => "P-PORT-PROTOTYPE",
            PortType::Required => "R-PORT-PROTOTYPE",
            PortType::ProvidedRequired => "PR-PORT-PROTOTYPE",
        }
    }

    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "P-PORT-PROTOTYPE" => PortType::Provided,
            "PR-PORT-PROTOTYPE" => PortType::ProvidedRequired,
            _ => PortType::Required,
        }
    }

    pub fn is_provided(&self) -> bool {
        matches!(self, PortType::Provided | PortType::ProvidedRequired)
    }

    pub fn is_required(&self) -> bool {
        matches!(self, PortType::Required | PortType::ProvidedRequired)
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub uuid: String,
    pub short_name: String,
    pub desc: Option<String>,
    pub category: Option<String>,
    pub port_type: PortType,
    /// Raw `*-INTERFACE-TREF` value.
    pub interface_ref: Option<String>,
    pub interface_uuid: Option<String>,
    pub component_uuid: Option<String>,
    pub xml_path: Option<String>,
    pub source_line: Option<u32>,
}

impl Port {
    pub fn new(short_name: impl Into<String>, port_type: PortType) -> Self {
        Self {
            uuid: new_uuid(),
            short_name: short_name.into(),
            desc: None,
            category: None,
            port_type,
            interface_ref: None,
            interface_uuid: None,
            component_uuid: None,
            xml_path: None,
            source_line: None,
        }
    }

    pub fn is_provided(&self) -> bool {
        self.port_type.is_provided()
    }

    pub fn is_required(&self) -> bool {
        self.port_type.is_required()
    }

    pub fn is_bidirectional(&self) -> bool {
        self.port_type == PortType::ProvidedRequired
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Port({}, {})", self.short_name, self.port_type)
    }
}

/// A `SW-COMPONENT-PROTOTYPE` inside a composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentPrototype {
    pub uuid: String,
    pub short_name: String,
    pub type_ref: Option<String>,
    pub component_uuid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub uuid: String,
    pub short_name: String,
    pub desc: Option<String>,
    pub category: Option<String>,
    pub component_type: ComponentType,
    pub behavior: ComponentBehavior,
    pub provided_ports: Vec<Port>,
    pub required_ports: Vec<Port>,
    pub prototypes: Vec<ComponentPrototype>,
    /// Connection UUIDs owned by this composition.
    pub connections: Vec<String>,
    pub package_path: Option<String>,
    pub xml_path: Option<String>,
    pub source_line: Option<u32>,
}

impl Component {
    pub fn new(short_name: impl Into<String>, component_type: ComponentType) -> Self {
        let behavior = if component_type == ComponentType::Composition {
            ComponentBehavior::Composite
        } else {
            ComponentBehavior::Atomic
        };

        Self {
            uuid: new_uuid(),
            short_name: short_name.into(),
            desc: None,
            category: None,
            component_type,
            behavior,
            provided_ports: Vec::new(),
            required_ports: Vec::new(),
            prototypes: Vec::new(),
            connections: Vec::new(),
            package_path: None,
            xml_path: None,
            source_line: None,
        }
    }

    pub fn all_ports(&self) -> impl Iterator<Item = &Port> {
        self.provided_ports.iter().chain(self.required_ports.iter())
    }

    pub fn is_composition(&self) -> bool {
        self.component_type == ComponentType::Composition
    }

    pub fn port_count(&self) -> usize {
        self.provided_ports.len() + self.required_ports.len()
    }

    pub fn port_by_name(&self, name: &str) -> Option<&Port> {
        self.all_ports().find(|port| port.short_name == name)
    }

    /// PR ports are filed with the provided ports.
    pub fn add_port(&mut self, mut port: Port) {
        port.component_uuid = Some(self.uuid.clone());
        if port.port_type.is_provided() {
            self.provided_ports.push(port);
        } else {
            self.required_ports.push(port);
        }
    }

    pub fn full_path(&self) -> String {
        match &self.package_path {
            Some(path) => format!("{}/{}", path, self.short_name),
            None => format!("/{}", self.short_name),
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({}, {})", self.short_name, self.component_type)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub uuid: String,
    pub short_name: String,
    pub desc: Option<String>,
    pub category: Option<String>,
    /// Absolute AUTOSAR path, e.g. `/Vehicle/Powertrain`.
    pub full_path: String,
    pub parent_path: Option<String>,
    pub sub_packages: Vec<Package>,
    pub components: Vec<Component>,
    /// Interface UUIDs declared in this package.
    pub interfaces: Vec<String>,
    pub xml_path: Option<String>,
    pub source_line: Option<u32>,
}

impl Package {
    pub fn new(short_name: impl Into<String>, parent_path: Option<&str>) -> Self {
        let short_name = short_name.into();
        let full_path = match parent_path {
            Some(parent) => format!("{}/{}", parent.trim_end_matches('/'), short_name),
            None => format!("/{}", short_name),
        };

        Self {
            uuid: new_uuid(),
            short_name,
            desc: None,
            category: None,
            full_path,
            parent_path: parent_path.map(str::to_string),
            sub_packages: Vec::new(),
            components: Vec::new(),
            interfaces: Vec::new(),
            xml_path: None,
            source_line: None,
        }
    }

    pub fn path_segments(&self) -> Vec<&str> {
        self.full_path.split('/').filter(|s| !s.is_empty()).collect()
    }

    pub fn depth(&self) -> usize {
        self.path_segments().len()
    }

    pub fn add_component(&mut self, mut component: Component) {
        component.package_path = Some(self.full_path.clone());
        self.components.push(component);
    }

    pub fn all_components(&self, recursive: bool) -> Vec<&Component> {
        let mut components: Vec<&Component> = self.components.iter().collect();
        if recursive {
            for sub in &self.sub_packages {
                components.extend(sub.all_components(true));
            }
        }
        components
    }

    pub fn find_component_by_name(&self, name: &str, recursive: bool) -> Option<&Component> {
        if let Some(found) = self.components.iter().find(|c| c.short_name == name) {
            return Some(found);
        }
        if recursive {
            return self
                .sub_packages
                .iter()
                .find_map(|sub| sub.find_component_by_name(name, true));
        }
        None
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Package({})", self.short_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionType {
    #[serde(rename = "ASSEMBLY-SW-CONNECTOR")]
    Assembly,
    #[serde(rename = "DELEGATION-SW-CONNECTOR")]
    Delegation,
    #[serde(rename = "PASS-THROUGH-SW-CONNECTOR")]
    PassThrough,
}

impl ConnectionType {
    pub fn tag(&self) -> &'static str {
        match self {
            ConnectionType::Assembly => "ASSEMBLY-SW-CONNECTOR",
            ConnectionType::Delegation => "DELEGATION-SW-CONNECTOR",
            ConnectionType::PassThrough => "PASS-THROUGH-SW-CONNECTOR",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "ASSEMBLY-SW-CONNECTOR" => Some(ConnectionType::Assembly),
            "DELEGATION-SW-CONNECTOR" => Some(ConnectionType::Delegation),
            "PASS-THROUGH-SW-CONNECTOR" => Some(ConnectionType::PassThrough),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionEndpoint {
    /// Raw `CONTEXT-COMPONENT-REF` (prototype path), absent for outer composition ports.
    pub component_ref: Option<String>,
    /// Raw `TARGET-*-PORT-REF` / `OUTER-PORT-REF`.
    pub port_ref: Option<String>,
    pub component_uuid: Option<String>,
    pub port_uuid: Option<String>,
}

impl ConnectionEndpoint {
    pub fn new(component_ref: Option<String>, port_ref: Option<String>) -> Self {
        Self {
            component_ref,
            port_ref,
            component_uuid: None,
            port_uuid: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.component_uuid.is_some() && self.port_uuid.is_some()
    }
}

impl fmt::Display for ConnectionEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn short(id: &Option<String>) -> String {
            id.as_deref()
                .map(|s| s.chars().take(8).collect())
                .unwrap_or_else(|| "?".to_string())
        }
        write!(
            f,
            "Endpoint({}:{})",
            short(&self.component_uuid),
            short(&self.port_uuid)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub uuid: String,
    pub short_name: String,
    pub desc: Option<String>,
    pub category: Option<String>,
    pub connection_type: ConnectionType,
    pub provider: ConnectionEndpoint,
    pub requester: ConnectionEndpoint,
    pub additional_endpoints: Vec<ConnectionEndpoint>,
    pub composition_uuid: Option<String>,
    pub xml_path: Option<String>,
    pub source_line: Option<u32>,
}

impl Connection {
    pub fn new(
        short_name: impl Into<String>,
        connection_type: ConnectionType,
        provider: ConnectionEndpoint,
        requester: ConnectionEndpoint,
    ) -> Self {
        Self {
            uuid: new_uuid(),
            short_name: short_name.into(),
            desc: None,
            category: None,
            connection_type,
            provider,
            requester,
            additional_endpoints: Vec::new(),
            composition_uuid: None,
            xml_path: None,
            source_line: None,
        }
    }

    pub fn all_endpoints(&self) -> impl Iterator<Item = &ConnectionEndpoint> {
        [&self.provider, &self.requester]
            .into_iter()
            .chain(self.additional_endpoints.iter())
    }

    pub fn involves_component(&self, component_uuid: &str) -> bool {
        self.all_endpoints()
            .any(|ep| ep.component_uuid.as_deref() == Some(component_uuid))
    }

    pub fn involves_port(&self, port_uuid: &str) -> bool {
        self.all_endpoints()
            .any(|ep| ep.port_uuid.as_deref() == Some(port_uuid))
    }

    pub fn is_resolved(&self) -> bool {
        self.all_endpoints().all(ConnectionEndpoint::is_resolved)
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Connection({}, {})", self.short_name, self.connection_type)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseStatistics {
    pub file_size: u64,
    pub parse_time_ms: f64,
    pub packages_parsed: usize,
    pub components_parsed: usize,
    pub ports_parsed: usize,
    pub interfaces_parsed: usize,
    pub methods_parsed: usize,
    pub data_elements_parsed: usize,
    pub prototypes_parsed: usize,
    pub connections_parsed: usize,
    pub unresolved_references: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseMetadata {
    pub file_path: String,
    pub file_size: u64,
    pub parse_time_ms: f64,
    pub statistics: ParseStatistics,
    pub namespaces: BTreeMap<String, String>,
    pub root_element: String,
    pub autosar_version: String,
    pub parsed_at: DateTime<Utc>,
}

impl Default for ParseMetadata {
    fn default() -> Self {
        Self {
            file_path: String::new(),
            file_size: 0,
            parse_time_ms: 0.0,
            statistics: ParseStatistics::default(),
            namespaces: BTreeMap::new(),
            root_element: String::new(),
            autosar_version: "Unknown".to_string(),
            parsed_at: Utc::now(),
        }
    }
}

/// Everything parsed from one ARXML file. Read-only after parsing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArxmlModel {
    pub packages: Vec<Package>,
    pub interfaces: Vec<Interface>,
    pub connections: Vec<Connection>,
    pub metadata: ParseMetadata,
}

impl ArxmlModel {
    /// Pre-order walk over every package.
    pub fn all_packages(&self) -> Vec<&Package> {
        let mut out = Vec::new();
        let mut stack: Vec<&Package> = self.packages.iter().rev().collect();
        while let Some(pkg) = stack.pop() {
            out.push(pkg);
            stack.extend(pkg.sub_packages.iter().rev());
        }
        out
    }

    pub fn all_components(&self) -> Vec<&Component> {
        self.all_packages()
            .into_iter()
            .flat_map(|pkg| pkg.components.iter())
            .collect()
    }

    pub fn find_component(&self, uuid: &str) -> Option<&Component> {
        self.all_components().into_iter().find(|c| c.uuid == uuid)
    }

    pub fn find_component_by_name(&self, name: &str) -> Option<&Component> {
        self.all_components()
            .into_iter()
            .find(|c| c.short_name == name)
    }

    /// Accepts `/A/B` as well as `A/B`.
    pub fn find_package(&self, path: &str) -> Option<&Package> {
        let wanted = format!("/{}", path.trim_matches('/'));
        self.all_packages()
            .into_iter()
            .find(|pkg| pkg.full_path == wanted)
    }

    pub fn find_port(&self, port_uuid: &str) -> Option<(&Component, &Port)> {
        self.all_components().into_iter().find_map(|component| {
            component
                .all_ports()
                .find(|port| port.uuid == port_uuid)
                .map(|port| (component, port))
        })
    }

    pub fn interface(&self, uuid: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.uuid == uuid)
    }

    /// Exact path first, then a path suffix, then the last path segment against short names.
    pub fn find_interface_by_ref(&self, reference: &str) -> Option<&Interface> {
        if let Some(exact) = self.interfaces.iter().find(|i| i.full_path() == reference) {
            return Some(exact);
        }
        if let Some(suffix) = self
            .interfaces
            .iter()
            .find(|i| path_ends_with(&i.full_path(), reference))
        {
            return Some(suffix);
        }
        let name = last_segment(reference);
        self.interfaces.iter().find(|i| i.short_name == name)
    }

    pub fn interfaces_by_type(&self, interface_type: InterfaceType) -> Vec<&Interface> {
        self.interfaces
            .iter()
            .filter(|i| i.interface_type == interface_type)
            .collect()
    }

    pub fn connections_for_component(&self, component_uuid: &str) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|c| {
                c.involves_component(component_uuid)
                    || c.composition_uuid.as_deref() == Some(component_uuid)
            })
            .collect()
    }

    pub fn connections_for_port(&self, port_uuid: &str) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|c| c.involves_port(port_uuid))
            .collect()
    }

    pub fn statistics(&self) -> &ParseStatistics {
        &self.metadata.statistics
    }

    /// Component count per type tag.
    pub fn component_type_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for component in self.all_components() {
            *counts.entry(component.component_type.tag()).or_insert(0) += 1;
        }
        counts
    }
}
