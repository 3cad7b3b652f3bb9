use crate::domain::model::new_uuid;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterfaceType {
    #[serde(rename = "SENDER-RECEIVER-INTERFACE")]
    SenderReceiver,
    #[serde(rename = "CLIENT-SERVER-INTERFACE")]
    ClientServer,
    #[serde(rename = "TRIGGER-INTERFACE")]
    Trigger,
    #[serde(rename = "MODE-SWITCH-INTERFACE")]
    ModeSwitch,
    #[serde(rename = "NV-DATA-INTERFACE")]
    NvData,
}

impl InterfaceType {
    pub fn tag(&self) -> &'static str {
        match self {
            InterfaceType::SenderReceiver => "SENDER-RECEIVER-INTERFACE",
            InterfaceType::ClientServer => "CLIENT-SERVER-INTERFACE",
            InterfaceType::Trigger => "TRIGGER-INTERFACE",
            InterfaceType::ModeSwitch => "MODE-SWITCH-INTERFACE",
            InterfaceType::NvData => "NV-DATA-INTERFACE",
        }
    }

    /// Other `*-INTERFACE` tags (parameter interfaces etc.) fall back to sender-receiver.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "CLIENT-SERVER-INTERFACE" => InterfaceType::ClientServer,
            "TRIGGER-INTERFACE" => InterfaceType::Trigger,
            "MODE-SWITCH-INTERFACE" => InterfaceType::ModeSwitch,
            "NV-DATA-INTERFACE" => InterfaceType::NvData,
            _ => InterfaceType::SenderReceiver,
        }
    }
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ArgumentDirection {
    In,
    Out,
    InOut,
}

impl ArgumentDirection {
    pub fn parse(text: &str) -> Self {
        match text.trim().to_ascii_uppercase().as_str() {
            "OUT" => ArgumentDirection::Out,
            "INOUT" => ArgumentDirection::InOut,
            _ => ArgumentDirection::In,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArgumentDirection::In => "IN",
            ArgumentDirection::Out => "OUT",
            ArgumentDirection::InOut => "INOUT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataTypeCategory {
    Primitive,
    Array,
    Record,
    Union,
    Enum,
    String,
}

impl DataTypeCategory {
    /// Best guess from a type name such as `UInt16` or `WheelSpeedArray`.
    pub fn guess(type_name: &str) -> Self {
        let lower = type_name.to_lowercase();
        if ["uint", "int", "bool", "float", "double"]
            .iter()
            .any(|p| lower.contains(p))
        {
            DataTypeCategory::Primitive
        } else if lower.contains("array") {
            DataTypeCategory::Array
        } else if lower.contains("record") || lower.contains("struct") {
            DataTypeCategory::Record
        } else {
            DataTypeCategory::Primitive
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataTypeCategory::Primitive => "PRIMITIVE",
            DataTypeCategory::Array => "ARRAY",
            DataTypeCategory::Record => "RECORD",
            DataTypeCategory::Union => "UNION",
            DataTypeCategory::Enum => "ENUM",
            DataTypeCategory::String => "STRING",
        }
    }
}

// 名稱比對順序有意義: "uint16" 必須在 "int16" 之前
const SIZE_TABLE: [(&str, u32); 11] = [
    ("uint8", 1),
    ("int8", 1),
    ("boolean", 1),
    ("uint16", 2),
    ("int16", 2),
    ("uint32", 4),
    ("int32", 4),
    ("float32", 4),
    ("uint64", 8),
    ("int64", 8),
    ("float64", 8),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataType {
    pub name: String,
    pub category: DataTypeCategory,
    pub type_reference: Option<String>,
    pub size_bytes: Option<u32>,
    pub description: Option<String>,
    pub enum_values: Vec<String>,
    pub array_size: Option<u32>,
}

impl DataType {
    pub fn new(name: impl Into<String>, category: DataTypeCategory) -> Self {
        Self {
            name: name.into(),
            category,
            type_reference: None,
            size_bytes: None,
            description: None,
            enum_values: Vec::new(),
            array_size: None,
        }
    }

    pub fn unknown() -> Self {
        Self::new("Unknown", DataTypeCategory::Primitive)
    }

    pub fn is_primitive(&self) -> bool {
        self.category == DataTypeCategory::Primitive
    }

    pub fn is_complex(&self) -> bool {
        matches!(
            self.category,
            DataTypeCategory::Record | DataTypeCategory::Union | DataTypeCategory::Array
        )
    }

    pub fn size_estimate(&self) -> u32 {
        if let Some(size) = self.size_bytes.filter(|s| *s > 0) {
            return size;
        }

        let lower = self.name.to_lowercase();
        for (type_name, size) in SIZE_TABLE {
            if lower.contains(type_name) {
                return match (self.category, self.array_size) {
                    (DataTypeCategory::Array, Some(n)) if n > 0 => size.saturating_mul(n),
                    _ => size,
                };
            }
        }
        4
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataElement {
    pub name: String,
    pub data_type: DataType,
    pub description: Option<String>,
    pub is_optional: bool,
    pub default_value: Option<String>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
}

impl DataElement {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            description: None,
            is_optional: false,
            default_value: None,
            min_value: None,
            max_value: None,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.data_type.name
    }

    pub fn is_primitive(&self) -> bool {
        self.data_type.is_primitive()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodArgument {
    pub name: String,
    pub data_type: DataType,
    pub direction: ArgumentDirection,
    pub description: Option<String>,
}

impl MethodArgument {
    pub fn is_input(&self) -> bool {
        matches!(self.direction, ArgumentDirection::In | ArgumentDirection::InOut)
    }

    pub fn is_output(&self) -> bool {
        matches!(self.direction, ArgumentDirection::Out | ArgumentDirection::InOut)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceMethod {
    pub name: String,
    pub description: Option<String>,
    pub arguments: Vec<MethodArgument>,
    pub return_type: Option<DataType>,
    pub is_asynchronous: bool,
    pub possible_errors: Vec<String>,
}

impl InterfaceMethod {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            arguments: Vec::new(),
            return_type: None,
            is_asynchronous: false,
            possible_errors: Vec::new(),
        }
    }

    pub fn input_arguments(&self) -> Vec<&MethodArgument> {
        self.arguments.iter().filter(|a| a.is_input()).collect()
    }

    pub fn output_arguments(&self) -> Vec<&MethodArgument> {
        self.arguments.iter().filter(|a| a.is_output()).collect()
    }

    pub fn signature(&self) -> String {
        let args = self
            .arguments
            .iter()
            .map(|a| format!("{}: {}", a.name, a.data_type.name))
            .collect::<Vec<_>>()
            .join(", ");
        match &self.return_type {
            Some(ret) => format!("{}({}) -> {}", self.name, args, ret.name),
            None => format!("{}({})", self.name, args),
        }
    }

    pub fn complexity_score(&self) -> f64 {
        let mut score = 1.0;
        score += self.arguments.len() as f64 * 0.2;
        score += self
            .arguments
            .iter()
            .filter(|a| a.data_type.is_complex())
            .count() as f64
            * 0.5;
        if self.is_asynchronous {
            score += 0.3;
        }
        score += self.possible_errors.len() as f64 * 0.1;
        score
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterfaceSummary {
    pub name: String,
    pub interface_type: InterfaceType,
    pub methods: usize,
    pub data_elements: usize,
    pub complexity: f64,
    pub package: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodStats {
    pub avg_complexity: f64,
    pub max_complexity: f64,
    pub min_complexity: f64,
    pub async_methods: usize,
    pub total_arguments: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataElementStats {
    pub primitive_types: usize,
    pub complex_types: usize,
    pub optional_elements: usize,
    pub estimated_size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterfaceStatistics {
    pub total_methods: usize,
    pub total_data_elements: usize,
    pub complexity_score: f64,
    pub method_stats: Option<MethodStats>,
    pub data_element_stats: Option<DataElementStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interface {
    pub uuid: String,
    pub short_name: String,
    pub desc: Option<String>,
    pub category: Option<String>,
    pub interface_type: InterfaceType,
    pub methods: Vec<InterfaceMethod>,
    pub data_elements: Vec<DataElement>,
    pub package_path: Option<String>,
    pub is_service_interface: bool,
    pub xml_path: Option<String>,
    pub source_line: Option<u32>,
}

impl Interface {
    pub fn new(short_name: impl Into<String>, interface_type: InterfaceType) -> Self {
        Self {
            uuid: new_uuid(),
            short_name: short_name.into(),
            desc: None,
            category: None,
            interface_type,
            methods: Vec::new(),
            data_elements: Vec::new(),
            package_path: None,
            is_service_interface: false,
            xml_path: None,
            source_line: None,
        }
    }

    pub fn full_path(&self) -> String {
        match &self.package_path {
            Some(path) => format!("{}/{}", path, self.short_name),
            None => format!("/{}", self.short_name),
        }
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    pub fn data_element_count(&self) -> usize {
        self.data_elements.len()
    }

    pub fn is_client_server(&self) -> bool {
        self.interface_type == InterfaceType::ClientServer
    }

    pub fn is_sender_receiver(&self) -> bool {
        self.interface_type == InterfaceType::SenderReceiver
    }

    pub fn method_by_name(&self, name: &str) -> Option<&InterfaceMethod> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn data_element_by_name(&self, name: &str) -> Option<&DataElement> {
        self.data_elements.iter().find(|e| e.name == name)
    }

    /// Returns false when a method with the same name already exists.
    pub fn add_method(&mut self, method: InterfaceMethod) -> bool {
        if self.method_by_name(&method.name).is_some() {
            return false;
        }
        self.methods.push(method);
        true
    }

    /// Returns false when a data element with the same name already exists.
    pub fn add_data_element(&mut self, element: DataElement) -> bool {
        if self.data_element_by_name(&element.name).is_some() {
            return false;
        }
        self.data_elements.push(element);
        true
    }

    pub fn complexity_score(&self) -> f64 {
        let mut score = 1.0;
        score += self
            .methods
            .iter()
            .map(InterfaceMethod::complexity_score)
            .sum::<f64>();
        score += self.data_elements.len() as f64 * 0.3;
        score += self
            .data_elements
            .iter()
            .filter(|e| e.data_type.is_complex())
            .count() as f64
            * 0.5;
        score
    }

    pub fn summary(&self) -> InterfaceSummary {
        InterfaceSummary {
            name: self.short_name.clone(),
            interface_type: self.interface_type,
            methods: self.method_count(),
            data_elements: self.data_element_count(),
            complexity: (self.complexity_score() * 100.0).round() / 100.0,
            package: self.package_path.clone(),
            description: self.desc.clone(),
        }
    }

    pub fn statistics(&self) -> InterfaceStatistics {
        let method_stats = if self.methods.is_empty() {
            None
        } else {
            let scores: Vec<f64> = self.methods.iter().map(|m| m.complexity_score()).collect();
            Some(MethodStats {
                avg_complexity: scores.iter().sum::<f64>() / scores.len() as f64,
                max_complexity: scores.iter().cloned().fold(f64::MIN, f64::max),
                min_complexity: scores.iter().cloned().fold(f64::MAX, f64::min),
                async_methods: self.methods.iter().filter(|m| m.is_asynchronous).count(),
                total_arguments: self.methods.iter().map(|m| m.arguments.len()).sum(),
            })
        };

        let data_element_stats = if self.data_elements.is_empty() {
            None
        } else {
            let primitive = self.data_elements.iter().filter(|e| e.is_primitive()).count();
            Some(DataElementStats {
                primitive_types: primitive,
                complex_types: self.data_elements.len() - primitive,
                optional_elements: self.data_elements.iter().filter(|e| e.is_optional).count(),
                estimated_size_bytes: self
                    .data_elements
                    .iter()
                    .map(|e| e.data_type.size_estimate() as u64)
                    .sum(),
            })
        };

        InterfaceStatistics {
            total_methods: self.methods.len(),
            total_data_elements: self.data_elements.len(),
            complexity_score: self.complexity_score(),
            method_stats,
            data_element_stats,
        }
    }

    /// Consistency issues; an empty list means the interface looks sound.
    pub fn validate_interface(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.short_name.trim().is_empty() {
            issues.push("Interface missing short_name".to_string());
        }

        match self.interface_type {
            InterfaceType::ClientServer if self.methods.is_empty() => {
                issues.push("Client-Server interface should have methods".to_string());
            }
            InterfaceType::SenderReceiver if self.data_elements.is_empty() => {
                issues.push("Sender-Receiver interface should have data elements".to_string());
            }
            _ => {}
        }

        if has_duplicates(self.methods.iter().map(|m| m.name.as_str())) {
            issues.push("Duplicate method names found".to_string());
        }
        if has_duplicates(self.data_elements.iter().map(|e| e.name.as_str())) {
            issues.push("Duplicate data element names found".to_string());
        }

        for method in &self.methods {
            if method.name.trim().is_empty() {
                issues.push("Method missing name".to_string());
            }
            if has_duplicates(method.arguments.iter().map(|a| a.name.as_str())) {
                issues.push(format!(
                    "Method '{}' has duplicate argument names",
                    method.name
                ));
            }
        }

        issues
    }

    /// Markdown reference page for the interface.
    pub fn generate_documentation(&self) -> String {
        let mut doc = Vec::new();
        doc.push(format!("# Interface: {}", self.short_name));
        doc.push(format!("**Type:** {}", self.interface_type));
        if let Some(desc) = &self.desc {
            doc.push(format!("**Description:** {}", desc));
        }
        if let Some(pkg) = &self.package_path {
            doc.push(format!("**Package:** {}", pkg));
        }
        doc.push(String::new());

        let summary = self.summary();
        doc.push("## Summary".to_string());
        doc.push(format!("- Methods: {}", summary.methods));
        doc.push(format!("- Data Elements: {}", summary.data_elements));
        doc.push(format!("- Complexity Score: {}", summary.complexity));
        doc.push(String::new());

        if !self.methods.is_empty() {
            doc.push("## Methods".to_string());
            for method in &self.methods {
                doc.push(format!("### {}", method.name));
                if let Some(desc) = &method.description {
                    doc.push(format!("**Description:** {}", desc));
                }
                doc.push(format!("**Signature:** `{}`", method.signature()));
                if !method.arguments.is_empty() {
                    doc.push("**Arguments:**".to_string());
                    for arg in &method.arguments {
                        let desc = arg
                            .description
                            .as_ref()
                            .map(|d| format!(" - {}", d))
                            .unwrap_or_default();
                        doc.push(format!(
                            "- `{}: {}` ({}){}",
                            arg.name,
                            arg.data_type.name,
                            arg.direction.as_str(),
                            desc
                        ));
                    }
                }
                if method.is_asynchronous {
                    doc.push("**Note:** This is an asynchronous method".to_string());
                }
                if !method.possible_errors.is_empty() {
                    doc.push("**Possible Errors:**".to_string());
                    for error in &method.possible_errors {
                        doc.push(format!("- {}", error));
                    }
                }
                doc.push(String::new());
            }
        }

        if !self.data_elements.is_empty() {
            doc.push("## Data Elements".to_string());
            for element in &self.data_elements {
                doc.push(format!("### {}", element.name));
                if let Some(desc) = &element.description {
                    doc.push(format!("**Description:** {}", desc));
                }
                doc.push(format!(
                    "**Type:** `{}` ({})",
                    element.data_type.name,
                    element.data_type.category.as_str()
                ));
                if element.is_optional {
                    doc.push("**Optional:** Yes".to_string());
                }
                if let Some(default) = &element.default_value {
                    doc.push(format!("**Default Value:** `{}`", default));
                }
                let mut constraints = Vec::new();
                if let Some(min) = element.min_value {
                    constraints.push(format!("Min: {}", min));
                }
                if let Some(max) = element.max_value {
                    constraints.push(format!("Max: {}", max));
                }
                if !constraints.is_empty() {
                    doc.push(format!("**Constraints:** {}", constraints.join(", ")));
                }
                doc.push(String::new());
            }
        }

        let stats = self.statistics();
        doc.push("## Statistics".to_string());
        doc.push(format!("- **Total Complexity:** {:.2}", stats.complexity_score));
        if let Some(method_stats) = &stats.method_stats {
            doc.push(format!(
                "- **Average Method Complexity:** {:.2}",
                method_stats.avg_complexity
            ));
            doc.push(format!("- **Total Arguments:** {}", method_stats.total_arguments));
            if method_stats.async_methods > 0 {
                doc.push(format!(
                    "- **Asynchronous Methods:** {}",
                    method_stats.async_methods
                ));
            }
        }
        if let Some(data_stats) = &stats.data_element_stats {
            doc.push(format!(
                "- **Estimated Size:** {} bytes",
                data_stats.estimated_size_bytes
            ));
            doc.push(format!("- **Primitive Types:** {}", data_stats.primitive_types));
            doc.push(format!("- **Complex Types:** {}", data_stats.complex_types));
        }

        doc.join("\n")
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Interface({}, {})", self.short_name, self.interface_type)
    }
}

fn has_duplicates<'a>(names: impl Iterator<Item = &'a str>) -> bool {
    let mut seen = HashSet::new();
    names.into_iter().any(|name| !seen.insert(name))
}
