use crate::domain::interface::Interface;
use crate::domain::model::{Component, Package, Port};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    ComponentType,
    PortType,
    Package,
    Interface,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
    Matches,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    ShortName,
    Description,
    ComponentType,
    PortType,
    InterfaceType,
    PackagePath,
    InterfaceRef,
    IsProvided,
    IsRequired,
    IsBidirectional,
}

impl FilterField {
    pub fn parse(name: &str) -> Option<Self> {
        let field = match name.trim().to_ascii_lowercase().as_str() {
            "short_name" | "name" => FilterField::ShortName,
            "desc" | "description" => FilterField::Description,
            "component_type" => FilterField::ComponentType,
            "port_type" => FilterField::PortType,
            "interface_type" => FilterField::InterfaceType,
            "package" | "package_path" => FilterField::PackagePath,
            "interface" | "interface_ref" => FilterField::InterfaceRef,
            "is_provided" => FilterField::IsProvided,
            "is_required" => FilterField::IsRequired,
            "is_bidirectional" => FilterField::IsBidirectional,
            _ => return None,
        };
        Some(field)
    }
}

/// Exposes item fields to filters as text. `None` means the item has no such field.
pub trait Filterable {
    fn field_value(&self, field: FilterField) -> Option<String>;
}

impl Filterable for Component {
    fn field_value(&self, field: FilterField) -> Option<String> {
        match field {
            FilterField::ShortName => Some(self.short_name.clone()),
            FilterField::Description => Some(self.desc.clone().unwrap_or_default()),
            FilterField::ComponentType => Some(self.component_type.tag().to_string()),
            FilterField::PackagePath => Some(self.package_path.clone().unwrap_or_default()),
            _ => None,
        }
    }
}

impl Filterable for Port {
    fn field_value(&self, field: FilterField) -> Option<String> {
        match field {
            FilterField::ShortName => Some(self.short_name.clone()),
            FilterField::Description => Some(self.desc.clone().unwrap_or_default()),
            FilterField::PortType => Some(self.port_type.tag().to_string()),
            FilterField::InterfaceRef => Some(self.interface_ref.clone().unwrap_or_default()),
            FilterField::IsProvided => Some(self.is_provided().to_string()),
            FilterField::IsRequired => Some(self.is_required().to_string()),
            FilterField::IsBidirectional => Some(self.is_bidirectional().to_string()),
            _ => None,
        }
    }
}

impl Filterable for Package {
    fn field_value(&self, field: FilterField) -> Option<String> {
        match field {
            FilterField::ShortName => Some(self.short_name.clone()),
            FilterField::Description => Some(self.desc.clone().unwrap_or_default()),
            FilterField::PackagePath => Some(self.full_path.clone()),
            _ => None,
        }
    }
}

impl Filterable for Interface {
    fn field_value(&self, field: FilterField) -> Option<String> {
        match field {
            FilterField::ShortName => Some(self.short_name.clone()),
            FilterField::Description => Some(self.desc.clone().unwrap_or_default()),
            FilterField::InterfaceType => Some(self.interface_type.tag().to_string()),
            FilterField::PackagePath => Some(self.package_path.clone().unwrap_or_default()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Filter {
    pub filter_type: FilterType,
    pub field: FilterField,
    pub operator: FilterOperator,
    pub value: String,
    pub active: bool,
    pattern: Option<Regex>,
}

impl Filter {
    pub fn new(
        filter_type: FilterType,
        field: FilterField,
        operator: FilterOperator,
        value: impl Into<String>,
    ) -> Self {
        let value = value.into();
        let pattern = if operator == FilterOperator::Matches {
            match RegexBuilder::new(&value).case_insensitive(true).build() {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!("Invalid filter pattern '{}': {}", value, e);
                    None
                }
            }
        } else {
            None
        };

        Self {
            filter_type,
            field,
            operator,
            value,
            active: true,
            pattern,
        }
    }

    pub fn apply(&self, item: &dyn Filterable) -> bool {
        if !self.active {
            return true;
        }
        let Some(item_value) = item.field_value(self.field) else {
            return false;
        };

        let item_str = item_value.to_lowercase();
        let value_str = self.value.to_lowercase();
        match self.operator {
            FilterOperator::Equals => item_str == value_str,
            FilterOperator::Contains => item_str.contains(&value_str),
            FilterOperator::StartsWith => item_str.starts_with(&value_str),
            FilterOperator::EndsWith => item_str.ends_with(&value_str),
            FilterOperator::Matches => self
                .pattern
                .as_ref()
                .map(|re| re.is_match(&item_value))
                .unwrap_or(false),
        }
    }
}

impl FilterField {
    pub fn filter_type(&self) -> FilterType {
        match self {
            FilterField::ComponentType => FilterType::ComponentType,
            FilterField::PortType
            | FilterField::IsProvided
            | FilterField::IsRequired
            | FilterField::IsBidirectional => FilterType::PortType,
            FilterField::PackagePath => FilterType::Package,
            FilterField::InterfaceType | FilterField::InterfaceRef => FilterType::Interface,
            FilterField::ShortName | FilterField::Description => FilterType::Custom,
        }
    }
}

impl std::str::FromStr for Filter {
    type Err = String;

    /// `field~=regex`, `field==value` or `field=value` (contains).
    fn from_str(expression: &str) -> std::result::Result<Self, Self::Err> {
        let (field, operator, value) = if let Some((f, v)) = expression.split_once("~=") {
            (f, FilterOperator::Matches, v)
        } else if let Some((f, v)) = expression.split_once("==") {
            (f, FilterOperator::Equals, v)
        } else if let Some((f, v)) = expression.split_once('=') {
            (f, FilterOperator::Contains, v)
        } else {
            return Err(format!("expected field=value, got '{}'", expression));
        };

        let field =
            FilterField::parse(field).ok_or_else(|| format!("unknown filter field '{}'", field))?;
        Ok(Filter::new(field.filter_type(), field, operator, value.trim()))
    }
}

pub type CustomFilterFn = Box<dyn Fn(&dyn Filterable) -> bool + Send + Sync>;

pub const QUICK_FILTERS: [&str; 7] = [
    "application",
    "service",
    "composition",
    "sensor_actuator",
    "complex_driver",
    "provided_ports",
    "required_ports",
];

const QUICK_PREFIX: &str = "quick_";
const TEXT_FILTER: &str = "text_filter";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterSummary {
    pub total_filters: usize,
    pub active_filters: usize,
    pub filter_types: BTreeMap<FilterType, usize>,
    pub quick_filter: Option<String>,
    pub custom_filters: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterStatistics {
    pub original_count: usize,
    pub filtered_count: usize,
    pub items_removed: usize,
    pub filter_efficiency: f64,
    pub percentage_remaining: f64,
}

/// Named filters combined with AND. With no filters every item passes.
#[derive(Default)]
pub struct FilterManager {
    filters: BTreeMap<String, Filter>,
    quick_filter: Option<String>,
    custom_filters: BTreeMap<String, CustomFilterFn>,
}

impl fmt::Debug for FilterManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterManager")
            .field("filters", &self.filters)
            .field("quick_filter", &self.quick_filter)
            .field("custom_filters", &self.custom_filters.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FilterManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_filter(&mut self, name: impl Into<String>, filter: Filter) {
        self.filters.insert(name.into(), filter);
    }

    pub fn remove_filter(&mut self, name: &str) -> bool {
        self.filters.remove(name).is_some()
    }

    /// Flips the filter's active flag and returns the new state; unknown names return false.
    pub fn toggle_filter(&mut self, name: &str) -> bool {
        match self.filters.get_mut(name) {
            Some(filter) => {
                filter.active = !filter.active;
                filter.active
            }
            None => false,
        }
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.quick_filter = None;
    }

    pub fn get_filter(&self, name: &str) -> Option<&Filter> {
        self.filters.get(name)
    }

    /// Replaces the current quick filter. Returns false for an unknown name.
    pub fn apply_quick_filter(&mut self, quick: &str) -> bool {
        self.filters.retain(|name, _| !name.starts_with(QUICK_PREFIX));
        self.quick_filter = Some(quick.to_string());

        let (name, filter) = match quick {
            "application" => ("quick_application", Self::create_component_type_filter("APPLICATION")),
            "service" => ("quick_service", Self::create_component_type_filter("SERVICE")),
            "composition" => ("quick_composition", Self::create_component_type_filter("COMPOSITION")),
            "sensor_actuator" => (
                "quick_sensor_actuator",
                Self::create_component_type_filter("SENSOR-ACTUATOR"),
            ),
            "complex_driver" => (
                "quick_complex_driver",
                Self::create_component_type_filter("COMPLEX-DEVICE-DRIVER"),
            ),
            "provided_ports" => ("quick_provided", Self::create_port_type_filter(true)),
            "required_ports" => ("quick_required", Self::create_port_type_filter(false)),
            other => {
                tracing::warn!(
                    "Unknown quick filter '{}'. Valid filters: {}",
                    other,
                    QUICK_FILTERS.join(", ")
                );
                return false;
            }
        };
        self.add_filter(name, filter);
        true
    }

    pub fn add_custom_filter<F>(&mut self, name: impl Into<String>, predicate: F)
    where
        F: Fn(&dyn Filterable) -> bool + Send + Sync + 'static,
    {
        self.custom_filters.insert(name.into(), Box::new(predicate));
    }

    pub fn remove_custom_filter(&mut self, name: &str) -> bool {
        self.custom_filters.remove(name).is_some()
    }

    pub fn passes(&self, item: &dyn Filterable) -> bool {
        self.filters.values().all(|f| f.apply(item))
            && self.custom_filters.values().all(|predicate| predicate(item))
    }

    pub fn filter_items<'a, T: Filterable + 'a>(
        &self,
        items: impl IntoIterator<Item = &'a T>,
    ) -> Vec<&'a T> {
        items.into_iter().filter(|item| self.passes(*item)).collect()
    }

    pub fn filter_components<'a>(
        &self,
        components: impl IntoIterator<Item = &'a Component>,
    ) -> Vec<&'a Component> {
        self.filter_items(components)
    }

    pub fn filter_ports<'a>(&self, ports: impl IntoIterator<Item = &'a Port>) -> Vec<&'a Port> {
        self.filter_items(ports)
    }

    pub fn filter_packages<'a>(
        &self,
        packages: impl IntoIterator<Item = &'a Package>,
    ) -> Vec<&'a Package> {
        self.filter_items(packages)
    }

    pub fn filter_interfaces<'a>(
        &self,
        interfaces: impl IntoIterator<Item = &'a Interface>,
    ) -> Vec<&'a Interface> {
        self.filter_items(interfaces)
    }

    pub fn summary(&self) -> FilterSummary {
        let mut filter_types = BTreeMap::new();
        for filter in self.filters.values().filter(|f| f.active) {
            *filter_types.entry(filter.filter_type).or_insert(0) += 1;
        }
        FilterSummary {
            total_filters: self.filters.len(),
            active_filters: self.filters.values().filter(|f| f.active).count(),
            filter_types,
            quick_filter: self.quick_filter.clone(),
            custom_filters: self.custom_filters.len(),
        }
    }

    pub fn active_filter_names(&self) -> Vec<&str> {
        self.filters
            .iter()
            .filter(|(_, f)| f.active)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn create_component_type_filter(component_type: &str) -> Filter {
        Filter::new(
            FilterType::ComponentType,
            FilterField::ComponentType,
            FilterOperator::Contains,
            component_type.to_uppercase(),
        )
    }

    pub fn create_port_type_filter(is_provided: bool) -> Filter {
        let field = if is_provided {
            FilterField::IsProvided
        } else {
            FilterField::IsRequired
        };
        Filter::new(FilterType::PortType, field, FilterOperator::Equals, "true")
    }

    pub fn create_name_filter(pattern: &str, operator: FilterOperator) -> Filter {
        Filter::new(FilterType::Custom, FilterField::ShortName, operator, pattern)
    }

    pub fn create_package_filter(package_path: &str) -> Filter {
        Filter::new(
            FilterType::Package,
            FilterField::PackagePath,
            FilterOperator::Contains,
            package_path,
        )
    }

    /// Blank text removes the text filter.
    pub fn apply_text_filter(&mut self, text: &str, field: FilterField) {
        let text = text.trim();
        if text.is_empty() {
            self.remove_filter(TEXT_FILTER);
        } else {
            self.add_filter(
                TEXT_FILTER,
                Filter::new(FilterType::Custom, field, FilterOperator::Contains, text),
            );
        }
    }

    pub fn filtered_statistics(original_count: usize, filtered_count: usize) -> FilterStatistics {
        let removed = original_count.saturating_sub(filtered_count);
        let (efficiency, remaining) = if original_count > 0 {
            (
                removed as f64 / original_count as f64,
                filtered_count as f64 / original_count as f64 * 100.0,
            )
        } else {
            (0.0, 0.0)
        };
        FilterStatistics {
            original_count,
            filtered_count,
            items_removed: removed,
            filter_efficiency: efficiency,
            percentage_remaining: remaining,
        }
    }
}
