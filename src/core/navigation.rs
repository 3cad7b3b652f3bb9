use crate::domain::model::{ArxmlModel, Component, Package};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_HISTORY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    Tree,
    Diagram,
    #[default]
    Split,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationState {
    pub package_path: Option<String>,
    pub selected_component: Option<String>,
    pub breadcrumb: Vec<String>,
    pub view_mode: ViewMode,
    pub zoom_level: f64,
    pub scroll_position: (f64, f64),
}

impl Default for NavigationState {
    fn default() -> Self {
        Self {
            package_path: None,
            selected_component: None,
            breadcrumb: Vec::new(),
            view_mode: ViewMode::default(),
            zoom_level: 1.0,
            scroll_position: (0.0, 0.0),
        }
    }
}

/// Bounded back/forward stack. Pushing after going back drops the forward entries.
#[derive(Debug, Clone)]
pub struct NavigationHistory {
    states: Vec<NavigationState>,
    current: Option<usize>,
    max_history: usize,
}

impl Default for NavigationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl NavigationHistory {
    pub fn new(max_history: usize) -> Self {
        Self {
            states: Vec::new(),
            current: None,
            max_history: max_history.max(1),
        }
    }

    pub fn push(&mut self, state: NavigationState) {
        if let Some(index) = self.current {
            self.states.truncate(index + 1);
        }
        self.states.push(state);
        if self.states.len() > self.max_history {
            self.states.remove(0);
        }
        self.current = Some(self.states.len() - 1);
        tracing::debug!("Navigation state pushed: {} states", self.states.len());
    }

    pub fn can_go_back(&self) -> bool {
        matches!(self.current, Some(i) if i > 0)
    }

    pub fn can_go_forward(&self) -> bool {
        matches!(self.current, Some(i) if i + 1 < self.states.len())
    }

    pub fn go_back(&mut self) -> Option<&NavigationState> {
        if !self.can_go_back() {
            return None;
        }
        let index = self.current? - 1;
        self.current = Some(index);
        self.states.get(index)
    }

    pub fn go_forward(&mut self) -> Option<&NavigationState> {
        if !self.can_go_forward() {
            return None;
        }
        let index = self.current? + 1;
        self.current = Some(index);
        self.states.get(index)
    }

    pub fn current(&self) -> Option<&NavigationState> {
        self.current.and_then(|i| self.states.get(i))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Package/component selection over a parsed model, with history and breadcrumbs.
pub struct Navigator<'m> {
    model: &'m ArxmlModel,
    state: NavigationState,
    history: NavigationHistory,
}

impl<'m> Navigator<'m> {
    pub fn new(model: &'m ArxmlModel) -> Self {
        Self::with_history(model, NavigationHistory::default())
    }

    pub fn with_history(model: &'m ArxmlModel, history: NavigationHistory) -> Self {
        Self {
            model,
            state: NavigationState::default(),
            history,
        }
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn history(&self) -> &NavigationHistory {
        &self.history
    }

    pub fn breadcrumb(&self) -> &[String] {
        &self.state.breadcrumb
    }

    pub fn current_package(&self) -> Option<&'m Package> {
        let path = self.state.package_path.as_deref()?;
        self.model.find_package(path)
    }

    pub fn current_component(&self) -> Option<&'m Component> {
        let uuid = self.state.selected_component.as_deref()?;
        self.model.find_component(uuid)
    }

    /// Returns false when the model has no package at `path`.
    pub fn navigate_to_package(&mut self, path: &str, add_to_history: bool) -> bool {
        let Some(package) = self.model.find_package(path) else {
            tracing::warn!("Package not found: {}", path);
            return false;
        };
        tracing::info!("📁 Navigating to package: {}", package.full_path);

        self.state = NavigationState {
            package_path: Some(package.full_path.clone()),
            selected_component: None,
            breadcrumb: package.path_segments().into_iter().map(str::to_string).collect(),
            view_mode: self.state.view_mode,
            ..NavigationState::default()
        };
        if add_to_history {
            self.history.push(self.state.clone());
        }
        true
    }

    /// Returns false when no component has this UUID.
    pub fn select_component(&mut self, uuid: &str, add_to_history: bool) -> bool {
        let Some(component) = self.model.find_component(uuid) else {
            tracing::warn!("Component not found: {}", uuid);
            return false;
        };
        tracing::info!("Selecting component: {}", component.short_name);

        self.state.selected_component = Some(component.uuid.clone());
        if add_to_history {
            self.history.push(self.state.clone());
        }
        true
    }

    /// Selects whatever package or component carries `uuid`.
    pub fn select_by_uuid(&mut self, uuid: &str) -> bool {
        if self.model.find_component(uuid).is_some() {
            return self.select_component(uuid, true);
        }
        match self.model.all_packages().into_iter().find(|p| p.uuid == uuid) {
            Some(package) => {
                let path = package.full_path.clone();
                self.navigate_to_package(&path, true)
            }
            None => false,
        }
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.state.view_mode = mode;
    }

    pub fn update_view_state(&mut self, zoom_level: Option<f64>, scroll_position: Option<(f64, f64)>) {
        if let Some(zoom) = zoom_level {
            self.state.zoom_level = zoom;
        }
        if let Some(scroll) = scroll_position {
            self.state.scroll_position = scroll;
        }
    }

    pub fn navigate_back(&mut self) -> bool {
        match self.history.go_back() {
            Some(state) => {
                self.state = state.clone();
                tracing::info!("Navigated back in history");
                true
            }
            None => false,
        }
    }

    pub fn navigate_forward(&mut self) -> bool {
        match self.history.go_forward() {
            Some(state) => {
                self.state = state.clone();
                tracing::info!("Navigated forward in history");
                true
            }
            None => false,
        }
    }

    /// Jumps to the ancestor package named by breadcrumb entry `index`.
    pub fn navigate_to_breadcrumb(&mut self, index: usize) -> bool {
        if index >= self.state.breadcrumb.len() {
            return false;
        }
        let path = format!("/{}", self.state.breadcrumb[..=index].join("/"));
        self.navigate_to_package(&path, true)
    }

    pub fn can_navigate_back(&self) -> bool {
        self.history.can_go_back()
    }

    pub fn can_navigate_forward(&self) -> bool {
        self.history.can_go_forward()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ComponentType;

    fn model() -> ArxmlModel {
        let mut vehicle = Package::new("Vehicle", None);
        let mut body = Package::new("Body", Some(&vehicle.full_path));
        let mut doors = Package::new("Doors", Some(&body.full_path));
        doors.add_component(Component::new("DoorCtrl", ComponentType::Application));
        body.sub_packages.push(doors);
        vehicle.sub_packages.push(body);
        ArxmlModel {
            packages: vec![vehicle],
            ..ArxmlModel::default()
        }
    }

    fn state(path: &str) -> NavigationState {
        NavigationState {
            package_path: Some(path.to_string()),
            ..NavigationState::default()
        }
    }

    #[test]
    fn test_history_truncates_forward_entries() {
        let mut history = NavigationHistory::default();
        history.push(state("/A"));
        history.push(state("/B"));
        history.push(state("/C"));

        assert_eq!(history.go_back().unwrap().package_path.as_deref(), Some("/B"));
        assert!(history.can_go_forward());

        history.push(state("/D"));
        assert!(!history.can_go_forward());
        assert_eq!(history.len(), 3);
        assert_eq!(history.current().unwrap().package_path.as_deref(), Some("/D"));
    }

    #[test]
    fn test_history_is_bounded() {
        let mut history = NavigationHistory::new(3);
        for name in ["/A", "/B", "/C", "/D"] {
            history.push(state(name));
        }
        assert_eq!(history.len(), 3);
        history.go_back();
        history.go_back();
        assert!(!history.can_go_back());
        assert_eq!(history.current().unwrap().package_path.as_deref(), Some("/B"));
    }

    #[test]
    fn test_empty_history() {
        let mut history = NavigationHistory::default();
        assert!(history.is_empty());
        assert!(history.go_back().is_none());
        assert!(history.go_forward().is_none());
        assert!(history.current().is_none());
    }

    #[test]
    fn test_navigator_breadcrumbs() {
        let model = model();
        let mut nav = Navigator::new(&model);

        assert!(nav.navigate_to_package("/Vehicle/Body/Doors", true));
        assert_eq!(nav.breadcrumb(), ["Vehicle", "Body", "Doors"]);
        assert!(!nav.navigate_to_package("/Nope", true));

        assert!(nav.navigate_to_breadcrumb(1));
        assert_eq!(nav.current_package().unwrap().full_path, "/Vehicle/Body");
        assert!(!nav.navigate_to_breadcrumb(5));

        assert!(nav.navigate_back());
        assert_eq!(nav.state().package_path.as_deref(), Some("/Vehicle/Body/Doors"));
        assert!(nav.navigate_forward());
        assert!(!nav.navigate_forward());
    }

    #[test]
    fn test_navigator_selection_and_view_mode() {
        let model = model();
        let door_uuid = model.find_component_by_name("DoorCtrl").unwrap().uuid.clone();
        let mut nav = Navigator::new(&model);

        nav.set_view_mode(ViewMode::Diagram);
        assert!(nav.navigate_to_package("Vehicle/Body/Doors", false));
        assert_eq!(nav.state().view_mode, ViewMode::Diagram);
        assert!(nav.history().is_empty());

        assert!(nav.select_component(&door_uuid, true));
        assert_eq!(nav.current_component().unwrap().short_name, "DoorCtrl");
        assert!(!nav.select_component("missing", true));

        let vehicle_uuid = model.packages[0].uuid.clone();
        assert!(nav.select_by_uuid(&vehicle_uuid));
        assert_eq!(nav.breadcrumb(), ["Vehicle"]);
        assert!(nav.current_component().is_none());
    }
}
