//! Tab controller: one active panel and one active selector at a time.

use std::collections::HashSet;

use crate::config::{AppConfig, PanelKind};
use crate::error::TabError;

/// Suffix appended to a panel id to form the id of its selector.
pub const SELECTOR_SUFFIX: &str = "-tab";

/// A content container shown or hidden as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel {
    pub id: String,
    pub label: String,
    pub kind: PanelKind,
}

/// A clickable control that activates its target panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub id: String,
    pub label: String,
    pub target: String,
}

/// A click on a selector, passed explicitly to [`TabController::open_tab`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabClick {
    /// Panel to activate.
    pub target: String,
    /// Selector that was clicked.
    pub origin: String,
}

#[derive(Debug, Clone)]
pub struct TabController {
    panels: Vec<Panel>,
    selectors: Vec<Selector>,
    active_panel: usize,
    active_selector: usize,
}

impl TabController {
    /// Validate the panel/selector pairing and activate `initial` (or the first panel).
    pub fn new(
        panels: Vec<Panel>,
        selectors: Vec<Selector>,
        initial: Option<&str>,
    ) -> Result<Self, TabError> {
        if panels.is_empty() {
            return Err(TabError::NoPanels);
        }

        let mut panel_ids = HashSet::new();
        for panel in &panels {
            if !panel_ids.insert(panel.id.as_str()) {
                return Err(TabError::DuplicatePanel(panel.id.clone()));
            }
        }

        let mut selector_ids = HashSet::new();
        for selector in &selectors {
            if !selector_ids.insert(selector.id.as_str()) {
                return Err(TabError::DuplicateSelector(selector.id.clone()));
            }
            if !panel_ids.contains(selector.target.as_str()) {
                return Err(TabError::DanglingSelector {
                    selector: selector.id.clone(),
                    target: selector.target.clone(),
                });
            }
        }

        for panel in &panels {
            let count = selectors.iter().filter(|s| s.target == panel.id).count();
            if count != 1 {
                return Err(TabError::UnpairedPanel {
                    panel: panel.id.clone(),
                    count,
                });
            }
        }

        let active_panel = match initial {
            Some(id) => panels
                .iter()
                .position(|p| p.id == id)
                .ok_or_else(|| TabError::UnknownPanel(id.to_string()))?,
            None => 0,
        };
        let active_selector = selectors
            .iter()
            .position(|s| s.target == panels[active_panel].id)
            .ok_or_else(|| TabError::UnpairedPanel {
                panel: panels[active_panel].id.clone(),
                count: 0,
            })?;

        Ok(Self {
            panels,
            selectors,
            active_panel,
            active_selector,
        })
    }

    pub fn from_config(cfg: &AppConfig) -> Result<Self, TabError> {
        let panels = cfg
            .tabs
            .iter()
            .map(|tab| Panel {
                id: tab.id.clone(),
                label: tab.label.clone(),
                kind: tab.kind.clone(),
            })
            .collect();
        let selectors = cfg
            .tabs
            .iter()
            .map(|tab| Selector {
                id: format!("{}{SELECTOR_SUFFIX}", tab.id),
                label: tab.label.clone(),
                target: tab.id.clone(),
            })
            .collect();
        Self::new(panels, selectors, cfg.default_tab.as_deref())
    }

    /// Deactivate everything, then activate the clicked panel and its origin selector.
    ///
    /// Unknown ids leave the current state untouched.
    pub fn open_tab(&mut self, click: &TabClick) -> Result<(), TabError> {
        let Some(panel) = self.panels.iter().position(|p| p.id == click.target) else {
            tracing::warn!(panel = %click.target, "Ignoring click for unknown panel");
            return Err(TabError::UnknownPanel(click.target.clone()));
        };
        let Some(selector) = self.selectors.iter().position(|s| s.id == click.origin) else {
            tracing::warn!(selector = %click.origin, "Ignoring click from unknown selector");
            return Err(TabError::UnknownSelector(click.origin.clone()));
        };

        self.active_panel = panel;
        self.active_selector = selector;
        tracing::debug!(panel = %click.target, selector = %click.origin, "Opened tab");
        Ok(())
    }

    /// The click a selector produces when pressed.
    pub fn click_for(&self, selector_id: &str) -> Option<TabClick> {
        self.selectors
            .iter()
            .find(|s| s.id == selector_id)
            .map(|s| TabClick {
                target: s.target.clone(),
                origin: s.id.clone(),
            })
    }

    /// The click of the selector paired with `panel_id`.
    pub fn click_for_panel(&self, panel_id: &str) -> Option<TabClick> {
        self.selectors
            .iter()
            .find(|s| s.target == panel_id)
            .and_then(|s| self.click_for(&s.id))
    }

    pub fn active_panel(&self) -> &Panel {
        &self.panels[self.active_panel]
    }

    pub fn active_selector(&self) -> &Selector {
        &self.selectors[self.active_selector]
    }

    pub fn is_panel_active(&self, id: &str) -> bool {
        self.active_panel().id == id
    }

    pub fn is_selector_active(&self, id: &str) -> bool {
        self.active_selector().id == id
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }
}
