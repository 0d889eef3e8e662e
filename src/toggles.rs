/// Window and sampling toggles shared by the tray menu and the in-window
/// buttons. Both surfaces render from this one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppToggles {
    pub always_on_top: bool,
    pub sampling: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayAction {
    ToggleSampling,
    ShowWindow,
    ToggleAlwaysOnTop,
    Quit,
}

/// Work the UI must perform after a toggle changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    EnableSampling,
    DisableSampling,
    SetAlwaysOnTop(bool),
    /// Restore the window from minimized or maximized and focus it.
    ShowWindow,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub label: &'static str,
    pub action: TrayAction,
    /// `Some` for checkable entries.
    pub checked: Option<bool>,
}

pub struct TrayMenu;

impl TrayMenu {
    pub fn items(toggles: &AppToggles) -> Vec<MenuItem> {
        vec![
            MenuItem {
                label: "Pick From Screen",
                action: TrayAction::ToggleSampling,
                checked: Some(toggles.sampling),
            },
            MenuItem {
                label: "Show Window",
                action: TrayAction::ShowWindow,
                checked: None,
            },
            MenuItem {
                label: "Always On Top",
                action: TrayAction::ToggleAlwaysOnTop,
                checked: Some(toggles.always_on_top),
            },
            MenuItem {
                label: "Quit",
                action: TrayAction::Quit,
                checked: None,
            },
        ]
    }
}

impl AppToggles {
    pub fn apply(&mut self, action: TrayAction) -> SideEffect {
        match action {
            TrayAction::ToggleSampling => {
                self.sampling = !self.sampling;
                if self.sampling {
                    SideEffect::EnableSampling
                } else {
                    SideEffect::DisableSampling
                }
            }
            TrayAction::ShowWindow => SideEffect::ShowWindow,
            TrayAction::ToggleAlwaysOnTop => {
                self.always_on_top = !self.always_on_top;
                SideEffect::SetAlwaysOnTop(self.always_on_top)
            }
            TrayAction::Quit => SideEffect::Quit,
        }
    }

    /// Re-syncs the sampling flag with the controller, e.g. after the
    /// cancel key ended a session or the hook failed to start.
    pub fn sync_sampling(&mut self, active: bool) {
        self.sampling = active;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checked(toggles: &AppToggles, action: TrayAction) -> Option<bool> {
        TrayMenu::items(toggles)
            .into_iter()
            .find(|item| item.action == action)
            .and_then(|item| item.checked)
    }

    #[test]
    fn menu_mirrors_toggle_state() {
        let mut toggles = AppToggles::default();
        assert_eq!(checked(&toggles, TrayAction::ToggleSampling), Some(false));

        assert_eq!(
            toggles.apply(TrayAction::ToggleSampling),
            SideEffect::EnableSampling
        );
        assert_eq!(checked(&toggles, TrayAction::ToggleSampling), Some(true));

        assert_eq!(
            toggles.apply(TrayAction::ToggleAlwaysOnTop),
            SideEffect::SetAlwaysOnTop(true)
        );
        assert_eq!(checked(&toggles, TrayAction::ToggleAlwaysOnTop), Some(true));
    }

    #[test]
    fn second_toggle_disables_sampling() {
        let mut toggles = AppToggles::default();
        toggles.apply(TrayAction::ToggleSampling);
        assert_eq!(
            toggles.apply(TrayAction::ToggleSampling),
            SideEffect::DisableSampling
        );
        assert!(!toggles.sampling);
    }

    #[test]
    fn sync_updates_the_checked_state() {
        let mut toggles = AppToggles::default();
        toggles.apply(TrayAction::ToggleSampling);
        toggles.sync_sampling(false);
        assert_eq!(checked(&toggles, TrayAction::ToggleSampling), Some(false));
    }

    #[test]
    fn menu_has_four_entries_in_order() {
        let labels: Vec<_> = TrayMenu::items(&AppToggles::default())
            .into_iter()
            .map(|item| item.label)
            .collect();
        assert_eq!(
            labels,
            vec!["Pick From Screen", "Show Window", "Always On Top", "Quit"]
        );
    }

    #[test]
    fn show_and_quit_do_not_touch_other_toggles() {
        let mut toggles = AppToggles {
            always_on_top: true,
            sampling: true,
        };
        assert_eq!(toggles.apply(TrayAction::ShowWindow), SideEffect::ShowWindow);
        assert_eq!(toggles.apply(TrayAction::Quit), SideEffect::Quit);
        assert_eq!(
            toggles,
            AppToggles {
                always_on_top: true,
                sampling: true,
            }
        );
    }
}
