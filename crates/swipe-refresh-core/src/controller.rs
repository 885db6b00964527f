//! Enable/disable lifecycle around a [`GestureCoordinator`].

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::collaborators::Collaborators;
use crate::coordinator::GestureCoordinator;
use crate::error::SettingsError;
use crate::refresh::RefreshAction;
use crate::runtime::RuntimeHandle;
use crate::settings::SwipeRefreshSettings;

/// Owns at most one live coordinator and rebuilds it when re-enabled.
///
/// The refreshing flag follows the coordinator's start and end callbacks;
/// the caller's own callbacks in `settings` still fire.
pub struct SwipeRefreshController {
    runtime: RuntimeHandle,
    collaborators: Collaborators,
    action: RefCell<RefreshAction>,
    settings: SwipeRefreshSettings,
    refreshing: Rc<Cell<bool>>,
    coordinator: RefCell<Option<Rc<GestureCoordinator>>>,
}

impl SwipeRefreshController {
    pub fn new(
        runtime: RuntimeHandle,
        collaborators: Collaborators,
        action: RefreshAction,
        settings: SwipeRefreshSettings,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;
        let refreshing = Rc::new(Cell::new(false));
        let settings = Self::track_refreshing(settings, &refreshing);
        Ok(Self {
            runtime,
            collaborators,
            action: RefCell::new(action),
            settings,
            refreshing,
            coordinator: RefCell::new(None),
        })
    }

    fn track_refreshing(
        mut settings: SwipeRefreshSettings,
        refreshing: &Rc<Cell<bool>>,
    ) -> SwipeRefreshSettings {
        let user_start = settings.on_start_refresh.take();
        let flag = Rc::clone(refreshing);
        settings.on_start_refresh = Some(Rc::new(move || {
            flag.set(true);
            if let Some(callback) = user_start.as_ref() {
                callback();
            }
        }));

        let user_end = settings.on_end_refresh.take();
        let flag = Rc::clone(refreshing);
        settings.on_end_refresh = Some(Rc::new(move || {
            flag.set(false);
            if let Some(callback) = user_end.as_ref() {
                callback();
            }
        }));
        settings
    }

    pub fn is_enabled(&self) -> bool {
        self.coordinator.borrow().is_some()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.get()
    }

    /// Enabling builds and registers a coordinator if none is live.
    /// Disabling unregisters it, reverts its environment changes and drops it.
    pub fn set_enabled(&self, enabled: bool) -> Result<(), SettingsError> {
        if enabled {
            if self.is_enabled() {
                return Ok(());
            }
            let coordinator = GestureCoordinator::new(
                self.runtime.clone(),
                self.collaborators.clone(),
                self.action.borrow().clone(),
                self.settings.clone(),
            )?;
            coordinator.register_listeners();
            *self.coordinator.borrow_mut() = Some(Rc::new(coordinator));
            log::debug!("swipe refresh enabled");
        } else {
            let coordinator = self.coordinator.borrow_mut().take();
            if let Some(coordinator) = coordinator {
                Self::shutdown(&coordinator);
                log::debug!("swipe refresh disabled");
            }
        }
        Ok(())
    }

    pub fn set_refresh_action(&self, action: RefreshAction) {
        *self.action.borrow_mut() = action.clone();
        if let Some(coordinator) = self.live_coordinator() {
            coordinator.set_refresh_action(action);
        }
    }

    /// Forwarded to the live coordinator; ignored while disabled.
    pub fn set_refreshing(&self, active: bool) {
        if let Some(coordinator) = self.live_coordinator() {
            coordinator.set_refreshing(active);
        }
    }

    /// Runs `f` against the live coordinator, if any.
    ///
    /// `f` may call back into the controller, including disabling it.
    pub fn with_coordinator<R>(&self, f: impl FnOnce(&GestureCoordinator) -> R) -> Option<R> {
        self.live_coordinator().map(|coordinator| f(&coordinator))
    }

    // Cloned out so no borrow is held while the coordinator runs callbacks.
    fn live_coordinator(&self) -> Option<Rc<GestureCoordinator>> {
        self.coordinator.borrow().clone()
    }

    fn shutdown(coordinator: &GestureCoordinator) {
        coordinator.unregister_listeners();
        coordinator.cleanup();
    }
}

impl Drop for SwipeRefreshController {
    fn drop(&mut self) {
        if let Some(coordinator) = self.coordinator.get_mut().take() {
            Self::shutdown(&coordinator);
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
