//! JavaScript entry point.
//!
//! ```js
//! const handle = attachSwipeRefresh(list, spinner, () => reloadFeed());
//! // later
//! handle.free();
//! ```

use js_sys::Function;
use swipe_refresh_core::SwipeRefreshSettings;
use wasm_bindgen::prelude::*;
use web_sys::HtmlElement;

use crate::{attach, js_refresh_action, WebSwipeRefresh};

/// JS-owned swipe-to-refresh instance. `free()` detaches it.
#[wasm_bindgen]
pub struct SwipeRefreshHandle {
    inner: WebSwipeRefresh,
}

#[wasm_bindgen]
impl SwipeRefreshHandle {
    #[wasm_bindgen(js_name = setEnabled)]
    pub fn set_enabled(&self, enabled: bool) -> Result<(), JsValue> {
        self.inner
            .controller()
            .set_enabled(enabled)
            .map_err(|err| JsValue::from_str(&err.to_string()))
    }

    #[wasm_bindgen(js_name = setRefreshing)]
    pub fn set_refreshing(&self, refreshing: bool) {
        self.inner.controller().set_refreshing(refreshing);
    }

    #[wasm_bindgen(js_name = isRefreshing)]
    pub fn is_refreshing(&self) -> bool {
        self.inner.controller().is_refreshing()
    }

    #[wasm_bindgen(js_name = setRefreshAction)]
    pub fn set_refresh_action(&self, on_refresh: Function) {
        self.inner
            .controller()
            .set_refresh_action(js_refresh_action(on_refresh));
    }
}

/// Attaches with default settings; `data-*` attributes still apply.
///
/// `on_start` and `on_end`, when given, are called as the indicator appears
/// and after it is fully hidden again.
#[wasm_bindgen(js_name = attachSwipeRefresh)]
pub fn attach_swipe_refresh(
    scroll_element: HtmlElement,
    indicator: HtmlElement,
    on_refresh: Function,
    on_start: Option<Function>,
    on_end: Option<Function>,
) -> Result<SwipeRefreshHandle, JsValue> {
    let mut settings = SwipeRefreshSettings::default();
    if let Some(on_start) = on_start {
        settings = settings.on_start_refresh(move || call_hook(&on_start, "onStartRefresh"));
    }
    if let Some(on_end) = on_end {
        settings = settings.on_end_refresh(move || call_hook(&on_end, "onEndRefresh"));
    }
    let inner = attach(
        scroll_element,
        indicator,
        js_refresh_action(on_refresh),
        settings,
    )?;
    Ok(SwipeRefreshHandle { inner })
}

fn call_hook(hook: &Function, name: &str) {
    if let Err(err) = hook.call0(&JsValue::UNDEFINED) {
        log::warn!("{name} threw: {:?}", err);
    }
}
