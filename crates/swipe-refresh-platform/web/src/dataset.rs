use swipe_refresh_core::{SettingsError, SwipeRefreshSettings};
use web_sys::HtmlElement;

/// Attributes read from `data-*` on the scroll container.
pub const DATASET_ATTRIBUTES: &[&str] = &[
    "slingshot-distance",
    "threshold",
    "progress-view-offset",
    "resting-offset",
    "damping-exponent",
    "scale-down-duration",
    "progress-background-color",
    "progress-stroke-color",
    "override-browser-refresh",
];

/// `slingshot-distance` → `slingshotDistance`, the key `element.dataset` uses.
pub fn dataset_key(attribute: &str) -> String {
    let mut key = String::with_capacity(attribute.len());
    let mut upper = false;
    for ch in attribute.chars() {
        if ch == '-' {
            upper = true;
        } else if upper {
            key.extend(ch.to_uppercase());
            upper = false;
        } else {
            key.push(ch);
        }
    }
    key
}

/// Applies `(attribute, value)` pairs over `base`, then validates the result.
pub fn apply_attributes<'a>(
    base: SwipeRefreshSettings,
    attributes: impl IntoIterator<Item = (&'a str, String)>,
) -> Result<SwipeRefreshSettings, SettingsError> {
    let mut settings = base;
    for (name, value) in attributes {
        settings.apply_attribute(name, &value)?;
    }
    settings.validate()?;
    Ok(settings)
}

/// Layers the element's `data-*` attributes over `base`.
///
/// ```html
/// <main data-slingshot-distance="80" data-progress-stroke-color="teal">
/// ```
pub fn settings_from_dataset(
    element: &HtmlElement,
    base: SwipeRefreshSettings,
) -> Result<SwipeRefreshSettings, SettingsError> {
    let dataset = element.dataset();
    let present = DATASET_ATTRIBUTES
        .iter()
        .filter_map(|&name| dataset.get(&dataset_key(name)).map(|value| (name, value)));
    apply_attributes(base, present)
}

#[cfg(test)]
#[path = "tests/dataset_tests.rs"]
mod tests;
