//! Settings registry.
//!
//! Plugins add entries to the preferences screen as (category, sub-category,
//! name) triples backed by a [`Widget`]. Widget values are persisted as JSON in
//! a settings data tree shaped `{ category: { name: value } }`.

use super::UnlocalizedString;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;

/// Drawing surface for settings widgets, provided by the host UI toolkit.
///
/// Every control returns true when the user changed the value this frame.
pub trait SettingsUi {
    fn checkbox(&mut self, label: &str, value: &mut bool) -> bool;
    fn slider_i32(&mut self, label: &str, value: &mut i32, min: i32, max: i32) -> bool;
    fn slider_f32(&mut self, label: &str, value: &mut f32, min: f32, max: f32) -> bool;
    fn color_edit(&mut self, label: &str, rgba: &mut [f32; 4]) -> bool;
    fn combo(&mut self, label: &str, items: &[String], selected: &mut usize) -> bool;
    fn text_input(&mut self, label: &str, value: &mut String) -> bool;
    fn file_picker(&mut self, label: &str, path: &mut PathBuf) -> bool;
    fn label(&mut self, text: &str);
}

/// A persisted setting value with its editor
pub trait Widget: Send + Sync {
    /// Draw the widget; true if the value changed
    fn draw(&mut self, ui: &mut dyn SettingsUi, name: &str) -> bool;

    /// Restore the value from its persisted form. Values of the wrong shape are ignored.
    fn load(&mut self, data: &Value);

    /// Persisted form of the current value
    fn store(&self) -> Value;
}

pub type EnabledCallback = Arc<dyn Fn() -> bool + Send + Sync>;
pub type ChangedCallback = Arc<dyn Fn(&dyn Widget) + Send + Sync>;

/// Extra configuration attached to a settings entry
#[derive(Default, Clone)]
pub struct WidgetInterface {
    requires_restart: bool,
    enabled_callback: Option<EnabledCallback>,
    changed_callback: Option<ChangedCallback>,
    tooltip: Option<String>,
}

impl WidgetInterface {
    pub fn requires_restart(&mut self) -> &mut Self {
        self.requires_restart = true;
        self
    }

    pub fn set_enabled_callback(
        &mut self,
        callback: impl Fn() -> bool + Send + Sync + 'static,
    ) -> &mut Self {
        self.enabled_callback = Some(Arc::new(callback));
        self
    }

    pub fn set_changed_callback(
        &mut self,
        callback: impl Fn(&dyn Widget) + Send + Sync + 'static,
    ) -> &mut Self {
        self.changed_callback = Some(Arc::new(callback));
        self
    }

    pub fn set_tooltip(&mut self, tooltip: impl Into<String>) -> &mut Self {
        self.tooltip = Some(tooltip.into());
        self
    }
}

/// One settings entry
pub struct Entry {
    pub unlocalized_name: UnlocalizedString,
    widget: Box<dyn Widget>,
    interface: WidgetInterface,
}

impl Entry {
    #[must_use]
    pub fn widget(&self) -> &dyn Widget {
        self.widget.as_ref()
    }

    #[must_use]
    pub fn does_require_restart(&self) -> bool {
        self.interface.requires_restart
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.interface
            .enabled_callback
            .as_ref()
            .map_or(true, |callback| callback())
    }

    #[must_use]
    pub fn tooltip(&self) -> Option<&str> {
        self.interface.tooltip.as_deref()
    }

    pub fn interface_mut(&mut self) -> &mut WidgetInterface {
        &mut self.interface
    }

    fn on_changed(&self) {
        if let Some(callback) = &self.interface.changed_callback {
            callback(self.widget.as_ref());
        }
    }
}

pub struct SubCategory {
    pub unlocalized_name: UnlocalizedString,
    pub entries: Vec<Entry>,
}

pub struct Category {
    pub unlocalized_name: UnlocalizedString,
    pub unlocalized_description: Option<UnlocalizedString>,
    pub sub_categories: Vec<SubCategory>,
}

/// Result of one pass over all settings widgets
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DrawOutcome {
    /// Unlocalized names of entries whose value changed
    pub changed: Vec<UnlocalizedString>,
    /// True if any changed entry needs a restart to take effect
    pub restart_required: bool,
}

/// The settings registry and its data store
#[derive(Default)]
pub struct Settings {
    categories: Vec<Category>,
    data: Map<String, Value>,
}

impl Settings {
    /// Add an entry, creating its category and sub-category on first use.
    /// If the data store already holds a value for it, the widget is loaded from it.
    pub fn add(
        &mut self,
        unlocalized_category: impl Into<UnlocalizedString>,
        unlocalized_sub_category: impl Into<UnlocalizedString>,
        unlocalized_name: impl Into<UnlocalizedString>,
        widget: impl Widget + 'static,
    ) -> &mut WidgetInterface {
        let category_name = unlocalized_category.into();
        let name = unlocalized_name.into();

        let mut widget: Box<dyn Widget> = Box::new(widget);
        if let Some(value) = self.stored_value(category_name.as_str(), name.as_str()) {
            widget.load(value);
        }

        let category = self.category_mut(category_name);
        let sub_category_name = unlocalized_sub_category.into();
        let index = match category
            .sub_categories
            .iter()
            .position(|sub| sub.unlocalized_name == sub_category_name)
        {
            Some(index) => index,
            None => {
                category.sub_categories.push(SubCategory {
                    unlocalized_name: sub_category_name,
                    entries: Vec::new(),
                });
                category.sub_categories.len() - 1
            }
        };

        let entries = &mut category.sub_categories[index].entries;
        entries.push(Entry {
            unlocalized_name: name,
            widget,
            interface: WidgetInterface::default(),
        });

        let last = entries.len() - 1;
        &mut entries[last].interface
    }

    pub fn set_category_description(
        &mut self,
        unlocalized_category: impl Into<UnlocalizedString>,
        unlocalized_description: impl Into<UnlocalizedString>,
    ) {
        self.category_mut(unlocalized_category.into())
            .unlocalized_description = Some(unlocalized_description.into());
    }

    /// Read a raw setting value, falling back to `default` if none is stored
    #[must_use]
    pub fn read(&self, unlocalized_category: &str, unlocalized_name: &str, default: Value) -> Value {
        self.stored_value(unlocalized_category, unlocalized_name)
            .filter(|value| !value.is_null())
            .cloned()
            .unwrap_or(default)
    }

    /// Write a raw setting value and reload any widget bound to it
    pub fn write(&mut self, unlocalized_category: &str, unlocalized_name: &str, value: Value) {
        if let Some(entry) = self.entry_mut(unlocalized_category, unlocalized_name) {
            entry.widget.load(&value);
            entry.on_changed();
        }

        if let Some(category) = self
            .data
            .entry(unlocalized_category.to_string())
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
        {
            category.insert(unlocalized_name.to_string(), value);
        }
    }

    /// Replace the data store with `data` and load every widget from it
    pub fn load_all(&mut self, data: Value) {
        self.data = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let data = &self.data;
        for category in &mut self.categories {
            for sub_category in &mut category.sub_categories {
                for entry in &mut sub_category.entries {
                    let stored = data
                        .get(category.unlocalized_name.as_str())
                        .and_then(|values| values.get(entry.unlocalized_name.as_str()));

                    if let Some(value) = stored {
                        entry.widget.load(value);
                        entry.on_changed();
                    }
                }
            }
        }
    }

    /// The data store with every widget's current value merged in
    #[must_use]
    pub fn store_all(&self) -> Value {
        let mut data = self.data.clone();

        for category in &self.categories {
            for entry in category.sub_categories.iter().flat_map(|sub| sub.entries.iter()) {
                let value = entry.widget.store();
                if value.is_null() {
                    continue;
                }

                if let Some(values) = data
                    .entry(category.unlocalized_name.to_string())
                    .or_insert_with(|| Value::Object(Map::new()))
                    .as_object_mut()
                {
                    values.insert(entry.unlocalized_name.to_string(), value);
                }
            }
        }

        Value::Object(data)
    }

    /// Draw every enabled entry through `ui`. Changed values are written to the
    /// data store and their change callbacks run.
    pub fn draw_all(&mut self, ui: &mut dyn SettingsUi) -> DrawOutcome {
        let mut outcome = DrawOutcome::default();

        for category in &mut self.categories {
            for entry in category.sub_categories.iter_mut().flat_map(|sub| sub.entries.iter_mut()) {
                if !entry.is_enabled() {
                    continue;
                }

                if entry.widget.draw(ui, entry.unlocalized_name.as_str()) {
                    entry.on_changed();

                    if let Some(values) = self
                        .data
                        .entry(category.unlocalized_name.to_string())
                        .or_insert_with(|| Value::Object(Map::new()))
                        .as_object_mut()
                    {
                        values.insert(entry.unlocalized_name.to_string(), entry.widget.store());
                    }

                    outcome.restart_required |= entry.does_require_restart();
                    outcome.changed.push(entry.unlocalized_name.clone());
                }
            }
        }

        outcome
    }

    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    #[must_use]
    pub fn entry(&self, unlocalized_category: &str, unlocalized_name: &str) -> Option<&Entry> {
        self.categories
            .iter()
            .filter(|category| category.unlocalized_name == unlocalized_category)
            .flat_map(|category| category.sub_categories.iter())
            .flat_map(|sub| sub.entries.iter())
            .find(|entry| entry.unlocalized_name == unlocalized_name)
    }

    pub fn entry_mut(&mut self, unlocalized_category: &str, unlocalized_name: &str) -> Option<&mut Entry> {
        self.categories
            .iter_mut()
            .filter(|category| category.unlocalized_name == unlocalized_category)
            .flat_map(|category| category.sub_categories.iter_mut())
            .flat_map(|sub| sub.entries.iter_mut())
            .find(|entry| entry.unlocalized_name == unlocalized_name)
    }

    /// Drop every entry. Their current values stay in the data store, so
    /// entries added again later pick them up.
    pub fn clear(&mut self) {
        if let Value::Object(data) = self.store_all() {
            self.data = data;
        }
        self.categories.clear();
    }

    fn stored_value(&self, unlocalized_category: &str, unlocalized_name: &str) -> Option<&Value> {
        self.data
            .get(unlocalized_category)
            .and_then(|values| values.get(unlocalized_name))
    }

    fn category_mut(&mut self, name: UnlocalizedString) -> &mut Category {
        let index = match self.categories.iter().position(|c| c.unlocalized_name == name) {
            Some(index) => index,
            None => {
                self.categories.push(Category {
                    unlocalized_name: name,
                    unlocalized_description: None,
                    sub_categories: Vec::new(),
                });
                self.categories.len() - 1
            }
        };

        &mut self.categories[index]
    }
}

/// Boolean toggle. Also accepts numbers when loading (non-zero is checked).
#[derive(Debug, Clone)]
pub struct Checkbox {
    value: bool,
}

impl Checkbox {
    #[must_use]
    pub fn new(default: bool) -> Self {
        Self { value: default }
    }

    #[must_use]
    pub fn is_checked(&self) -> bool {
        self.value
    }
}

impl Widget for Checkbox {
    fn draw(&mut self, ui: &mut dyn SettingsUi, name: &str) -> bool {
        ui.checkbox(name, &mut self.value)
    }

    fn load(&mut self, data: &Value) {
        if let Some(value) = data.as_bool() {
            self.value = value;
        } else if let Some(value) = data.as_i64() {
            self.value = value != 0;
        }
    }

    fn store(&self) -> Value {
        Value::Bool(self.value)
    }
}

#[derive(Debug, Clone)]
pub struct SliderInteger {
    value: i32,
    min: i32,
    max: i32,
}

impl SliderInteger {
    #[must_use]
    pub fn new(default: i32, min: i32, max: i32) -> Self {
        Self { value: default, min, max }
    }

    #[must_use]
    pub fn value(&self) -> i32 {
        self.value
    }
}

impl Widget for SliderInteger {
    fn draw(&mut self, ui: &mut dyn SettingsUi, name: &str) -> bool {
        ui.slider_i32(name, &mut self.value, self.min, self.max)
    }

    fn load(&mut self, data: &Value) {
        if let Some(value) = data.as_i64() {
            self.value = value.clamp(i64::from(self.min), i64::from(self.max)) as i32;
        }
    }

    fn store(&self) -> Value {
        Value::from(self.value)
    }
}

#[derive(Debug, Clone)]
pub struct SliderFloat {
    value: f32,
    min: f32,
    max: f32,
}

impl SliderFloat {
    #[must_use]
    pub fn new(default: f32, min: f32, max: f32) -> Self {
        Self { value: default, min, max }
    }

    #[must_use]
    pub fn value(&self) -> f32 {
        self.value
    }
}

impl Widget for SliderFloat {
    fn draw(&mut self, ui: &mut dyn SettingsUi, name: &str) -> bool {
        ui.slider_f32(name, &mut self.value, self.min, self.max)
    }

    fn load(&mut self, data: &Value) {
        if let Some(value) = data.as_f64() {
            self.value = (value as f32).clamp(self.min, self.max);
        }
    }

    fn store(&self) -> Value {
        Value::from(f64::from(self.value))
    }
}

/// RGBA color, persisted as a packed `0xAABBGGRR` integer
#[derive(Debug, Clone)]
pub struct ColorPicker {
    value: [f32; 4],
}

impl ColorPicker {
    #[must_use]
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            value: [r, g, b, a].map(|c| f32::from(c) / 255.0),
        }
    }

    #[must_use]
    pub fn color(&self) -> u32 {
        let [r, g, b, a] = self.value.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u32);
        (a << 24) | (b << 16) | (g << 8) | r
    }
}

impl Widget for ColorPicker {
    fn draw(&mut self, ui: &mut dyn SettingsUi, name: &str) -> bool {
        ui.color_edit(name, &mut self.value)
    }

    fn load(&mut self, data: &Value) {
        if let Some(packed) = data.as_u64() {
            let packed = packed as u32;
            self.value = [0, 8, 16, 24].map(|shift| ((packed >> shift) & 0xFF) as f32 / 255.0);
        }
    }

    fn store(&self) -> Value {
        Value::from(self.color())
    }
}

/// Choice from a fixed list. Each label maps to the value that gets persisted.
#[derive(Debug, Clone)]
pub struct DropDown {
    items: Vec<String>,
    settings_values: Vec<Value>,
    default_item: Value,
    selected: Option<usize>,
}

impl DropDown {
    #[must_use]
    pub fn new(items: Vec<String>, settings_values: Vec<Value>, default_item: Value) -> Self {
        let selected = settings_values.iter().position(|value| *value == default_item);
        Self {
            items,
            settings_values,
            default_item,
            selected,
        }
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        self.selected
            .and_then(|index| self.settings_values.get(index))
            .unwrap_or(&self.default_item)
    }
}

impl Widget for DropDown {
    fn draw(&mut self, ui: &mut dyn SettingsUi, name: &str) -> bool {
        let mut selected = self.selected.unwrap_or(0);
        if ui.combo(name, &self.items, &mut selected) && selected < self.settings_values.len() {
            self.selected = Some(selected);
            return true;
        }

        false
    }

    fn load(&mut self, data: &Value) {
        self.selected = self.settings_values.iter().position(|value| value == data);
    }

    fn store(&self) -> Value {
        self.value().clone()
    }
}

#[derive(Debug, Clone)]
pub struct TextBox {
    value: String,
}

impl TextBox {
    #[must_use]
    pub fn new(default: impl Into<String>) -> Self {
        Self { value: default.into() }
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl Widget for TextBox {
    fn draw(&mut self, ui: &mut dyn SettingsUi, name: &str) -> bool {
        ui.text_input(name, &mut self.value)
    }

    fn load(&mut self, data: &Value) {
        if let Some(value) = data.as_str() {
            self.value = value.to_string();
        }
    }

    fn store(&self) -> Value {
        Value::String(self.value.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilePicker {
    value: PathBuf,
}

impl FilePicker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.value
    }
}

impl Widget for FilePicker {
    fn draw(&mut self, ui: &mut dyn SettingsUi, name: &str) -> bool {
        ui.file_picker(name, &mut self.value)
    }

    fn load(&mut self, data: &Value) {
        if let Some(value) = data.as_str() {
            self.value = PathBuf::from(value);
        }
    }

    fn store(&self) -> Value {
        Value::String(self.value.to_string_lossy().into_owned())
    }
}

/// Static text; stores nothing
#[derive(Debug, Clone, Default)]
pub struct Label;

impl Widget for Label {
    fn draw(&mut self, ui: &mut dyn SettingsUi, name: &str) -> bool {
        ui.label(name);
        false
    }

    fn load(&mut self, _data: &Value) {}

    fn store(&self) -> Value {
        Value::Null
    }
}
