use crate::registry::settings::{
    Checkbox, ColorPicker, DropDown, FilePicker, Label, SliderFloat, SliderInteger, TextBox, Widget,
};
use crate::registry::ExtensionRegistry;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub(crate) const GENERAL: &str = "hex.builtin.setting.general";
pub(crate) const INTERFACE: &str = "hex.builtin.setting.interface";
pub(crate) const HEX_EDITOR: &str = "hex.builtin.setting.hex_editor";
pub(crate) const FONT: &str = "hex.builtin.setting.font";
pub(crate) const PROXY: &str = "hex.builtin.setting.proxy";

pub(crate) fn register(registry: &mut ExtensionRegistry) {
    let settings = &mut registry.settings;

    // General
    settings.add(GENERAL, "hex.builtin.setting.general.patterns", "hex.builtin.setting.general.show_tips", Checkbox::new(false));
    settings.add(GENERAL, "hex.builtin.setting.general.patterns", "hex.builtin.setting.general.auto_load_patterns", Checkbox::new(true));
    settings.add(GENERAL, "hex.builtin.setting.general.patterns", "hex.builtin.setting.general.pattern_data_max_filter", SliderInteger::new(256, 32, 8192));
    settings.add(GENERAL, "hex.builtin.setting.general.network", "hex.builtin.setting.general.network_interface", Checkbox::new(false));
    settings.add(GENERAL, "hex.builtin.setting.general.network", "hex.builtin.setting.general.upload_crash_logs", Checkbox::new(true));

    // Interface
    settings
        .add(INTERFACE, "hex.builtin.setting.interface.style", "hex.builtin.setting.interface.scaling_factor", SliderFloat::new(1.0, 0.5, 4.0))
        .requires_restart();
    settings.add(
        INTERFACE,
        "hex.builtin.setting.interface.style",
        "hex.builtin.setting.interface.color",
        DropDown::new(
            vec!["hex.builtin.setting.interface.color.dark".to_string(), "hex.builtin.setting.interface.color.light".to_string(), "hex.builtin.setting.interface.color.classic".to_string()],
            vec![json!("Dark"), json!("Light"), json!("Classic")],
            json!("Dark"),
        ),
    );
    settings
        .add(INTERFACE, "hex.builtin.setting.interface.language", "hex.builtin.setting.interface.language", TextBox::new("en-US"))
        .requires_restart();
    settings.add(INTERFACE, "hex.builtin.setting.interface.window", "hex.builtin.setting.interface.fps", SliderInteger::new(60, 15, 241));

    // Hex editor
    settings.add(HEX_EDITOR, "", "hex.builtin.setting.hex_editor.highlight_color", ColorPicker::new(0x80, 0x80, 0xC0, 0x60));
    settings.add(HEX_EDITOR, "", "hex.builtin.setting.hex_editor.bytes_per_row", SliderInteger::new(16, 1, 32));
    settings.add(HEX_EDITOR, "", "hex.builtin.setting.hex_editor.byte_padding", SliderInteger::new(0, 0, 50));
    settings.add(HEX_EDITOR, "", "hex.builtin.setting.hex_editor.char_padding", SliderInteger::new(0, 0, 50));
    settings.add(HEX_EDITOR, "", "hex.builtin.setting.hex_editor.uppercase_hex", Checkbox::new(true));
    settings.add(HEX_EDITOR, "", "hex.builtin.setting.hex_editor.grey_zeros", Checkbox::new(true));
    settings.add(HEX_EDITOR, "", "hex.builtin.setting.hex_editor.visualizer", TextBox::new("hex.builtin.visualizer.hexadecimal.8bit"));

    // Fonts: the custom font path is only editable while custom fonts are on
    let custom_font = Arc::new(AtomicBool::new(false));

    let enabled = custom_font.clone();
    settings
        .add(FONT, "hex.builtin.setting.font.custom_font", "hex.builtin.setting.font.custom_font_enable", Checkbox::new(false))
        .requires_restart()
        .set_changed_callback(move |widget: &dyn Widget| {
            enabled.store(widget.store().as_bool().unwrap_or(false), Ordering::Relaxed);
        });

    let enabled = custom_font.clone();
    settings
        .add(FONT, "hex.builtin.setting.font.custom_font", "hex.builtin.setting.font.font_path", FilePicker::new())
        .requires_restart()
        .set_enabled_callback(move || enabled.load(Ordering::Relaxed));

    let enabled = custom_font;
    settings
        .add(FONT, "hex.builtin.setting.font.custom_font", "hex.builtin.setting.font.font_size", SliderInteger::new(13, 0, 100))
        .requires_restart()
        .set_enabled_callback(move || enabled.load(Ordering::Relaxed))
        .set_tooltip("hex.builtin.setting.font.font_size.tooltip");

    // Proxy
    settings.set_category_description(PROXY, "hex.builtin.setting.proxy.description");

    let proxy_enabled = Arc::new(AtomicBool::new(false));
    let enabled = proxy_enabled.clone();
    settings
        .add(PROXY, "", "hex.builtin.setting.proxy.enable", Checkbox::new(false))
        .set_changed_callback(move |widget: &dyn Widget| {
            enabled.store(widget.store().as_bool().unwrap_or(false), Ordering::Relaxed);
        });
    settings
        .add(PROXY, "", "hex.builtin.setting.proxy.url", TextBox::new(""))
        .set_enabled_callback(move || proxy_enabled.load(Ordering::Relaxed));
    settings.add(PROXY, "", "hex.builtin.setting.proxy.url.tooltip", Label);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_path_follows_custom_font_toggle() {
        let mut registry = ExtensionRegistry::new();
        register(&mut registry);

        let font_path = "hex.builtin.setting.font.font_path";
        assert!(!registry.settings.entry(FONT, font_path).unwrap().is_enabled());

        registry.settings.load_all(json!({ FONT: { "hex.builtin.setting.font.custom_font_enable": true } }));
        assert!(registry.settings.entry(FONT, font_path).unwrap().is_enabled());
        assert!(registry.settings.entry(FONT, font_path).unwrap().does_require_restart());
    }

    #[test]
    fn test_defaults_are_stored() {
        let mut registry = ExtensionRegistry::new();
        register(&mut registry);

        let stored = registry.settings.store_all();
        assert_eq!(stored[HEX_EDITOR]["hex.builtin.setting.hex_editor.byte_padding"], json!(0));
        assert_eq!(stored[INTERFACE]["hex.builtin.setting.interface.color"], json!("Dark"));
        assert_eq!(stored[GENERAL]["hex.builtin.setting.general.show_tips"], json!(false));
        assert!(stored[PROXY].get("hex.builtin.setting.proxy.url.tooltip").is_none());
    }
}
