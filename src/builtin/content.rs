//! Menus, providers, formatters, palette commands, file handlers, experiments,
//! endpoints and services of the builtin plugin.

use super::hashes::sha3_256;
use base64::prelude::*;
use crate::registry::command_palette::{CommandType, QueryResult};
use crate::registry::interface::{Modifier, Shortcut};
use crate::registry::provider::{DataProvider, MemoryProvider, Region};
use crate::registry::ExtensionRegistry;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Ticks of the builtin heartbeat service since boot
pub(crate) static HEARTBEAT: AtomicU64 = AtomicU64::new(0);

pub(crate) fn register(registry: &mut ExtensionRegistry) {
    register_menus(registry);
    register_providers(registry);
    register_formatters(registry);
    register_command_palette(registry);
    register_file_handlers(registry);
    register_experiments(registry);
    register_endpoints(registry);
    register_services(registry);
}

fn register_menus(registry: &mut ExtensionRegistry) {
    let interface = &mut registry.interface;

    interface.register_main_menu_item("hex.builtin.menu.file", 1000);
    interface.register_main_menu_item("hex.builtin.menu.edit", 2000);
    interface.register_main_menu_item("hex.builtin.menu.view", 3000);
    interface.register_main_menu_item("hex.builtin.menu.extras", 9000);
    interface.register_main_menu_item("hex.builtin.menu.help", 10000);

    interface.add_menu_item(
        ["hex.builtin.menu.file", "hex.builtin.menu.file.open_file"],
        1050,
        Some(Shortcut::new(&[Modifier::Ctrl], "O")),
        || info!("Open file requested"),
        || true,
    );
    interface.add_menu_item_sub_menu(["hex.builtin.menu.file", "hex.builtin.menu.file.open_recent"], 1200, || {}, || false);
    interface.add_menu_item_separator(["hex.builtin.menu.file"], 1300);
    interface.add_menu_item(
        ["hex.builtin.menu.file", "hex.builtin.menu.file.quit"],
        10100,
        Some(Shortcut::new(&[Modifier::Alt], "F4")),
        || info!("Quit requested"),
        || true,
    );

    interface.add_menu_item(
        ["hex.builtin.menu.edit", "hex.builtin.menu.edit.undo"],
        1000,
        Some(Shortcut::new(&[Modifier::Ctrl], "Z")),
        || debug!("Undo"),
        || false,
    );
    interface.add_menu_item(
        ["hex.builtin.menu.edit", "hex.builtin.menu.edit.redo"],
        1050,
        Some(Shortcut::new(&[Modifier::Ctrl], "Y")),
        || debug!("Redo"),
        || false,
    );

    interface.add_menu_item(
        ["hex.builtin.menu.help", "hex.builtin.view.help.about.name"],
        1000,
        None,
        || info!("anvil {}", crate::host::HOST_VERSION),
        || true,
    );

    interface.add_title_bar_button("ICON_VS_GITHUB", "hex.builtin.title_bar_button.feedback", || {
        info!("Feedback requested");
    });
    interface.add_footer_item(|| {});
    interface.add_welcome_screen_entry(|| {});
}

fn register_providers(registry: &mut ExtensionRegistry) {
    registry.providers.add::<MemoryProvider>(true);
}

fn register_formatters(registry: &mut ExtensionRegistry) {
    registry
        .data_formatters
        .add("hex.builtin.view.hex_editor.copy.c", |provider, region| {
            let bytes = provider.read_region(region);
            let body = bytes
                .chunks(12)
                .map(|row| {
                    let row: Vec<_> = row.iter().map(|byte| format!("0x{byte:02X}")).collect();
                    format!("    {},", row.join(", "))
                })
                .collect::<Vec<_>>()
                .join("\n");
            format!("const uint8_t data[{}] = {{\n{}\n}};", bytes.len(), body)
        });

    registry
        .data_formatters
        .add("hex.builtin.view.hex_editor.copy.hex", |provider, region| {
            hex::encode_upper(provider.read_region(region))
        });

    registry
        .data_formatters
        .add("hex.builtin.view.hex_editor.copy.base64", |provider, region| {
            BASE64_STANDARD.encode(provider.read_region(region))
        });
}

fn register_command_palette(registry: &mut ExtensionRegistry) {
    registry.command_palette.add(
        CommandType::SymbolCommand,
        "#",
        "hex.builtin.command.convert.desc",
        |input| match parse_number(input) {
            Some(value) => format!("# {value} = 0x{value:X} = 0b{value:b}"),
            None => format!("# {input}"),
        },
        |input| parse_number(input).map(|value| value.to_string()),
    );

    registry.command_palette.add_handler(
        CommandType::KeywordCommand,
        "/hash",
        |input| {
            let digest = hex::encode(sha3_256(input.as_bytes()));
            vec![QueryResult::new(digest, |_| {})]
        },
        |digest| format!("SHA3-256: {digest}"),
    );
}

fn parse_number(input: &str) -> Option<u64> {
    let input = input.trim();
    if let Some(hex) = input.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).ok()
    } else if let Some(binary) = input.strip_prefix("0b") {
        u64::from_str_radix(binary, 2).ok()
    } else {
        input.parse().ok()
    }
}

fn register_file_handlers(registry: &mut ExtensionRegistry) {
    registry.file_handlers.add(["hexpat", "pat"], |path: &Path| {
        info!("Opening pattern file '{}'", path.display());
        path.is_file()
    });

    registry.file_handlers.add(["hexproj"], |path: &Path| {
        info!("Opening project '{}'", path.display());
        path.is_file()
    });
}

fn register_experiments(registry: &mut ExtensionRegistry) {
    registry.experiments.add_experiment(
        "hex.builtin.experiment.parallel_evaluation",
        "hex.builtin.experiment.parallel_evaluation.name",
        "hex.builtin.experiment.parallel_evaluation.desc",
    );
}

fn register_endpoints(registry: &mut ExtensionRegistry) {
    registry.network_endpoints.register("hash/sha3_256", |data: &Value| {
        let input = data["data"].as_str().unwrap_or_default();
        json!({ "hash": hex::encode(sha3_256(input.as_bytes())) })
    });

    registry.network_endpoints.register("format/hex", |data: &Value| {
        let bytes: Vec<u8> = data["data"]
            .as_array()
            .map(|values| values.iter().filter_map(Value::as_u64).map(|b| b as u8).collect())
            .unwrap_or_default();
        let provider = MemoryProvider::new(bytes);
        json!({ "hex": hex::encode_upper(provider.read_region(Region::new(0, provider.data().len()))) })
    });
}

fn register_services(registry: &mut ExtensionRegistry) {
    registry
        .background_services
        .register("hex.builtin.background_service.heartbeat", || {
            HEARTBEAT.fetch_add(1, Ordering::Relaxed);
        });
}
