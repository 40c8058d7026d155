use crate::registry::data_inspector::{EditingFunction, Endian, NumberDisplayStyle};
use crate::registry::ExtensionRegistry;
use std::sync::Arc;

macro_rules! integer_entry {
    ($inspector:expr, $name:literal, $ty:ty) => {
        $inspector.add(
            $name,
            std::mem::size_of::<$ty>(),
            |bytes, endian, style| {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(&bytes[..std::mem::size_of::<$ty>()]);
                let value = match endian {
                    Endian::Little => <$ty>::from_le_bytes(raw),
                    Endian::Big => <$ty>::from_be_bytes(raw),
                };
                match style {
                    NumberDisplayStyle::Decimal => format!("{}", value),
                    NumberDisplayStyle::Hexadecimal => format!("0x{:X}", value),
                    NumberDisplayStyle::Octal => format!("0o{:o}", value),
                }
            },
            Some(Arc::new(|input: &str, endian: Endian| {
                let value = input.trim().parse::<$ty>().ok()?;
                Some(match endian {
                    Endian::Little => value.to_le_bytes().to_vec(),
                    Endian::Big => value.to_be_bytes().to_vec(),
                })
            }) as EditingFunction),
        )
    };
}

pub(crate) fn register(registry: &mut ExtensionRegistry) {
    let inspector = &mut registry.data_inspector;

    inspector.add(
        "hex.builtin.inspector.binary",
        1,
        |bytes, _, _| format!("0b{:08b}", bytes[0]),
        Some(Arc::new(|input: &str, _: Endian| {
            u8::from_str_radix(input.trim().trim_start_matches("0b"), 2)
                .ok()
                .map(|value| vec![value])
        })),
    );

    integer_entry!(inspector, "hex.builtin.inspector.u8", u8);
    integer_entry!(inspector, "hex.builtin.inspector.i8", i8);
    integer_entry!(inspector, "hex.builtin.inspector.u16", u16);
    integer_entry!(inspector, "hex.builtin.inspector.i16", i16);
    integer_entry!(inspector, "hex.builtin.inspector.u32", u32);
    integer_entry!(inspector, "hex.builtin.inspector.i32", i32);
    integer_entry!(inspector, "hex.builtin.inspector.u64", u64);
    integer_entry!(inspector, "hex.builtin.inspector.i64", i64);

    inspector.add(
        "hex.builtin.inspector.float",
        4,
        |bytes, endian, _| {
            let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
            let value = match endian {
                Endian::Little => f32::from_le_bytes(raw),
                Endian::Big => f32::from_be_bytes(raw),
            };
            format!("{value}")
        },
        None,
    );

    inspector.add(
        "hex.builtin.inspector.ascii",
        1,
        |bytes, _, _| {
            let byte = bytes[0];
            if byte.is_ascii_graphic() || byte == b' ' {
                format!("'{}'", byte as char)
            } else {
                format!("'\\x{byte:02X}'")
            }
        },
        None,
    );

    inspector.add_sized(
        "hex.builtin.inspector.string",
        1,
        32,
        |bytes, _, _| {
            let end = bytes.iter().position(|byte| *byte == 0).unwrap_or(bytes.len());
            format!("\"{}\"", String::from_utf8_lossy(&bytes[..end]))
        },
        None,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_of(rows: &[crate::registry::data_inspector::InspectedRow], name: &str) -> String {
        rows.iter()
            .find(|row| row.unlocalized_name == name)
            .map(|row| row.value.clone())
            .unwrap()
    }

    #[test]
    fn test_integer_entries() {
        let mut registry = ExtensionRegistry::new();
        register(&mut registry);

        let bytes = [0xFE, 0xFF, 0x00, 0x00];
        let rows = registry
            .data_inspector
            .inspect(&bytes, Endian::Little, NumberDisplayStyle::Decimal);

        assert_eq!(value_of(&rows, "hex.builtin.inspector.u8"), "254");
        assert_eq!(value_of(&rows, "hex.builtin.inspector.i8"), "-2");
        assert_eq!(value_of(&rows, "hex.builtin.inspector.u16"), "65534");
        assert_eq!(value_of(&rows, "hex.builtin.inspector.u32"), "65534");
        assert!(rows.iter().all(|row| row.unlocalized_name != "hex.builtin.inspector.u64"));
    }

    #[test]
    fn test_text_entries_and_editing() {
        let mut registry = ExtensionRegistry::new();
        register(&mut registry);

        let rows = registry
            .data_inspector
            .inspect(b"Hi\0rest", Endian::Big, NumberDisplayStyle::Hexadecimal);
        assert_eq!(value_of(&rows, "hex.builtin.inspector.ascii"), "'H'");
        assert_eq!(value_of(&rows, "hex.builtin.inspector.string"), "\"Hi\"");
        assert_eq!(value_of(&rows, "hex.builtin.inspector.u16"), "0x4869");

        assert_eq!(
            registry.data_inspector.edit("hex.builtin.inspector.u16", "258", Endian::Big),
            Some(vec![1, 2])
        );
        assert_eq!(
            registry.data_inspector.edit("hex.builtin.inspector.binary", "0b101", Endian::Big),
            Some(vec![5])
        );
    }
}
