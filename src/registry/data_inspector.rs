//! Data inspector rows: interpretations of the bytes at the cursor.

use super::UnlocalizedString;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberDisplayStyle {
    #[default]
    Decimal,
    Hexadecimal,
    Octal,
}

/// Renders `buffer` as display text
pub type GeneratorFunction =
    Arc<dyn Fn(&[u8], Endian, NumberDisplayStyle) -> String + Send + Sync>;

/// Parses user input back into bytes; `None` rejects it
pub type EditingFunction = Arc<dyn Fn(&str, Endian) -> Option<Vec<u8>> + Send + Sync>;

pub struct Entry {
    pub unlocalized_name: UnlocalizedString,
    pub required_size: usize,
    pub max_size: usize,
    pub generator: GeneratorFunction,
    pub editing: Option<EditingFunction>,
}

/// One inspected value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectedRow {
    pub unlocalized_name: UnlocalizedString,
    pub value: String,
    pub editable: bool,
}

#[derive(Default)]
pub struct DataInspector {
    entries: Vec<Entry>,
}

impl DataInspector {
    /// Add an entry that reads exactly `required_size` bytes
    pub fn add(
        &mut self,
        unlocalized_name: impl Into<UnlocalizedString>,
        required_size: usize,
        generator: impl Fn(&[u8], Endian, NumberDisplayStyle) -> String + Send + Sync + 'static,
        editing: Option<EditingFunction>,
    ) {
        self.add_sized(unlocalized_name, required_size, required_size, generator, editing);
    }

    /// Add an entry that needs at least `required_size` bytes and is given up to `max_size`
    pub fn add_sized(
        &mut self,
        unlocalized_name: impl Into<UnlocalizedString>,
        required_size: usize,
        max_size: usize,
        generator: impl Fn(&[u8], Endian, NumberDisplayStyle) -> String + Send + Sync + 'static,
        editing: Option<EditingFunction>,
    ) {
        self.entries.push(Entry {
            unlocalized_name: unlocalized_name.into(),
            required_size,
            max_size: max_size.max(required_size),
            generator: Arc::new(generator),
            editing,
        });
    }

    /// Rows for every entry that has enough bytes in `buffer`
    #[must_use]
    pub fn inspect(&self, buffer: &[u8], endian: Endian, style: NumberDisplayStyle) -> Vec<InspectedRow> {
        self.entries
            .iter()
            .filter(|entry| buffer.len() >= entry.required_size)
            .map(|entry| {
                let bytes = &buffer[..buffer.len().min(entry.max_size)];
                InspectedRow {
                    unlocalized_name: entry.unlocalized_name.clone(),
                    value: (entry.generator)(bytes, endian, style),
                    editable: entry.editing.is_some(),
                }
            })
            .collect()
    }

    /// Bytes the entry `unlocalized_name` produces for `input`
    #[must_use]
    pub fn edit(&self, unlocalized_name: &str, input: &str, endian: Endian) -> Option<Vec<u8>> {
        self.entries
            .iter()
            .find(|entry| entry.unlocalized_name == unlocalized_name)
            .and_then(|entry| entry.editing.as_ref())
            .and_then(|editing| editing(input, endian))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u16_inspector() -> DataInspector {
        let mut inspector = DataInspector::default();
        inspector.add(
            "test.u16",
            2,
            |bytes, endian, style| {
                let raw = [bytes[0], bytes[1]];
                let value = match endian {
                    Endian::Little => u16::from_le_bytes(raw),
                    Endian::Big => u16::from_be_bytes(raw),
                };
                match style {
                    NumberDisplayStyle::Decimal => value.to_string(),
                    NumberDisplayStyle::Hexadecimal => format!("0x{value:04X}"),
                    NumberDisplayStyle::Octal => format!("0o{value:o}"),
                }
            },
            Some(Arc::new(|input: &str, endian: Endian| {
                let value: u16 = input.parse().ok()?;
                Some(match endian {
                    Endian::Little => value.to_le_bytes().to_vec(),
                    Endian::Big => value.to_be_bytes().to_vec(),
                })
            })),
        );
        inspector
    }

    #[test]
    fn test_inspect_respects_endian_and_style() {
        let inspector = u16_inspector();

        let rows = inspector.inspect(&[0x01, 0x02, 0x03], Endian::Big, NumberDisplayStyle::Hexadecimal);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, "0x0102");
        assert!(rows[0].editable);

        let rows = inspector.inspect(&[0x01, 0x02], Endian::Little, NumberDisplayStyle::Decimal);
        assert_eq!(rows[0].value, "513");
    }

    #[test]
    fn test_short_buffer_skips_entry() {
        let inspector = u16_inspector();
        assert!(inspector.inspect(&[0x01], Endian::Little, NumberDisplayStyle::Decimal).is_empty());
    }

    #[test]
    fn test_edit() {
        let inspector = u16_inspector();
        assert_eq!(inspector.edit("test.u16", "258", Endian::Big), Some(vec![1, 2]));
        assert_eq!(inspector.edit("test.u16", "abc", Endian::Big), None);
        assert_eq!(inspector.edit("missing", "1", Endian::Big), None);
    }
}
