use crate::registry::data_visualizer::DataVisualizer;
use crate::registry::{ExtensionRegistry, UnlocalizedString};

pub(crate) fn register(registry: &mut ExtensionRegistry) {
    registry.data_visualizers.add(Hexadecimal::new(1));
    registry.data_visualizers.add(Hexadecimal::new(2));
    registry.data_visualizers.add(Hexadecimal::new(4));
    registry.data_visualizers.add(Decimal::default());
    registry.data_visualizers.add(Binary::default());
}

/// Big-endian hex cells of 1, 2 or 4 bytes
pub(crate) struct Hexadecimal {
    name: UnlocalizedString,
    bytes: usize,
}

impl Hexadecimal {
    pub(crate) fn new(bytes: usize) -> Self {
        Self {
            name: format!("hex.builtin.visualizer.hexadecimal.{}bit", bytes * 8).into(),
            bytes,
        }
    }
}

impl DataVisualizer for Hexadecimal {
    fn unlocalized_name(&self) -> &UnlocalizedString {
        &self.name
    }

    fn bytes_per_cell(&self) -> usize {
        self.bytes
    }

    fn max_chars_per_cell(&self) -> usize {
        self.bytes * 2
    }

    fn draw(&self, _address: u64, data: &[u8], upper_case: bool) -> String {
        data.iter()
            .take(self.bytes)
            .map(|byte| {
                if upper_case {
                    format!("{byte:02X}")
                } else {
                    format!("{byte:02x}")
                }
            })
            .collect()
    }

    fn draw_editing(&self, _address: u64, data: &mut [u8], input: &str, _upper_case: bool) -> bool {
        if input.len() != self.bytes * 2 || data.len() < self.bytes {
            return false;
        }

        match hex::decode(input) {
            Ok(bytes) => {
                data[..self.bytes].copy_from_slice(&bytes);
                true
            }
            Err(_) => false,
        }
    }
}

/// Unsigned decimal byte cells
pub(crate) struct Decimal {
    name: UnlocalizedString,
}

impl Default for Decimal {
    fn default() -> Self {
        Self {
            name: "hex.builtin.visualizer.decimal.unsigned.8bit".into(),
        }
    }
}

impl DataVisualizer for Decimal {
    fn unlocalized_name(&self) -> &UnlocalizedString {
        &self.name
    }

    fn bytes_per_cell(&self) -> usize {
        1
    }

    fn max_chars_per_cell(&self) -> usize {
        3
    }

    fn draw(&self, _address: u64, data: &[u8], _upper_case: bool) -> String {
        data.first().map_or_else(String::new, |byte| format!("{byte:>3}"))
    }

    fn draw_editing(&self, _address: u64, data: &mut [u8], input: &str, _upper_case: bool) -> bool {
        match (input.trim().parse::<u8>(), data.first_mut()) {
            (Ok(value), Some(cell)) => {
                *cell = value;
                true
            }
            _ => false,
        }
    }
}

pub(crate) struct Binary {
    name: UnlocalizedString,
}

impl Default for Binary {
    fn default() -> Self {
        Self {
            name: "hex.builtin.visualizer.binary".into(),
        }
    }
}

impl DataVisualizer for Binary {
    fn unlocalized_name(&self) -> &UnlocalizedString {
        &self.name
    }

    fn bytes_per_cell(&self) -> usize {
        1
    }

    fn max_chars_per_cell(&self) -> usize {
        8
    }

    fn draw(&self, _address: u64, data: &[u8], _upper_case: bool) -> String {
        data.first().map_or_else(String::new, |byte| format!("{byte:08b}"))
    }

    fn draw_editing(&self, _address: u64, data: &mut [u8], input: &str, _upper_case: bool) -> bool {
        if input.len() != 8 {
            return false;
        }

        match (u8::from_str_radix(input, 2), data.first_mut()) {
            (Ok(value), Some(cell)) => {
                *cell = value;
                true
            }
            _ => false,
        }
    }
}
