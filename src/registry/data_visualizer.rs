use super::UnlocalizedString;

/// Renders the hex editor's cells
pub trait DataVisualizer: Send + Sync {
    fn unlocalized_name(&self) -> &UnlocalizedString;

    /// Number of bytes shown per cell
    fn bytes_per_cell(&self) -> usize;

    /// Widest cell text this visualizer produces
    fn max_chars_per_cell(&self) -> usize;

    /// Text of the cell holding `data`
    fn draw(&self, address: u64, data: &[u8], upper_case: bool) -> String;

    /// Parse user `input` for the cell into `data`. Returns true if the input
    /// was accepted and `data` updated.
    fn draw_editing(&self, address: u64, data: &mut [u8], input: &str, upper_case: bool) -> bool;
}

#[derive(Default)]
pub struct DataVisualizers {
    visualizers: Vec<Box<dyn DataVisualizer>>,
}

impl DataVisualizers {
    pub fn add(&mut self, visualizer: impl DataVisualizer + 'static) {
        self.visualizers.push(Box::new(visualizer));
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn DataVisualizer> {
        self.visualizers.iter().map(|visualizer| visualizer.as_ref())
    }

    /// First visualizer registered as `unlocalized_name`
    #[must_use]
    pub fn by_name(&self, unlocalized_name: &str) -> Option<&dyn DataVisualizer> {
        self.iter()
            .find(|visualizer| *visualizer.unlocalized_name() == unlocalized_name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.visualizers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visualizers.is_empty()
    }

    pub fn clear(&mut self) {
        self.visualizers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Octal {
        name: UnlocalizedString,
    }

    impl DataVisualizer for Octal {
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
            data.first().map_or_else(String::new, |byte| format!("{byte:03o}"))
        }

        fn draw_editing(&self, _address: u64, data: &mut [u8], input: &str, _upper_case: bool) -> bool {
            match (u8::from_str_radix(input, 8), data.first_mut()) {
                (Ok(value), Some(cell)) => {
                    *cell = value;
                    true
                }
                _ => false,
            }
        }
    }

    #[test]
    fn test_lookup_by_name() {
        let mut visualizers = DataVisualizers::default();
        visualizers.add(Octal { name: "test.octal".into() });

        let octal = visualizers.by_name("test.octal").unwrap();
        assert_eq!(octal.draw(0, &[8], false), "010");

        let mut cell = [0u8];
        assert!(octal.draw_editing(0, &mut cell, "17", false));
        assert_eq!(cell, [15]);
        assert!(!octal.draw_editing(0, &mut cell, "9", false));

        assert!(visualizers.by_name("missing").is_none());
    }
}
