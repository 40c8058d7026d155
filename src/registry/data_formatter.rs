use super::provider::{DataProvider, Region};
use super::UnlocalizedString;
use std::sync::Arc;

pub type FormatterCallback = Arc<dyn Fn(&dyn DataProvider, Region) -> String + Send + Sync>;

/// Exports a region as text, e.g. as a C array
pub struct DataFormatter {
    pub unlocalized_name: UnlocalizedString,
    pub callback: FormatterCallback,
}

#[derive(Default)]
pub struct DataFormatters {
    formatters: Vec<DataFormatter>,
}

impl DataFormatters {
    pub fn add(
        &mut self,
        unlocalized_name: impl Into<UnlocalizedString>,
        callback: impl Fn(&dyn DataProvider, Region) -> String + Send + Sync + 'static,
    ) {
        self.formatters.push(DataFormatter {
            unlocalized_name: unlocalized_name.into(),
            callback: Arc::new(callback),
        });
    }

    /// Run the formatter registered as `unlocalized_name`
    #[must_use]
    pub fn format(&self, unlocalized_name: &str, provider: &dyn DataProvider, region: Region) -> Option<String> {
        self.formatters
            .iter()
            .find(|formatter| formatter.unlocalized_name == unlocalized_name)
            .map(|formatter| (formatter.callback)(provider, region))
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataFormatter> {
        self.formatters.iter()
    }

    pub fn clear(&mut self) {
        self.formatters.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::provider::MemoryProvider;

    #[test]
    fn test_format_region() {
        let mut formatters = DataFormatters::default();
        formatters.add("test.csv", |provider, region| {
            provider
                .read_region(region)
                .iter()
                .map(u8::to_string)
                .collect::<Vec<_>>()
                .join(",")
        });

        let provider = MemoryProvider::new(vec![1, 2, 3, 4]);
        assert_eq!(
            formatters.format("test.csv", &provider, Region::new(1, 2)),
            Some("2,3".to_string())
        );
        assert_eq!(formatters.format("missing", &provider, Region::new(0, 1)), None);
    }
}
