//! Data providers: sources of bytes the editor views work on.

use super::UnlocalizedString;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// A contiguous range of addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Region {
    pub address: u64,
    pub size: usize,
}

impl Region {
    #[must_use]
    pub fn new(address: u64, size: usize) -> Self {
        Self { address, size }
    }

    /// Last address covered, or `None` for an empty region
    #[must_use]
    pub fn end_address(&self) -> Option<u64> {
        (self.size > 0).then(|| self.address + self.size as u64 - 1)
    }

    #[must_use]
    pub fn overlaps(&self, other: &Region) -> bool {
        match (self.end_address(), other.end_address()) {
            (Some(end), Some(other_end)) => self.address <= other_end && other.address <= end,
            _ => false,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X} (+{} bytes)", self.address, self.size)
    }
}

/// Source of bytes
pub trait DataProvider: Send + Sync {
    /// Registry key of the provider type
    fn type_name(&self) -> &str;

    fn size(&self) -> u64;

    /// Read into `buffer` starting at `address`. Returns the number of bytes read,
    /// which is short at the end of the data.
    fn read(&self, address: u64, buffer: &mut [u8]) -> usize;

    fn write(&mut self, address: u64, data: &[u8]) -> usize;

    fn is_writable(&self) -> bool {
        true
    }

    /// Read a whole region; short if it extends past the end
    fn read_region(&self, region: Region) -> Vec<u8> {
        let mut buffer = vec![0; region.size];
        let read = self.read(region.address, &mut buffer);
        buffer.truncate(read);
        buffer
    }
}

/// Provider over an in-memory buffer
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    data: Vec<u8>,
}

impl MemoryProvider {
    pub const TYPE_NAME: &'static str = "hex.builtin.provider.mem_file";

    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl DataProvider for MemoryProvider {
    fn type_name(&self) -> &str {
        Self::TYPE_NAME
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn read(&self, address: u64, buffer: &mut [u8]) -> usize {
        let Ok(start) = usize::try_from(address) else {
            return 0;
        };
        let Some(available) = self.data.get(start..) else {
            return 0;
        };

        let count = available.len().min(buffer.len());
        buffer[..count].copy_from_slice(&available[..count]);
        count
    }

    fn write(&mut self, address: u64, data: &[u8]) -> usize {
        let Ok(start) = usize::try_from(address) else {
            return 0;
        };
        let Some(available) = self.data.get_mut(start..) else {
            return 0;
        };

        let count = available.len().min(data.len());
        available[..count].copy_from_slice(&data[..count]);
        count
    }
}

pub type ProviderFactory = Arc<dyn Fn() -> Box<dyn DataProvider> + Send + Sync>;

struct ProviderType {
    type_name: UnlocalizedString,
    factory: ProviderFactory,
}

/// Registered provider types
#[derive(Default)]
pub struct Providers {
    types: Vec<ProviderType>,
    // Names offered in the "open provider" list, in registration order
    visible: Vec<UnlocalizedString>,
}

impl Providers {
    /// Register `T` under its default instance's type name
    pub fn add<T: DataProvider + Default + 'static>(&mut self, add_to_list: bool) {
        let type_name = T::default().type_name().to_string();
        self.add_with_name(type_name, add_to_list, || Box::new(T::default()));
    }

    pub fn add_with_name(
        &mut self,
        type_name: impl Into<UnlocalizedString>,
        add_to_list: bool,
        factory: impl Fn() -> Box<dyn DataProvider> + Send + Sync + 'static,
    ) {
        let type_name = type_name.into();
        if add_to_list {
            self.visible.push(type_name.clone());
        }

        self.types.push(ProviderType {
            type_name,
            factory: Arc::new(factory),
        });
    }

    /// Create a provider of the first type registered as `type_name`
    #[must_use]
    pub fn create(&self, type_name: &str) -> Option<Box<dyn DataProvider>> {
        let Some(provider_type) = self.types.iter().find(|t| t.type_name == type_name) else {
            warn!("No provider type '{}' registered", type_name);
            return None;
        };

        Some((provider_type.factory)())
    }

    /// Type names shown to the user
    #[must_use]
    pub fn names(&self) -> &[UnlocalizedString] {
        &self.visible
    }

    pub fn type_names(&self) -> impl Iterator<Item = &UnlocalizedString> {
        self.types.iter().map(|t| &t.type_name)
    }

    pub fn clear(&mut self) {
        self.types.clear();
        self.visible.clear();
    }
}
