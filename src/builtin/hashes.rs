use crate::registry::hashes::{Hash, HashFunction};
use crate::registry::settings::SettingsUi;
use crate::registry::{ExtensionRegistry, UnlocalizedString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha3::{Digest, Sha3_256, Sha3_512};

pub(crate) fn register(registry: &mut ExtensionRegistry) {
    registry.hashes.add(Sha3::new(Sha3Variant::Sha256));
    registry.hashes.add(Sha3::new(Sha3Variant::Sha512));
    registry.hashes.add(Crc32::default());
}

/// SHA3 digest of `data`
pub(crate) fn sha3_256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

fn sha3_512(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha3_512::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sha3Variant {
    Sha256,
    Sha512,
}

pub(crate) struct Sha3 {
    name: UnlocalizedString,
    variant: Sha3Variant,
}

impl Sha3 {
    pub(crate) fn new(variant: Sha3Variant) -> Self {
        let name = match variant {
            Sha3Variant::Sha256 => "hex.builtin.hash.sha3_256",
            Sha3Variant::Sha512 => "hex.builtin.hash.sha3_512",
        };

        Self {
            name: name.into(),
            variant,
        }
    }
}

impl Hash for Sha3 {
    fn unlocalized_name(&self) -> &UnlocalizedString {
        &self.name
    }

    fn create(&self, name: &str) -> HashFunction {
        let digest = match self.variant {
            Sha3Variant::Sha256 => sha3_256,
            Sha3Variant::Sha512 => sha3_512,
        };

        HashFunction::new(self.name.clone(), name, move |region, provider| {
            digest(&provider.read_region(region))
        })
    }
}

/// Parameters of a CRC-32 variant, defaulting to the common IEEE one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct CrcParameters {
    pub polynomial: u32,
    pub init: u32,
    pub xor_out: u32,
    pub reflect_in: bool,
    pub reflect_out: bool,
}

impl Default for CrcParameters {
    fn default() -> Self {
        Self {
            polynomial: 0x04C1_1DB7,
            init: 0xFFFF_FFFF,
            xor_out: 0xFFFF_FFFF,
            reflect_in: true,
            reflect_out: true,
        }
    }
}

impl CrcParameters {
    pub(crate) fn checksum(&self, data: &[u8]) -> u32 {
        let mut crc = self.init;

        for &byte in data {
            let byte = if self.reflect_in { byte.reverse_bits() } else { byte };
            crc ^= u32::from(byte) << 24;

            for _ in 0..8 {
                crc = if crc & 0x8000_0000 != 0 {
                    (crc << 1) ^ self.polynomial
                } else {
                    crc << 1
                };
            }
        }

        if self.reflect_out {
            crc = crc.reverse_bits();
        }

        crc ^ self.xor_out
    }
}

pub(crate) struct Crc32 {
    name: UnlocalizedString,
    parameters: CrcParameters,
    polynomial_input: String,
}

impl Default for Crc32 {
    fn default() -> Self {
        let parameters = CrcParameters::default();
        Self {
            name: "hex.builtin.hash.crc32".into(),
            polynomial_input: format!("{:08X}", parameters.polynomial),
            parameters,
        }
    }
}

impl Hash for Crc32 {
    fn unlocalized_name(&self) -> &UnlocalizedString {
        &self.name
    }

    fn create(&self, name: &str) -> HashFunction {
        let parameters = self.parameters;
        HashFunction::new(self.name.clone(), name, move |region, provider| {
            parameters
                .checksum(&provider.read_region(region))
                .to_be_bytes()
                .to_vec()
        })
    }

    fn store(&self) -> Value {
        serde_json::to_value(self.parameters).unwrap_or(Value::Null)
    }

    fn load(&mut self, data: &Value) {
        if let Ok(parameters) = serde_json::from_value::<CrcParameters>(data.clone()) {
            self.parameters = parameters;
            self.polynomial_input = format!("{:08X}", parameters.polynomial);
        }
    }

    fn draw(&mut self, ui: &mut dyn SettingsUi) -> bool {
        let mut changed = false;

        if ui.text_input("hex.builtin.hash.crc.poly", &mut self.polynomial_input) {
            if let Ok(polynomial) = u32::from_str_radix(self.polynomial_input.trim_start_matches("0x"), 16) {
                self.parameters.polynomial = polynomial;
                changed = true;
            }
        }

        changed |= ui.checkbox("hex.builtin.hash.crc.refl_in", &mut self.parameters.reflect_in);
        changed |= ui.checkbox("hex.builtin.hash.crc.refl_out", &mut self.parameters.reflect_out);
        changed
    }
}
