use super::hashes::{sha3_256, CrcParameters};
use crate::registry::pattern_language::{Literal, ParameterCount};
use crate::registry::ExtensionRegistry;
use tracing::{debug, info};

const STRING: &str = "builtin::std::string";
const STD: &str = "builtin::std";
const HASH: &str = "builtin::hash";
const ENV: &str = "builtin::std::env";

pub(crate) fn register(registry: &mut ExtensionRegistry) {
    register_functions(registry);
    register_pragmas(registry);
    register_visualizers(registry);
}

fn string_arg(args: &[Literal], index: usize) -> Result<&str, String> {
    args.get(index)
        .and_then(Literal::as_str)
        .ok_or_else(|| format!("parameter {index} must be a string"))
}

fn integer_arg(args: &[Literal], index: usize) -> Result<i64, String> {
    args.get(index)
        .and_then(Literal::as_integer)
        .ok_or_else(|| format!("parameter {index} must be an integer"))
}

fn register_functions(registry: &mut ExtensionRegistry) {
    let language = &mut registry.pattern_language;

    language.add_function(STD, "print", ParameterCount::AtLeast(1), |args| {
        let message = args.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ");
        info!(target: "pattern", "{}", message);
        Ok(None)
    });

    language.add_function(STRING, "length", ParameterCount::Exactly(1), |args| {
        let string = string_arg(args, 0)?;
        Ok(Some(Literal::Integer(string.chars().count() as i64)))
    });

    language.add_function(STRING, "at", ParameterCount::Exactly(2), |args| {
        let string = string_arg(args, 0)?;
        let index = integer_arg(args, 1)?;

        let character = usize::try_from(index)
            .ok()
            .and_then(|index| string.chars().nth(index))
            .ok_or_else(|| format!("index {index} out of range"))?;
        Ok(Some(Literal::String(character.to_string())))
    });

    language.add_function(STRING, "substr", ParameterCount::Exactly(3), |args| {
        let string = string_arg(args, 0)?;
        let start = usize::try_from(integer_arg(args, 1)?).map_err(|_| "negative start".to_string())?;
        let length = usize::try_from(integer_arg(args, 2)?).map_err(|_| "negative length".to_string())?;

        Ok(Some(Literal::String(string.chars().skip(start).take(length).collect())))
    });

    language.add_function(STRING, "parse_int", ParameterCount::Exactly(2), |args| {
        let string = string_arg(args, 0)?;
        let base = u32::try_from(integer_arg(args, 1)?)
            .ok()
            .filter(|base| (2..=36).contains(base))
            .ok_or_else(|| "base must be between 2 and 36".to_string())?;

        let digits = match base {
            16 => string.trim_start_matches("0x"),
            2 => string.trim_start_matches("0b"),
            _ => string,
        };

        i64::from_str_radix(digits, base)
            .map(|value| Some(Literal::Integer(value)))
            .map_err(|err| format!("cannot parse '{string}': {err}"))
    });

    language.add_function(STRING, "parse_float", ParameterCount::Exactly(1), |args| {
        let string = string_arg(args, 0)?;
        string
            .trim()
            .parse::<f64>()
            .map(|value| Some(Literal::Float(value)))
            .map_err(|err| format!("cannot parse '{string}': {err}"))
    });

    language.add_function(HASH, "crc32", ParameterCount::Exactly(1), |args| {
        let data = string_arg(args, 0)?;
        let checksum = CrcParameters::default().checksum(data.as_bytes());
        Ok(Some(Literal::Integer(i64::from(checksum))))
    });

    language.add_function(HASH, "sha3_256", ParameterCount::Exactly(1), |args| {
        let data = string_arg(args, 0)?;
        Ok(Some(Literal::String(hex::encode(sha3_256(data.as_bytes())))))
    });

    language.add_dangerous_function(ENV, "get", ParameterCount::Exactly(1), |args| {
        let name = string_arg(args, 0)?;
        Ok(std::env::var(name).ok().map(Literal::String))
    });
}

fn register_pragmas(registry: &mut ExtensionRegistry) {
    let language = &mut registry.pattern_language;

    language.add_pragma("endian", |value| {
        debug!("Pattern endian set to '{}'", value);
        matches!(value, "big" | "little" | "native")
    });

    language.add_pragma("base_address", |value| parse_unsigned(value).is_some());

    language.add_pragma("eval_depth", |value| parse_unsigned(value).is_some_and(|depth| depth > 0));

    language.add_pragma("pattern_limit", |value| parse_unsigned(value).is_some_and(|limit| limit > 0));
}

fn parse_unsigned(value: &str) -> Option<u64> {
    match value.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

fn register_visualizers(registry: &mut ExtensionRegistry) {
    let language = &mut registry.pattern_language;

    language.add_visualizer("hex_dump", ParameterCount::AtLeast(1), |args| {
        args.iter()
            .map(|arg| match arg.as_integer() {
                Some(value) => format!("{:02X}", value & 0xFF),
                None => "??".to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    });

    language.add_inline_visualizer("color", ParameterCount::Exactly(3), |args| {
        let channel = |index: usize| args[index].as_integer().unwrap_or(0).clamp(0, 255);
        format!("#{:02X}{:02X}{:02X}", channel(0), channel(1), channel(2))
    });

    language.add_inline_visualizer("gradient", ParameterCount::Exactly(1), |args| {
        format!("gradient({})", args[0])
    });
}
