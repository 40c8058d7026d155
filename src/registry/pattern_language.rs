//! Pattern language extensions and the shared interpreter.
//!
//! Plugins register built-in functions, pragmas and visualizers here. The host
//! installs them into one [`PatternRuntime`], a sandboxed Lua state, and shares
//! it between threads as a [`SharedRuntime`]. Every call into the interpreter
//! holds the runtime's mutex.

use mlua::{FromLua, IntoLua, Lua, Table, Value, Variadic};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Separator between namespace segments, as in `builtin::hash::crc32`
pub const NAMESPACE_SEPARATOR: &str = "::";

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

/// Interpreter globals a function may not be installed over or into
const RESERVED_GLOBALS: &[&str] = &[
    "_G", "_VERSION", "assert", "collectgarbage", "coroutine", "debug", "dofile", "error",
    "getmetatable", "io", "ipairs", "load", "loadfile", "math", "next", "os", "package", "pairs",
    "pcall", "print", "rawequal", "rawget", "rawlen", "rawset", "require", "select",
    "setmetatable", "string", "table", "tonumber", "tostring", "type", "utf8", "xpcall", "warn",
];

/// A value passed to or returned from a language function
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::String(value) => f.write_str(value),
        }
    }
}

impl Literal {
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Float(value) if value.fract() == 0.0 => Some(*value as i64),
            Self::Boolean(value) => Some(i64::from(*value)),
            Self::Float(_) | Self::String(_) => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }
}

impl<'lua> IntoLua<'lua> for Literal {
    fn into_lua(self, lua: &'lua Lua) -> mlua::Result<Value<'lua>> {
        Ok(match self {
            Self::Boolean(value) => Value::Boolean(value),
            Self::Integer(value) => Value::Integer(value),
            Self::Float(value) => Value::Number(value),
            Self::String(value) => Value::String(lua.create_string(&value)?),
        })
    }
}

impl<'lua> FromLua<'lua> for Literal {
    fn from_lua(value: Value<'lua>, _lua: &'lua Lua) -> mlua::Result<Self> {
        match value {
            Value::Boolean(value) => Ok(Self::Boolean(value)),
            Value::Integer(value) => Ok(Self::Integer(value)),
            Value::Number(value) => Ok(Self::Float(value)),
            Value::String(value) => Ok(Self::String(value.to_string_lossy().into_owned())),
            other => Err(mlua::Error::FromLuaConversionError {
                from: other.type_name(),
                to: "Literal",
                message: Some("only booleans, numbers and strings are supported".to_string()),
            }),
        }
    }
}

/// Number of parameters a function or visualizer accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterCount {
    Unlimited,
    None,
    Exactly(usize),
    AtLeast(usize),
    AtMost(usize),
    Between(usize, usize),
}

impl ParameterCount {
    #[must_use]
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Self::Unlimited => true,
            Self::None => count == 0,
            Self::Exactly(expected) => count == expected,
            Self::AtLeast(min) => count >= min,
            Self::AtMost(max) => count <= max,
            Self::Between(min, max) => (min..=max).contains(&count),
        }
    }
}

impl fmt::Display for ParameterCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlimited => write!(f, "any number of"),
            Self::None => write!(f, "no"),
            Self::Exactly(count) => write!(f, "exactly {count}"),
            Self::AtLeast(count) => write!(f, "at least {count}"),
            Self::AtMost(count) => write!(f, "at most {count}"),
            Self::Between(min, max) => write!(f, "between {min} and {max}"),
        }
    }
}

pub type FunctionCallback =
    Arc<dyn Fn(&[Literal]) -> Result<Option<Literal>, String> + Send + Sync>;

/// Handles `#pragma <name> <value>`; false rejects the value
pub type PragmaHandler = Arc<dyn Fn(&str) -> bool + Send + Sync>;

pub type VisualizerCallback = Arc<dyn Fn(&[Literal]) -> String + Send + Sync>;

#[derive(Clone)]
pub struct FunctionDefinition {
    pub namespace: Vec<String>,
    pub name: String,
    pub parameters: ParameterCount,
    pub callback: FunctionCallback,
    pub dangerous: bool,
}

impl FunctionDefinition {
    /// `namespace::name`
    #[must_use]
    pub fn qualified_name(&self) -> String {
        let mut parts = self.namespace.clone();
        parts.push(self.name.clone());
        parts.join(NAMESPACE_SEPARATOR)
    }
}

#[derive(Clone)]
pub struct Visualizer {
    pub name: String,
    pub parameters: ParameterCount,
    pub callback: VisualizerCallback,
}

impl Visualizer {
    /// # Errors
    /// [`RuntimeError::ParameterCount`] if `arguments` violates the visualizer's contract
    pub fn render(&self, arguments: &[Literal]) -> Result<String, RuntimeError> {
        if !self.parameters.accepts(arguments.len()) {
            return Err(RuntimeError::ParameterCount {
                name: self.name.clone(),
                expected: self.parameters,
                got: arguments.len(),
            });
        }

        Ok((self.callback)(arguments))
    }
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("script error: {0}")]
    Lua(#[from] mlua::Error),

    #[error("unknown pragma '{0}'")]
    UnknownPragma(String),

    #[error("invalid value '{value}' for pragma '{name}'")]
    Pragma { name: String, value: String },

    #[error("'{name}' takes {expected} parameters, got {got}")]
    ParameterCount {
        name: String,
        expected: ParameterCount,
        got: usize,
    },

    #[error("pattern runtime lock is poisoned")]
    Poisoned,
}

/// Registered pattern language extensions
#[derive(Default)]
pub struct PatternLanguage {
    functions: Vec<FunctionDefinition>,
    pragmas: Vec<(String, PragmaHandler)>,
    visualizers: Vec<Visualizer>,
    inline_visualizers: Vec<Visualizer>,
}

impl PatternLanguage {
    /// Register a function callable as `namespace::name`.
    /// Invalid identifiers are rejected with a warning.
    pub fn add_function(
        &mut self,
        namespace: &str,
        name: &str,
        parameters: ParameterCount,
        callback: impl Fn(&[Literal]) -> Result<Option<Literal>, String> + Send + Sync + 'static,
    ) {
        self.push_function(namespace, name, parameters, Arc::new(callback), false);
    }

    /// Like [`add_function`](Self::add_function), but the function only runs when
    /// the runtime permits dangerous functions
    pub fn add_dangerous_function(
        &mut self,
        namespace: &str,
        name: &str,
        parameters: ParameterCount,
        callback: impl Fn(&[Literal]) -> Result<Option<Literal>, String> + Send + Sync + 'static,
    ) {
        self.push_function(namespace, name, parameters, Arc::new(callback), true);
    }

    pub fn add_pragma(&mut self, name: impl Into<String>, handler: impl Fn(&str) -> bool + Send + Sync + 'static) {
        self.pragmas.push((name.into(), Arc::new(handler)));
    }

    pub fn add_visualizer(
        &mut self,
        name: impl Into<String>,
        parameters: ParameterCount,
        callback: impl Fn(&[Literal]) -> String + Send + Sync + 'static,
    ) {
        self.visualizers.push(Visualizer {
            name: name.into(),
            parameters,
            callback: Arc::new(callback),
        });
    }

    pub fn add_inline_visualizer(
        &mut self,
        name: impl Into<String>,
        parameters: ParameterCount,
        callback: impl Fn(&[Literal]) -> String + Send + Sync + 'static,
    ) {
        self.inline_visualizers.push(Visualizer {
            name: name.into(),
            parameters,
            callback: Arc::new(callback),
        });
    }

    #[must_use]
    pub fn functions(&self) -> &[FunctionDefinition] {
        &self.functions
    }

    #[must_use]
    pub fn function(&self, qualified_name: &str) -> Option<&FunctionDefinition> {
        self.functions
            .iter()
            .find(|function| function.qualified_name() == qualified_name)
    }

    pub fn pragma_names(&self) -> impl Iterator<Item = &str> {
        self.pragmas.iter().map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn visualizer(&self, name: &str) -> Option<&Visualizer> {
        self.visualizers.iter().find(|visualizer| visualizer.name == name)
    }

    #[must_use]
    pub fn inline_visualizer(&self, name: &str) -> Option<&Visualizer> {
        self.inline_visualizers.iter().find(|visualizer| visualizer.name == name)
    }

    pub fn clear(&mut self) {
        self.functions.clear();
        self.pragmas.clear();
        self.visualizers.clear();
        self.inline_visualizers.clear();
    }

    fn push_function(
        &mut self,
        namespace: &str,
        name: &str,
        parameters: ParameterCount,
        callback: FunctionCallback,
        dangerous: bool,
    ) {
        let namespace: Vec<String> = namespace
            .split(NAMESPACE_SEPARATOR)
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();

        if !IDENTIFIER.is_match(name) || !namespace.iter().all(|segment| IDENTIFIER.is_match(segment)) {
            warn!("Ignoring pattern language function with invalid name '{}::{}'", namespace.join(NAMESPACE_SEPARATOR), name);
            return;
        }

        let root = namespace.first().map_or(name, String::as_str);
        if RESERVED_GLOBALS.contains(&root) {
            warn!(
                "Ignoring pattern language function '{}::{}', '{}' is reserved by the interpreter",
                namespace.join(NAMESPACE_SEPARATOR),
                name,
                root
            );
            return;
        }

        self.functions.push(FunctionDefinition {
            namespace,
            name: name.to_string(),
            parameters,
            callback,
            dangerous,
        });
    }
}

/// The interpreter with every registered extension installed
pub struct PatternRuntime {
    lua: Lua,
    pragmas: Vec<(String, PragmaHandler)>,
    allow_dangerous: Arc<AtomicBool>,
}

impl PatternRuntime {
    /// Create a sandboxed interpreter with no extensions
    ///
    /// # Errors
    /// Fails if the sandbox prelude cannot run
    pub fn new() -> Result<Self, RuntimeError> {
        Ok(Self {
            lua: sandboxed_lua()?,
            pragmas: Vec::new(),
            allow_dangerous: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Replace the interpreter state with one holding the extensions in `language`.
    ///
    /// A function whose name collides with one installed earlier (for example
    /// `a::b` after a function `a`) is skipped with a warning. Returns the
    /// number of functions installed.
    ///
    /// # Errors
    /// Fails if the sandbox prelude cannot run
    pub fn configure(&mut self, language: &PatternLanguage) -> Result<usize, RuntimeError> {
        let lua = sandboxed_lua()?;
        let mut installed = 0;

        for function in &language.functions {
            match install_function(&lua, function, self.allow_dangerous.clone()) {
                Ok(()) => {
                    installed += 1;
                    debug!("Installed pattern language function '{}'", function.qualified_name());
                }
                Err(err) => warn!(
                    "Skipping pattern language function '{}': {}",
                    function.qualified_name(),
                    err
                ),
            }
        }

        self.lua = lua;
        self.pragmas = language.pragmas.clone();

        info!(
            "Pattern runtime configured with {} of {} function(s) and {} pragma(s)",
            installed,
            language.functions.len(),
            self.pragmas.len()
        );
        Ok(installed)
    }

    /// Drop every installed extension
    ///
    /// # Errors
    /// Fails if the sandbox prelude cannot run
    pub fn reset(&mut self) -> Result<(), RuntimeError> {
        self.lua = sandboxed_lua()?;
        self.pragmas.clear();
        Ok(())
    }

    pub fn set_allow_dangerous(&self, allow: bool) {
        self.allow_dangerous.store(allow, Ordering::SeqCst);
    }

    #[must_use]
    pub fn allows_dangerous(&self) -> bool {
        self.allow_dangerous.load(Ordering::SeqCst)
    }

    /// Run `source` and return the value of its final `return`, if any.
    ///
    /// Lines of the form `#pragma <name> <value>` are handed to the registered
    /// pragma handlers before the script runs.
    ///
    /// # Errors
    /// Unknown or rejected pragmas, and any script error
    pub fn execute(&self, source: &str) -> Result<Option<Literal>, RuntimeError> {
        let mut script = String::with_capacity(source.len());

        for line in source.lines() {
            match line.trim_start().strip_prefix("#pragma") {
                Some(pragma) => {
                    self.apply_pragma(pragma.trim())?;
                    // Keep line numbers in error messages intact
                    script.push('\n');
                }
                None => {
                    script.push_str(line);
                    script.push('\n');
                }
            }
        }

        let result = self
            .lua
            .load(script.as_str())
            .eval::<Option<Literal>>()?;
        Ok(result)
    }

    fn apply_pragma(&self, pragma: &str) -> Result<(), RuntimeError> {
        let (name, value) = pragma
            .split_once(char::is_whitespace)
            .map_or((pragma, ""), |(name, value)| (name, value.trim()));

        let Some((_, handler)) = self.pragmas.iter().find(|(registered, _)| registered == name) else {
            return Err(RuntimeError::UnknownPragma(name.to_string()));
        };

        if handler(value) {
            Ok(())
        } else {
            Err(RuntimeError::Pragma {
                name: name.to_string(),
                value: value.to_string(),
            })
        }
    }
}

/// The runtime shared between threads
#[derive(Clone)]
pub struct SharedRuntime(Arc<Mutex<PatternRuntime>>);

impl SharedRuntime {
    /// # Errors
    /// Fails if the interpreter cannot be created
    pub fn new() -> Result<Self, RuntimeError> {
        Ok(Self(Arc::new(Mutex::new(PatternRuntime::new()?))))
    }

    /// Exclusive access to the interpreter
    ///
    /// # Errors
    /// [`RuntimeError::Poisoned`] if a previous holder panicked
    pub fn lock(&self) -> Result<MutexGuard<'_, PatternRuntime>, RuntimeError> {
        self.0.lock().map_err(|_| RuntimeError::Poisoned)
    }

    /// Run `source` while holding the lock
    ///
    /// # Errors
    /// As [`PatternRuntime::execute`], plus [`RuntimeError::Poisoned`]
    pub fn execute(&self, source: &str) -> Result<Option<Literal>, RuntimeError> {
        self.lock()?.execute(source)
    }
}

fn sandboxed_lua() -> Result<Lua, RuntimeError> {
    let lua = Lua::new();

    lua.load(
        r#"
        os.execute = nil
        os.exit = nil
        os.remove = nil
        os.rename = nil
        io = nil
        loadfile = nil
        dofile = nil
        require = nil
    "#,
    )
    .exec()?;

    Ok(lua)
}

fn install_function(
    lua: &Lua,
    function: &FunctionDefinition,
    allow_dangerous: Arc<AtomicBool>,
) -> Result<(), RuntimeError> {
    let qualified_name = function.qualified_name();
    let parameters = function.parameters;
    let dangerous = function.dangerous;
    let callback = function.callback.clone();

    let table = namespace_table(lua, &function.namespace)?;
    if !matches!(table.raw_get::<_, Value>(function.name.as_str())?, Value::Nil) {
        return Err(mlua::Error::RuntimeError(format!("'{qualified_name}' is already defined")).into());
    }

    let lua_function = lua.create_function(move |_, arguments: Variadic<Literal>| {
        if dangerous && !allow_dangerous.load(Ordering::SeqCst) {
            return Err(mlua::Error::RuntimeError(format!(
                "dangerous function '{qualified_name}' is not permitted"
            )));
        }

        if !parameters.accepts(arguments.len()) {
            return Err(mlua::Error::RuntimeError(format!(
                "'{qualified_name}' takes {parameters} parameters, got {}",
                arguments.len()
            )));
        }

        callback(arguments.as_slice()).map_err(mlua::Error::RuntimeError)
    })?;

    table.set(function.name.as_str(), lua_function)?;
    Ok(())
}

fn namespace_table<'lua>(lua: &'lua Lua, namespace: &[String]) -> mlua::Result<Table<'lua>> {
    let mut table = lua.globals();

    for segment in namespace {
        table = match table.raw_get::<_, Value>(segment.as_str())? {
            Value::Table(existing) => existing,
            Value::Nil => {
                let created = lua.create_table()?;
                table.raw_set(segment.as_str(), created.clone())?;
                created
            }
            _ => {
                return Err(mlua::Error::RuntimeError(format!(
                    "'{segment}' is already defined and is not a namespace"
                )))
            }
        };
    }

    Ok(table)
}
