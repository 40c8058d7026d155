use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub type OpenCallback = Arc<dyn Fn(&Path) -> bool + Send + Sync>;

/// Opens files with particular extensions
pub struct FileHandler {
    /// Lowercase, without the leading dot
    pub extensions: Vec<String>,
    pub callback: OpenCallback,
}

#[derive(Default)]
pub struct FileHandlers {
    handlers: Vec<FileHandler>,
}

impl FileHandlers {
    /// Register `callback` for every extension in `extensions`.
    /// Extensions are matched case-insensitively; a leading dot is ignored.
    pub fn add<I, S>(&mut self, extensions: I, callback: impl Fn(&Path) -> bool + Send + Sync + 'static)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|extension| extension.as_ref().trim_start_matches('.').to_lowercase())
            .collect();

        self.handlers.push(FileHandler {
            extensions,
            callback: Arc::new(callback),
        });
    }

    /// First handler that accepts the extension of `path`
    #[must_use]
    pub fn handler_for(&self, path: &Path) -> Option<&FileHandler> {
        let extension = path.extension()?.to_string_lossy().to_lowercase();
        self.handlers
            .iter()
            .find(|handler| handler.extensions.iter().any(|e| *e == extension))
    }

    /// Open `path` with its handler. Returns false if none accepts it.
    pub fn open(&self, path: &Path) -> bool {
        match self.handler_for(path) {
            Some(handler) => (handler.callback)(path),
            None => {
                debug!("No file handler for '{}'", path.display());
                false
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileHandler> {
        self.handlers.iter()
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}
