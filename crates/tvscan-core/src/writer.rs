//! Plain-text symbol lists and JSON watchlist snapshots.
//!
//! Text lists are what the downstream import expects: an optional `#`
//! comment header followed by one symbol per line.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::{UtcDateTime, ValidationError, Watchlist};

#[derive(Debug, Error)]
pub enum WriterError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl WriterError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Comment block written above a symbol list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListHeader {
    title: Option<String>,
    generated_at: UtcDateTime,
}

impl ListHeader {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            generated_at: UtcDateTime::now(),
        }
    }

    /// No comment lines at all.
    pub fn bare() -> Self {
        Self {
            title: None,
            generated_at: UtcDateTime::now(),
        }
    }

    pub fn with_generated_at(mut self, generated_at: UtcDateTime) -> Self {
        self.generated_at = generated_at;
        self
    }

    pub const fn generated_at(&self) -> UtcDateTime {
        self.generated_at
    }
}

/// Per-line rendering options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolListFormat {
    /// Prepended as `EXCHANGE:` to symbols that carry no prefix yet.
    pub exchange_prefix: Option<String>,
}

impl SymbolListFormat {
    pub fn with_exchange_prefix(exchange: impl Into<String>) -> Self {
        Self {
            exchange_prefix: Some(exchange.into().trim().to_ascii_uppercase()),
        }
    }

    /// The symbol as written out, prefixed when a prefix is set.
    pub fn render<'a>(&self, symbol: &'a str) -> std::borrow::Cow<'a, str> {
        match &self.exchange_prefix {
            Some(prefix) if !prefix.is_empty() && !symbol.contains(':') => {
                format!("{prefix}:{symbol}").into()
            }
            _ => symbol.into(),
        }
    }
}

/// Write `symbols` one per line under `header`.
pub fn write_symbol_list<W, S>(
    writer: &mut W,
    header: &ListHeader,
    format: &SymbolListFormat,
    symbols: &[S],
) -> Result<(), WriterError>
where
    W: Write,
    S: AsRef<str>,
{
    for symbol in symbols {
        let symbol = symbol.as_ref();
        if symbol.contains(['\n', '\r']) {
            return Err(ValidationError::SymbolContainsLineBreak {
                value: symbol.escape_debug().to_string(),
            }
            .into());
        }
    }

    let mut write_all = || -> io::Result<()> {
        if let Some(title) = &header.title {
            writeln!(writer, "# {title}")?;
            writeln!(writer, "# Generated: {}", header.generated_at.display_seconds())?;
            writeln!(writer, "# Total symbols: {}", symbols.len())?;
            writeln!(writer)?;
        }
        for symbol in symbols {
            writeln!(writer, "{}", format.render(symbol.as_ref()))?;
        }
        Ok(())
    };

    write_all().map_err(|source| WriterError::io(Path::new("<writer>"), source))
}

/// Write a symbol list to `<dir>/<stem>_<YYYYMMDD_HHMMSS>.txt`, creating
/// `dir` if needed. Returns the written path.
pub fn write_symbol_file<S: AsRef<str>>(
    dir: &Path,
    stem: &str,
    header: &ListHeader,
    format: &SymbolListFormat,
    symbols: &[S],
) -> Result<PathBuf, WriterError> {
    fs::create_dir_all(dir).map_err(|source| WriterError::io(dir, source))?;

    let path = dir.join(format!("{stem}_{}.txt", header.generated_at.file_stamp()));
    let file = File::create(&path).map_err(|source| WriterError::io(&path, source))?;
    let mut writer = BufWriter::new(file);

    write_symbol_list(&mut writer, header, format, symbols).map_err(|error| match error {
        WriterError::Io { source, .. } => WriterError::io(&path, source),
        other => other,
    })?;
    writer
        .flush()
        .map_err(|source| WriterError::io(&path, source))?;

    tracing::info!(path = %path.display(), count = symbols.len(), "wrote symbol list");
    Ok(path)
}

/// Persist a watchlist snapshot as pretty JSON.
pub fn save_watchlist_json(path: &Path, watchlist: &Watchlist) -> Result<(), WriterError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| WriterError::io(parent, source))?;
    }

    let payload = serde_json::to_string_pretty(watchlist)?;
    fs::write(path, payload).map_err(|source| WriterError::io(path, source))?;

    tracing::info!(
        path = %path.display(),
        name = watchlist.name(),
        count = watchlist.len(),
        "saved watchlist snapshot"
    );
    Ok(())
}

/// Load a watchlist snapshot. A missing file is `Ok(None)`.
pub fn load_watchlist_json(path: &Path) -> Result<Option<Watchlist>, WriterError> {
    let payload = match fs::read_to_string(path) {
        Ok(payload) => payload,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no watchlist snapshot found");
            return Ok(None);
        }
        Err(source) => return Err(WriterError::io(path, source)),
    };

    let watchlist: Watchlist = serde_json::from_str(&payload)?;
    tracing::info!(name = watchlist.name(), count = watchlist.len(), "loaded watchlist snapshot");
    Ok(Some(watchlist))
}
